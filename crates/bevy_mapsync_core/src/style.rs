//! Feature styling for GeoJSON layers.
//!
//! Style rules are data: the backend evaluates [`StyleRule::resolve`] for each
//! feature it draws. Classification of numeric property values is a closed
//! enum, so every value maps to exactly one outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fill opacity used by the classified and membership rules.
pub const DEFAULT_FILL_OPACITY: f64 = 0.6;

/// How features of a GeoJSON layer are colored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum StyleRule {
    /// Every feature filled with one color.
    Uniform { color: String },

    /// Color by the classification of a numeric column (see [`Classification`]).
    Classified { column: String },

    /// Red when the stringified `property` is listed in `members`, black otherwise.
    Membership {
        property: String,
        members: Vec<String>,
    },

    /// Opacity proportional to `variable` within its range over the dataset.
    Normalized {
        variable: String,
        #[serde(default = "default_heat_color")]
        color: String,
    },
}

fn default_heat_color() -> String {
    "red".to_string()
}

impl StyleRule {
    /// Whether the property name the rule reads is non-empty.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Uniform { color } => !color.trim().is_empty(),
            Self::Classified { column } => !column.trim().is_empty(),
            Self::Membership { property, .. } => !property.trim().is_empty(),
            Self::Normalized { variable, .. } => !variable.trim().is_empty(),
        }
    }

    /// Style for one feature.
    pub fn resolve(&self, properties: &Map<String, Value>, ranges: &StatRanges) -> FeatureStyle {
        match self {
            Self::Uniform { color } => FeatureStyle::filled(color, DEFAULT_FILL_OPACITY),
            Self::Classified { column } => Classification::of(properties.get(column)).style(),
            Self::Membership { property, members } => {
                let member = properties
                    .get(property)
                    .and_then(stringify)
                    .is_some_and(|value| members.iter().any(|m| *m == value));
                FeatureStyle::filled(if member { "red" } else { "black" }, DEFAULT_FILL_OPACITY)
            }
            Self::Normalized { variable, color } => {
                let value = properties.get(variable).and_then(Value::as_f64);
                match (value, ranges.get(variable)) {
                    (Some(value), Some(range)) => FeatureStyle::filled(color, range.normalize(value)),
                    _ => FeatureStyle::hidden(),
                }
            }
        }
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Outcome of classifying a presence/absence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Value `1`.
    Present,
    /// Value `-1`.
    Absent,
    /// Value `2`.
    Both,
    /// Anything else, including missing and non-numeric values.
    Unclassified,
}

impl Classification {
    pub fn of(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_f64) {
            Some(v) if v == 1.0 => Self::Present,
            Some(v) if v == -1.0 => Self::Absent,
            Some(v) if v == 2.0 => Self::Both,
            _ => Self::Unclassified,
        }
    }

    /// Unclassified features are not drawn.
    pub fn style(self) -> FeatureStyle {
        match self {
            Self::Present => FeatureStyle::filled("blue", DEFAULT_FILL_OPACITY),
            Self::Absent => FeatureStyle::filled("red", DEFAULT_FILL_OPACITY),
            Self::Both => FeatureStyle::filled("purple", DEFAULT_FILL_OPACITY),
            Self::Unclassified => FeatureStyle::hidden(),
        }
    }
}

/// Resolved drawing parameters for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub fill: bool,
    pub stroke: bool,
    pub fill_color: Option<String>,
    pub fill_opacity: f64,
}

impl FeatureStyle {
    pub fn filled(color: &str, opacity: f64) -> Self {
        Self {
            fill: true,
            stroke: false,
            fill_color: Some(color.to_string()),
            fill_opacity: opacity,
        }
    }

    pub fn hidden() -> Self {
        Self {
            fill: false,
            stroke: false,
            fill_color: None,
            fill_opacity: DEFAULT_FILL_OPACITY,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.fill || self.stroke
    }
}

/// Inclusive min/max of one numeric property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: f64,
    pub max: f64,
}

impl StatRange {
    /// Position of `value` in the range, clamped to `0..=1`.
    ///
    /// A degenerate range (`min == max`) maps everything to 1.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Per-property ranges over a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRanges(pub BTreeMap<String, StatRange>);

impl StatRanges {
    /// Collect ranges of every numeric property over `features`.
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a Map<String, Value>>) -> Self {
        let mut ranges: BTreeMap<String, StatRange> = BTreeMap::new();
        for properties in features {
            for (name, value) in properties {
                let Some(value) = value.as_f64() else {
                    continue;
                };
                ranges
                    .entry(name.clone())
                    .and_modify(|range| {
                        range.min = range.min.min(value);
                        range.max = range.max.max(value);
                    })
                    .or_insert(StatRange {
                        min: value,
                        max: value,
                    });
            }
        }
        Self(ranges)
    }

    pub fn get(&self, name: &str) -> Option<&StatRange> {
        self.0.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_classification_outcomes() {
        assert_eq!(Classification::of(Some(&json!(1))), Classification::Present);
        assert_eq!(Classification::of(Some(&json!(-1))), Classification::Absent);
        assert_eq!(Classification::of(Some(&json!(2.0))), Classification::Both);
        assert_eq!(Classification::of(Some(&json!(0))), Classification::Unclassified);
        assert_eq!(Classification::of(Some(&json!("1"))), Classification::Unclassified);
        assert_eq!(Classification::of(None), Classification::Unclassified);
    }

    #[test]
    fn test_classified_rule_colors() {
        let rule = StyleRule::Classified { column: "sp".into() };
        let ranges = StatRanges::default();

        let present = rule.resolve(&props(json!({"sp": 1})), &ranges);
        assert_eq!(present.fill_color.as_deref(), Some("blue"));
        assert_eq!(present.fill_opacity, DEFAULT_FILL_OPACITY);
        assert!(!present.stroke);

        let both = rule.resolve(&props(json!({"sp": 2})), &ranges);
        assert_eq!(both.fill_color.as_deref(), Some("purple"));

        let unknown = rule.resolve(&props(json!({"sp": 7})), &ranges);
        assert!(!unknown.is_visible());
    }

    #[test]
    fn test_membership_rule_stringifies_ids() {
        let rule = StyleRule::Membership {
            property: "siteid".into(),
            members: vec!["12".into(), "40".into()],
        };
        let ranges = StatRanges::default();
        let inside = rule.resolve(&props(json!({"siteid": 12})), &ranges);
        let outside = rule.resolve(&props(json!({"siteid": 13})), &ranges);
        assert_eq!(inside.fill_color.as_deref(), Some("red"));
        assert_eq!(outside.fill_color.as_deref(), Some("black"));
    }

    #[test]
    fn test_normalized_rule_uses_dataset_range() {
        let features = [
            props(json!({"alpha": 2.0, "name": "a"})),
            props(json!({"alpha": 6.0})),
            props(json!({"alpha": 4.0})),
        ];
        let ranges = StatRanges::from_features(&features);
        assert_eq!(ranges.get("alpha"), Some(&StatRange { min: 2.0, max: 6.0 }));
        assert!(ranges.get("name").is_none());

        let rule = StyleRule::Normalized {
            variable: "alpha".into(),
            color: "red".into(),
        };
        assert_eq!(rule.resolve(&features[2], &ranges).fill_opacity, 0.5);
        assert!(!rule.resolve(&props(json!({})), &ranges).is_visible());
    }

    #[test]
    fn test_degenerate_range_is_fully_opaque() {
        let range = StatRange { min: 3.0, max: 3.0 };
        assert_eq!(range.normalize(3.0), 1.0);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: StyleRule =
            serde_json::from_value(json!({"rule": "normalized", "variable": "alpha"})).unwrap();
        assert_eq!(
            rule,
            StyleRule::Normalized {
                variable: "alpha".into(),
                color: "red".into()
            }
        );
    }
}
