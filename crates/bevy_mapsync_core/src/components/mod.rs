//! Components describing map containers in the ECS world.

pub mod attributes;
pub mod container;

// Re-export commonly used components
pub use attributes::MapAttributes;
pub use container::{ContainerId, ContainerSelector, MapContainer};
