//! Systems and observers that keep the registry in step with the world.

pub mod commands;
pub mod context;
pub mod lifecycle;
pub mod outbound;

pub use commands::{apply_map_commands, pump_backend_events, teardown_on_exit};
pub use context::MountContext;
pub use lifecycle::{
    ContainerOwners, PollTimer, on_container_inserted, on_container_replaced, poll_containers,
    reapply_changed_attributes,
};
pub use outbound::MapOutbound;
