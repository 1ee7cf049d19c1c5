//! ambiance-services: Host port, channel track binding and channel propagation

pub mod binding;
pub mod host;
pub mod memory;
pub mod pending;
pub mod propagator;
pub mod session;
pub mod tree;

pub use binding::{
    apply_plan, existing_channel_tracks, get_channel_volume, resolve_container_track,
    set_channel_volume, sync_channel_volumes, update_routing,
};
pub use host::{with_undo_block, HostPort, TrackGuid, TrackProperty, TrackSnapshot};
pub use memory::{MemoryHost, MemoryTrack};
pub use pending::{FlushReport, PendingUpdates, UpdateKind};
pub use propagator::{ensure_ancestor_capacity, optimize_project, ChannelChange, OptimizeReport};
pub use session::{RegenerateOutcome, RoutingSession};
pub use tree::{TrackNode, TrackTree};
