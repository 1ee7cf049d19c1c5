//! ambiance-core: Channel formats, container profiles, track planning and routing conflicts

pub mod channel_config;
pub mod conflicts;
mod error;
pub mod planner;
pub mod profile;
mod project;
pub mod volume;

pub use channel_config::{
    get_config, get_config_by_index, output_channel_count, required_channels, round_up_even,
    ChannelConfig, ChannelMode, ChannelVariant, ResolvedRouting, VariantId,
};
pub use conflicts::{
    apply_suggestion, detect_conflicts, routing_usage, suggest_fix, ChannelOccupant, Conflict,
    RoutingUsage, Suggestion,
};
pub use error::{Result, RoutingError};
pub use planner::{
    determine_track_structure, effective_mono_channel, effective_stereo_pair,
    source_channel_order, AutoBalance, DefaultBalance, ItemAnalysis, PlanStrategy, TrackPlan,
    TrackStructurePlanner, TrackType,
};
pub use profile::{
    migrate_legacy_record, ChannelPick, ChannelSelectionMode, ContainerChannelProfile,
    ItemDistributionMode, ProfileChange, ProfileCommand,
};
pub use project::{Container, ContainerId, Group, Project};
pub use volume::{clamp_db, db_to_linear, linear_to_db};
