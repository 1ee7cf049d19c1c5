//! Track structure planning: how many output tracks a container gets and what they carry

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel_config::{round_up_even, ChannelConfig, VariantId};
use crate::profile::{ChannelPick, ChannelSelectionMode, ContainerChannelProfile};

pub const STEREO_PAIRS_UNAVAILABLE: &str = "Stereo pairs not available";

/// Upper bound for a generated track's channel count
const MAX_TRACK_CHANNELS: u32 = 64;

/// Channel layout of the source items, as reported by the generation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAnalysis {
    pub max_item_channels: u32,
    pub item_count: usize,
}

impl ItemAnalysis {
    pub fn new(max_item_channels: u32, item_count: usize) -> Self {
        Self { max_item_channels, item_count }
    }

    pub fn is_mono(&self) -> bool {
        self.max_item_channels == 1
    }

    /// Number of complete stereo pairs in the widest item
    pub fn stereo_pairs(&self) -> u32 {
        self.max_item_channels / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackType {
    Mono,
    Stereo,
    Multichannel,
}

impl TrackType {
    pub fn for_channels(channels: u32) -> Self {
        match channels {
            0 | 1 => Self::Mono,
            2 => Self::Stereo,
            _ => Self::Multichannel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanStrategy {
    StereoPassthrough,
    StereoPairs,
    MonoSplit,
    AutoMonoSpread,
    AutoStereoPairs,
    AutoPassthrough,
    AutoTruncate,
    Fallback,
}

impl PlanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StereoPassthrough => "stereo passthrough",
            Self::StereoPairs => "stereo pairs",
            Self::MonoSplit => "mono split",
            Self::AutoMonoSpread => "auto: mono items spread over outputs",
            Self::AutoStereoPairs => "auto: stereo items on output pairs",
            Self::AutoPassthrough => "auto: multichannel passthrough",
            Self::AutoTruncate => "auto: extra item channels dropped",
            Self::Fallback => "single track fallback",
        }
    }
}

impl fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived output-track layout for a container. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPlan {
    pub num_tracks: u32,
    pub track_channels: u32,
    pub track_type: TrackType,
    pub track_labels: Vec<String>,
    pub use_distribution: bool,
    pub needs_source_variant: bool,
    pub strategy: PlanStrategy,
    pub warning: Option<String>,
}

impl TrackPlan {
    pub fn stereo() -> Self {
        Self::single(2, "L/R", PlanStrategy::StereoPassthrough)
    }

    pub fn single(channels: u32, label: impl Into<String>, strategy: PlanStrategy) -> Self {
        Self {
            num_tracks: 1,
            track_channels: channels,
            track_type: TrackType::for_channels(channels),
            track_labels: vec![label.into()],
            use_distribution: false,
            needs_source_variant: false,
            strategy,
            warning: None,
        }
    }

    /// Safe single stereo track carrying a warning for the preview
    pub fn fallback(warning: impl Into<String>) -> Self {
        Self {
            warning: Some(warning.into()),
            ..Self::single(2, "L/R", PlanStrategy::Fallback)
        }
    }

    pub fn per_track(labels: Vec<String>, track_channels: u32, strategy: PlanStrategy) -> Self {
        Self {
            num_tracks: labels.len() as u32,
            track_channels,
            track_type: TrackType::for_channels(track_channels),
            track_labels: labels,
            use_distribution: false,
            needs_source_variant: false,
            strategy,
            warning: None,
        }
    }

    /// Channel count to give each generated track in the host
    pub fn host_track_channels(&self) -> u32 {
        round_up_even(self.track_channels).max(2)
    }

    fn is_well_formed(&self) -> bool {
        self.num_tracks >= 1
            && self.track_labels.len() == self.num_tracks as usize
            && (1..=MAX_TRACK_CHANNELS).contains(&self.track_channels)
    }

    /// Lines for the structure preview
    pub fn describe(&self) -> Vec<String> {
        let kind = match self.track_type {
            TrackType::Mono => "mono",
            TrackType::Stereo => "stereo",
            TrackType::Multichannel => "multichannel",
        };
        let plural = if self.num_tracks == 1 { "" } else { "s" };

        let mut lines = vec![
            format!("Strategy: {}", self.strategy),
            format!("{} {} track{} ({} ch)", self.num_tracks, kind, plural, self.track_channels),
        ];
        lines.extend(
            self.track_labels
                .iter()
                .enumerate()
                .map(|(i, label)| format!("  {}: {}", i + 1, label)),
        );
        if self.use_distribution {
            lines.push("Items are distributed across tracks".to_string());
        }
        if self.needs_source_variant {
            lines.push("Select the channel order of the source items".to_string());
        }
        if let Some(warning) = &self.warning {
            lines.push(format!("Warning: {warning}"));
        }
        lines
    }
}

/// Auto-balancing of item channels against the output format.
///
/// Used when the profile has no explicit channel selection. The generation
/// engine may supply its own heuristic; [`DefaultBalance`] is used otherwise.
pub trait AutoBalance {
    fn balance(
        &self,
        profile: &ContainerChannelProfile,
        config: &ChannelConfig,
        analysis: &ItemAnalysis,
    ) -> TrackPlan;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBalance;

impl AutoBalance for DefaultBalance {
    fn balance(
        &self,
        profile: &ContainerChannelProfile,
        config: &ChannelConfig,
        analysis: &ItemAnalysis,
    ) -> TrackPlan {
        let outputs = config.logical_channels;
        let resolved = config.resolve(profile.channel_variant());

        match analysis.max_item_channels {
            0 => TrackPlan::fallback("No items to analyze"),
            1 => TrackPlan::per_track(resolved.labels, 1, PlanStrategy::AutoMonoSpread),
            2 => TrackPlan::per_track(
                pair_labels(config, profile.channel_variant()),
                2,
                PlanStrategy::AutoStereoPairs,
            ),
            n if n > outputs => Self::passthrough(config, outputs, PlanStrategy::AutoTruncate)
                .with_warning(format!(
                    "Items have {n} channels; only the first {outputs} are used"
                )),
            n => Self::passthrough(config, n, PlanStrategy::AutoPassthrough),
        }
    }
}

impl DefaultBalance {
    fn passthrough(config: &ChannelConfig, channels: u32, strategy: PlanStrategy) -> TrackPlan {
        TrackPlan::single(channels, config.name, strategy)
    }
}

impl TrackPlan {
    fn with_warning(mut self, warning: String) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// "L/R", "LS/RS", ... for the pairable labels of a layout
fn pair_labels(config: &ChannelConfig, variant: Option<VariantId>) -> Vec<String> {
    config
        .pairable_labels(variant)
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| format!("{}/{}", pair[0], pair[1]))
        .collect()
}

/// Derives a [`TrackPlan`] from a profile and the analysis of its source items
#[derive(Debug, Clone, Default)]
pub struct TrackStructurePlanner<B = DefaultBalance> {
    balancer: B,
}

impl TrackStructurePlanner<DefaultBalance> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: AutoBalance> TrackStructurePlanner<B> {
    pub fn with_balancer(balancer: B) -> Self {
        Self { balancer }
    }

    /// Compute the plan. Never fails: bad input yields a safe plan with a warning.
    pub fn plan(&self, profile: &ContainerChannelProfile, analysis: &ItemAnalysis) -> TrackPlan {
        let Some(config) = profile.config() else {
            return TrackPlan::stereo();
        };

        let selection = profile.channel_selection_mode();
        let mut plan = match selection {
            ChannelSelectionMode::StereoPairs => Self::plan_stereo_pairs(profile, config, analysis),
            ChannelSelectionMode::MonoSplit => Self::plan_mono_split(profile, config, analysis),
            ChannelSelectionMode::None => {
                let proposed = self.balancer.balance(profile, config, analysis);
                if proposed.is_well_formed() {
                    proposed
                } else {
                    warn!(?proposed, "Auto-balance produced an invalid structure");
                    TrackPlan::fallback("Could not determine track structure")
                }
            }
        };

        plan.use_distribution = plan.num_tracks > 1 && analysis.is_mono();
        plan.needs_source_variant = selection == ChannelSelectionMode::None
            && config.logical_channels >= 5
            && analysis.max_item_channels >= 5
            && profile.source_channel_variant().is_none();

        if plan.warning.is_none() && analysis.item_count == 0 {
            plan.warning = Some("No items to analyze".to_string());
        }

        debug!(
            strategy = %plan.strategy,
            tracks = plan.num_tracks,
            channels = plan.track_channels,
            "Track structure planned"
        );
        plan
    }

    fn plan_stereo_pairs(
        profile: &ContainerChannelProfile,
        config: &ChannelConfig,
        analysis: &ItemAnalysis,
    ) -> TrackPlan {
        let items = analysis.max_item_channels;
        if items < 2 || items % 2 != 0 {
            return TrackPlan::fallback(STEREO_PAIRS_UNAVAILABLE);
        }

        let outputs = config.logical_channels;
        let labels = if outputs == 2 {
            vec!["L/R".to_string()]
        } else {
            let mut labels = pair_labels(config, profile.channel_variant());
            labels.truncate((outputs / 2) as usize);
            labels
        };
        TrackPlan::per_track(labels, 2, PlanStrategy::StereoPairs)
    }

    fn plan_mono_split(
        profile: &ContainerChannelProfile,
        config: &ChannelConfig,
        analysis: &ItemAnalysis,
    ) -> TrackPlan {
        let labels = config.resolve(profile.channel_variant()).labels;
        let mut plan = TrackPlan::per_track(labels, 1, PlanStrategy::MonoSplit);

        if let ChannelPick::Index(channel) = profile.mono_channel_selection() {
            let items = analysis.max_item_channels;
            if items > 0 && channel > items {
                plan.warning = Some(format!(
                    "Channel {channel} exceeds the {items} item channels; channel {items} is used"
                ));
            }
        }
        plan
    }
}

/// Shorthand for planning with the default auto-balance heuristic
pub fn determine_track_structure(
    profile: &ContainerChannelProfile,
    analysis: &ItemAnalysis,
) -> TrackPlan {
    TrackStructurePlanner::new().plan(profile, analysis)
}

/// Source channel pair (1-based, inclusive) that output track `track` extracts
pub fn effective_stereo_pair(
    profile: &ContainerChannelProfile,
    track: u32,
    num_pairs: u32,
    rng: &mut fastrand::Rng,
) -> (u32, u32) {
    if num_pairs <= 1 {
        return (1, 2);
    }

    let pick = match profile.stereo_pair_mapping().get(&track) {
        Some(&pick) => pick,
        None if profile.stereo_pair_track_count() == 1 => profile.stereo_pair_selection(),
        None => ChannelPick::Index(track.saturating_sub(1) % num_pairs + 1),
    };

    let pair = match pick {
        ChannelPick::Index(pair) => pair.clamp(1, num_pairs),
        ChannelPick::Random => rng.u32(1..=num_pairs),
    };
    (pair * 2 - 1, pair * 2)
}

/// Source channel (1-based) extracted for mono split tracks
pub fn effective_mono_channel(
    profile: &ContainerChannelProfile,
    item_channels: u32,
    rng: &mut fastrand::Rng,
) -> u32 {
    if item_channels <= 1 {
        return 1;
    }
    match profile.mono_channel_selection() {
        ChannelPick::Index(channel) => channel.clamp(1, item_channels),
        ChannelPick::Random => rng.u32(1..=item_channels),
    }
}

/// For each output slot, the 1-based source channel carrying the same label.
///
/// Source items recorded in one ordering (ITU or SMPTE) are reordered onto the
/// container's ordering. Labels missing from the source map to `None`.
pub fn source_channel_order(
    config: &ChannelConfig,
    output_variant: Option<VariantId>,
    source_variant: VariantId,
) -> Vec<Option<u32>> {
    let source = config.resolve(Some(source_variant)).labels;
    config
        .resolve(output_variant)
        .labels
        .iter()
        .map(|label| source.iter().position(|s| s == label).map(|i| i as u32 + 1))
        .collect()
}
