//! Multichannel output formats and their routing tables

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// Logical output format of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChannelMode {
    /// Plain stereo passthrough, no multichannel routing
    #[default]
    Stereo,
    Quad,
    Five,
    Seven,
}

impl ChannelMode {
    pub const ALL: [ChannelMode; 4] = [Self::Stereo, Self::Quad, Self::Five, Self::Seven];

    pub fn index(&self) -> u8 {
        match self {
            Self::Stereo => 0,
            Self::Quad => 1,
            Self::Five => 2,
            Self::Seven => 3,
        }
    }

    pub fn is_multichannel(&self) -> bool {
        !matches!(self, Self::Stereo)
    }

    pub fn name(&self) -> &'static str {
        match get_config(*self) {
            Some(config) => config.name,
            None => "Stereo",
        }
    }
}

impl TryFrom<u8> for ChannelMode {
    type Error = RoutingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Stereo),
            1 => Ok(Self::Quad),
            2 => Ok(Self::Five),
            3 => Ok(Self::Seven),
            other => Err(RoutingError::UnknownValue {
                field: "channelMode",
                value: other.to_string(),
            }),
        }
    }
}

impl From<ChannelMode> for u8 {
    fn from(mode: ChannelMode) -> Self {
        mode.index()
    }
}

/// Physical ordering of the front channels in 5.0 / 7.0 layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantId {
    /// ITU/Dolby: L R C ...
    Itu,
    /// SMPTE: L C R ...
    Smpte,
}

impl VariantId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Itu => "ITU/Dolby",
            Self::Smpte => "SMPTE",
        }
    }
}

/// One routing table: labels in slot order and the physical channel each one lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelVariant {
    pub id: VariantId,
    pub name: &'static str,
    pub routing: &'static [u16],
    pub labels: &'static [&'static str],
}

/// A logical output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    pub name: &'static str,
    pub logical_channels: u32,
    pub total_channels: u32,
    pub has_variants: bool,
    /// First entry is the default table
    pub variants: &'static [ChannelVariant],
}

/// Labels and physical routing after variant and override resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRouting {
    pub labels: Vec<String>,
    pub routing: Vec<u16>,
}

impl ResolvedRouting {
    pub fn pairs(&self) -> impl Iterator<Item = (&str, u16)> {
        self.labels.iter().map(String::as_str).zip(self.routing.iter().copied())
    }

    pub fn physical_for(&self, label: &str) -> Option<u16> {
        self.pairs().find(|(l, _)| *l == label).map(|(_, ch)| ch)
    }

    pub fn required_channels(&self) -> u32 {
        required_channels(&self.routing)
    }
}

impl ChannelConfig {
    pub fn variant(&self, id: VariantId) -> Option<&'static ChannelVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn default_variant(&self) -> &'static ChannelVariant {
        &self.variants[0]
    }

    /// Resolve the table for a variant, falling back to the default one
    pub fn resolve(&self, variant: Option<VariantId>) -> ResolvedRouting {
        let table = variant
            .filter(|_| self.has_variants)
            .and_then(|id| self.variant(id))
            .unwrap_or_else(|| self.default_variant());

        ResolvedRouting {
            labels: table.labels.iter().map(|l| l.to_string()).collect(),
            routing: table.routing.to_vec(),
        }
    }

    /// Labels used for stereo pairing (the center channel has no partner)
    pub fn pairable_labels(&self, variant: Option<VariantId>) -> Vec<String> {
        self.resolve(variant)
            .labels
            .into_iter()
            .filter(|l| l != "C")
            .collect()
    }
}

const QUAD_VARIANTS: &[ChannelVariant] = &[ChannelVariant {
    id: VariantId::Itu,
    name: "Default",
    routing: &[1, 2, 3, 4],
    labels: &["L", "R", "LS", "RS"],
}];

// Slot 4 is left free for LFE in both surround layouts.
const FIVE_VARIANTS: &[ChannelVariant] = &[
    ChannelVariant {
        id: VariantId::Itu,
        name: "ITU/Dolby",
        routing: &[1, 2, 3, 5, 6],
        labels: &["L", "R", "C", "LS", "RS"],
    },
    ChannelVariant {
        id: VariantId::Smpte,
        name: "SMPTE",
        routing: &[1, 2, 3, 5, 6],
        labels: &["L", "C", "R", "LS", "RS"],
    },
];

const SEVEN_VARIANTS: &[ChannelVariant] = &[
    ChannelVariant {
        id: VariantId::Itu,
        name: "ITU/Dolby",
        routing: &[1, 2, 3, 5, 6, 7, 8],
        labels: &["L", "R", "C", "LS", "RS", "LB", "RB"],
    },
    ChannelVariant {
        id: VariantId::Smpte,
        name: "SMPTE",
        routing: &[1, 2, 3, 5, 6, 7, 8],
        labels: &["L", "C", "R", "LS", "RS", "LB", "RB"],
    },
];

static CATALOG: [ChannelConfig; 3] = [
    ChannelConfig {
        mode: ChannelMode::Quad,
        name: "4.0 Quad",
        logical_channels: 4,
        total_channels: 4,
        has_variants: false,
        variants: QUAD_VARIANTS,
    },
    ChannelConfig {
        mode: ChannelMode::Five,
        name: "5.0",
        logical_channels: 5,
        total_channels: 6,
        has_variants: true,
        variants: FIVE_VARIANTS,
    },
    ChannelConfig {
        mode: ChannelMode::Seven,
        name: "7.0",
        logical_channels: 7,
        total_channels: 8,
        has_variants: true,
        variants: SEVEN_VARIANTS,
    },
];

/// Look up the config for a mode. Stereo has no entry.
pub fn get_config(mode: ChannelMode) -> Option<&'static ChannelConfig> {
    CATALOG.iter().find(|c| c.mode == mode)
}

/// Lookup by raw stored index; unknown modes degrade to stereo passthrough
pub fn get_config_by_index(index: u8) -> Option<&'static ChannelConfig> {
    ChannelMode::try_from(index).ok().and_then(get_config)
}

/// Number of logical output channels for a mode
pub fn output_channel_count(mode: ChannelMode) -> u32 {
    get_config(mode).map_or(2, |c| c.logical_channels)
}

pub fn round_up_even(channels: u32) -> u32 {
    channels + channels % 2
}

/// Smallest even channel count (at least 2) covering every physical channel in `routing`
pub fn required_channels(routing: &[u16]) -> u32 {
    let highest = routing.iter().copied().max().unwrap_or(0) as u32;
    round_up_even(highest).max(2)
}
