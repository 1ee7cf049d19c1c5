//! Per-container channel configuration and the commands that mutate it

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::channel_config::{
    get_config, output_channel_count, required_channels, ChannelConfig, ChannelMode,
    ResolvedRouting, VariantId,
};
use crate::error::{Result, RoutingError};
use crate::volume::clamp_db;

/// How a multichannel source is split across the output tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelSelectionMode {
    /// Auto-balance item channels against the output format
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "stereo")]
    StereoPairs,
    #[serde(rename = "mono")]
    MonoSplit,
}

/// How generated items fan out over several output tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemDistributionMode {
    #[default]
    RoundRobin,
    Random,
    /// Every track gets its own independent generation pass
    AllTracks,
}

/// A 1-based source channel or pair index, or a random pick at generation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PickRepr", into = "PickRepr")]
pub enum ChannelPick {
    Index(u32),
    Random,
}

impl Default for ChannelPick {
    fn default() -> Self {
        Self::Index(1)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PickRepr {
    Index(u32),
    Keyword(String),
}

impl TryFrom<PickRepr> for ChannelPick {
    type Error = RoutingError;

    fn try_from(repr: PickRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            PickRepr::Index(0) => Err(RoutingError::UnknownValue {
                field: "channel index",
                value: "0".to_string(),
            }),
            PickRepr::Index(i) => Ok(Self::Index(i)),
            PickRepr::Keyword(k) if k.eq_ignore_ascii_case("random") => Ok(Self::Random),
            PickRepr::Keyword(k) => Err(RoutingError::UnknownValue {
                field: "channel index",
                value: k,
            }),
        }
    }
}

impl From<ChannelPick> for PickRepr {
    fn from(pick: ChannelPick) -> Self {
        match pick {
            ChannelPick::Index(i) => PickRepr::Index(i),
            ChannelPick::Random => PickRepr::Keyword("random".to_string()),
        }
    }
}

impl ChannelPick {
    fn validate(self, what: &str) -> Result<Self> {
        match self {
            Self::Index(0) => Err(RoutingError::InvalidChannelProfile(format!(
                "{what} index is 1-based"
            ))),
            pick => Ok(pick),
        }
    }
}

/// Validating mutations issued by the UI or a preset load
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileCommand {
    SetChannelMode(ChannelMode),
    SetChannelVariant(Option<VariantId>),
    SetSelectionMode(ChannelSelectionMode),
    SetStereoPairMapping { track: u32, pair: ChannelPick },
    ClearStereoPairMapping { track: u32 },
    SetStereoPairSelection(ChannelPick),
    SetMonoChannelSelection(ChannelPick),
    SetDistributionMode(ItemDistributionMode),
    SetSourceVariant(Option<VariantId>),
    SetChannelVolume { track: u32, db: f64 },
    ResetChannelVolumes,
    SetCustomRouting(Option<Vec<u16>>),
}

/// What a command changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileChange {
    Unchanged,
    /// Track structure or routing changed; the container must be regenerated
    Structure,
    /// Only live per-channel volumes changed
    Volume,
}

impl ProfileChange {
    pub fn needs_regeneration(&self) -> bool {
        matches!(self, Self::Structure)
    }
}

/// Channel configuration owned by a container.
///
/// Every deserialization goes through [`ContainerChannelProfile::from_record`],
/// so nested records in a saved project are migrated and validated too.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct ContainerChannelProfile {
    channel_mode: ChannelMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_variant: Option<VariantId>,
    channel_selection_mode: ChannelSelectionMode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    stereo_pair_mapping: BTreeMap<u32, ChannelPick>,
    stereo_pair_selection: ChannelPick,
    mono_channel_selection: ChannelPick,
    item_distribution_mode: ItemDistributionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_channel_variant: Option<VariantId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    channel_volumes: BTreeMap<u32, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_routing: Option<Vec<u16>>,
}

/// Stored profile fields as they appear in a record, before validation
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileFields {
    #[serde(default)]
    channel_mode: ChannelMode,
    #[serde(default)]
    channel_variant: Option<VariantId>,
    #[serde(default)]
    channel_selection_mode: ChannelSelectionMode,
    #[serde(default)]
    stereo_pair_mapping: BTreeMap<u32, ChannelPick>,
    #[serde(default)]
    stereo_pair_selection: ChannelPick,
    #[serde(default)]
    mono_channel_selection: ChannelPick,
    #[serde(default)]
    item_distribution_mode: ItemDistributionMode,
    #[serde(default)]
    source_channel_variant: Option<VariantId>,
    #[serde(default)]
    channel_volumes: BTreeMap<u32, f64>,
    #[serde(default)]
    custom_routing: Option<Vec<u16>>,
}

impl From<ProfileFields> for ContainerChannelProfile {
    fn from(fields: ProfileFields) -> Self {
        Self {
            channel_mode: fields.channel_mode,
            channel_variant: fields.channel_variant,
            channel_selection_mode: fields.channel_selection_mode,
            stereo_pair_mapping: fields.stereo_pair_mapping,
            stereo_pair_selection: fields.stereo_pair_selection,
            mono_channel_selection: fields.mono_channel_selection,
            item_distribution_mode: fields.item_distribution_mode,
            source_channel_variant: fields.source_channel_variant,
            channel_volumes: fields.channel_volumes,
            custom_routing: fields.custom_routing,
        }
    }
}

impl TryFrom<Map<String, Value>> for ContainerChannelProfile {
    type Error = RoutingError;

    fn try_from(mut record: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        Self::from_record(&mut record)
    }
}

impl ContainerChannelProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ChannelMode) -> Self {
        Self {
            channel_mode: mode,
            ..Default::default()
        }
    }

    /// Load from a container preset record, migrating legacy downmix fields in place
    pub fn from_record(record: &mut Map<String, Value>) -> Result<Self> {
        migrate_legacy_record(record)?;
        let fields: ProfileFields = serde_json::from_value(Value::Object(record.clone()))?;
        let profile = Self::from(fields);
        profile.validate()?;
        Ok(profile)
    }

    /// Write the profile fields into a container preset record
    pub fn write_record(&self, record: &mut Map<String, Value>) -> Result<()> {
        if let Value::Object(fields) = serde_json::to_value(self)? {
            record.extend(fields);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(routing) = &self.custom_routing {
            self.check_routing(routing)?;
        }
        let pair_tracks = self.stereo_pair_track_count();
        if let Some(&track) = self.stereo_pair_mapping.keys().find(|&&t| t == 0 || t > pair_tracks) {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "stereo pair mapping for track {track} outside 1..={pair_tracks}"
            )));
        }
        if let Some((track, db)) = self.channel_volumes.iter().find(|(_, db)| !db.is_finite()) {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "volume {db} dB for track {track} is not a number"
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    pub fn channel_variant(&self) -> Option<VariantId> {
        self.channel_variant
    }

    pub fn channel_selection_mode(&self) -> ChannelSelectionMode {
        self.channel_selection_mode
    }

    pub fn stereo_pair_mapping(&self) -> &BTreeMap<u32, ChannelPick> {
        &self.stereo_pair_mapping
    }

    pub fn stereo_pair_selection(&self) -> ChannelPick {
        self.stereo_pair_selection
    }

    pub fn mono_channel_selection(&self) -> ChannelPick {
        self.mono_channel_selection
    }

    pub fn item_distribution_mode(&self) -> ItemDistributionMode {
        self.item_distribution_mode
    }

    pub fn source_channel_variant(&self) -> Option<VariantId> {
        self.source_channel_variant
    }

    pub fn custom_routing(&self) -> Option<&[u16]> {
        self.custom_routing.as_deref()
    }

    /// Stored volume for a 1-based output track, 0 dB when unset
    pub fn channel_volume(&self, track: u32) -> f64 {
        self.channel_volumes.get(&track).copied().unwrap_or(0.0)
    }

    pub fn channel_volumes(&self) -> &BTreeMap<u32, f64> {
        &self.channel_volumes
    }

    pub fn config(&self) -> Option<&'static ChannelConfig> {
        get_config(self.channel_mode)
    }

    pub fn output_channels(&self) -> u32 {
        output_channel_count(self.channel_mode)
    }

    /// Number of output tracks when splitting into stereo pairs
    pub fn stereo_pair_track_count(&self) -> u32 {
        let outputs = self.output_channels();
        if outputs == 2 { 1 } else { outputs / 2 }
    }

    /// Active routing table, `None` for stereo passthrough
    pub fn resolved_routing(&self) -> Option<ResolvedRouting> {
        let config = self.config()?;
        let mut resolved = config.resolve(self.channel_variant);
        if let Some(custom) = &self.custom_routing {
            if custom.len() == resolved.routing.len() {
                resolved.routing = custom.clone();
            }
        }
        Some(resolved)
    }

    /// Even channel count the container track needs for its routing
    pub fn required_channels(&self) -> u32 {
        match (self.config(), self.resolved_routing()) {
            (Some(config), Some(resolved)) => config.total_channels.max(resolved.required_channels()),
            _ => 2,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn apply(&mut self, command: ProfileCommand) -> Result<ProfileChange> {
        let change = match command {
            ProfileCommand::SetChannelMode(mode) => self.set_channel_mode(mode),
            ProfileCommand::SetChannelVariant(variant) => self.set_channel_variant(variant)?,
            ProfileCommand::SetSelectionMode(mode) => {
                structural(replace(&mut self.channel_selection_mode, mode))
            }
            ProfileCommand::SetStereoPairMapping { track, pair } => {
                self.set_stereo_pair_mapping(track, pair)?
            }
            ProfileCommand::ClearStereoPairMapping { track } => {
                structural(self.stereo_pair_mapping.remove(&track).is_some())
            }
            ProfileCommand::SetStereoPairSelection(pair) => {
                let pair = pair.validate("stereo pair")?;
                structural(replace(&mut self.stereo_pair_selection, pair))
            }
            ProfileCommand::SetMonoChannelSelection(channel) => {
                let channel = channel.validate("mono channel")?;
                structural(replace(&mut self.mono_channel_selection, channel))
            }
            ProfileCommand::SetDistributionMode(mode) => {
                structural(replace(&mut self.item_distribution_mode, mode))
            }
            ProfileCommand::SetSourceVariant(variant) => {
                structural(replace(&mut self.source_channel_variant, variant))
            }
            ProfileCommand::SetChannelVolume { track, db } => self.set_channel_volume(track, db)?,
            ProfileCommand::ResetChannelVolumes => {
                let had_values = !self.channel_volumes.is_empty();
                self.channel_volumes.clear();
                if had_values { ProfileChange::Volume } else { ProfileChange::Unchanged }
            }
            ProfileCommand::SetCustomRouting(routing) => {
                if let Some(routing) = &routing {
                    self.check_routing(routing)?;
                }
                structural(replace(&mut self.custom_routing, routing))
            }
        };

        if change != ProfileChange::Unchanged {
            debug!(?change, mode = self.channel_mode.index(), "Channel profile updated");
        }
        Ok(change)
    }

    fn set_channel_mode(&mut self, mode: ChannelMode) -> ProfileChange {
        if mode == self.channel_mode {
            return ProfileChange::Unchanged;
        }
        self.channel_mode = mode;
        self.custom_routing = None;

        let supports_variants = self.config().is_some_and(|c| c.has_variants);
        if !supports_variants {
            self.channel_variant = None;
        }

        let pair_tracks = self.stereo_pair_track_count();
        self.stereo_pair_mapping.retain(|&track, _| track <= pair_tracks);
        let outputs = self.output_channels();
        self.channel_volumes.retain(|&track, _| track <= outputs);

        ProfileChange::Structure
    }

    fn set_channel_variant(&mut self, variant: Option<VariantId>) -> Result<ProfileChange> {
        if let Some(id) = variant {
            let supported = self.config().is_some_and(|c| c.has_variants && c.variant(id).is_some());
            if !supported {
                return Err(RoutingError::InvalidChannelProfile(format!(
                    "{} has no {} variant",
                    self.channel_mode.name(),
                    id.name()
                )));
            }
        }
        Ok(structural(replace(&mut self.channel_variant, variant)))
    }

    fn set_stereo_pair_mapping(&mut self, track: u32, pair: ChannelPick) -> Result<ProfileChange> {
        let pair_tracks = self.stereo_pair_track_count();
        if track == 0 || track > pair_tracks {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "track {track} outside 1..={pair_tracks}"
            )));
        }
        let pair = pair.validate("stereo pair")?;
        let previous = self.stereo_pair_mapping.insert(track, pair);
        Ok(structural(previous != Some(pair)))
    }

    fn set_channel_volume(&mut self, track: u32, db: f64) -> Result<ProfileChange> {
        let outputs = self.output_channels();
        if track == 0 || track > outputs {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "volume track {track} outside 1..={outputs}"
            )));
        }
        if !db.is_finite() {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "volume {db} dB for track {track} is not a number"
            )));
        }
        let db = clamp_db(db);
        let previous = self.channel_volumes.insert(track, db);
        Ok(if previous == Some(db) { ProfileChange::Unchanged } else { ProfileChange::Volume })
    }

    fn check_routing(&self, routing: &[u16]) -> Result<()> {
        let Some(config) = self.config() else {
            return Err(RoutingError::InvalidChannelProfile(
                "stereo containers have no routing table".to_string(),
            ));
        };
        if routing.len() != config.logical_channels as usize {
            return Err(RoutingError::InvalidChannelProfile(format!(
                "routing has {} entries, {} expects {}",
                routing.len(),
                config.name,
                config.logical_channels
            )));
        }
        if routing.contains(&0) {
            return Err(RoutingError::InvalidChannelProfile(
                "physical channels are 1-based".to_string(),
            ));
        }
        let mut seen = routing.to_vec();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != routing.len() {
            return Err(RoutingError::InvalidChannelProfile(
                "routing maps two labels to the same channel".to_string(),
            ));
        }
        debug!(required = required_channels(routing), "Custom routing accepted");
        Ok(())
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn structural(changed: bool) -> ProfileChange {
    if changed { ProfileChange::Structure } else { ProfileChange::Unchanged }
}

/// Rewrite legacy `downmixMode` / `downmixChannel` fields into the current ones.
/// Returns true if the record was changed.
pub fn migrate_legacy_record(record: &mut Map<String, Value>) -> Result<bool> {
    if !record.contains_key("downmixMode") && !record.contains_key("downmixChannel") {
        return Ok(false);
    }

    let mode = record.get("downmixMode").and_then(Value::as_u64).unwrap_or(0);
    let (selection, target) = match mode {
        0 => ("none", None),
        1 => ("stereo", Some("stereoPairSelection")),
        2 => ("mono", Some("monoChannelSelection")),
        other => {
            return Err(RoutingError::UnknownValue {
                field: "downmixMode",
                value: other.to_string(),
            });
        }
    };

    record.remove("downmixMode");
    let channel = record.remove("downmixChannel");

    record
        .entry("channelSelectionMode")
        .or_insert_with(|| Value::from(selection));

    if let Some(target) = target {
        match channel.as_ref().and_then(Value::as_u64) {
            Some(index) if index >= 1 => {
                record.insert(target.to_string(), Value::from(index));
            }
            _ => warn!(?channel, "Dropping unusable legacy downmix channel"),
        }
    }

    debug!(selection, "Migrated legacy downmix settings");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults() {
        let profile = ContainerChannelProfile::new();
        assert_eq!(profile.channel_mode(), ChannelMode::Stereo);
        assert_eq!(profile.channel_selection_mode(), ChannelSelectionMode::None);
        assert_eq!(profile.channel_volume(3), 0.0);
        assert_eq!(profile.required_channels(), 2);
        assert!(profile.resolved_routing().is_none());
    }

    #[test]
    fn test_legacy_migration_runs_once() {
        let mut rec = record(json!({ "name": "Rain", "downmixMode": 1, "downmixChannel": 2 }));

        assert!(migrate_legacy_record(&mut rec).unwrap());
        assert_eq!(rec["channelSelectionMode"], json!("stereo"));
        assert_eq!(rec["stereoPairSelection"], json!(2));
        assert!(!rec.contains_key("downmixMode"));
        assert!(!rec.contains_key("downmixChannel"));

        let snapshot = rec.clone();
        assert!(!migrate_legacy_record(&mut rec).unwrap());
        assert_eq!(rec, snapshot);
    }

    #[test]
    fn test_legacy_mono_migration() {
        let mut rec = record(json!({ "downmixMode": 2, "downmixChannel": 3 }));
        let profile = ContainerChannelProfile::from_record(&mut rec).unwrap();
        assert_eq!(profile.channel_selection_mode(), ChannelSelectionMode::MonoSplit);
        assert_eq!(profile.mono_channel_selection(), ChannelPick::Index(3));
    }

    #[test]
    fn test_legacy_unknown_mode_rejected() {
        let mut rec = record(json!({ "downmixMode": 5 }));
        assert!(matches!(
            migrate_legacy_record(&mut rec),
            Err(RoutingError::UnknownValue { .. })
        ));
    }

    #[test]
    fn test_record_round_trip() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Five);
        profile.apply(ProfileCommand::SetChannelVariant(Some(VariantId::Smpte))).unwrap();
        profile.apply(ProfileCommand::SetSelectionMode(ChannelSelectionMode::StereoPairs)).unwrap();
        profile
            .apply(ProfileCommand::SetStereoPairMapping { track: 2, pair: ChannelPick::Random })
            .unwrap();
        profile.apply(ProfileCommand::SetChannelVolume { track: 1, db: -6.0 }).unwrap();

        let mut rec = Map::new();
        profile.write_record(&mut rec).unwrap();
        assert_eq!(rec["channelMode"], json!(2));
        assert_eq!(rec["stereoPairMapping"]["2"], json!("random"));

        let loaded = ContainerChannelProfile::from_record(&mut rec).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_unknown_values_rejected_at_load() {
        let mut rec = record(json!({ "channelMode": 9 }));
        assert!(ContainerChannelProfile::from_record(&mut rec).is_err());

        let mut rec = record(json!({ "channelSelectionMode": "surround" }));
        assert!(ContainerChannelProfile::from_record(&mut rec).is_err());

        let mut rec = record(json!({ "channelMode": 1, "stereoPairMapping": { "5": 1 } }));
        assert!(ContainerChannelProfile::from_record(&mut rec).is_err());
    }

    #[test]
    fn test_commands_report_changes() {
        let mut profile = ContainerChannelProfile::new();
        assert_eq!(
            profile.apply(ProfileCommand::SetChannelMode(ChannelMode::Quad)).unwrap(),
            ProfileChange::Structure
        );
        assert_eq!(
            profile.apply(ProfileCommand::SetChannelMode(ChannelMode::Quad)).unwrap(),
            ProfileChange::Unchanged
        );
        assert_eq!(
            profile.apply(ProfileCommand::SetChannelVolume { track: 2, db: -3.0 }).unwrap(),
            ProfileChange::Volume
        );
        assert!(!ProfileChange::Volume.needs_regeneration());
    }

    #[test]
    fn test_invalid_commands() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Quad);
        assert!(profile.apply(ProfileCommand::SetChannelVariant(Some(VariantId::Smpte))).is_err());
        assert!(profile
            .apply(ProfileCommand::SetStereoPairMapping { track: 3, pair: ChannelPick::Index(1) })
            .is_err());
        assert!(profile
            .apply(ProfileCommand::SetStereoPairMapping { track: 1, pair: ChannelPick::Index(0) })
            .is_err());
        assert!(profile.apply(ProfileCommand::SetCustomRouting(Some(vec![1, 2, 2, 4]))).is_err());
        assert!(profile.apply(ProfileCommand::SetCustomRouting(Some(vec![1, 2, 3]))).is_err());
    }

    #[test]
    fn test_mode_change_prunes_dependent_state() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Seven);
        profile.apply(ProfileCommand::SetChannelVariant(Some(VariantId::Smpte))).unwrap();
        profile
            .apply(ProfileCommand::SetStereoPairMapping { track: 3, pair: ChannelPick::Index(2) })
            .unwrap();
        profile.apply(ProfileCommand::SetChannelVolume { track: 7, db: -2.0 }).unwrap();

        profile.apply(ProfileCommand::SetChannelMode(ChannelMode::Quad)).unwrap();
        assert_eq!(profile.channel_variant(), None);
        assert!(profile.stereo_pair_mapping().is_empty());
        assert!(profile.channel_volumes().is_empty());
    }

    #[test]
    fn test_custom_routing_widens_requirement() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Quad);
        assert_eq!(profile.required_channels(), 4);
        profile.apply(ProfileCommand::SetCustomRouting(Some(vec![1, 2, 7, 8]))).unwrap();
        assert_eq!(profile.required_channels(), 8);
        assert_eq!(profile.resolved_routing().unwrap().physical_for("RS"), Some(8));
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Quad);
        profile.apply(ProfileCommand::SetChannelVolume { track: 1, db: 90.0 }).unwrap();
        assert_eq!(profile.channel_volume(1), crate::volume::MAX_DB);
    }

    #[test]
    fn test_non_finite_volume_rejected() {
        let mut profile = ContainerChannelProfile::with_mode(ChannelMode::Quad);
        profile.apply(ProfileCommand::SetChannelVolume { track: 1, db: -6.0 }).unwrap();

        for db in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                profile.apply(ProfileCommand::SetChannelVolume { track: 1, db }),
                Err(RoutingError::InvalidChannelProfile(_))
            ));
        }
        assert_eq!(profile.channel_volume(1), -6.0);
        assert_eq!(profile.channel_volumes().len(), 1);
    }

    #[test]
    fn test_deserialize_runs_migration() {
        let profile: ContainerChannelProfile = serde_json::from_value(json!({
            "channelMode": 2,
            "downmixMode": 1,
            "downmixChannel": 2
        }))
        .unwrap();
        assert_eq!(profile.channel_selection_mode(), ChannelSelectionMode::StereoPairs);
        assert_eq!(profile.stereo_pair_selection(), ChannelPick::Index(2));

        let bad = serde_json::from_value::<ContainerChannelProfile>(json!({
            "channelMode": 1,
            "customRouting": [1, 2, 2, 4]
        }));
        assert!(bad.is_err());
    }
}
