//! Narrow interface to the host's live track table

use std::fmt;

use ambiance_core::{round_up_even, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stable identifier of a host track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackGuid(pub String);

impl TrackGuid {
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric track properties the routing engine reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    /// Total channel count of the track bus
    ChannelCount,
    /// Linear volume
    Volume,
    /// 0-based channel offset of the send into the parent track
    ParentChannelOffset,
}

/// One row of the host track table, in host order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub guid: TrackGuid,
    pub name: String,
    /// Folder depth delta: 1 opens a folder, -n closes n folders after this track
    pub folder_depth: i32,
    pub channels: u32,
}

/// The host operations the routing engine depends on.
///
/// Implementations are driven from the single UI thread; indices are never
/// cached across calls, everything is addressed by GUID.
pub trait HostPort {
    fn snapshot(&self) -> Vec<TrackSnapshot>;
    fn master(&self) -> TrackGuid;
    fn find_by_name(&self, name: &str) -> Option<TrackGuid>;
    fn find_by_guid(&self, guid: &str) -> Option<TrackGuid>;
    fn get_property(&self, track: &TrackGuid, property: TrackProperty) -> Option<f64>;
    fn set_property(&mut self, track: &TrackGuid, property: TrackProperty, value: f64) -> Result<()>;
    fn set_name(&mut self, track: &TrackGuid, name: &str) -> Result<()>;
    /// Insert a track as the last child of `parent`
    fn insert_child_track(&mut self, parent: &TrackGuid, name: &str) -> Result<TrackGuid>;
    /// Delete a track together with any tracks nested under it
    fn delete_track(&mut self, track: &TrackGuid) -> Result<()>;
    fn begin_undo(&mut self);
    fn end_undo(&mut self, description: &str);

    fn channel_count(&self, track: &TrackGuid) -> Option<u32> {
        self.get_property(track, TrackProperty::ChannelCount)
            .map(|v| v.max(0.0).round() as u32)
    }

    /// Hosts only accept even channel counts; odd requests are rounded up
    fn set_channel_count(&mut self, track: &TrackGuid, channels: u32) -> Result<u32> {
        let channels = round_up_even(channels).max(2);
        self.set_property(track, TrackProperty::ChannelCount, channels as f64)?;
        debug!(%track, channels, "Channel count set");
        Ok(channels)
    }
}

/// Run `f` inside one host undo block. The block is closed even when `f` fails.
pub fn with_undo_block<H, T, F>(host: &mut H, description: &str, f: F) -> Result<T>
where
    H: HostPort + ?Sized,
    F: FnOnce(&mut H) -> Result<T>,
{
    host.begin_undo();
    let result = f(host);
    host.end_undo(description);
    result
}
