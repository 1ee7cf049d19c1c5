//! In-memory host used by tests and by the command-line tool

use ambiance_core::{Result, RoutingError};
use serde::{Deserialize, Serialize};

use crate::host::{HostPort, TrackGuid, TrackProperty, TrackSnapshot};

const MASTER_GUID: &str = "{MASTER}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTrack {
    pub guid: TrackGuid,
    pub name: String,
    /// Absolute nesting level (0 = top level)
    #[serde(default)]
    pub depth: u32,
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub parent_offset: u32,
}

fn default_channels() -> u32 {
    2
}

fn default_volume() -> f64 {
    1.0
}

impl MemoryTrack {
    fn new(guid: TrackGuid, name: impl Into<String>, depth: u32) -> Self {
        Self {
            guid,
            name: name.into(),
            depth,
            channels: default_channels(),
            volume: default_volume(),
            parent_offset: 0,
        }
    }
}

/// Deterministic track table with undo bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHost {
    master: MemoryTrack,
    #[serde(default)]
    tracks: Vec<MemoryTrack>,
    #[serde(default)]
    next_guid: u64,
    #[serde(skip)]
    undo_depth: u32,
    #[serde(skip)]
    undo_history: Vec<String>,
    #[serde(skip)]
    writes: usize,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            master: MemoryTrack::new(TrackGuid::new(MASTER_GUID), "MASTER", 0),
            tracks: Vec::new(),
            next_guid: 1,
            undo_depth: 0,
            undo_history: Vec::new(),
            writes: 0,
        }
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track at the end of the table at the given nesting level
    pub fn add_track(&mut self, name: impl Into<String>, depth: u32) -> TrackGuid {
        let max_depth = self.tracks.last().map_or(0, |t| t.depth + 1);
        let guid = self.allocate_guid();
        self.tracks
            .push(MemoryTrack::new(guid.clone(), name, depth.min(max_depth)));
        guid
    }

    pub fn track(&self, guid: &TrackGuid) -> Option<&MemoryTrack> {
        if *guid == self.master.guid {
            return Some(&self.master);
        }
        self.tracks.iter().find(|t| t.guid == *guid)
    }

    pub fn tracks(&self) -> &[MemoryTrack] {
        &self.tracks
    }

    /// Number of property writes since creation
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Descriptions of closed top-level undo blocks
    pub fn undo_history(&self) -> &[String] {
        &self.undo_history
    }

    pub fn in_undo_block(&self) -> bool {
        self.undo_depth > 0
    }

    fn allocate_guid(&mut self) -> TrackGuid {
        let taken: Vec<&str> = self.tracks.iter().map(|t| t.guid.as_str()).collect();
        loop {
            let candidate = format!("{{TRACK-{:04}}}", self.next_guid.max(1));
            self.next_guid = self.next_guid.max(1) + 1;
            if !taken.contains(&candidate.as_str()) {
                return TrackGuid(candidate);
            }
        }
    }

    fn index_of(&self, guid: &TrackGuid) -> Option<usize> {
        self.tracks.iter().position(|t| t.guid == *guid)
    }

    /// One past the last track nested under `index`
    fn subtree_end(&self, index: usize) -> usize {
        let depth = self.tracks[index].depth;
        self.tracks[index + 1..]
            .iter()
            .position(|t| t.depth <= depth)
            .map_or(self.tracks.len(), |offset| index + 1 + offset)
    }

    fn track_mut(&mut self, guid: &TrackGuid) -> Result<&mut MemoryTrack> {
        if *guid == self.master.guid {
            return Ok(&mut self.master);
        }
        self.tracks
            .iter_mut()
            .find(|t| t.guid == *guid)
            .ok_or_else(|| RoutingError::TrackNotFound(guid.to_string()))
    }
}

impl HostPort for MemoryHost {
    fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let next_depth = self.tracks.get(i + 1).map_or(0, |t| t.depth);
                TrackSnapshot {
                    guid: track.guid.clone(),
                    name: track.name.clone(),
                    folder_depth: next_depth as i32 - track.depth as i32,
                    channels: track.channels,
                }
            })
            .collect()
    }

    fn master(&self) -> TrackGuid {
        self.master.guid.clone()
    }

    fn find_by_name(&self, name: &str) -> Option<TrackGuid> {
        self.tracks
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.guid.clone())
    }

    fn find_by_guid(&self, guid: &str) -> Option<TrackGuid> {
        self.track(&TrackGuid::new(guid)).map(|t| t.guid.clone())
    }

    fn get_property(&self, track: &TrackGuid, property: TrackProperty) -> Option<f64> {
        let track = self.track(track)?;
        Some(match property {
            TrackProperty::ChannelCount => track.channels as f64,
            TrackProperty::Volume => track.volume,
            TrackProperty::ParentChannelOffset => track.parent_offset as f64,
        })
    }

    fn set_property(&mut self, track: &TrackGuid, property: TrackProperty, value: f64) -> Result<()> {
        let target = self.track_mut(track)?;
        match property {
            TrackProperty::ChannelCount => {
                let channels = value.round() as u32;
                if channels < 2 || channels % 2 != 0 {
                    return Err(RoutingError::Host(format!(
                        "channel count must be even, got {channels}"
                    )));
                }
                target.channels = channels;
            }
            TrackProperty::Volume => target.volume = value.max(0.0),
            TrackProperty::ParentChannelOffset => target.parent_offset = value.max(0.0) as u32,
        }
        self.writes += 1;
        Ok(())
    }

    fn set_name(&mut self, track: &TrackGuid, name: &str) -> Result<()> {
        self.track_mut(track)?.name = name.to_string();
        Ok(())
    }

    fn insert_child_track(&mut self, parent: &TrackGuid, name: &str) -> Result<TrackGuid> {
        let (position, depth) = if *parent == self.master.guid {
            (self.tracks.len(), 0)
        } else {
            let index = self
                .index_of(parent)
                .ok_or_else(|| RoutingError::TrackNotFound(parent.to_string()))?;
            (self.subtree_end(index), self.tracks[index].depth + 1)
        };

        let guid = self.allocate_guid();
        self.tracks
            .insert(position, MemoryTrack::new(guid.clone(), name, depth));
        Ok(guid)
    }

    fn delete_track(&mut self, track: &TrackGuid) -> Result<()> {
        let index = self
            .index_of(track)
            .ok_or_else(|| RoutingError::TrackNotFound(track.to_string()))?;
        let end = self.subtree_end(index);
        self.tracks.drain(index..end);
        Ok(())
    }

    fn begin_undo(&mut self) {
        self.undo_depth += 1;
    }

    fn end_undo(&mut self, description: &str) {
        self.undo_depth = self.undo_depth.saturating_sub(1);
        if self.undo_depth == 0 {
            self.undo_history.push(description.to_string());
        }
    }
}
