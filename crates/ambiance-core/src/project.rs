//! Groups and containers of an ambiance project

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::profile::{ContainerChannelProfile, ProfileChange, ProfileCommand};

/// Unique identifier for containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u64);

/// A sound source unit backed by a host track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    /// Host track GUID, set once the container has been generated
    #[serde(default)]
    pub track_guid: Option<String>,
    #[serde(default)]
    pub channels: ContainerChannelProfile,
    #[serde(default)]
    pub needs_regeneration: bool,
}

impl Container {
    pub fn new(id: ContainerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            track_guid: None,
            channels: ContainerChannelProfile::default(),
            needs_regeneration: false,
        }
    }

    /// Apply a profile command, flagging the container when its structure changed
    pub fn apply_command(&mut self, command: ProfileCommand) -> Result<ProfileChange> {
        let change = self.channels.apply(command)?;
        if change.needs_regeneration() {
            self.needs_regeneration = true;
            info!(container = %self.name, "Container flagged for regeneration");
        }
        Ok(change)
    }

    pub fn logical_channels(&self) -> u32 {
        self.channels.config().map_or(2, |c| c.logical_channels)
    }
}

/// A folder of containers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub track_guid: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            track_guid: None,
            containers: Vec::new(),
        }
    }
}

/// All groups of the project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub groups: Vec<Group>,
    #[serde(default)]
    next_container_id: u64,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            next_container_id: 1,
        }
    }
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group, returns its index
    pub fn add_group(&mut self, name: impl Into<String>) -> usize {
        self.groups.push(Group::new(name));
        self.groups.len() - 1
    }

    pub fn add_container(&mut self, group: usize, name: impl Into<String>) -> Option<ContainerId> {
        // Hand-written project files may omit the counter
        let next = self
            .containers()
            .map(|c| c.id.0 + 1)
            .fold(self.next_container_id.max(1), u64::max);
        let group = self.groups.get_mut(group)?;
        let id = ContainerId(next);
        self.next_container_id = next + 1;
        group.containers.push(Container::new(id, name));
        Some(id)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.groups.iter().flat_map(|g| g.containers.iter())
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers().find(|c| c.id == id)
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.containers.iter_mut())
            .find(|c| c.id == id)
    }

    pub fn find_container_by_name(&self, name: &str) -> Option<&Container> {
        self.containers().find(|c| c.name == name)
    }

    /// Group that owns a container
    pub fn group_of(&self, id: ContainerId) -> Option<&Group> {
        self.groups.iter().find(|g| g.containers.iter().any(|c| c.id == id))
    }

    pub fn containers_needing_regeneration(&self) -> Vec<ContainerId> {
        self.containers()
            .filter(|c| c.needs_regeneration)
            .map(|c| c.id)
            .collect()
    }
}
