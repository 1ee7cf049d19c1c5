//! Project plus host: runs the routing control flow for containers

use ambiance_core::{
    apply_suggestion, detect_conflicts, suggest_fix, AutoBalance, Conflict, ContainerId,
    DefaultBalance, ItemAnalysis, ProfileChange, ProfileCommand, Project, Result, RoutingError,
    Suggestion, TrackPlan, TrackStructurePlanner,
};
use tracing::{debug, info};

use crate::binding::{self, resolve_container_track};
use crate::host::{HostPort, TrackGuid};
use crate::pending::{FlushReport, PendingUpdates, UpdateKind};
use crate::propagator::{self, OptimizeReport};

/// Result of regenerating one container's track structure
#[derive(Debug, Clone)]
pub struct RegenerateOutcome {
    pub plan: TrackPlan,
    pub container_track: TrackGuid,
    pub channel_tracks: Vec<TrackGuid>,
    /// Ancestors raised to fit the container
    pub raised: usize,
}

pub struct RoutingSession<H, B = DefaultBalance> {
    host: H,
    project: Project,
    planner: TrackStructurePlanner<B>,
    pending: PendingUpdates<()>,
}

impl<H: HostPort> RoutingSession<H, DefaultBalance> {
    pub fn new(host: H, project: Project) -> Self {
        Self::with_planner(host, project, TrackStructurePlanner::new())
    }
}

impl<H: HostPort, B: AutoBalance> RoutingSession<H, B> {
    pub fn with_planner(host: H, project: Project, planner: TrackStructurePlanner<B>) -> Self {
        Self {
            host,
            project,
            planner,
            pending: PendingUpdates::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn pending(&self) -> &PendingUpdates<()> {
        &self.pending
    }

    pub fn into_parts(self) -> (H, Project) {
        (self.host, self.project)
    }

    /// Apply a UI command to a container. Volume edits are queued for the next tick.
    pub fn apply_command(&mut self, id: ContainerId, command: ProfileCommand) -> Result<ProfileChange> {
        let container = self
            .project
            .container_mut(id)
            .ok_or(RoutingError::ContainerNotFound(id.0))?;
        let change = container.apply_command(command)?;
        if change == ProfileChange::Volume {
            self.pending.queue(id, UpdateKind::ChannelVolumes, ());
        }
        Ok(change)
    }

    pub fn plan(&self, id: ContainerId, analysis: &ItemAnalysis) -> Result<TrackPlan> {
        let container = self
            .project
            .container(id)
            .ok_or(RoutingError::ContainerNotFound(id.0))?;
        Ok(self.planner.plan(&container.channels, analysis))
    }

    /// Host track of a container, creating the group and container tracks if missing
    fn materialize_container_track(&mut self, id: ContainerId) -> Result<TrackGuid> {
        let container = self
            .project
            .container(id)
            .ok_or(RoutingError::ContainerNotFound(id.0))?;
        if let Some(track) = resolve_container_track(&self.host, container) {
            return Ok(track);
        }
        let name = container.name.clone();

        let group = self
            .project
            .group_of(id)
            .ok_or(RoutingError::ContainerNotFound(id.0))?;
        let existing = group
            .track_guid
            .as_deref()
            .and_then(|guid| self.host.find_by_guid(guid))
            .or_else(|| self.host.find_by_name(&group.name));
        let group_track = match existing {
            Some(track) => track,
            None => {
                let master = self.host.master();
                let track = self.host.insert_child_track(&master, &group.name)?;
                info!(group = %group.name, %track, "Group track created");
                track
            }
        };

        let track = self.host.insert_child_track(&group_track, &name)?;
        info!(container = %name, %track, "Container track created");
        Ok(track)
    }

    /// Plan and apply a container's channel track structure, then widen its ancestors
    pub fn regenerate(&mut self, id: ContainerId, analysis: &ItemAnalysis) -> Result<RegenerateOutcome> {
        let plan = self.plan(id, analysis)?;
        let track = self.materialize_container_track(id)?;

        let container = self
            .project
            .container(id)
            .ok_or(RoutingError::ContainerNotFound(id.0))?;
        let channel_tracks = binding::apply_plan(&mut self.host, &track, &container.channels, &plan)?;
        let required = self
            .host
            .channel_count(&track)
            .unwrap_or_else(|| container.channels.required_channels());
        let raised = propagator::ensure_ancestor_capacity(&mut self.host, &track, required)?;

        if let Some(container) = self.project.container_mut(id) {
            container.needs_regeneration = false;
            container.track_guid = Some(track.0.clone());
        }
        if let Some(warning) = &plan.warning {
            info!(container = id.0, %warning, "Regenerated with warning");
        }

        Ok(RegenerateOutcome {
            plan,
            container_track: track,
            channel_tracks,
            raised,
        })
    }

    /// Queue a channel count refresh for the next tick
    pub fn request_routing_update(&mut self, id: ContainerId) -> bool {
        self.pending.queue(id, UpdateKind::Routing, ())
    }

    /// Apply everything queued since the previous tick
    pub fn end_tick(&mut self) -> FlushReport {
        let Self { host, project, pending, .. } = self;
        pending.flush(|id, kind, ()| {
            let container = project
                .container(id)
                .ok_or(RoutingError::ContainerNotFound(id.0))?;
            let track = resolve_container_track(host, container)
                .ok_or_else(|| RoutingError::TrackNotFound(container.name.clone()))?;
            match kind {
                UpdateKind::Routing => {
                    binding::update_routing(host, &track, &container.channels)?;
                    propagator::ensure_ancestor_capacity(host, &track, container.channels.required_channels())?;
                }
                UpdateKind::ChannelVolumes => {
                    let written = binding::sync_channel_volumes(host, &track, &container.channels)?;
                    debug!(container = %container.name, written, "Channel volumes written");
                }
            }
            Ok(())
        })
    }

    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        detect_conflicts(&self.project)
    }

    pub fn suggest_fixes(&self) -> Vec<Suggestion> {
        suggest_fix(&self.project, &detect_conflicts(&self.project))
    }

    /// Apply a confirmed suggestion and queue the container's routing refresh
    pub fn apply_fix(&mut self, suggestion: &Suggestion) -> Result<bool> {
        let changed = apply_suggestion(&mut self.project, suggestion)?;
        if changed {
            self.request_routing_update(suggestion.container);
        }
        Ok(changed)
    }

    pub fn optimize(&mut self) -> Result<OptimizeReport> {
        propagator::optimize_project(&mut self.host, &self.project)
    }

    pub fn channel_volume(&self, id: ContainerId, channel_index: u32) -> Option<f64> {
        let container = self.project.container(id)?;
        let track = resolve_container_track(&self.host, container)?;
        binding::get_channel_volume(&self.host, &track, &container.channels, channel_index)
    }
}
