//! Keeps folder and master channel counts wide enough for everything below them

use std::collections::{BTreeMap, HashSet};

use ambiance_core::{round_up_even, Project, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binding::resolve_container_track;
use crate::host::{with_undo_block, HostPort, TrackGuid};
use crate::tree::TrackTree;

/// One channel count rewritten by the optimizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelChange {
    pub guid: TrackGuid,
    pub name: String,
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub changes: Vec<ChannelChange>,
}

impl OptimizeReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn channels_saved(&self) -> u32 {
        self.changes.iter().map(|c| c.from - c.to).sum()
    }
}

/// Raise every ancestor of `track`, and the master, to at least `required` channels.
///
/// Never lowers a count. Returns the number of tracks raised; a missing track
/// is logged and leaves the host untouched.
pub fn ensure_ancestor_capacity<H: HostPort + ?Sized>(
    host: &mut H,
    track: &TrackGuid,
    required: u32,
) -> Result<usize> {
    let required = round_up_even(required).max(2);
    let tree = TrackTree::capture(host);
    if tree.node(track).is_none() {
        warn!(%track, "Track not found, ancestor capacity unchanged");
        return Ok(0);
    }

    let mut raises: Vec<(TrackGuid, u32)> = tree
        .ancestors(track)
        .into_iter()
        .filter(|node| node.channels < required)
        .map(|node| (node.guid.clone(), required))
        .collect();

    let master = host.master();
    if host.channel_count(&master).unwrap_or(0) < required {
        raises.push((master, required));
    }
    if raises.is_empty() {
        return Ok(0);
    }

    with_undo_block(host, "Raise parent channel counts", |host| {
        for (guid, channels) in &raises {
            host.set_channel_count(guid, *channels)?;
            debug!(track = %guid, channels, "Ancestor raised");
        }
        Ok(())
    })?;
    info!(%track, required, raised = raises.len(), "Ancestor capacity ensured");
    Ok(raises.len())
}

/// Shrink container, group and master tracks to the smallest even counts
/// their content needs.
///
/// A container needs exactly what its routing reaches; channel tracks below
/// it send into those channels and add nothing. Counts are only ever lowered,
/// so a second run finds nothing to change. Tracks the project does not
/// manage keep their counts and still count towards their parent's need.
pub fn optimize_project<H: HostPort + ?Sized>(host: &mut H, project: &Project) -> Result<OptimizeReport> {
    let tree = TrackTree::capture(host);
    let mut needs: BTreeMap<TrackGuid, u32> = BTreeMap::new();

    for group in &project.groups {
        let Some(group_node) = tree.locate(group.track_guid.as_deref(), &group.name) else {
            warn!(group = %group.name, "Group track not found, skipped");
            continue;
        };

        let mut container_guids = HashSet::new();
        let mut group_need = 2;
        for container in &group.containers {
            let Some(guid) = resolve_container_track(host, container) else {
                debug!(container = %container.name, "Container track not found");
                continue;
            };
            let need = container.channels.required_channels();
            group_need = group_need.max(need);
            needs.insert(guid.clone(), need);
            container_guids.insert(guid);
        }

        for child in tree.children(&group_node.guid) {
            if !container_guids.contains(&child.guid) {
                group_need = group_need.max(round_up_even(child.channels));
            }
        }
        needs.insert(group_node.guid.clone(), group_need);
    }

    let mut master_need = 2;
    for root in tree.roots() {
        let channels = needs.get(&root.guid).copied().unwrap_or(root.channels);
        master_need = master_need.max(round_up_even(channels));
    }
    needs.insert(host.master(), master_need);

    let changes: Vec<ChannelChange> = needs
        .into_iter()
        .filter_map(|(guid, need)| {
            let current = host.channel_count(&guid)?;
            (current > need).then(|| ChannelChange {
                name: tree.node(&guid).map_or_else(|| "MASTER".to_string(), |n| n.name.clone()),
                guid,
                from: current,
                to: need,
            })
        })
        .collect();

    if changes.is_empty() {
        debug!("Channel counts already minimal");
        return Ok(OptimizeReport::default());
    }

    with_undo_block(host, "Optimize channel counts", |host| {
        for change in &changes {
            host.set_channel_count(&change.guid, change.to)?;
        }
        Ok(())
    })?;

    let report = OptimizeReport { changes };
    info!(tracks = report.changes.len(), saved = report.channels_saved(), "Channel counts optimized");
    Ok(report)
}
