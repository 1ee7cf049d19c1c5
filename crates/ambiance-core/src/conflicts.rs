//! Detection and repair of physical channel collisions between containers

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::channel_config::ChannelMode;
use crate::error::{Result, RoutingError};
use crate::profile::ProfileCommand;
use crate::project::{ContainerId, Project};

/// Lowest physical channel a relocated surround pair may use
const FIRST_SURROUND_CHANNEL: u16 = 5;

/// Labels every multichannel layout places on the same channels
const FRONT_LABELS: [&str; 2] = ["L", "R"];

/// One label of one container sitting on a physical channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOccupant {
    pub container: ContainerId,
    pub container_name: String,
    pub layout: ChannelMode,
    pub label: String,
}

impl ChannelOccupant {
    /// Two containers may share a channel when they carry the same front
    /// label, or the same label within the same layout.
    fn shares_with(&self, other: &ChannelOccupant) -> bool {
        self.label == other.label
            && (FRONT_LABELS.contains(&self.label.as_str()) || self.layout == other.layout)
    }
}

/// Physical channel -> everything routed onto it
pub type RoutingUsage = BTreeMap<u16, Vec<ChannelOccupant>>;

/// Two containers whose signals collide on the same physical channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub physical_channel: u16,
    pub first: ChannelOccupant,
    pub second: ChannelOccupant,
}

impl Conflict {
    pub fn involves(&self, id: ContainerId) -> bool {
        self.first.container == id || self.second.container == id
    }

    pub fn describe(&self) -> String {
        format!(
            "Channel {}: {} ({}) vs {} ({})",
            self.physical_channel,
            self.first.container_name,
            self.first.label,
            self.second.container_name,
            self.second.label
        )
    }
}

/// Proposed routing for one container. Applied only on user confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub container: ContainerId,
    pub container_name: String,
    pub labels: Vec<String>,
    pub original_routing: Vec<u16>,
    pub suggested_routing: Vec<u16>,
}

impl Suggestion {
    pub fn describe(&self) -> String {
        let moves: Vec<String> = self
            .labels
            .iter()
            .zip(self.original_routing.iter().zip(&self.suggested_routing))
            .filter(|(_, (from, to))| from != to)
            .map(|(label, (from, to))| format!("{label} {from}->{to}"))
            .collect();
        format!("{}: {}", self.container_name, moves.join(", "))
    }
}

/// Channel occupancy of every multichannel container in the project
pub fn routing_usage(project: &Project) -> RoutingUsage {
    let mut usage = RoutingUsage::new();
    for container in project.containers() {
        let Some(resolved) = container.channels.resolved_routing() else {
            continue;
        };
        for (label, channel) in resolved.pairs() {
            usage.entry(channel).or_default().push(ChannelOccupant {
                container: container.id,
                container_name: container.name.clone(),
                layout: container.channels.channel_mode(),
                label: label.to_string(),
            });
        }
    }
    usage
}

/// Scan all containers for physical channel collisions.
///
/// Any channel used by two containers collides unless both carry the same
/// front label, or the same label within the same layout. A 4.0 surround on
/// the channel of a 5.0 surround is a collision. At most one conflict is
/// reported per unordered container pair per channel.
pub fn detect_conflicts(project: &Project) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let mut reported: HashSet<(u16, ContainerId, ContainerId)> = HashSet::new();

    for (channel, occupants) in routing_usage(project) {
        for (i, first) in occupants.iter().enumerate() {
            for second in &occupants[i + 1..] {
                if first.container == second.container || first.shares_with(second) {
                    continue;
                }
                let key = (
                    channel,
                    first.container.min(second.container),
                    first.container.max(second.container),
                );
                if reported.insert(key) {
                    conflicts.push(Conflict {
                        physical_channel: channel,
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }
    }

    if !conflicts.is_empty() {
        info!(count = conflicts.len(), "Routing conflicts detected");
    }
    conflicts
}

/// Propose new routings for quad containers caught in conflicts.
///
/// Containers with five or more channels are authoritative and never moved.
/// A quad keeps L/R on 1-2 and its surround pair moves to the lowest channels
/// from 5 upward that no surround container uses.
pub fn suggest_fix(project: &Project, conflicts: &[Conflict]) -> Vec<Suggestion> {
    let reserved: BTreeSet<u16> = project
        .containers()
        .filter(|c| c.logical_channels() >= 5)
        .filter_map(|c| c.channels.resolved_routing())
        .flat_map(|r| r.routing)
        .collect();

    let candidates: BTreeSet<ContainerId> = conflicts
        .iter()
        .flat_map(|c| [c.first.container, c.second.container])
        .collect();

    let mut suggestions = Vec::new();
    for id in candidates {
        let Some(container) = project.container(id) else {
            continue;
        };
        if container.logical_channels() != 4 {
            continue;
        }
        let Some(resolved) = container.channels.resolved_routing() else {
            continue;
        };

        let mut next = FIRST_SURROUND_CHANNEL;
        let suggested: Vec<u16> = resolved
            .pairs()
            .map(|(label, channel)| match label {
                "L" => 1,
                "R" => 2,
                "LS" | "RS" => {
                    while reserved.contains(&next) {
                        next += 1;
                    }
                    next += 1;
                    next - 1
                }
                _ => channel,
            })
            .collect();

        if suggested == resolved.routing {
            debug!(container = %container.name, "Routing already clear of surround channels");
            continue;
        }

        suggestions.push(Suggestion {
            container: id,
            container_name: container.name.clone(),
            labels: resolved.labels,
            original_routing: resolved.routing,
            suggested_routing: suggested,
        });
    }
    suggestions
}

/// Store a confirmed suggestion as the container's custom routing
pub fn apply_suggestion(project: &mut Project, suggestion: &Suggestion) -> Result<bool> {
    let container = project
        .container_mut(suggestion.container)
        .ok_or(RoutingError::ContainerNotFound(suggestion.container.0))?;

    let change = container.apply_command(ProfileCommand::SetCustomRouting(Some(
        suggestion.suggested_routing.clone(),
    )))?;
    info!(fix = %suggestion.describe(), "Applied routing fix");
    Ok(change.needs_regeneration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_config::{ChannelMode, VariantId};

    fn project_with(modes: &[(&str, ChannelMode)]) -> (Project, Vec<ContainerId>) {
        let mut project = Project::new();
        let g = project.add_group("Ambience");
        let ids = modes
            .iter()
            .map(|(name, mode)| {
                let id = project.add_container(g, *name).unwrap();
                project
                    .container_mut(id)
                    .unwrap()
                    .apply_command(ProfileCommand::SetChannelMode(*mode))
                    .unwrap();
                id
            })
            .collect();
        (project, ids)
    }

    fn route(project: &mut Project, id: ContainerId, routing: &[u16]) {
        project
            .container_mut(id)
            .unwrap()
            .apply_command(ProfileCommand::SetCustomRouting(Some(routing.to_vec())))
            .unwrap();
    }

    #[test]
    fn test_disjoint_routings_have_no_conflicts() {
        let (mut project, ids) =
            project_with(&[("Rain", ChannelMode::Quad), ("Wind", ChannelMode::Quad)]);
        route(&mut project, ids[1], &[5, 6, 7, 8]);
        assert!(detect_conflicts(&project).is_empty());
    }

    #[test]
    fn test_shared_labels_do_not_conflict() {
        let (project, _) = project_with(&[("Rain", ChannelMode::Quad), ("Wind", ChannelMode::Quad)]);
        assert!(detect_conflicts(&project).is_empty());
        assert_eq!(routing_usage(&project)[&1].len(), 2);
    }

    #[test]
    fn test_shared_front_pair_across_layouts() {
        let (mut project, ids) =
            project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Five)]);
        route(&mut project, ids[0], &[1, 2, 7, 8]);
        assert!(detect_conflicts(&project).is_empty());
        assert_eq!(routing_usage(&project)[&2].len(), 2);
    }

    #[test]
    fn test_stereo_containers_are_ignored() {
        let (project, _) = project_with(&[("Birds", ChannelMode::Stereo), ("Rain", ChannelMode::Five)]);
        assert!(detect_conflicts(&project).is_empty());
    }

    #[test]
    fn test_quad_against_five() {
        let (project, ids) = project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Five)]);
        let conflicts = detect_conflicts(&project);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].physical_channel, 3);
        assert!(conflicts[0].involves(ids[0]) && conflicts[0].involves(ids[1]));

        let suggestions = suggest_fix(&project, &conflicts);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].container, ids[0]);
        assert_eq!(suggestions[0].original_routing, vec![1, 2, 3, 4]);
        assert_eq!(suggestions[0].suggested_routing, vec![1, 2, 7, 8]);
    }

    #[test]
    fn test_quad_surrounds_on_five_surround_channels() {
        let (mut project, ids) =
            project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Five)]);
        route(&mut project, ids[0], &[1, 2, 5, 6]);

        let conflicts = detect_conflicts(&project);
        assert!(!conflicts.is_empty());
        assert!(conflicts.iter().any(|c| c.physical_channel == 5));
        assert!(conflicts.iter().all(|c| c.physical_channel > 2));

        let suggestions = suggest_fix(&project, &conflicts);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].container, ids[0]);
        assert_eq!(suggestions[0].suggested_routing, vec![1, 2, 7, 8]);

        let five = project.container(ids[1]).unwrap();
        assert!(five.channels.custom_routing().is_none());
        assert_eq!(five.channels.resolved_routing().unwrap().routing, vec![1, 2, 3, 5, 6]);

        apply_suggestion(&mut project, &suggestions[0]).unwrap();
        assert!(detect_conflicts(&project).is_empty());
    }

    #[test]
    fn test_surround_pair_collision_on_five() {
        let (mut project, ids) =
            project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Five)]);
        route(&mut project, ids[0], &[1, 2, 5, 6]);
        route(&mut project, ids[1], &[1, 2, 3, 6, 5]);

        let conflicts = detect_conflicts(&project);
        assert!(conflicts.iter().any(|c| c.physical_channel == 5));

        let suggestions = suggest_fix(&project, &conflicts);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_routing, vec![1, 2, 7, 8]);
        let five = project.container(ids[1]).unwrap();
        assert_eq!(five.channels.custom_routing(), Some(&[1, 2, 3, 6, 5][..]));
    }

    #[test]
    fn test_quad_against_seven_moves_past_back_channels() {
        let (project, _) = project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Seven)]);
        let suggestions = suggest_fix(&project, &detect_conflicts(&project));
        assert_eq!(suggestions[0].suggested_routing, vec![1, 2, 9, 10]);
    }

    #[test]
    fn test_surround_containers_are_never_moved() {
        let (mut project, ids) =
            project_with(&[("Drone", ChannelMode::Five), ("Choir", ChannelMode::Five)]);
        project
            .container_mut(ids[1])
            .unwrap()
            .apply_command(ProfileCommand::SetChannelVariant(Some(VariantId::Smpte)))
            .unwrap();

        let conflicts = detect_conflicts(&project);
        assert_eq!(conflicts.len(), 2);
        assert!(suggest_fix(&project, &conflicts).is_empty());
    }

    #[test]
    fn test_unchanged_routing_not_suggested() {
        let (mut project, ids) = project_with(&[("Rain", ChannelMode::Quad), ("Wind", ChannelMode::Quad)]);
        route(&mut project, ids[0], &[1, 2, 5, 6]);
        route(&mut project, ids[1], &[1, 2, 6, 5]);

        let conflicts = detect_conflicts(&project);
        assert_eq!(conflicts.len(), 2);

        let suggestions = suggest_fix(&project, &conflicts);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].container, ids[1]);
        assert_eq!(suggestions[0].suggested_routing, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_apply_suggestion_resolves_conflict() {
        let (mut project, ids) = project_with(&[("Rain", ChannelMode::Quad), ("Drone", ChannelMode::Five)]);
        let suggestions = suggest_fix(&project, &detect_conflicts(&project));
        project.container_mut(ids[0]).unwrap().needs_regeneration = false;

        assert!(apply_suggestion(&mut project, &suggestions[0]).unwrap());
        assert!(project.container(ids[0]).unwrap().needs_regeneration);
        assert!(detect_conflicts(&project).is_empty());
        assert_eq!(project.container(ids[0]).unwrap().channels.required_channels(), 8);
    }
}
