//! Applies a container's channel profile and track plan to its host tracks

use ambiance_core::{
    clamp_db, db_to_linear, linear_to_db, ChannelMode, Container, ContainerChannelProfile, Result,
    TrackPlan,
};
use tracing::{debug, info, warn};

use crate::host::{with_undo_block, HostPort, TrackGuid, TrackProperty};
use crate::tree::TrackTree;

/// Host track of a container: stored GUID first, then the container name
pub fn resolve_container_track<H: HostPort + ?Sized>(
    host: &H,
    container: &Container,
) -> Option<TrackGuid> {
    container
        .track_guid
        .as_deref()
        .and_then(|guid| host.find_by_guid(guid))
        .or_else(|| host.find_by_name(&container.name))
}

/// Set the container track's channel count for its profile.
///
/// Returns whether the count changed.
pub fn update_routing<H: HostPort + ?Sized>(
    host: &mut H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
) -> Result<bool> {
    let required = profile.required_channels();
    if host.channel_count(track) == Some(required) {
        return Ok(false);
    }
    host.set_channel_count(track, required)?;
    info!(%track, mode = profile.channel_mode().name(), channels = required, "Container routing updated");
    Ok(true)
}

/// Direct children of `track` in creation order
pub fn existing_channel_tracks<H: HostPort + ?Sized>(host: &H, track: &TrackGuid) -> Vec<TrackGuid> {
    TrackTree::capture(host)
        .children(track)
        .into_iter()
        .map(|node| node.guid.clone())
        .collect()
}

fn channel_track<H: HostPort + ?Sized>(
    host: &H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
    channel_index: u32,
) -> Option<TrackGuid> {
    if profile.channel_mode() == ChannelMode::Stereo || channel_index == 0 {
        return None;
    }
    existing_channel_tracks(host, track)
        .into_iter()
        .nth(channel_index as usize - 1)
}

/// Set the volume of the `channel_index`-th (1-based) channel track.
///
/// Returns `false` in stereo mode or when the channel track does not exist yet.
pub fn set_channel_volume<H: HostPort + ?Sized>(
    host: &mut H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
    channel_index: u32,
    db: f64,
) -> bool {
    let Some(child) = channel_track(host, track, profile, channel_index) else {
        debug!(%track, channel_index, "No channel track for volume");
        return false;
    };
    match host.set_property(&child, TrackProperty::Volume, db_to_linear(clamp_db(db))) {
        Ok(()) => true,
        Err(err) => {
            warn!(%child, %err, "Failed to set channel volume");
            false
        }
    }
}

/// Volume in dB of the `channel_index`-th (1-based) channel track
pub fn get_channel_volume<H: HostPort + ?Sized>(
    host: &H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
    channel_index: u32,
) -> Option<f64> {
    let child = channel_track(host, track, profile, channel_index)?;
    host.get_property(&child, TrackProperty::Volume)
        .map(linear_to_db)
}

/// Write every stored channel volume to the channel tracks in one undo block.
///
/// Tracks without a stored value are reset to 0 dB. Returns the number written.
pub fn sync_channel_volumes<H: HostPort + ?Sized>(
    host: &mut H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
) -> Result<usize> {
    if profile.channel_mode() == ChannelMode::Stereo {
        return Ok(0);
    }
    let children = existing_channel_tracks(host, track);
    if children.is_empty() {
        return Ok(0);
    }

    with_undo_block(host, "Sync channel volumes", |host| {
        for (i, child) in children.iter().enumerate() {
            let db = clamp_db(profile.channel_volume(i as u32 + 1));
            host.set_property(child, TrackProperty::Volume, db_to_linear(db))?;
        }
        debug!(%track, count = children.len(), "Channel volumes synced");
        Ok(children.len())
    })
}

/// 0-based parent channel offset for a plan label such as "LS" or "LS/RS"
fn parent_offset(profile: &ContainerChannelProfile, label: &str, fallback: u32) -> u32 {
    if profile.channel_mode() == ChannelMode::Stereo {
        return 0;
    }
    let first = label.split('/').next().unwrap_or(label);
    profile
        .resolved_routing()
        .and_then(|resolved| resolved.physical_for(first))
        .map_or(fallback, |channel| u32::from(channel).saturating_sub(1))
}

/// Materialize `plan` under the container track.
///
/// Multi-track plans get one labelled child per plan track, sending into the
/// physical channels of its label. Single-track plans remove any children.
/// Everything runs in one undo block. Returns the channel tracks in order.
pub fn apply_plan<H: HostPort + ?Sized>(
    host: &mut H,
    track: &TrackGuid,
    profile: &ContainerChannelProfile,
    plan: &TrackPlan,
) -> Result<Vec<TrackGuid>> {
    let existing = existing_channel_tracks(host, track);
    let wanted = if plan.num_tracks > 1 { plan.num_tracks as usize } else { 0 };

    let channel_tracks = with_undo_block(host, "Apply channel track structure", |host| {
        update_routing(host, track, profile)?;

        let mut channel_tracks = Vec::with_capacity(wanted);
        for (i, label) in plan.track_labels.iter().take(wanted).enumerate() {
            let child = match existing.get(i) {
                Some(child) => {
                    host.set_name(child, label)?;
                    child.clone()
                }
                None => host.insert_child_track(track, label)?,
            };
            let fallback = i as u32 * plan.track_channels;
            host.set_channel_count(&child, plan.host_track_channels())?;
            host.set_property(
                &child,
                TrackProperty::ParentChannelOffset,
                parent_offset(profile, label, fallback) as f64,
            )?;
            channel_tracks.push(child);
        }

        for extra in existing.iter().skip(wanted) {
            host.delete_track(extra)?;
        }

        sync_channel_volumes(host, track, profile)?;
        Ok(channel_tracks)
    })?;

    info!(
        %track,
        strategy = %plan.strategy,
        tracks = channel_tracks.len(),
        removed = existing.len().saturating_sub(wanted),
        "Channel track structure applied"
    );
    Ok(channel_tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use ambiance_core::{
        ChannelSelectionMode, ContainerId, ItemAnalysis, ProfileCommand, TrackStructurePlanner,
    };
    use approx::assert_abs_diff_eq;

    fn profile(mode: ChannelMode) -> ContainerChannelProfile {
        ContainerChannelProfile::with_mode(mode)
    }

    fn host_with_container() -> (MemoryHost, TrackGuid) {
        let mut host = MemoryHost::new();
        host.add_track("Forest", 0);
        let rain = host.add_track("Rain", 1);
        (host, rain)
    }

    #[test]
    fn test_resolve_prefers_guid_then_name() {
        let (host, rain) = host_with_container();
        let mut container = Container::new(ContainerId(1), "Rain");
        assert_eq!(resolve_container_track(&host, &container), Some(rain.clone()));

        container.track_guid = Some("{gone}".to_string());
        assert_eq!(resolve_container_track(&host, &container), Some(rain.clone()));

        container.name = "Thunder".to_string();
        assert!(resolve_container_track(&host, &container).is_none());
        container.track_guid = Some(rain.0.clone());
        assert_eq!(resolve_container_track(&host, &container), Some(rain));
    }

    #[test]
    fn test_update_routing_sets_total_channels() {
        let (mut host, rain) = host_with_container();
        assert!(update_routing(&mut host, &rain, &profile(ChannelMode::Five)).unwrap());
        assert_eq!(host.channel_count(&rain), Some(6));
        assert!(!update_routing(&mut host, &rain, &profile(ChannelMode::Five)).unwrap());

        update_routing(&mut host, &rain, &profile(ChannelMode::Stereo)).unwrap();
        assert_eq!(host.channel_count(&rain), Some(2));
    }

    #[test]
    fn test_update_routing_covers_custom_routing() {
        let (mut host, rain) = host_with_container();
        let mut quad = profile(ChannelMode::Quad);
        quad.apply(ProfileCommand::SetCustomRouting(Some(vec![1, 2, 9, 10])))
            .unwrap();
        update_routing(&mut host, &rain, &quad).unwrap();
        assert_eq!(host.channel_count(&rain), Some(10));
    }

    #[test]
    fn test_volume_requires_channel_tracks() {
        let (mut host, rain) = host_with_container();
        let quad = profile(ChannelMode::Quad);
        assert!(!set_channel_volume(&mut host, &rain, &quad, 1, -6.0));
        assert!(get_channel_volume(&host, &rain, &quad, 1).is_none());

        host.insert_child_track(&rain, "L").unwrap();
        assert!(!set_channel_volume(&mut host, &rain, &profile(ChannelMode::Stereo), 1, -6.0));
        assert!(!set_channel_volume(&mut host, &rain, &quad, 2, -6.0));
        assert!(!set_channel_volume(&mut host, &rain, &quad, 0, -6.0));
    }

    #[test]
    fn test_volume_round_trip() {
        let (mut host, rain) = host_with_container();
        host.insert_child_track(&rain, "L").unwrap();
        host.insert_child_track(&rain, "R").unwrap();
        let quad = profile(ChannelMode::Quad);

        assert!(set_channel_volume(&mut host, &rain, &quad, 2, -6.0));
        let linear = host.get_property(&existing_channel_tracks(&host, &rain)[1], TrackProperty::Volume);
        assert_abs_diff_eq!(linear.unwrap(), 0.501_187, epsilon = 1e-6);
        assert_abs_diff_eq!(get_channel_volume(&host, &rain, &quad, 2).unwrap(), -6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(get_channel_volume(&host, &rain, &quad, 1).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_mono_split_plan() {
        let (mut host, rain) = host_with_container();
        let mut five = profile(ChannelMode::Five);
        five.apply(ProfileCommand::SetSelectionMode(ChannelSelectionMode::MonoSplit))
            .unwrap();
        five.apply(ProfileCommand::SetChannelVolume { track: 3, db: -3.0 })
            .unwrap();
        let plan = TrackStructurePlanner::new().plan(&five, &ItemAnalysis::new(1, 4));

        let tracks = apply_plan(&mut host, &rain, &five, &plan).unwrap();
        assert_eq!(tracks.len(), 5);
        assert_eq!(host.channel_count(&rain), Some(6));

        let names: Vec<&str> = tracks.iter().map(|g| host.track(g).unwrap().name.as_str()).collect();
        assert_eq!(names, vec!["L", "R", "C", "LS", "RS"]);
        let offsets: Vec<u32> = tracks.iter().map(|g| host.track(g).unwrap().parent_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 4, 5]);
        assert!(tracks.iter().all(|g| host.channel_count(g) == Some(2)));

        assert_abs_diff_eq!(get_channel_volume(&host, &rain, &five, 3).unwrap(), -3.0, epsilon = 1e-9);
        assert_eq!(host.undo_history(), &["Apply channel track structure".to_string()]);
    }

    #[test]
    fn test_apply_reuses_and_trims_children() {
        let (mut host, rain) = host_with_container();
        let mut quad = profile(ChannelMode::Quad);
        quad.apply(ProfileCommand::SetSelectionMode(ChannelSelectionMode::MonoSplit))
            .unwrap();
        let planner = TrackStructurePlanner::new();
        let first = apply_plan(&mut host, &rain, &quad, &planner.plan(&quad, &ItemAnalysis::new(1, 2))).unwrap();

        quad.apply(ProfileCommand::SetSelectionMode(ChannelSelectionMode::StereoPairs))
            .unwrap();
        let second = apply_plan(&mut host, &rain, &quad, &planner.plan(&quad, &ItemAnalysis::new(2, 2))).unwrap();
        assert_eq!(second, first[..2].to_vec());
        assert_eq!(host.track(&second[1]).unwrap().name, "LS/RS");
        assert_eq!(host.track(&second[1]).unwrap().parent_offset, 2);
        assert_eq!(existing_channel_tracks(&host, &rain).len(), 2);

        let single = planner.plan(&quad, &ItemAnalysis::new(3, 1));
        assert!(apply_plan(&mut host, &rain, &quad, &single).unwrap().is_empty());
        assert!(existing_channel_tracks(&host, &rain).is_empty());
    }
}
