use ambiance_core::{
    ChannelMode, ChannelSelectionMode, ContainerId, ItemAnalysis, PlanStrategy, ProfileCommand,
    Project,
};
use ambiance_services::{
    existing_channel_tracks, FlushReport, HostPort, MemoryHost, RoutingSession, TrackGuid,
    TrackProperty,
};
use approx::assert_abs_diff_eq;

fn forest_session() -> (RoutingSession<MemoryHost>, ContainerId, ContainerId) {
    let mut project = Project::new();
    let forest = project.add_group("Forest");
    let rain = project.add_container(forest, "Rain").unwrap();
    let drone = project.add_container(forest, "Drone").unwrap();

    let mut session = RoutingSession::new(MemoryHost::new(), project);
    session
        .apply_command(rain, ProfileCommand::SetChannelMode(ChannelMode::Quad))
        .unwrap();
    session
        .apply_command(rain, ProfileCommand::SetSelectionMode(ChannelSelectionMode::StereoPairs))
        .unwrap();
    session
        .apply_command(drone, ProfileCommand::SetChannelMode(ChannelMode::Five))
        .unwrap();
    (session, rain, drone)
}

fn channels(session: &RoutingSession<MemoryHost>, name: &str) -> Option<u32> {
    let host = session.host();
    let guid = if name == "MASTER" { host.master() } else { host.find_by_name(name)? };
    host.channel_count(&guid)
}

fn offsets(session: &RoutingSession<MemoryHost>, container: &TrackGuid) -> Vec<u32> {
    let host = session.host();
    existing_channel_tracks(host, container)
        .iter()
        .map(|child| host.get_property(child, TrackProperty::ParentChannelOffset).unwrap() as u32)
        .collect()
}

#[test]
fn test_generate_resolve_and_optimize() {
    let (mut session, rain, drone) = forest_session();
    assert_eq!(session.project().containers_needing_regeneration(), vec![rain, drone]);

    // Generation
    let rain_out = session.regenerate(rain, &ItemAnalysis::new(2, 4)).unwrap();
    assert_eq!(rain_out.plan.strategy, PlanStrategy::StereoPairs);
    assert_eq!(rain_out.plan.track_labels, vec!["L/R", "LS/RS"]);
    assert_eq!(offsets(&session, &rain_out.container_track), vec![0, 2]);

    let drone_out = session.regenerate(drone, &ItemAnalysis::new(5, 2)).unwrap();
    assert_eq!(drone_out.plan.strategy, PlanStrategy::AutoPassthrough);
    assert!(drone_out.plan.needs_source_variant);
    assert!(drone_out.channel_tracks.is_empty());

    assert_eq!(channels(&session, "Rain"), Some(4));
    assert_eq!(channels(&session, "Drone"), Some(6));
    assert_eq!(channels(&session, "Forest"), Some(6));
    assert_eq!(channels(&session, "MASTER"), Some(6));
    assert!(session.project().containers_needing_regeneration().is_empty());

    // Conflict resolution
    let conflicts = session.detect_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].physical_channel, 3);

    let fixes = session.suggest_fixes();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].suggested_routing, vec![1, 2, 7, 8]);
    assert!(session.apply_fix(&fixes[0]).unwrap());
    assert_eq!(session.end_tick(), FlushReport { applied: 1, failed: 0 });

    assert!(session.detect_conflicts().is_empty());
    assert_eq!(channels(&session, "Rain"), Some(8));
    assert_eq!(channels(&session, "Forest"), Some(8));
    assert_eq!(channels(&session, "MASTER"), Some(8));

    session.regenerate(rain, &ItemAnalysis::new(2, 4)).unwrap();
    assert_eq!(offsets(&session, &rain_out.container_track), vec![0, 6]);

    // Per-channel volume
    session
        .apply_command(rain, ProfileCommand::SetChannelVolume { track: 2, db: -6.0 })
        .unwrap();
    session.end_tick();
    assert_abs_diff_eq!(session.channel_volume(rain, 2).unwrap(), -6.0, epsilon = 1e-9);
    let surround = existing_channel_tracks(session.host(), &rain_out.container_track)[1].clone();
    assert_abs_diff_eq!(
        session.host().get_property(&surround, TrackProperty::Volume).unwrap(),
        0.501_187,
        epsilon = 1e-6
    );

    // Back to stereo, then shrink
    session
        .apply_command(rain, ProfileCommand::SetChannelMode(ChannelMode::Stereo))
        .unwrap();
    session.regenerate(rain, &ItemAnalysis::new(2, 4)).unwrap();
    assert_eq!(channels(&session, "Rain"), Some(2));
    assert!(existing_channel_tracks(session.host(), &rain_out.container_track).is_empty());
    assert_eq!(channels(&session, "Forest"), Some(8));

    let report = session.optimize().unwrap();
    assert_eq!(report.changes.len(), 2);
    assert_eq!(channels(&session, "Forest"), Some(6));
    assert_eq!(channels(&session, "MASTER"), Some(6));
    assert_eq!(channels(&session, "Drone"), Some(6));

    let writes = session.host().write_count();
    assert!(session.optimize().unwrap().is_empty());
    assert_eq!(session.host().write_count(), writes);
}

#[test]
fn test_saved_session_keeps_track_references() {
    let (mut session, rain, _) = forest_session();
    let outcome = session.regenerate(rain, &ItemAnalysis::new(2, 1)).unwrap();

    let (host, project) = session.into_parts();
    let host: MemoryHost = serde_json::from_str(&serde_json::to_string(&host).unwrap()).unwrap();
    let project: Project = serde_json::from_str(&serde_json::to_string(&project).unwrap()).unwrap();

    let container = project.container(rain).unwrap();
    assert_eq!(container.track_guid.as_deref(), Some(outcome.container_track.as_str()));
    assert_eq!(host.channel_count(&outcome.container_track), Some(4));
    assert_eq!(container.channels.channel_mode(), ChannelMode::Quad);
}
