/// End-to-end tests for the territory engine facade driven by an in-process host.
/// Covers join provisioning, achievement rewards, transfers and manual unlocks.
use chunkgate::config::Config;
use chunkgate::territory::{
    AchievementEvent, AchievementFrame, AgentSnapshot, CellAddress, ChannelSync, Dimension,
    RecordingHost, TerritoryEngine, TransferOutcome, UnlockOutcome,
};
use chunkgate::territory::types::WORLD_CELL_LIMIT;
use uuid::Uuid;

fn engine() -> TerritoryEngine {
    TerritoryEngine::in_memory(Config::default()).unwrap()
}

fn agent_at(x: i32, z: i32) -> AgentSnapshot {
    AgentSnapshot::new(
        Uuid::new_v4(),
        "steve",
        Dimension::overworld(),
        CellAddress::new(x, z),
    )
}

#[test]
fn test_join_provisions_spawn_and_draws_boundaries() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(0, 0);

    let provisioned = engine.on_agent_join(&mut host, &agent).unwrap();
    assert_eq!(provisioned.len(), 4);
    assert_eq!(engine.areas().len(), 1);
    // 2x2 square has 8 outer edges
    assert_eq!(host.boundaries.edges().len(), 8);
    assert_eq!(host.last_sync(&agent.id).unwrap().available_credits, 0);
    assert_eq!(
        host.messages_for(&agent.id),
        vec!["Unlocked 4 spawn chunk(s) starting at [0, 0] so you have somewhere to stand."]
    );

    // second agent spawning inside the square gets nothing new
    let other = agent_at(1, 1);
    assert!(engine.on_agent_join(&mut host, &other).unwrap().is_empty());
    assert!(host.messages_for(&other.id).is_empty());
}

#[test]
fn test_join_at_world_border_commits_and_marks_dirty() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(WORLD_CELL_LIMIT, 0);

    let provisioned = engine.on_agent_join(&mut host, &agent).unwrap();
    assert_eq!(provisioned.len(), 2);
    assert_eq!(engine.manager().unlocked_count(), 2);
    // in-memory engines have nowhere to save, so the change stays pending
    assert!(engine.is_dirty());
}

#[test]
fn test_join_in_other_dimension_does_not_provision() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let mut agent = agent_at(0, 0);
    agent.dimension = Dimension::new("minecraft:the_nether");

    assert!(engine.on_agent_join(&mut host, &agent).unwrap().is_empty());
    assert_eq!(engine.manager().unlocked_count(), 0);
}

#[test]
fn test_achievement_awards_notifies_and_syncs() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = Uuid::new_v4();

    let event = AchievementEvent::new(
        agent,
        "minecraft:adventure/adventuring_time",
        Some(AchievementFrame::Challenge),
    );
    assert_eq!(engine.on_achievement_completed(&mut host, &event).unwrap(), 20);
    assert_eq!(engine.available_credits(&agent), 20);
    assert_eq!(
        host.messages_for(&agent),
        vec!["+20 chunk credits! You now have 20."]
    );
    assert_eq!(host.last_sync(&agent).unwrap().total_completed, 1);

    // repeats are ignored
    assert_eq!(engine.on_achievement_completed(&mut host, &event).unwrap(), 0);
    assert_eq!(host.messages_for(&agent).len(), 1);
}

#[test]
fn test_ineligible_achievements_award_nothing() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = Uuid::new_v4();

    let recipe = AchievementEvent::new(
        agent,
        "minecraft:recipes/misc/charcoal",
        Some(AchievementFrame::Task),
    );
    let blacklisted = AchievementEvent::new(agent, "minecraft:story/root", Some(AchievementFrame::Task));
    let no_frame = AchievementEvent::new(agent, "mymod:hidden", None);
    let mut automated = AchievementEvent::new(agent, "minecraft:story/smelt_iron", Some(AchievementFrame::Task));
    automated.automated = true;

    for event in [recipe, blacklisted, no_frame, automated] {
        assert_eq!(engine.on_achievement_completed(&mut host, &event).unwrap(), 0);
    }
    assert_eq!(engine.available_credits(&agent), 0);
    assert!(host.messages.is_empty());
}

#[test]
fn test_transfer_unlocks_arrival_cell() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(40, -7);
    engine.grant_credits(&agent.id, 2).unwrap();

    let outcome = engine
        .on_dimension_transfer(&mut host, &agent, &Dimension::overworld())
        .unwrap();
    assert_eq!(
        outcome,
        TransferOutcome::Unlocked {
            cell: CellAddress::new(40, -7),
            remaining: 1
        }
    );
    assert!(engine.is_unlocked_globally(&CellAddress::new(40, -7)));
    assert_eq!(
        host.messages_for(&agent.id),
        vec!["Unlocked chunk [40, -7] on arrival! Remaining credits: 1"]
    );
    assert_eq!(host.last_sync(&agent.id).unwrap().available_credits, 1);

    // arriving again changes nothing
    let again = engine
        .on_dimension_transfer(&mut host, &agent, &Dimension::overworld())
        .unwrap();
    assert_eq!(again, TransferOutcome::AlreadyUnlocked);
    assert_eq!(engine.available_credits(&agent.id), 1);
}

#[test]
fn test_transfer_elsewhere_or_without_credits() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(3, 3);

    let nether = Dimension::new("minecraft:the_nether");
    assert_eq!(
        engine.on_dimension_transfer(&mut host, &agent, &nether).unwrap(),
        TransferOutcome::NotPrimary
    );
    assert_eq!(
        engine
            .on_dimension_transfer(&mut host, &agent, &Dimension::overworld())
            .unwrap(),
        TransferOutcome::NoCredits
    );
    assert_eq!(engine.manager().unlocked_count(), 0);
}

#[test]
fn test_manual_unlock_requires_adjacency() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(0, 0);
    engine.on_agent_join(&mut host, &agent).unwrap();
    engine.grant_credits(&agent.id, 2).unwrap();

    assert_eq!(
        engine.unlock(&mut host, &agent.id, CellAddress::new(10, 10)).unwrap(),
        UnlockOutcome::NotAdjacent
    );
    assert_eq!(
        engine.unlock(&mut host, &agent.id, CellAddress::new(2, 0)).unwrap(),
        UnlockOutcome::Unlocked { remaining: 1 }
    );
    assert_eq!(
        engine.unlock(&mut host, &agent.id, CellAddress::new(2, 0)).unwrap(),
        UnlockOutcome::AlreadyUnlocked
    );
    assert!(!host.boundaries.edges().is_empty());
}

#[test]
fn test_manual_unlock_without_credits() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let agent = agent_at(0, 0);
    engine.on_agent_join(&mut host, &agent).unwrap();

    assert_eq!(
        engine.unlock(&mut host, &agent.id, CellAddress::new(0, 2)).unwrap(),
        UnlockOutcome::NoCredits
    );
}

#[test]
fn test_penalty_lifecycle_through_engine() {
    let mut engine = engine();
    let mut host = RecordingHost::new();
    let mut agent = agent_at(0, 0);
    engine.on_agent_join(&mut host, &agent).unwrap();

    agent.cell = CellAddress::new(5, 5);
    let report = engine.on_tick(&mut host, 0, std::slice::from_ref(&agent));
    assert_eq!(report.penalized, 1);
    assert!(host.penalized.contains(&agent.id));

    // walking back into unlocked ground lifts the effect on the next check
    agent.cell = CellAddress::new(0, 0);
    engine.on_tick(&mut host, 20, std::slice::from_ref(&agent));
    assert!(!host.penalized.contains(&agent.id));
    assert_eq!(host.cleared, 1);

    engine.on_agent_leave(&agent.id);
    assert_eq!(engine.tracker().tracked_agents(), 0);
}

#[tokio::test]
async fn test_channel_sync_receives_updates() {
    let (mut sync, mut rx) = ChannelSync::new();
    let mut engine = engine();
    let agent = Uuid::new_v4();
    engine.grant_credits(&agent, 3).unwrap();

    chunkgate::territory::push_sync(&mut sync, engine.manager().ledger(), &agent);
    let update = rx.recv().await.unwrap();
    assert_eq!(update.agent, agent);
    assert_eq!(update.available_credits, 3);
    assert_eq!(update.total_completed, 0);
}
