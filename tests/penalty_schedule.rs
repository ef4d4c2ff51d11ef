/// Integration tests for the locked-cell penalty scheduler.
/// Covers the check gate boundary, warning throttling and exemption rules.
use chunkgate::config::{PenaltyConfig, RewardsConfig};
use chunkgate::territory::{
    AgentSnapshot, CellAddress, CreditLedger, Dimension, PenaltyOutcome, PenaltyScheduler,
    PenaltyTracker, RecordingHost, TerritoryManager,
};
use uuid::Uuid;

fn setup() -> (PenaltyScheduler, TerritoryManager, PenaltyTracker, RecordingHost) {
    let scheduler = PenaltyScheduler::new(PenaltyConfig::default(), Dimension::overworld());
    let manager = TerritoryManager::new(CreditLedger::new(RewardsConfig::default()));
    (scheduler, manager, PenaltyTracker::new(), RecordingHost::new())
}

fn poor_agent_in_locked_cell() -> AgentSnapshot {
    AgentSnapshot::new(
        Uuid::new_v4(),
        "wanderer",
        Dimension::overworld(),
        CellAddress::new(10, 10),
    )
}

#[test]
fn test_gate_uses_inclusive_boundary() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let agent = poor_agent_in_locked_cell();

    let at_0 = scheduler.evaluate(&mut tracker, 0, &agent, &manager, &mut host);
    let at_25 = scheduler.evaluate(&mut tracker, 25, &agent, &manager, &mut host);
    let at_44 = scheduler.evaluate(&mut tracker, 44, &agent, &manager, &mut host);
    let at_45 = scheduler.evaluate(&mut tracker, 45, &agent, &manager, &mut host);

    assert!(at_0.was_evaluated());
    assert!(at_25.was_evaluated());
    assert_eq!(at_44, PenaltyOutcome::Throttled);
    // exactly C ticks after the previous check
    assert!(at_45.was_evaluated());
    assert_eq!(tracker.last_check(&agent.id), Some(45));
    assert_eq!(host.applied, 3);
}

#[test]
fn test_evaluated_once_per_interval() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let agent = poor_agent_in_locked_cell();

    let mut evaluated = 0;
    for tick in 100..120 {
        if scheduler
            .evaluate(&mut tracker, tick, &agent, &manager, &mut host)
            .was_evaluated()
        {
            evaluated += 1;
        }
    }
    assert_eq!(evaluated, 1);
}

#[test]
fn test_warning_never_twice_within_window() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let agent = poor_agent_in_locked_cell();

    let mut warned_at = Vec::new();
    for tick in 0..=400u64 {
        let report = scheduler.on_tick(
            &mut tracker,
            tick,
            std::slice::from_ref(&agent),
            &manager,
            &mut host,
        );
        if report.warned > 0 {
            warned_at.push(tick);
        }
    }
    assert_eq!(warned_at, vec![0, 100, 200, 300, 400]);
    for pair in warned_at.windows(2) {
        assert!(pair[1] - pair[0] >= 100);
    }
    // debuff refreshed on every check, not only every reapply interval
    assert_eq!(host.applied, 21);
}

#[test]
fn test_credits_exempt_agent_in_locked_cell() {
    let (scheduler, mut manager, mut tracker, mut host) = setup();
    let agent = poor_agent_in_locked_cell();
    manager.ledger_mut().set_credits(&agent.id, 1).unwrap();

    let outcome = scheduler.evaluate(&mut tracker, 0, &agent, &manager, &mut host);
    assert_eq!(outcome, PenaltyOutcome::HasCredits);
    assert_eq!(host.applied, 0);
    assert!(host.messages.is_empty());
}

#[test]
fn test_other_dimensions_are_exempt_and_clear_warning_state() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let mut agent = poor_agent_in_locked_cell();

    scheduler.evaluate(&mut tracker, 0, &agent, &manager, &mut host);
    assert_eq!(tracker.last_warning(&agent.id), Some(0));

    agent.dimension = Dimension::new("minecraft:the_end");
    let outcome = scheduler.evaluate(&mut tracker, 20, &agent, &manager, &mut host);
    assert_eq!(outcome, PenaltyOutcome::OutsidePrimary);
    assert_eq!(tracker.last_warning(&agent.id), None);
    assert!(!host.penalized.contains(&agent.id));

    // back in the primary dimension the warning fires again immediately
    agent.dimension = Dimension::overworld();
    let outcome = scheduler.evaluate(&mut tracker, 40, &agent, &manager, &mut host);
    assert_eq!(outcome, PenaltyOutcome::Penalized { warned: true });
}

#[test]
fn test_removed_agents_skip_without_state() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let mut agent = poor_agent_in_locked_cell();
    agent.removed = true;

    let report = scheduler.on_tick(
        &mut tracker,
        0,
        std::slice::from_ref(&agent),
        &manager,
        &mut host,
    );
    assert_eq!(report.evaluated, 0);
    assert_eq!(tracker.tracked_agents(), 0);
}

#[test]
fn test_running_effect_cleared_after_state_was_forgotten() {
    let (scheduler, manager, mut tracker, mut host) = setup();
    let mut agent = poor_agent_in_locked_cell();

    scheduler.evaluate(&mut tracker, 0, &agent, &manager, &mut host);
    assert!(host.penalized.contains(&agent.id));

    // reconnect with the effect still ticking on the host side
    tracker.forget(&agent.id);
    agent.dimension = Dimension::new("minecraft:the_nether");
    let outcome = scheduler.evaluate(&mut tracker, 5, &agent, &manager, &mut host);
    assert_eq!(outcome, PenaltyOutcome::OutsidePrimary);
    assert_eq!(host.cleared, 1);
    assert!(!host.penalized.contains(&agent.id));
}
