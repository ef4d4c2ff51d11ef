//! Tick-driven penalty for agents lingering in locked territory without credits.
//!
//! Three independent throttles keep per-tick work bounded:
//! - check gate: each agent is evaluated at most once every `check_interval_ticks`
//! - reapply log: the effect is refreshed on every qualifying evaluation, but the
//!   debug line about it is only written when `tick % reapply_log_interval_ticks == 0`
//! - warning gate: the chat warning goes out at most once every `warning_interval_ticks`
//!
//! Per-agent throttle state lives in [`PenaltyTracker`], owned by the caller and
//! tied to the agent's connection through [`PenaltyTracker::forget`].

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::config::PenaltyConfig;
use crate::metrics;
use crate::territory::host::{AgentEffects, Notifier, PenaltyEffect};
use crate::territory::manager::TerritoryManager;
use crate::territory::types::{AgentId, AgentSnapshot, Dimension};

pub const LOCKED_WARNING: &str =
    "You are in a locked chunk without credits! Complete advancements to earn credits.";

/// Result of running one agent through the scheduler on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyOutcome {
    /// Removed from the world or spectating.
    Ineligible,
    /// Check gate not yet open for this agent.
    Throttled,
    OutsidePrimary,
    InUnlockedCell,
    /// Standing in a locked cell but holding credits.
    HasCredits,
    Penalized { warned: bool },
}

impl PenaltyOutcome {
    pub fn was_evaluated(&self) -> bool {
        !matches!(self, PenaltyOutcome::Ineligible | PenaltyOutcome::Throttled)
    }
}

/// Per-agent throttle timestamps.
#[derive(Debug, Default)]
pub struct PenaltyTracker {
    last_check: HashMap<AgentId, u64>,
    last_warning: HashMap<AgentId, u64>,
    active: HashSet<AgentId>,
}

impl PenaltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state for a disconnecting agent.
    pub fn forget(&mut self, agent: &AgentId) {
        self.last_check.remove(agent);
        self.last_warning.remove(agent);
        self.active.remove(agent);
    }

    pub fn last_check(&self, agent: &AgentId) -> Option<u64> {
        self.last_check.get(agent).copied()
    }

    pub fn last_warning(&self, agent: &AgentId) -> Option<u64> {
        self.last_warning.get(agent).copied()
    }

    pub fn is_penalized(&self, agent: &AgentId) -> bool {
        self.active.contains(agent)
    }

    pub fn tracked_agents(&self) -> usize {
        self.last_check.len()
    }
}

/// Counts from one `on_tick` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub penalized: usize,
    pub warned: usize,
}

#[derive(Debug, Clone)]
pub struct PenaltyScheduler {
    config: PenaltyConfig,
    primary: Dimension,
}

impl PenaltyScheduler {
    pub fn new(config: PenaltyConfig, primary: Dimension) -> Self {
        Self { config, primary }
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    pub fn effect(&self) -> PenaltyEffect {
        PenaltyEffect {
            duration_ticks: self.config.effect_duration_ticks,
            amplifier: self.config.effect_amplifier,
        }
    }

    /// Run every active agent through the scheduler for `tick`.
    pub fn on_tick<H>(
        &self,
        tracker: &mut PenaltyTracker,
        tick: u64,
        agents: &[AgentSnapshot],
        territory: &TerritoryManager,
        host: &mut H,
    ) -> TickReport
    where
        H: AgentEffects + Notifier + ?Sized,
    {
        let mut report = TickReport::default();
        for agent in agents {
            let outcome = self.evaluate(tracker, tick, agent, territory, host);
            if outcome.was_evaluated() {
                report.evaluated += 1;
            }
            if let PenaltyOutcome::Penalized { warned } = outcome {
                report.penalized += 1;
                if warned {
                    report.warned += 1;
                }
            }
        }
        report
    }

    pub fn evaluate<H>(
        &self,
        tracker: &mut PenaltyTracker,
        tick: u64,
        agent: &AgentSnapshot,
        territory: &TerritoryManager,
        host: &mut H,
    ) -> PenaltyOutcome
    where
        H: AgentEffects + Notifier + ?Sized,
    {
        if agent.removed || agent.spectator {
            return PenaltyOutcome::Ineligible;
        }

        if let Some(last) = tracker.last_check.get(&agent.id) {
            if tick.saturating_sub(*last) < self.config.check_interval_ticks {
                return PenaltyOutcome::Throttled;
            }
        }
        tracker.last_check.insert(agent.id, tick);

        if agent.dimension != self.primary {
            self.release(tracker, agent, host);
            return PenaltyOutcome::OutsidePrimary;
        }
        if territory.is_unlocked_globally(&agent.cell) {
            self.release(tracker, agent, host);
            return PenaltyOutcome::InUnlockedCell;
        }
        if territory.available_credits(&agent.id) > 0 {
            self.release(tracker, agent, host);
            return PenaltyOutcome::HasCredits;
        }

        if let Err(e) = host.apply_penalty(agent, self.effect()) {
            warn!("Applying penalty to {} failed: {}", agent.name, e);
        }
        tracker.active.insert(agent.id);
        metrics::inc_penalties_applied();
        if self.config.reapply_log_interval_ticks > 0
            && tick % self.config.reapply_log_interval_ticks == 0
        {
            debug!(
                "Reapplied locked-cell penalty to {} at {} (tick {})",
                agent.name, agent.cell, tick
            );
        }

        let warned = self.maybe_warn(tracker, tick, agent, host);
        PenaltyOutcome::Penalized { warned }
    }

    fn maybe_warn<H: Notifier + ?Sized>(
        &self,
        tracker: &mut PenaltyTracker,
        tick: u64,
        agent: &AgentSnapshot,
        notifier: &mut H,
    ) -> bool {
        let due = match tracker.last_warning.get(&agent.id) {
            None => true,
            Some(last) => tick.saturating_sub(*last) >= self.config.warning_interval_ticks,
        };
        if !due {
            return false;
        }
        tracker.last_warning.insert(agent.id, tick);
        if let Err(e) = notifier.send_message(&agent.id, LOCKED_WARNING) {
            warn!("Locked-cell warning to {} failed: {}", agent.name, e);
            return false;
        }
        metrics::inc_warnings_sent();
        debug!("Warned {} about locked cell {}", agent.name, agent.cell);
        true
    }

    fn release<H: AgentEffects + ?Sized>(
        &self,
        tracker: &mut PenaltyTracker,
        agent: &AgentSnapshot,
        effects: &mut H,
    ) {
        tracker.last_warning.remove(&agent.id);
        let tracked = tracker.active.remove(&agent.id);
        if tracked || effects.has_penalty(agent) {
            if let Err(e) = effects.clear_penalty(agent) {
                warn!("Clearing penalty on {} failed: {}", agent.name, e);
            }
        }
    }
}
