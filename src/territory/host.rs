//! Host-side collaborators the engine drives but does not implement.
//!
//! Every method is best effort: the engine logs a failure and keeps its own state.

use std::collections::HashSet;

use anyhow::Result;
use log::info;

use crate::territory::boundary::{BoundaryPlacement, BoundaryPlan, MarkedEdges};
use crate::territory::sync::{CreditSync, SyncTransport};
use crate::territory::types::{AgentId, AgentSnapshot};

/// Status effect applied to an agent standing in locked territory without credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyEffect {
    pub duration_ticks: u32,
    pub amplifier: u8,
}

/// Applies and removes the locked-territory status effect.
pub trait AgentEffects {
    fn apply_penalty(&mut self, agent: &AgentSnapshot, effect: PenaltyEffect) -> Result<()>;

    fn clear_penalty(&mut self, agent: &AgentSnapshot) -> Result<()>;

    /// Whether the effect is currently running on the agent.
    fn has_penalty(&self, agent: &AgentSnapshot) -> bool;
}

/// Delivers short text messages to a connected agent.
pub trait Notifier {
    fn send_message(&mut self, agent: &AgentId, message: &str) -> Result<()>;
}

/// Everything the engine needs from its host in one bound.
pub trait TerritoryHost: BoundaryPlacement + AgentEffects + Notifier + SyncTransport {}

impl<T> TerritoryHost for T where T: BoundaryPlacement + AgentEffects + Notifier + SyncTransport {}

/// In-process host that records every side effect and logs messages.
///
/// Backs the `replay` command and the test suites.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub boundaries: MarkedEdges,
    pub penalized: HashSet<AgentId>,
    pub applied: u64,
    pub cleared: u64,
    pub messages: Vec<(AgentId, String)>,
    pub syncs: Vec<CreditSync>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_for(&self, agent: &AgentId) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(id, _)| id == agent)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn last_sync(&self, agent: &AgentId) -> Option<&CreditSync> {
        self.syncs.iter().rev().find(|s| s.agent == *agent)
    }
}

impl BoundaryPlacement for RecordingHost {
    fn apply(&mut self, plan: &BoundaryPlan) -> Result<()> {
        self.boundaries.apply(plan)
    }

    fn clear_all(&mut self) -> Result<()> {
        self.boundaries.clear_all()
    }
}

impl AgentEffects for RecordingHost {
    fn apply_penalty(&mut self, agent: &AgentSnapshot, _effect: PenaltyEffect) -> Result<()> {
        self.applied += 1;
        self.penalized.insert(agent.id);
        Ok(())
    }

    fn clear_penalty(&mut self, agent: &AgentSnapshot) -> Result<()> {
        self.cleared += 1;
        self.penalized.remove(&agent.id);
        Ok(())
    }

    fn has_penalty(&self, agent: &AgentSnapshot) -> bool {
        self.penalized.contains(&agent.id)
    }
}

impl Notifier for RecordingHost {
    fn send_message(&mut self, agent: &AgentId, message: &str) -> Result<()> {
        info!("[to {}] {}", agent, message);
        self.messages.push((*agent, message.to_string()));
        Ok(())
    }
}

impl SyncTransport for RecordingHost {
    fn send(&mut self, update: CreditSync) -> Result<()> {
        self.syncs.push(update);
        Ok(())
    }
}
