//! Test utilities & fixtures.
//! Collaborators that fail on demand, for checking that core state survives them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chunkgate::territory::{
    AgentEffects, AgentId, AgentSnapshot, BoundaryPlacement, BoundaryPlan, CreditSync, Notifier,
    PenaltyEffect, SnapshotStore, SyncTransport, TerritoryError, TerritorySnapshot,
};

/// Host whose every side effect fails. Counts the attempts.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FailingHost {
    pub placements: usize,
    pub messages: usize,
    pub penalties: usize,
    pub syncs: usize,
}

#[allow(dead_code)]
impl FailingHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoundaryPlacement for FailingHost {
    fn apply(&mut self, _plan: &BoundaryPlan) -> Result<()> {
        self.placements += 1;
        bail!("marker placement unavailable")
    }

    fn clear_all(&mut self) -> Result<()> {
        self.placements += 1;
        bail!("marker placement unavailable")
    }
}

impl AgentEffects for FailingHost {
    fn apply_penalty(&mut self, _agent: &AgentSnapshot, _effect: PenaltyEffect) -> Result<()> {
        self.penalties += 1;
        bail!("effect rejected")
    }

    fn clear_penalty(&mut self, _agent: &AgentSnapshot) -> Result<()> {
        bail!("effect rejected")
    }

    fn has_penalty(&self, _agent: &AgentSnapshot) -> bool {
        false
    }
}

impl Notifier for FailingHost {
    fn send_message(&mut self, _agent: &AgentId, _message: &str) -> Result<()> {
        self.messages += 1;
        bail!("agent disconnected")
    }
}

impl SyncTransport for FailingHost {
    fn send(&mut self, _update: CreditSync) -> Result<()> {
        self.syncs += 1;
        bail!("sync transport down")
    }
}

/// In-memory snapshot store that can be switched into a failing state.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    pub failing: Arc<AtomicBool>,
    pub saves: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for FlakyStore {
    fn load_snapshot(&self) -> Result<TerritorySnapshot, TerritoryError> {
        Ok(TerritorySnapshot::default())
    }

    fn save_snapshot(&self, _snapshot: &TerritorySnapshot) -> Result<(), TerritoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TerritoryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
