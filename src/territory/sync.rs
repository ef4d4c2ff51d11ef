//! Fire-and-forget credit sync to remote display surfaces.

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::metrics;
use crate::territory::ledger::CreditLedger;
use crate::territory::types::AgentId;

/// Payload pushed to a client whenever its credit state may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSync {
    pub agent: AgentId,
    pub available_credits: u32,
    pub total_completed: u32,
}

impl CreditSync {
    pub fn from_ledger(ledger: &CreditLedger, agent: &AgentId) -> Self {
        Self {
            agent: *agent,
            available_credits: ledger.available_credits(agent),
            total_completed: ledger.total_completed(agent),
        }
    }
}

/// Best-effort delivery; nothing is ever read back.
pub trait SyncTransport {
    fn send(&mut self, update: CreditSync) -> Result<()>;
}

/// Transport backed by a Tokio unbounded channel; the receiver side does the network I/O.
#[derive(Debug, Clone)]
pub struct ChannelSync {
    tx: mpsc::UnboundedSender<CreditSync>,
}

impl ChannelSync {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CreditSync>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SyncTransport for ChannelSync {
    fn send(&mut self, update: CreditSync) -> Result<()> {
        self.tx
            .send(update)
            .map_err(|e| anyhow!("credit sync channel closed: {}", e))
    }
}

/// Send and swallow failures; a lost sync is corrected by the next trigger.
pub fn push_sync<T: SyncTransport + ?Sized>(transport: &mut T, ledger: &CreditLedger, agent: &AgentId) {
    let update = CreditSync::from_ledger(ledger, agent);
    match transport.send(update) {
        Ok(()) => debug!(
            "Synced {} credits / {} completed to {}",
            update.available_credits, update.total_completed, agent
        ),
        Err(e) => {
            metrics::inc_sync_failures();
            warn!("Credit sync to {} failed: {}", agent, e);
        }
    }
}
