//! Host-facing facade wiring the territory pieces together.
//!
//! The host calls these entry points from its single simulation thread and passes
//! itself in as the [`TerritoryHost`] for side effects. State is persisted through
//! [`TerritoryStore`] whenever it changes; a failed save leaves the engine dirty so
//! the next trigger retries it.

use std::path::Path;

use log::{debug, error, info, warn};

use crate::config::Config;
use crate::territory::area::PlayableArea;
use crate::territory::errors::TerritoryError;
use crate::territory::host::TerritoryHost;
use crate::territory::ledger::CreditLedger;
use crate::territory::manager::TerritoryManager;
use crate::territory::penalty::{PenaltyScheduler, PenaltyTracker, TickReport};
use crate::territory::storage::{SnapshotStore, TerritorySnapshot, TerritoryStore};
use crate::territory::sync::push_sync;
use crate::territory::transfer::{DimensionTransferHandler, TransferOutcome};
use crate::territory::types::{
    ensure_agent, AchievementEvent, AgentId, AgentSnapshot, CellAddress, Dimension,
};

/// Result of a manual unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked { remaining: u32 },
    AlreadyUnlocked,
    /// Not touching the unlocked surface while adjacency is required.
    NotAdjacent,
    NoCredits,
}

pub struct TerritoryEngine {
    config: Config,
    primary: Dimension,
    manager: TerritoryManager,
    scheduler: PenaltyScheduler,
    tracker: PenaltyTracker,
    transfer: DimensionTransferHandler,
    store: Option<Box<dyn SnapshotStore + Send>>,
    dirty: bool,
}

impl TerritoryEngine {
    /// Engine with no persistence.
    pub fn in_memory(config: Config) -> Result<Self, TerritoryError> {
        Self::build(config, TerritorySnapshot::default(), None)
    }

    /// Open the store under `config.storage.data_dir` and load its snapshot.
    pub fn open(config: Config) -> Result<Self, TerritoryError> {
        let path = Path::new(&config.storage.data_dir).join("territory");
        let store = TerritoryStore::open(&path)?;
        Self::with_store(config, store)
    }

    pub fn with_store<S>(config: Config, store: S) -> Result<Self, TerritoryError>
    where
        S: SnapshotStore + Send + 'static,
    {
        let snapshot = store.load_snapshot()?;
        Self::build(config, snapshot, Some(Box::new(store)))
    }

    fn build(
        config: Config,
        snapshot: TerritorySnapshot,
        store: Option<Box<dyn SnapshotStore + Send>>,
    ) -> Result<Self, TerritoryError> {
        config.validate()?;
        let primary = Dimension::new(config.territory.primary_dimension.clone());
        let ledger = CreditLedger::with_agents(config.rewards.clone(), snapshot.agents);
        let manager = TerritoryManager::from_records(snapshot.unlocked, ledger)?;
        info!(
            "Territory engine ready: {} unlocked cell(s), {} known agent(s), primary dimension {}",
            manager.unlocked_count(),
            manager.ledger().agents().len(),
            primary
        );
        Ok(Self {
            scheduler: PenaltyScheduler::new(config.penalty.clone(), primary.clone()),
            transfer: DimensionTransferHandler::new(primary.clone()),
            tracker: PenaltyTracker::new(),
            primary,
            manager,
            store,
            dirty: false,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &TerritoryManager {
        &self.manager
    }

    pub fn tracker(&self) -> &PenaltyTracker {
        &self.tracker
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_unlocked_globally(&self, cell: &CellAddress) -> bool {
        self.manager.is_unlocked_globally(cell)
    }

    pub fn available_credits(&self, agent: &AgentId) -> u32 {
        self.manager.available_credits(agent)
    }

    pub fn areas(&mut self) -> Vec<PlayableArea> {
        self.manager.areas().to_vec()
    }

    pub fn snapshot(&self) -> TerritorySnapshot {
        TerritorySnapshot {
            unlocked: self.manager.records().cloned().collect(),
            agents: self.manager.ledger().agents().clone(),
        }
    }

    /// Sync credits, make sure the spawn has unlocked ground, then redraw all boundaries.
    pub fn on_agent_join<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        agent: &AgentSnapshot,
    ) -> Result<Vec<CellAddress>, TerritoryError> {
        ensure_agent(&agent.id)?;
        push_sync(host, self.manager.ledger(), &agent.id);

        let mut provisioned = Vec::new();
        if agent.dimension == self.primary {
            let before = self.manager.unlocked_count();
            let result = self.manager.provision_spawn(
                &agent.id,
                agent.cell,
                self.config.territory.spawn_area_size,
            );
            if self.manager.unlocked_count() != before {
                self.dirty = true;
            }
            provisioned = match result {
                Ok(cells) => cells,
                Err(e) => {
                    self.autosave();
                    return Err(e);
                }
            };
            if !provisioned.is_empty() {
                let message = format!(
                    "Unlocked {} spawn chunk(s) starting at {} so you have somewhere to stand.",
                    provisioned.len(),
                    agent.cell
                );
                if let Err(e) = host.send_message(&agent.id, &message) {
                    warn!("Spawn notification to {} failed: {}", agent.name, e);
                }
            }
        }

        self.manager.initialize_boundaries_for_agent(host, &agent.id);
        debug!("{} joined at {} in {}", agent.name, agent.cell, agent.dimension);
        self.autosave();
        Ok(provisioned)
    }

    pub fn on_agent_leave(&mut self, agent: &AgentId) {
        self.tracker.forget(agent);
        debug!("Dropped penalty state for {}", agent);
        self.autosave();
    }

    pub fn on_tick<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        tick: u64,
        agents: &[AgentSnapshot],
    ) -> TickReport {
        self.scheduler
            .on_tick(&mut self.tracker, tick, agents, &self.manager, host)
    }

    pub fn on_dimension_transfer<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        agent: &AgentSnapshot,
        destination: &Dimension,
    ) -> Result<TransferOutcome, TerritoryError> {
        ensure_agent(&agent.id)?;
        let outcome = self
            .transfer
            .on_dimension_transfer(&mut self.manager, host, agent, destination)?;
        if matches!(outcome, TransferOutcome::Unlocked { .. }) {
            self.dirty = true;
            self.autosave();
        }
        push_sync(host, self.manager.ledger(), &agent.id);
        Ok(outcome)
    }

    /// Award credits for an achievement. Returns the credits awarded.
    pub fn on_achievement_completed<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        event: &AchievementEvent,
    ) -> Result<u32, TerritoryError> {
        let awarded = self.manager.ledger_mut().on_achievement_completed(event)?;
        if awarded == 0 {
            return Ok(0);
        }
        self.dirty = true;

        if self.config.rewards.enable_notifications {
            let balance = self.manager.available_credits(&event.agent);
            let message = format!(
                "+{} chunk credit{}! You now have {}.",
                awarded,
                if awarded == 1 { "" } else { "s" },
                balance
            );
            if let Err(e) = host.send_message(&event.agent, &message) {
                warn!("Reward notification to {} failed: {}", event.agent, e);
            }
        }
        push_sync(host, self.manager.ledger(), &event.agent);
        self.autosave();
        Ok(awarded)
    }

    /// Manual unlock request from an agent.
    pub fn unlock<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        agent: &AgentId,
        cell: CellAddress,
    ) -> Result<UnlockOutcome, TerritoryError> {
        ensure_agent(agent)?;
        let cell = cell.validate()?;

        if self.manager.is_unlocked_globally(&cell) {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }
        if self.config.territory.require_adjacent_for_manual && !self.manager.can_unlock(&cell) {
            debug!("Rejected unlock of {} by {}: not adjacent", cell, agent);
            return Ok(UnlockOutcome::NotAdjacent);
        }
        if !self.manager.try_unlock(agent, cell)? {
            return Ok(UnlockOutcome::NoCredits);
        }

        self.dirty = true;
        self.manager.update_boundaries_after_unlock(host, agent, cell);
        push_sync(host, self.manager.ledger(), agent);
        self.autosave();
        Ok(UnlockOutcome::Unlocked {
            remaining: self.manager.available_credits(agent),
        })
    }

    /// Admin unlock that never touches credits. Returns false if already unlocked.
    pub fn force_unlock<H: TerritoryHost + ?Sized>(
        &mut self,
        host: &mut H,
        agent: Option<AgentId>,
        cell: CellAddress,
    ) -> Result<bool, TerritoryError> {
        if !self.manager.force_unlock(agent, cell)? {
            return Ok(false);
        }
        self.dirty = true;
        let by = agent.unwrap_or_default();
        self.manager.update_boundaries_after_unlock(host, &by, cell);
        self.autosave();
        Ok(true)
    }

    /// Admin credit grant. Returns the new balance.
    pub fn grant_credits(&mut self, agent: &AgentId, amount: u32) -> Result<u32, TerritoryError> {
        let balance = self.manager.ledger_mut().add_credits(agent, amount)?;
        info!("Granted {} credit(s) to {} (balance {})", amount, agent, balance);
        self.dirty = true;
        self.autosave();
        Ok(balance)
    }

    pub fn set_credits(&mut self, agent: &AgentId, amount: u32) -> Result<(), TerritoryError> {
        self.manager.ledger_mut().set_credits(agent, amount)?;
        info!("Set credits of {} to {}", agent, amount);
        self.dirty = true;
        self.autosave();
        Ok(())
    }

    /// Persist the full snapshot if anything changed. Returns whether a save happened.
    pub fn save_if_dirty(&mut self) -> Result<bool, TerritoryError> {
        if !self.dirty {
            return Ok(false);
        }
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };
        store.save_snapshot(&self.snapshot())?;
        self.dirty = false;
        Ok(true)
    }

    pub fn shutdown(&mut self) -> Result<(), TerritoryError> {
        self.save_if_dirty()?;
        info!(
            "Territory engine stopped with {} unlocked cell(s)",
            self.manager.unlocked_count()
        );
        Ok(())
    }

    fn autosave(&mut self) {
        if let Err(e) = self.save_if_dirty() {
            error!("Territory save failed, will retry on next change: {}", e);
        }
    }
}
