//! Authoritative unlocked-cell set and the credit-gated unlock state machine.
//!
//! The global set, its connectivity cache and the credit ledger live together here
//! so that every mutation of the set invalidates the cache in the same call.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use crate::metrics;
use crate::territory::area::PlayableArea;
use crate::territory::boundary::{BoundaryPlacement, BoundaryPlan};
use crate::territory::connectivity::{ConnectivityIndex, ConnectivityStats};
use crate::territory::errors::TerritoryError;
use crate::territory::ledger::CreditLedger;
use crate::territory::types::{ensure_agent, AgentId, CellAddress, UnlockRecord};

/// Credits spent per manual or automatic unlock.
pub const UNLOCK_COST: u32 = 1;

/// Largest spawn square side accepted by [`TerritoryManager::provision_spawn`].
pub const MAX_SPAWN_AREA_SIZE: u32 = 64;

#[derive(Debug, Default)]
pub struct TerritoryManager {
    unlocked: BTreeSet<CellAddress>,
    records: HashMap<CellAddress, UnlockRecord>,
    index: ConnectivityIndex,
    ledger: CreditLedger,
}

impl TerritoryManager {
    pub fn new(ledger: CreditLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Rebuild from persisted unlock records.
    pub fn from_records(
        records: impl IntoIterator<Item = UnlockRecord>,
        ledger: CreditLedger,
    ) -> Result<Self, TerritoryError> {
        let mut manager = Self::new(ledger);
        for record in records {
            let cell = record.cell.validate()?;
            manager.unlocked.insert(cell);
            manager.records.insert(cell, record);
        }
        Ok(manager)
    }

    pub fn is_unlocked_globally(&self, cell: &CellAddress) -> bool {
        self.unlocked.contains(cell)
    }

    pub fn available_credits(&self, agent: &AgentId) -> u32 {
        self.ledger.available_credits(agent)
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut CreditLedger {
        &mut self.ledger
    }

    pub fn global_unlocked(&self) -> &BTreeSet<CellAddress> {
        &self.unlocked
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    pub fn record(&self, cell: &CellAddress) -> Option<&UnlockRecord> {
        self.records.get(cell)
    }

    pub fn records(&self) -> impl Iterator<Item = &UnlockRecord> {
        self.records.values()
    }

    /// Spend one credit to unlock `cell`.
    ///
    /// Returns `Ok(false)` with no state change when the cell is already unlocked or
    /// the agent has no credits. Errors only on a nil agent or out-of-world cell.
    pub fn try_unlock(&mut self, agent: &AgentId, cell: CellAddress) -> Result<bool, TerritoryError> {
        ensure_agent(agent)?;
        let cell = cell.validate()?;

        if self.unlocked.contains(&cell) {
            debug!("Cell {} already unlocked, nothing to spend", cell);
            return Ok(false);
        }
        if !self.ledger.spend(agent, UNLOCK_COST)? {
            debug!("Agent {} has no credits to unlock {}", agent, cell);
            return Ok(false);
        }

        self.insert_unlocked(cell, Some(*agent), false);
        metrics::inc_unlocks();
        info!(
            "Agent {} unlocked cell {} ({} credits left)",
            agent,
            cell,
            self.ledger.available_credits(agent)
        );
        Ok(true)
    }

    /// Unlock without touching credits. Returns false if the cell was already unlocked.
    pub fn force_unlock(
        &mut self,
        agent: Option<AgentId>,
        cell: CellAddress,
    ) -> Result<bool, TerritoryError> {
        if let Some(agent) = agent.as_ref() {
            ensure_agent(agent)?;
        }
        let cell = cell.validate()?;

        if !self.insert_unlocked(cell, agent, true) {
            return Ok(false);
        }
        metrics::inc_force_unlocks();
        match agent {
            Some(agent) => info!("Force-unlocked cell {} for agent {}", cell, agent),
            None => info!("Force-unlocked cell {}", cell),
        }
        Ok(true)
    }

    /// Unlock cells in order until one fails. Returns the cells that were unlocked.
    pub fn try_unlock_many(
        &mut self,
        agent: &AgentId,
        cells: &[CellAddress],
    ) -> Result<Vec<CellAddress>, TerritoryError> {
        let mut done = Vec::new();
        for cell in cells {
            if !self.try_unlock(agent, *cell)? {
                break;
            }
            done.push(*cell);
        }
        Ok(done)
    }

    pub fn force_unlock_many(
        &mut self,
        agent: Option<AgentId>,
        cells: &[CellAddress],
    ) -> Result<Vec<CellAddress>, TerritoryError> {
        let mut done = Vec::new();
        for cell in cells {
            if self.force_unlock(agent, *cell)? {
                done.push(*cell);
            }
        }
        Ok(done)
    }

    /// Guarantee an agent spawning into locked territory has somewhere to stand.
    ///
    /// When nothing is unlocked yet or `spawn` is locked, force-unlocks the
    /// `size x size` square whose min corner is `spawn`, clipped to the world border.
    /// Returns the newly unlocked cells.
    pub fn provision_spawn(
        &mut self,
        agent: &AgentId,
        spawn: CellAddress,
        size: u32,
    ) -> Result<Vec<CellAddress>, TerritoryError> {
        ensure_agent(agent)?;
        let spawn = spawn.validate()?;
        if size > MAX_SPAWN_AREA_SIZE {
            return Err(TerritoryError::InvalidConfig(format!(
                "spawn area size {} exceeds {}",
                size, MAX_SPAWN_AREA_SIZE
            )));
        }
        if !self.unlocked.is_empty() && self.unlocked.contains(&spawn) {
            return Ok(Vec::new());
        }

        let side = i32::try_from(size.max(1)).map_err(|_| {
            TerritoryError::InvalidConfig(format!("spawn area size {} out of range", size))
        })?;
        let mut square = Vec::with_capacity((side as usize).pow(2));
        for dx in 0..side {
            for dz in 0..side {
                let (Some(x), Some(z)) = (spawn.x.checked_add(dx), spawn.z.checked_add(dz)) else {
                    continue;
                };
                let cell = CellAddress::new(x, z);
                if cell.is_in_world() {
                    square.push(cell);
                }
            }
        }
        let added = self.force_unlock_many(Some(*agent), &square)?;
        if !added.is_empty() {
            info!(
                "Provisioned {} spawn cell(s) at {} for agent {}",
                added.len(),
                spawn,
                agent
            );
        }
        Ok(added)
    }

    pub fn areas(&mut self) -> &[PlayableArea] {
        self.index.compute_areas(&self.unlocked)
    }

    pub fn area_containing(&mut self, cell: &CellAddress) -> Option<PlayableArea> {
        self.index.compute_areas(&self.unlocked);
        self.index.find_area_containing(cell).cloned()
    }

    /// Areas that unlocking `cell` would join together.
    pub fn preview_unlock(&mut self, cell: &CellAddress) -> Vec<PlayableArea> {
        self.index.compute_areas(&self.unlocked);
        self.index
            .find_areas_adjacent_to(cell)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Locked cells sharing an edge with the unlocked surface.
    pub fn frontier(&self) -> BTreeSet<CellAddress> {
        self.unlocked
            .iter()
            .flat_map(|cell| cell.neighbors())
            .filter(|n| !self.unlocked.contains(n))
            .collect()
    }

    /// Whether a manual unlock of `cell` is allowed: locked, and touching the
    /// unlocked surface unless nothing is unlocked yet.
    pub fn can_unlock(&self, cell: &CellAddress) -> bool {
        if self.unlocked.contains(cell) || !cell.is_in_world() {
            return false;
        }
        self.unlocked.is_empty() || cell.neighbors().iter().any(|n| self.unlocked.contains(n))
    }

    pub fn connectivity_stats(&self) -> ConnectivityStats {
        self.index.stats()
    }

    pub fn boundary_plan_after_unlock(&self, cell: CellAddress) -> BoundaryPlan {
        BoundaryPlan::after_unlock(&self.unlocked, cell)
    }

    /// Push the marker changes around a newly unlocked cell. Placement failures are
    /// logged; the unlock itself stays committed.
    pub fn update_boundaries_after_unlock<P: BoundaryPlacement + ?Sized>(
        &self,
        placement: &mut P,
        agent: &AgentId,
        cell: CellAddress,
    ) {
        let plan = self.boundary_plan_after_unlock(cell);
        if let Err(e) = placement.apply(&plan) {
            warn!(
                "Boundary update after unlock of {} by {} failed: {}",
                cell, agent, e
            );
        }
    }

    /// Re-derive every marker from scratch for a newly connected agent.
    pub fn initialize_boundaries_for_agent<P: BoundaryPlacement + ?Sized>(
        &mut self,
        placement: &mut P,
        agent: &AgentId,
    ) {
        if let Err(e) = placement.clear_all() {
            warn!("Clearing boundaries for {} failed: {}", agent, e);
            return;
        }
        let plan = BoundaryPlan::surrounding(self.areas());
        debug!("Initializing {} boundary edge(s) for {}", plan.mark.len(), agent);
        if let Err(e) = placement.apply(&plan) {
            warn!("Initializing boundaries for {} failed: {}", agent, e);
        }
    }

    fn insert_unlocked(&mut self, cell: CellAddress, agent: Option<AgentId>, forced: bool) -> bool {
        if !self.unlocked.insert(cell) {
            return false;
        }
        self.records.insert(cell, UnlockRecord::new(cell, agent, forced));
        self.index.invalidate();
        true
    }
}
