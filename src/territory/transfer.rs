//! Automatic unlock when an agent arrives in the primary dimension.

use log::{debug, info, warn};

use crate::metrics;
use crate::territory::boundary::BoundaryPlacement;
use crate::territory::errors::TerritoryError;
use crate::territory::host::Notifier;
use crate::territory::manager::TerritoryManager;
use crate::territory::types::{AgentSnapshot, CellAddress, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    NotPrimary,
    AlreadyUnlocked,
    /// No credits to spend; the penalty scheduler takes over.
    NoCredits,
    Unlocked { cell: CellAddress, remaining: u32 },
    /// Credits were seen but the unlock was refused anyway.
    Raced,
}

#[derive(Debug, Clone)]
pub struct DimensionTransferHandler {
    primary: Dimension,
}

impl DimensionTransferHandler {
    pub fn new(primary: Dimension) -> Self {
        Self { primary }
    }

    pub fn primary(&self) -> &Dimension {
        &self.primary
    }

    /// `agent` must already reflect the post-transfer position.
    pub fn on_dimension_transfer<H>(
        &self,
        manager: &mut TerritoryManager,
        host: &mut H,
        agent: &AgentSnapshot,
        destination: &Dimension,
    ) -> Result<TransferOutcome, TerritoryError>
    where
        H: BoundaryPlacement + Notifier + ?Sized,
    {
        if *destination != self.primary {
            return Ok(TransferOutcome::NotPrimary);
        }

        let cell = agent.cell;
        if manager.is_unlocked_globally(&cell) {
            debug!("{} arrived in unlocked cell {}", agent.name, cell);
            return Ok(TransferOutcome::AlreadyUnlocked);
        }
        if manager.available_credits(&agent.id) == 0 {
            debug!("{} arrived in locked cell {} with no credits", agent.name, cell);
            return Ok(TransferOutcome::NoCredits);
        }

        if !manager.try_unlock(&agent.id, cell)? {
            warn!(
                "Transfer unlock of {} for {} refused despite available credits",
                cell, agent.name
            );
            return Ok(TransferOutcome::Raced);
        }

        manager.update_boundaries_after_unlock(host, &agent.id, cell);
        let remaining = manager.available_credits(&agent.id);
        metrics::inc_transfer_unlocks();
        info!(
            "{} unlocked {} on arrival in {} ({} credits left)",
            agent.name, cell, destination, remaining
        );
        let message = format!(
            "Unlocked chunk {} on arrival! Remaining credits: {}",
            cell, remaining
        );
        if let Err(e) = host.send_message(&agent.id, &message) {
            warn!("Unlock notification to {} failed: {}", agent.name, e);
        }
        Ok(TransferOutcome::Unlocked { cell, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardsConfig;
    use crate::territory::host::RecordingHost;
    use crate::territory::ledger::CreditLedger;
    use uuid::Uuid;

    fn agent_at(cell: CellAddress) -> AgentSnapshot {
        AgentSnapshot::new(Uuid::new_v4(), "alex", Dimension::overworld(), cell)
    }

    #[test]
    fn unlocks_destination_and_notifies() {
        let handler = DimensionTransferHandler::new(Dimension::overworld());
        let agent = agent_at(CellAddress::new(7, -3));
        let mut manager = TerritoryManager::new(CreditLedger::new(RewardsConfig::default()));
        manager.ledger_mut().set_credits(&agent.id, 2).unwrap();
        let mut host = RecordingHost::new();

        let outcome = handler
            .on_dimension_transfer(&mut manager, &mut host, &agent, &Dimension::overworld())
            .unwrap();
        assert_eq!(
            outcome,
            TransferOutcome::Unlocked {
                cell: agent.cell,
                remaining: 1
            }
        );
        assert_eq!(host.boundaries.edges().len(), 4);
        assert_eq!(host.messages.len(), 1);
        assert!(host.messages[0].1.contains("Remaining credits: 1"));
    }

    #[test]
    fn no_ops_leave_state_alone() {
        let handler = DimensionTransferHandler::new(Dimension::overworld());
        let agent = agent_at(CellAddress::new(0, 0));
        let mut manager = TerritoryManager::new(CreditLedger::new(RewardsConfig::default()));
        let mut host = RecordingHost::new();

        let nether = Dimension::new("minecraft:the_nether");
        assert_eq!(
            handler
                .on_dimension_transfer(&mut manager, &mut host, &agent, &nether)
                .unwrap(),
            TransferOutcome::NotPrimary
        );
        assert_eq!(
            handler
                .on_dimension_transfer(&mut manager, &mut host, &agent, &Dimension::overworld())
                .unwrap(),
            TransferOutcome::NoCredits
        );

        manager.force_unlock(None, agent.cell).unwrap();
        manager.ledger_mut().set_credits(&agent.id, 3).unwrap();
        assert_eq!(
            handler
                .on_dimension_transfer(&mut manager, &mut host, &agent, &Dimension::overworld())
                .unwrap(),
            TransferOutcome::AlreadyUnlocked
        );
        assert_eq!(manager.available_credits(&agent.id), 3);
        assert!(host.messages.is_empty());
    }
}
