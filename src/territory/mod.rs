//! Chunk territory engine.
//!
//! Tracks which grid cells are unlocked, groups them into playable areas, gates
//! unlocking behind per-agent credits and penalizes agents who linger in locked
//! territory without any.

pub mod area;
pub mod boundary;
pub mod connectivity;
pub mod engine;
pub mod errors;
pub mod host;
pub mod ledger;
pub mod manager;
pub mod penalty;
pub mod storage;
pub mod sync;
pub mod transfer;
pub mod types;

pub use area::PlayableArea;
pub use boundary::{BoundaryPlacement, BoundaryPlan, MarkedEdges};
pub use connectivity::{ConnectivityIndex, ConnectivityStats};
pub use engine::{TerritoryEngine, UnlockOutcome};
pub use errors::TerritoryError;
pub use host::{AgentEffects, Notifier, PenaltyEffect, RecordingHost, TerritoryHost};
pub use ledger::CreditLedger;
pub use manager::{TerritoryManager, MAX_SPAWN_AREA_SIZE, UNLOCK_COST};
pub use penalty::{PenaltyOutcome, PenaltyScheduler, PenaltyTracker, TickReport};
pub use storage::{SnapshotStore, TerritorySnapshot, TerritoryStore};
pub use sync::{push_sync, ChannelSync, CreditSync, SyncTransport};
pub use transfer::{DimensionTransferHandler, TransferOutcome};
pub use types::{
    AchievementEvent, AchievementFrame, AgentId, AgentProgress, AgentSnapshot, CellAddress,
    CellEdge, Dimension, RewardMode, UnlockRecord,
};
