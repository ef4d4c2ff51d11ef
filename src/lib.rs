//! # Chunkgate - Credit-Gated Chunk Territory Engine
//!
//! Chunkgate tracks which cells ("chunks") of an unbounded 2D grid a population of
//! agents has unlocked, groups unlocked cells into contiguous playable areas, gates
//! unlocking behind per-agent credits earned from achievements, and penalizes agents
//! who linger in locked territory without credits.
//!
//! ## Features
//!
//! - **Connectivity Index**: Cached 4-neighbour connected components over the unlocked set.
//! - **Unlock State Machine**: Credit-gated unlocks, admin force unlocks and spawn provisioning.
//! - **Penalty Scheduler**: Tick-driven, per-agent throttled debuff and warning loop.
//! - **Transfer Unlocks**: Automatic unlock of the arrival cell in the primary dimension.
//! - **Persistence**: Sled-backed snapshot of unlocked cells and agent credits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chunkgate::config::Config;
//! use chunkgate::territory::{AgentSnapshot, CellAddress, Dimension, RecordingHost, TerritoryEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut engine = TerritoryEngine::in_memory(Config::default())?;
//!     let mut host = RecordingHost::new();
//!     let agent = AgentSnapshot::new(
//!         uuid::Uuid::new_v4(),
//!         "steve",
//!         Dimension::overworld(),
//!         CellAddress::from_block(8, 8),
//!     );
//!     engine.on_agent_join(&mut host, &agent)?;
//!     engine.on_tick(&mut host, 0, &[agent]);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`territory`] - Cells, areas, unlock manager, penalty scheduler, storage and engine facade
//! - [`config`] - Configuration management and validation
//! - [`replay`] - JSON-lines event replay used by the CLI
//! - [`metrics`] - Process-wide activity counters

pub mod config;
pub mod metrics;
pub mod replay;
pub mod territory;
