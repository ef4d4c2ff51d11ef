use thiserror::Error;

use crate::territory::types::CellAddress;

/// Errors that can arise while operating the territory engine or its storage layer.
///
/// Insufficient credits and already-unlocked cells are ordinary outcomes and never
/// show up here; these variants are storage failures or caller contract violations.
#[derive(Debug, Error)]
pub enum TerritoryError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Cell coordinate outside the addressable world.
    #[error("invalid cell coordinate: {0}")]
    InvalidCell(CellAddress),

    /// The nil UUID was passed where a real agent is required.
    #[error("invalid agent id: nil uuid")]
    InvalidAgent,

    /// Credit arithmetic that would underflow or overflow a balance.
    #[error("invalid credit operation: {0}")]
    InvalidCredits(String),

    /// Configuration values that break scheduler or reward invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
