use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::territory::errors::TerritoryError;

pub const AGENT_SCHEMA_VERSION: u8 = 1;
pub const CELL_SCHEMA_VERSION: u8 = 1;

/// Largest absolute cell coordinate inside the world border (30M blocks / 16).
pub const WORLD_CELL_LIMIT: i32 = 1_875_000;

/// Dimension id used when the configuration does not name one.
pub const DEFAULT_PRIMARY_DIMENSION: &str = "minecraft:overworld";

/// Agents are identified by UUID; the nil UUID is never a valid agent.
pub type AgentId = Uuid;

/// Reject the nil UUID before it reaches any state-mutating operation.
pub fn ensure_agent(agent: &AgentId) -> Result<(), TerritoryError> {
    if agent.is_nil() {
        return Err(TerritoryError::InvalidAgent);
    }
    Ok(())
}

/// Address of one grid cell ("chunk") on the horizontal plane.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellAddress {
    pub x: i32,
    pub z: i32,
}

impl CellAddress {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell containing the given block coordinates (16 blocks per cell side).
    pub fn from_block(block_x: i64, block_z: i64) -> Self {
        Self {
            x: (block_x >> 4) as i32,
            z: (block_z >> 4) as i32,
        }
    }

    /// The four edge-sharing neighbours in north, south, east, west order.
    pub fn neighbors(&self) -> [CellAddress; 4] {
        [
            CellAddress::new(self.x, self.z.wrapping_sub(1)),
            CellAddress::new(self.x, self.z.wrapping_add(1)),
            CellAddress::new(self.x.wrapping_add(1), self.z),
            CellAddress::new(self.x.wrapping_sub(1), self.z),
        ]
    }

    /// True when the two cells share an edge. Diagonals do not count.
    pub fn is_adjacent(&self, other: &CellAddress) -> bool {
        let dx = (self.x as i64 - other.x as i64).abs();
        let dz = (self.z as i64 - other.z as i64).abs();
        dx + dz == 1
    }

    pub fn is_in_world(&self) -> bool {
        self.x.unsigned_abs() <= WORLD_CELL_LIMIT as u32 && self.z.unsigned_abs() <= WORLD_CELL_LIMIT as u32
    }

    /// Returns the cell unchanged if it lies inside the world border.
    pub fn validate(self) -> Result<Self, TerritoryError> {
        if self.is_in_world() {
            Ok(self)
        } else {
            Err(TerritoryError::InvalidCell(self))
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Undirected boundary between two edge-adjacent cells, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellEdge {
    pub a: CellAddress,
    pub b: CellAddress,
}

impl CellEdge {
    /// Build the edge between two cells, or `None` if they are not 4-adjacent.
    pub fn between(first: CellAddress, second: CellAddress) -> Option<Self> {
        if !first.is_adjacent(&second) {
            return None;
        }
        let (a, b) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        Some(Self { a, b })
    }

    pub fn touches(&self, cell: &CellAddress) -> bool {
        self.a == *cell || self.b == *cell
    }
}

impl fmt::Display for CellEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.a, self.b)
    }
}

/// Namespaced dimension identifier, e.g. `minecraft:the_nether`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimension(String);

impl Dimension {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn overworld() -> Self {
        Self::new(DEFAULT_PRIMARY_DIMENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the host knows about a connected agent at the moment of a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub dimension: Dimension,
    pub cell: CellAddress,
    /// Despawned or otherwise removed from the world this tick.
    pub removed: bool,
    /// Non-corporeal observer mode; never penalized.
    pub spectator: bool,
}

impl AgentSnapshot {
    pub fn new(id: AgentId, name: &str, dimension: Dimension, cell: CellAddress) -> Self {
        Self {
            id,
            name: name.to_string(),
            dimension,
            cell,
            removed: false,
            spectator: false,
        }
    }
}

/// Cosmetic frame of an achievement; drives credit multipliers in the active modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementFrame {
    Task,
    Goal,
    Challenge,
}

/// World difficulty mode, fixed at world creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardMode {
    /// Credits come from the configured reward table.
    #[default]
    Disabled,
    /// Generous frame-based rewards.
    Easy,
    /// Strict frame-based rewards.
    Extreme,
}

impl RewardMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, RewardMode::Disabled)
    }

    /// Frame-based credit amount, or `None` when the config table applies.
    pub fn credit_multiplier(&self, frame: AchievementFrame) -> Option<u32> {
        match (self, frame) {
            (RewardMode::Disabled, _) => None,
            (RewardMode::Easy, AchievementFrame::Task) => Some(1),
            (RewardMode::Easy, AchievementFrame::Goal) => Some(5),
            (RewardMode::Easy, AchievementFrame::Challenge) => Some(10),
            (RewardMode::Extreme, AchievementFrame::Task) => Some(1),
            (RewardMode::Extreme, AchievementFrame::Goal) => Some(2),
            (RewardMode::Extreme, AchievementFrame::Challenge) => Some(5),
        }
    }
}

/// One completed achievement as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementEvent {
    pub agent: AgentId,
    pub achievement_id: String,
    #[serde(default)]
    pub criterion: String,
    #[serde(default)]
    pub frame: Option<AchievementFrame>,
    /// Completed by a non-interactive automated actor (fake player, test harness).
    #[serde(default)]
    pub automated: bool,
}

impl AchievementEvent {
    pub fn new(agent: AgentId, achievement_id: &str, frame: Option<AchievementFrame>) -> Self {
        Self {
            agent,
            achievement_id: achievement_id.to_string(),
            criterion: String::new(),
            frame,
            automated: false,
        }
    }
}

/// Audit record for one unlocked cell. Membership itself is agent-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub cell: CellAddress,
    /// Agent whose action unlocked the cell; `None` for admin or imported unlocks.
    pub unlocked_by: Option<AgentId>,
    /// Unlocked without spending a credit.
    pub forced: bool,
    pub unlocked_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UnlockRecord {
    pub fn new(cell: CellAddress, unlocked_by: Option<AgentId>, forced: bool) -> Self {
        Self {
            cell,
            unlocked_by,
            forced,
            unlocked_at: Utc::now(),
            schema_version: CELL_SCHEMA_VERSION,
        }
    }
}

/// Credit balance and reward history for a single agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProgress {
    pub available_credits: u32,
    pub total_completed: u32,
    pub rewarded: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl Default for AgentProgress {
    fn default() -> Self {
        Self {
            available_credits: 0,
            total_completed: 0,
            rewarded: BTreeSet::new(),
            updated_at: Utc::now(),
            schema_version: AGENT_SCHEMA_VERSION,
        }
    }
}

impl AgentProgress {
    pub fn with_credits(credits: u32) -> Self {
        Self {
            available_credits: credits,
            ..Self::default()
        }
    }

    pub fn has_received_reward(&self, achievement_id: &str) -> bool {
        self.rewarded.contains(achievement_id)
    }

    /// Record a rewarded achievement. Marking twice does not double count.
    pub fn mark_rewarded(&mut self, achievement_id: &str) {
        if self.rewarded.insert(achievement_id.to_string()) {
            self.total_completed = self.total_completed.saturating_add(1);
        }
        self.touch();
    }

    pub fn add_credits(&mut self, amount: u32) -> Result<(), TerritoryError> {
        self.available_credits = self.available_credits.checked_add(amount).ok_or_else(|| {
            TerritoryError::InvalidCredits(format!(
                "adding {} to {} overflows",
                amount, self.available_credits
            ))
        })?;
        self.touch();
        Ok(())
    }

    /// Debit `amount` credits. Returns false, leaving the balance untouched, if it would go negative.
    pub fn spend(&mut self, amount: u32) -> bool {
        match self.available_credits.checked_sub(amount) {
            Some(rest) => {
                self.available_credits = rest;
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_block_floors_negative_coordinates() {
        assert_eq!(CellAddress::from_block(0, 15), CellAddress::new(0, 0));
        assert_eq!(CellAddress::from_block(16, -1), CellAddress::new(1, -1));
        assert_eq!(CellAddress::from_block(-16, -17), CellAddress::new(-1, -2));
    }

    #[test]
    fn adjacency_excludes_diagonals_and_self() {
        let origin = CellAddress::new(0, 0);
        assert!(origin.is_adjacent(&CellAddress::new(1, 0)));
        assert!(origin.is_adjacent(&CellAddress::new(0, -1)));
        assert!(!origin.is_adjacent(&CellAddress::new(1, 1)));
        assert!(!origin.is_adjacent(&origin));
        for n in origin.neighbors() {
            assert!(origin.is_adjacent(&n));
        }
    }

    #[test]
    fn edges_are_normalized() {
        let a = CellAddress::new(3, 4);
        let b = CellAddress::new(3, 5);
        assert_eq!(CellEdge::between(a, b), CellEdge::between(b, a));
        assert!(CellEdge::between(a, CellAddress::new(4, 5)).is_none());
    }

    #[test]
    fn validate_rejects_cells_past_world_border() {
        assert!(CellAddress::new(WORLD_CELL_LIMIT, 0).validate().is_ok());
        assert!(matches!(
            CellAddress::new(0, -WORLD_CELL_LIMIT - 1).validate(),
            Err(TerritoryError::InvalidCell(_))
        ));
    }

    #[test]
    fn spend_never_goes_negative() {
        let mut progress = AgentProgress::with_credits(1);
        assert!(progress.spend(1));
        assert!(!progress.spend(1));
        assert_eq!(progress.available_credits, 0);
    }

    #[test]
    fn frame_multipliers_per_mode() {
        assert_eq!(RewardMode::Disabled.credit_multiplier(AchievementFrame::Goal), None);
        assert_eq!(RewardMode::Easy.credit_multiplier(AchievementFrame::Challenge), Some(10));
        assert_eq!(RewardMode::Extreme.credit_multiplier(AchievementFrame::Goal), Some(2));
    }
}
