//! # Configuration Management Module
//!
//! Configuration for the chunkgate territory engine, loaded from a TOML file with
//! defaults for every section.
//!
//! ## Configuration Structure
//!
//! - [`TerritoryConfig`] - Primary dimension, spawn provisioning, manual unlock rules
//! - [`PenaltyConfig`] - Tick intervals for the locked-cell penalty scheduler
//! - [`RewardsConfig`] - Achievement reward mode, tables and blacklist
//! - [`StorageConfig`] - Data persistence settings
//! - [`LoggingConfig`] - Logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chunkgate::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("chunkgate.toml").await?;
//!     let config = Config::load("chunkgate.toml").await?;
//!     println!("Primary dimension: {}", config.territory.primary_dimension);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [territory]
//! primary_dimension = "minecraft:overworld"
//! spawn_area_size = 2
//! require_adjacent_for_manual = true
//!
//! [penalty]
//! check_interval_ticks = 20
//! reapply_log_interval_ticks = 60
//! warning_interval_ticks = 100
//! effect_duration_ticks = 20
//! effect_amplifier = 1
//!
//! [rewards]
//! mode = "disabled"
//! default_credits = 1
//! blacklist = ["minecraft:story/root"]
//!
//! [rewards.custom_rewards]
//! "minecraft:adventure/adventuring_time" = 20
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::territory::errors::TerritoryError;
use crate::territory::manager::MAX_SPAWN_AREA_SIZE;
use crate::territory::types::{RewardMode, DEFAULT_PRIMARY_DIMENSION};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub territory: TerritoryConfig,
    #[serde(default)]
    pub penalty: PenaltyConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryConfig {
    /// Dimension in which territory and penalty rules apply.
    #[serde(default = "default_primary_dimension")]
    pub primary_dimension: String,
    /// Side length of the square force-unlocked when an agent spawns in locked territory.
    #[serde(default = "default_spawn_area_size")]
    pub spawn_area_size: u32,
    /// Manual unlocks must touch the unlocked surface once anything is unlocked.
    #[serde(default = "default_true")]
    pub require_adjacent_for_manual: bool,
}

fn default_primary_dimension() -> String {
    DEFAULT_PRIMARY_DIMENSION.to_string()
}

fn default_spawn_area_size() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            primary_dimension: default_primary_dimension(),
            spawn_area_size: default_spawn_area_size(),
            require_adjacent_for_manual: true,
        }
    }
}

/// Tick intervals for the penalty scheduler (20 ticks = 1 second).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_ticks: u64,
    /// Only throttles the reapplication debug log; the effect is refreshed every check.
    #[serde(default = "default_reapply_interval")]
    pub reapply_log_interval_ticks: u64,
    #[serde(default = "default_warning_interval")]
    pub warning_interval_ticks: u64,
    #[serde(default = "default_effect_duration")]
    pub effect_duration_ticks: u32,
    #[serde(default = "default_effect_amplifier")]
    pub effect_amplifier: u8,
}

fn default_check_interval() -> u64 {
    20
}

fn default_reapply_interval() -> u64 {
    60
}

fn default_warning_interval() -> u64 {
    100
}

fn default_effect_duration() -> u32 {
    20
}

fn default_effect_amplifier() -> u8 {
    1
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            check_interval_ticks: default_check_interval(),
            reapply_log_interval_ticks: default_reapply_interval(),
            warning_interval_ticks: default_warning_interval(),
            effect_duration_ticks: default_effect_duration(),
            effect_amplifier: default_effect_amplifier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default)]
    pub mode: RewardMode,
    /// Credits for a qualifying achievement not listed in `custom_rewards` (disabled mode).
    #[serde(default = "default_credits")]
    pub default_credits: u32,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    /// Per-achievement credit overrides (disabled mode only).
    #[serde(default)]
    pub custom_rewards: HashMap<String, u32>,
}

fn default_credits() -> u32 {
    1
}

impl Default for RewardsConfig {
    fn default() -> Self {
        let custom_rewards = [
            ("minecraft:adventure/adventuring_time", 20),
            ("minecraft:nether/explore_nether", 5),
            ("minecraft:nether/all_potions", 10),
            ("minecraft:nether/all_effects", 10),
            ("minecraft:husbandry/complete_catalogue", 5),
            ("minecraft:end/dragon_egg", 10),
            ("minecraft:nether/summon_wither", 5),
            ("minecraft:nether/obtain_ancient_debris", 3),
        ]
        .into_iter()
        .map(|(id, credits)| (id.to_string(), credits))
        .collect();

        let blacklist = [
            "minecraft:story/root",
            "minecraft:story/mine_stone",
            "minecraft:story/upgrade_tools",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            mode: RewardMode::Disabled,
            default_credits: default_credits(),
            blacklist,
            enable_notifications: true,
            custom_rewards,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file and validate it
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Config file {} rejected: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), TerritoryError> {
        self.territory.validate()?;
        self.penalty.validate()?;
        self.rewards.validate()
    }
}

impl TerritoryConfig {
    pub fn validate(&self) -> Result<(), TerritoryError> {
        if self.primary_dimension.trim().is_empty() {
            return Err(TerritoryError::InvalidConfig(
                "territory.primary_dimension must not be empty".into(),
            ));
        }
        if self.spawn_area_size == 0 || self.spawn_area_size > MAX_SPAWN_AREA_SIZE {
            return Err(TerritoryError::InvalidConfig(format!(
                "territory.spawn_area_size must be between 1 and {}",
                MAX_SPAWN_AREA_SIZE
            )));
        }
        Ok(())
    }
}

impl PenaltyConfig {
    /// Checks `C >= 1`, `C <= R < W` and `C <= duration < R`.
    pub fn validate(&self) -> Result<(), TerritoryError> {
        let c = self.check_interval_ticks;
        let r = self.reapply_log_interval_ticks;
        let w = self.warning_interval_ticks;
        let d = self.effect_duration_ticks as u64;

        if c == 0 {
            return Err(TerritoryError::InvalidConfig(
                "penalty.check_interval_ticks must be at least 1".into(),
            ));
        }
        if !(c <= r && r < w) {
            return Err(TerritoryError::InvalidConfig(format!(
                "penalty intervals must satisfy check ({}) <= reapply ({}) < warning ({})",
                c, r, w
            )));
        }
        if !(c <= d && d < r) {
            return Err(TerritoryError::InvalidConfig(format!(
                "penalty.effect_duration_ticks ({}) must be in [{}, {})",
                d, c, r
            )));
        }
        Ok(())
    }
}

impl RewardsConfig {
    pub fn validate(&self) -> Result<(), TerritoryError> {
        if self.custom_rewards.keys().any(|id| id.trim().is_empty()) {
            return Err(TerritoryError::InvalidConfig(
                "rewards.custom_rewards contains an empty achievement id".into(),
            ));
        }
        if self.blacklist.iter().any(|id| id.trim().is_empty()) {
            return Err(TerritoryError::InvalidConfig(
                "rewards.blacklist contains an empty achievement id".into(),
            ));
        }
        Ok(())
    }

    pub fn is_blacklisted(&self, achievement_id: &str) -> bool {
        self.blacklist.iter().any(|id| id == achievement_id)
    }
}
