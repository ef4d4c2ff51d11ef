//! Per-agent unlock credits earned from achievements.

use std::collections::HashMap;

use log::{debug, info};

use crate::config::RewardsConfig;
use crate::metrics;
use crate::territory::errors::TerritoryError;
use crate::territory::types::{
    ensure_agent, AchievementEvent, AchievementFrame, AgentId, AgentProgress,
};

const RECIPE_MARKER: &str = ":recipes/";

/// Credit balances plus the reward rules that feed them.
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    agents: HashMap<AgentId, AgentProgress>,
    rewards: RewardsConfig,
}

impl CreditLedger {
    pub fn new(rewards: RewardsConfig) -> Self {
        Self {
            agents: HashMap::new(),
            rewards,
        }
    }

    pub fn with_agents(rewards: RewardsConfig, agents: HashMap<AgentId, AgentProgress>) -> Self {
        Self { agents, rewards }
    }

    /// Replace the reward tables wholesale. Balances are untouched.
    pub fn load_config(&mut self, rewards: RewardsConfig) {
        info!(
            "Reward config loaded: mode={:?}, {} custom rewards, {} blacklisted",
            rewards.mode,
            rewards.custom_rewards.len(),
            rewards.blacklist.len()
        );
        self.rewards = rewards;
    }

    pub fn rewards(&self) -> &RewardsConfig {
        &self.rewards
    }

    pub fn available_credits(&self, agent: &AgentId) -> u32 {
        self.agents
            .get(agent)
            .map(|p| p.available_credits)
            .unwrap_or(0)
    }

    pub fn total_completed(&self, agent: &AgentId) -> u32 {
        self.agents
            .get(agent)
            .map(|p| p.total_completed)
            .unwrap_or(0)
    }

    pub fn progress(&self, agent: &AgentId) -> Option<&AgentProgress> {
        self.agents.get(agent)
    }

    pub fn agents(&self) -> &HashMap<AgentId, AgentProgress> {
        &self.agents
    }

    /// Credits an achievement would be worth ignoring whether it was already rewarded.
    pub fn credit_amount(&self, achievement_id: &str, frame: Option<AchievementFrame>) -> u32 {
        if achievement_id.contains(RECIPE_MARKER) || self.rewards.is_blacklisted(achievement_id) {
            return 0;
        }
        let Some(frame) = frame else {
            return 0;
        };
        match self.rewards.mode.credit_multiplier(frame) {
            Some(amount) => amount,
            None => self
                .rewards
                .custom_rewards
                .get(achievement_id)
                .copied()
                .unwrap_or(self.rewards.default_credits),
        }
    }

    /// Award credits for a completed achievement. Returns the amount awarded (0 when not eligible).
    pub fn on_achievement_completed(
        &mut self,
        event: &AchievementEvent,
    ) -> Result<u32, TerritoryError> {
        ensure_agent(&event.agent)?;

        if event.automated {
            debug!(
                "Ignoring achievement {} from automated actor {}",
                event.achievement_id, event.agent
            );
            return Ok(0);
        }

        let amount = self.credit_amount(&event.achievement_id, event.frame);
        if amount == 0 {
            return Ok(0);
        }

        let progress = self.agents.entry(event.agent).or_default();
        if progress.has_received_reward(&event.achievement_id) {
            debug!(
                "Agent {} already rewarded for {}",
                event.agent, event.achievement_id
            );
            return Ok(0);
        }

        progress.add_credits(amount)?;
        progress.mark_rewarded(&event.achievement_id);
        metrics::add_credits_awarded(amount);
        info!(
            "Agent {} earned {} credit(s) for {} (balance {})",
            event.agent, amount, event.achievement_id, progress.available_credits
        );
        Ok(amount)
    }

    /// Returns the new balance.
    pub fn add_credits(&mut self, agent: &AgentId, amount: u32) -> Result<u32, TerritoryError> {
        ensure_agent(agent)?;
        let progress = self.agents.entry(*agent).or_default();
        progress.add_credits(amount)?;
        Ok(progress.available_credits)
    }

    pub fn set_credits(&mut self, agent: &AgentId, amount: u32) -> Result<(), TerritoryError> {
        ensure_agent(agent)?;
        let progress = self.agents.entry(*agent).or_default();
        progress.available_credits = amount;
        progress.touch();
        Ok(())
    }

    /// Debit `amount`. Returns `Ok(false)` with no change when the balance is short.
    pub fn spend(&mut self, agent: &AgentId, amount: u32) -> Result<bool, TerritoryError> {
        ensure_agent(agent)?;
        match self.agents.get_mut(agent) {
            Some(progress) => Ok(progress.spend(amount)),
            None => Ok(amount == 0),
        }
    }
}
