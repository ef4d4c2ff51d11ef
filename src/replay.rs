//! Drive a [`TerritoryEngine`] from a JSON-lines script of host events.
//!
//! Each non-empty line that does not start with `#` is one event:
//!
//! ```text
//! {"event":"join","agent":"6f1c...","name":"steve","x":8,"z":8}
//! {"event":"achievement","agent":"6f1c...","id":"minecraft:story/smelt_iron","frame":"task"}
//! {"event":"unlock","agent":"6f1c...","cell_x":2,"cell_z":0}
//! {"event":"move","agent":"6f1c...","x":200,"z":8}
//! {"event":"tick","tick":0,"until":200}
//! {"event":"transfer","agent":"6f1c...","dimension":"minecraft:overworld","x":-40,"z":12}
//! {"event":"leave","agent":"6f1c..."}
//! ```
//!
//! Positions (`x`, `z`) are block coordinates; `cell_x`/`cell_z` are cell coordinates.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::fs;

use crate::territory::{
    AchievementEvent, AchievementFrame, AgentId, AgentSnapshot, CellAddress, Dimension,
    RecordingHost, TerritoryEngine, TickReport,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Join {
        agent: AgentId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        dimension: Option<String>,
        x: i64,
        z: i64,
    },
    Leave {
        agent: AgentId,
    },
    Move {
        agent: AgentId,
        x: i64,
        z: i64,
        #[serde(default)]
        spectator: Option<bool>,
    },
    Tick {
        tick: u64,
        /// Run every tick from `tick` through `until` inclusive.
        #[serde(default)]
        until: Option<u64>,
    },
    Transfer {
        agent: AgentId,
        dimension: String,
        x: i64,
        z: i64,
    },
    Achievement {
        agent: AgentId,
        id: String,
        #[serde(default)]
        criterion: String,
        #[serde(default)]
        frame: Option<AchievementFrame>,
        #[serde(default)]
        automated: bool,
    },
    Unlock {
        agent: AgentId,
        cell_x: i32,
        cell_z: i32,
    },
}

/// Totals printed after a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub ticks: u64,
    pub unlocked_cells: usize,
    pub areas: usize,
    pub penalties_applied: u64,
    pub warnings: usize,
    pub credits_awarded: u64,
    pub messages: usize,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Events replayed:   {}", self.events)?;
        writeln!(f, "Ticks simulated:   {}", self.ticks)?;
        writeln!(f, "Unlocked cells:    {}", self.unlocked_cells)?;
        writeln!(f, "Playable areas:    {}", self.areas)?;
        writeln!(f, "Penalties applied: {}", self.penalties_applied)?;
        writeln!(f, "Warnings sent:     {}", self.warnings)?;
        writeln!(f, "Credits awarded:   {}", self.credits_awarded)?;
        write!(f, "Messages sent:     {}", self.messages)
    }
}

/// Engine plus an in-process host and the set of online agents.
pub struct ReplaySession {
    engine: TerritoryEngine,
    host: RecordingHost,
    online: BTreeMap<AgentId, AgentSnapshot>,
    summary: ReplaySummary,
}

impl ReplaySession {
    pub fn new(engine: TerritoryEngine) -> Self {
        Self {
            engine,
            host: RecordingHost::new(),
            online: BTreeMap::new(),
            summary: ReplaySummary::default(),
        }
    }

    pub fn engine(&self) -> &TerritoryEngine {
        &self.engine
    }

    pub fn host(&self) -> &RecordingHost {
        &self.host
    }

    pub fn online(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.online.values()
    }

    pub fn apply(&mut self, event: HostEvent) -> Result<()> {
        self.summary.events += 1;
        match event {
            HostEvent::Join {
                agent,
                name,
                dimension,
                x,
                z,
            } => {
                let dimension = dimension
                    .map(Dimension::new)
                    .unwrap_or_else(|| Dimension::new(self.engine.config().territory.primary_dimension.clone()));
                let name = name.unwrap_or_else(|| agent.to_string());
                let snapshot =
                    AgentSnapshot::new(agent, &name, dimension, CellAddress::from_block(x, z));
                let provisioned = self.engine.on_agent_join(&mut self.host, &snapshot)?;
                info!(
                    "{} joined at {} ({} spawn cell(s) provisioned)",
                    name,
                    snapshot.cell,
                    provisioned.len()
                );
                self.online.insert(agent, snapshot);
            }
            HostEvent::Leave { agent } => {
                self.engine.on_agent_leave(&agent);
                if self.online.remove(&agent).is_none() {
                    warn!("Leave for unknown agent {}", agent);
                }
            }
            HostEvent::Move {
                agent,
                x,
                z,
                spectator,
            } => {
                let snapshot = self.online_mut(&agent)?;
                snapshot.cell = CellAddress::from_block(x, z);
                if let Some(spectator) = spectator {
                    snapshot.spectator = spectator;
                }
                debug!("{} moved to {}", snapshot.name, snapshot.cell);
            }
            HostEvent::Tick { tick, until } => {
                let end = until.unwrap_or(tick).max(tick);
                let agents: Vec<AgentSnapshot> = self.online.values().cloned().collect();
                for t in tick..=end {
                    let report = self.engine.on_tick(&mut self.host, t, &agents);
                    self.record_tick(report);
                }
            }
            HostEvent::Transfer {
                agent,
                dimension,
                x,
                z,
            } => {
                let destination = Dimension::new(dimension);
                let snapshot = {
                    let snapshot = self.online_mut(&agent)?;
                    snapshot.dimension = destination.clone();
                    snapshot.cell = CellAddress::from_block(x, z);
                    snapshot.clone()
                };
                let outcome =
                    self.engine
                        .on_dimension_transfer(&mut self.host, &snapshot, &destination)?;
                info!("{} transferred to {}: {:?}", snapshot.name, destination, outcome);
            }
            HostEvent::Achievement {
                agent,
                id,
                criterion,
                frame,
                automated,
            } => {
                let event = AchievementEvent {
                    agent,
                    achievement_id: id,
                    criterion,
                    frame,
                    automated,
                };
                let awarded = self.engine.on_achievement_completed(&mut self.host, &event)?;
                self.summary.credits_awarded += awarded as u64;
            }
            HostEvent::Unlock {
                agent,
                cell_x,
                cell_z,
            } => {
                let cell = CellAddress::new(cell_x, cell_z);
                let outcome = self.engine.unlock(&mut self.host, &agent, cell)?;
                info!("Unlock {} by {}: {:?}", cell, agent, outcome);
            }
        }
        Ok(())
    }

    fn online_mut(&mut self, agent: &AgentId) -> Result<&mut AgentSnapshot> {
        self.online
            .get_mut(agent)
            .ok_or_else(|| anyhow!("agent {} is not online", agent))
    }

    fn record_tick(&mut self, report: TickReport) {
        self.summary.ticks += 1;
        self.summary.warnings += report.warned;
    }

    /// Save pending state and return the totals.
    pub fn finish(mut self) -> Result<ReplaySummary> {
        self.engine.shutdown()?;
        let mut summary = self.summary;
        summary.unlocked_cells = self.engine.manager().unlocked_count();
        summary.areas = self.engine.areas().len();
        summary.penalties_applied = self.host.applied;
        summary.messages = self.host.messages.len();
        Ok(summary)
    }
}

/// Parse a script. Blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<Vec<HostEvent>> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: HostEvent = serde_json::from_str(line)
            .map_err(|e| anyhow!("Invalid event on line {}: {}", idx + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

pub async fn run_script(engine: TerritoryEngine, path: &str) -> Result<ReplaySummary> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read replay script {}: {}", path, e))?;
    let events = parse_script(&text)?;
    info!("Replaying {} event(s) from {}", events.len(), path);

    let mut session = ReplaySession::new(engine);
    for (idx, event) in events.into_iter().enumerate() {
        session
            .apply(event)
            .map_err(|e| anyhow!("Replay event #{} failed: {}", idx + 1, e))?;
    }
    session.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const AGENT: &str = "6f1c2a8e-0d4b-4c61-9a2e-3f5d7b9c1e20";

    #[test]
    fn parses_events_and_skips_comments() {
        let script = format!(
            "# setup\n\n{{\"event\":\"join\",\"agent\":\"{a}\",\"x\":8,\"z\":8}}\n{{\"event\":\"tick\",\"tick\":0,\"until\":40}}\n",
            a = AGENT
        );
        let events = parse_script(&script).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], HostEvent::Tick { tick: 0, until: Some(40) }));
    }

    #[test]
    fn bad_line_reports_line_number() {
        let err = parse_script("\n{\"event\":\"warp\"}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn session_runs_join_earn_unlock() {
        let agent: AgentId = AGENT.parse().unwrap();
        let script = format!(
            concat!(
                "{{\"event\":\"join\",\"agent\":\"{a}\",\"name\":\"steve\",\"x\":0,\"z\":0}}\n",
                "{{\"event\":\"achievement\",\"agent\":\"{a}\",\"id\":\"minecraft:story/smelt_iron\",\"frame\":\"task\"}}\n",
                "{{\"event\":\"unlock\",\"agent\":\"{a}\",\"cell_x\":2,\"cell_z\":0}}\n",
                "{{\"event\":\"move\",\"agent\":\"{a}\",\"x\":160,\"z\":0}}\n",
                "{{\"event\":\"tick\",\"tick\":0,\"until\":100}}\n"
            ),
            a = AGENT
        );
        let engine = TerritoryEngine::in_memory(Config::default()).unwrap();
        let mut session = ReplaySession::new(engine);
        for event in parse_script(&script).unwrap() {
            session.apply(event).unwrap();
        }
        assert!(session.engine().is_unlocked_globally(&CellAddress::new(2, 0)));
        assert!(session.host().penalized.contains(&agent));

        let summary = session.finish().unwrap();
        assert_eq!(summary.unlocked_cells, 5);
        assert_eq!(summary.areas, 1);
        assert_eq!(summary.credits_awarded, 1);
        assert_eq!(summary.ticks, 101);
        // warnings at tick 0 and tick 100
        assert_eq!(summary.warnings, 2);
    }
}
