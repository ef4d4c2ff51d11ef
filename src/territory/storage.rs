use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use log::{debug, warn};
use sled::IVec;
use uuid::Uuid;

use crate::territory::errors::TerritoryError;
use crate::territory::types::{
    AgentId, AgentProgress, CellAddress, UnlockRecord, AGENT_SCHEMA_VERSION, CELL_SCHEMA_VERSION,
};

const TREE_CELLS: &str = "territory_cells";
const TREE_AGENTS: &str = "territory_agents";

/// Everything needed to rebuild territory state at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerritorySnapshot {
    pub unlocked: Vec<UnlockRecord>,
    pub agents: HashMap<AgentId, AgentProgress>,
}

impl TerritorySnapshot {
    pub fn unlocked_cells(&self) -> BTreeSet<CellAddress> {
        self.unlocked.iter().map(|r| r.cell).collect()
    }
}

/// Backing store the engine loads from at startup and saves to after changes.
pub trait SnapshotStore {
    fn load_snapshot(&self) -> Result<TerritorySnapshot, TerritoryError>;

    fn save_snapshot(&self, snapshot: &TerritorySnapshot) -> Result<(), TerritoryError>;
}

pub struct TerritoryStore {
    _db: sled::Db,
    cells: sled::Tree,
    agents: sled::Tree,
}

impl TerritoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TerritoryError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let cells = db.open_tree(TREE_CELLS)?;
        let agents = db.open_tree(TREE_AGENTS)?;
        Ok(Self {
            _db: db,
            cells,
            agents,
        })
    }

    fn cell_key(cell: &CellAddress) -> Vec<u8> {
        format!("cells:{}:{}", cell.x, cell.z).into_bytes()
    }

    fn agent_key(agent: &AgentId) -> Vec<u8> {
        format!("agents:{}", agent).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, TerritoryError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, TerritoryError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    pub fn put_cell(&self, mut record: UnlockRecord) -> Result<(), TerritoryError> {
        record.schema_version = CELL_SCHEMA_VERSION;
        let key = Self::cell_key(&record.cell);
        let bytes = Self::serialize(&record)?;
        self.cells.insert(key, bytes)?;
        self.cells.flush()?;
        Ok(())
    }

    pub fn get_cell(&self, cell: &CellAddress) -> Result<Option<UnlockRecord>, TerritoryError> {
        let Some(bytes) = self.cells.get(Self::cell_key(cell))? else {
            return Ok(None);
        };
        Ok(Some(Self::check_cell(Self::deserialize(bytes)?)?))
    }

    pub fn list_cells(&self) -> Result<Vec<UnlockRecord>, TerritoryError> {
        let mut records = Vec::new();
        for entry in self.cells.scan_prefix(b"cells:") {
            let (_, bytes) = entry?;
            records.push(Self::check_cell(Self::deserialize(bytes)?)?);
        }
        Ok(records)
    }

    fn check_cell(record: UnlockRecord) -> Result<UnlockRecord, TerritoryError> {
        if record.schema_version != CELL_SCHEMA_VERSION {
            return Err(TerritoryError::SchemaMismatch {
                entity: "cell",
                expected: CELL_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn put_agent(&self, agent: &AgentId, progress: &AgentProgress) -> Result<(), TerritoryError> {
        let mut progress = progress.clone();
        progress.schema_version = AGENT_SCHEMA_VERSION;
        let bytes = Self::serialize(&progress)?;
        self.agents.insert(Self::agent_key(agent), bytes)?;
        self.agents.flush()?;
        Ok(())
    }

    pub fn get_agent(&self, agent: &AgentId) -> Result<Option<AgentProgress>, TerritoryError> {
        let Some(bytes) = self.agents.get(Self::agent_key(agent))? else {
            return Ok(None);
        };
        Ok(Some(Self::check_agent(Self::deserialize(bytes)?)?))
    }

    pub fn list_agents(&self) -> Result<HashMap<AgentId, AgentProgress>, TerritoryError> {
        let mut agents = HashMap::new();
        for entry in self.agents.scan_prefix(b"agents:") {
            let (key, bytes) = entry?;
            let text = String::from_utf8_lossy(&key);
            let Some(id) = text.strip_prefix("agents:").and_then(|s| Uuid::parse_str(s).ok()) else {
                warn!("Skipping agent record with malformed key {}", text);
                continue;
            };
            agents.insert(id, Self::check_agent(Self::deserialize(bytes)?)?);
        }
        Ok(agents)
    }

    fn check_agent(progress: AgentProgress) -> Result<AgentProgress, TerritoryError> {
        if progress.schema_version != AGENT_SCHEMA_VERSION {
            return Err(TerritoryError::SchemaMismatch {
                entity: "agent",
                expected: AGENT_SCHEMA_VERSION,
                found: progress.schema_version,
            });
        }
        Ok(progress)
    }

    pub fn load_snapshot(&self) -> Result<TerritorySnapshot, TerritoryError> {
        let snapshot = TerritorySnapshot {
            unlocked: self.list_cells()?,
            agents: self.list_agents()?,
        };
        debug!(
            "Loaded territory snapshot: {} cells, {} agents",
            snapshot.unlocked.len(),
            snapshot.agents.len()
        );
        Ok(snapshot)
    }

    /// Upsert every record in the snapshot, then flush once per tree.
    pub fn save_snapshot(&self, snapshot: &TerritorySnapshot) -> Result<(), TerritoryError> {
        let mut cells = sled::Batch::default();
        for record in &snapshot.unlocked {
            let mut record = record.clone();
            record.schema_version = CELL_SCHEMA_VERSION;
            cells.insert(Self::cell_key(&record.cell), Self::serialize(&record)?);
        }
        let mut agents = sled::Batch::default();
        for (id, progress) in &snapshot.agents {
            let mut progress = progress.clone();
            progress.schema_version = AGENT_SCHEMA_VERSION;
            agents.insert(Self::agent_key(id), Self::serialize(&progress)?);
        }
        self.cells.apply_batch(cells)?;
        self.agents.apply_batch(agents)?;
        self.cells.flush()?;
        self.agents.flush()?;
        debug!(
            "Saved territory snapshot: {} cells, {} agents",
            snapshot.unlocked.len(),
            snapshot.agents.len()
        );
        Ok(())
    }
}

impl SnapshotStore for TerritoryStore {
    fn load_snapshot(&self) -> Result<TerritorySnapshot, TerritoryError> {
        TerritoryStore::load_snapshot(self)
    }

    fn save_snapshot(&self, snapshot: &TerritorySnapshot) -> Result<(), TerritoryError> {
        TerritoryStore::save_snapshot(self, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cell_and_agent_records_persist() {
        let dir = TempDir::new().unwrap();
        let agent = Uuid::new_v4();
        {
            let store = TerritoryStore::open(dir.path()).unwrap();
            store
                .put_cell(UnlockRecord::new(CellAddress::new(-4, 9), Some(agent), false))
                .unwrap();
            store.put_agent(&agent, &AgentProgress::with_credits(3)).unwrap();
        }
        let store = TerritoryStore::open(dir.path()).unwrap();
        let snapshot = store.load_snapshot().unwrap();
        assert!(snapshot.unlocked_cells().contains(&CellAddress::new(-4, 9)));
        assert_eq!(snapshot.agents[&agent].available_credits, 3);
        assert!(store.get_cell(&CellAddress::new(0, 0)).unwrap().is_none());
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = TerritoryStore::open(dir.path()).unwrap();
        let mut record = UnlockRecord::new(CellAddress::new(1, 1), None, true);
        record.schema_version = CELL_SCHEMA_VERSION + 1;
        let bytes = bincode::serialize(&record).unwrap();
        store
            .cells
            .insert(TerritoryStore::cell_key(&record.cell), bytes)
            .unwrap();
        assert!(matches!(
            store.list_cells(),
            Err(TerritoryError::SchemaMismatch { entity: "cell", .. })
        ));
    }
}
