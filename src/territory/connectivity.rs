//! Connected-component index over the unlocked cell set.
//!
//! The index caches the last partition it computed together with the input it was
//! computed from. A call with an identical set is a cache hit; anything else, or a
//! call after [`ConnectivityIndex::invalidate`], runs a breadth-first flood fill.
//! Not thread-safe; callers own it from the simulation thread.

use std::collections::{BTreeSet, HashSet, VecDeque};

use log::debug;

use crate::metrics;
use crate::territory::area::PlayableArea;
use crate::territory::types::CellAddress;

#[derive(Debug, Default)]
pub struct ConnectivityIndex {
    snapshot: BTreeSet<CellAddress>,
    areas: Vec<PlayableArea>,
    valid: bool,
    recomputes: u64,
    hits: u64,
}

/// Cache counters, mostly for tests and the status command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityStats {
    pub recomputes: u64,
    pub hits: u64,
    pub areas: usize,
    pub valid: bool,
}

impl ConnectivityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition `unlocked` into maximal 4-connected areas.
    pub fn compute_areas(&mut self, unlocked: &BTreeSet<CellAddress>) -> &[PlayableArea] {
        if self.valid && self.snapshot.len() == unlocked.len() && self.snapshot == *unlocked {
            self.hits += 1;
            debug!("Area cache hit ({} cells, {} areas)", unlocked.len(), self.areas.len());
            return &self.areas;
        }

        debug!("Area cache miss, recomputing over {} cells", unlocked.len());
        self.areas = flood_fill(unlocked);
        self.snapshot = unlocked.clone();
        self.valid = true;
        self.recomputes += 1;
        metrics::inc_area_recomputes();
        &self.areas
    }

    /// Drop the cache; the next `compute_areas` always recomputes.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Area from the last computation whose members include `cell`.
    pub fn find_area_containing(&self, cell: &CellAddress) -> Option<&PlayableArea> {
        self.areas.iter().find(|area| area.contains(cell))
    }

    /// Every cached area with a member 4-adjacent to `cell`.
    pub fn find_areas_adjacent_to(&self, cell: &CellAddress) -> Vec<&PlayableArea> {
        self.areas
            .iter()
            .filter(|area| area.is_adjacent_to(cell))
            .collect()
    }

    pub fn cached_areas(&self) -> &[PlayableArea] {
        &self.areas
    }

    pub fn stats(&self) -> ConnectivityStats {
        ConnectivityStats {
            recomputes: self.recomputes,
            hits: self.hits,
            areas: self.areas.len(),
            valid: self.valid,
        }
    }
}

fn flood_fill(unlocked: &BTreeSet<CellAddress>) -> Vec<PlayableArea> {
    let mut visited: HashSet<CellAddress> = HashSet::with_capacity(unlocked.len());
    let mut areas = Vec::new();
    let mut next_id = 0u32;

    for start in unlocked {
        if visited.contains(start) {
            continue;
        }
        let mut members = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(*start);
        queue.push_back(*start);

        while let Some(cell) = queue.pop_front() {
            members.insert(cell);
            for neighbor in cell.neighbors() {
                if unlocked.contains(&neighbor) && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        if let Some(area) = PlayableArea::new(next_id, members) {
            areas.push(area);
            next_id += 1;
        }
    }

    areas
}
