//! Boundary markers between unlocked and locked cells.
//!
//! The engine only decides which cell edges should carry a marker; the host's
//! [`BoundaryPlacement`] implementation does the world mutation.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::territory::area::PlayableArea;
use crate::territory::types::{CellAddress, CellEdge};

/// Edges to mark and edges to clear after a territory change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryPlan {
    pub mark: BTreeSet<CellEdge>,
    pub clear: BTreeSet<CellEdge>,
}

impl BoundaryPlan {
    pub fn is_empty(&self) -> bool {
        self.mark.is_empty() && self.clear.is_empty()
    }

    /// Plan for a freshly unlocked `cell`: edges to unlocked neighbours are
    /// cleared, edges to locked neighbours are marked.
    pub fn after_unlock(unlocked: &BTreeSet<CellAddress>, cell: CellAddress) -> Self {
        let mut plan = Self::default();
        for neighbor in cell.neighbors() {
            let Some(edge) = CellEdge::between(cell, neighbor) else {
                continue;
            };
            if unlocked.contains(&neighbor) {
                plan.clear.insert(edge);
            } else {
                plan.mark.insert(edge);
            }
        }
        plan
    }

    /// Every edge between a member of some area and a cell outside it.
    pub fn surrounding(areas: &[PlayableArea]) -> Self {
        let mut plan = Self::default();
        for area in areas {
            for cell in area.cells() {
                for neighbor in cell.neighbors() {
                    if area.contains(&neighbor) {
                        continue;
                    }
                    if let Some(edge) = CellEdge::between(*cell, neighbor) {
                        plan.mark.insert(edge);
                    }
                }
            }
        }
        plan
    }
}

/// Host service that places and removes markers in the world.
pub trait BoundaryPlacement {
    fn apply(&mut self, plan: &BoundaryPlan) -> Result<()>;

    /// Remove every marker this service has placed.
    fn clear_all(&mut self) -> Result<()>;
}

/// In-memory placement that just tracks the currently marked edges.
#[derive(Debug, Default, Clone)]
pub struct MarkedEdges {
    edges: BTreeSet<CellEdge>,
}

impl MarkedEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> &BTreeSet<CellEdge> {
        &self.edges
    }

    pub fn is_marked(&self, edge: &CellEdge) -> bool {
        self.edges.contains(edge)
    }
}

impl BoundaryPlacement for MarkedEdges {
    fn apply(&mut self, plan: &BoundaryPlan) -> Result<()> {
        for edge in &plan.clear {
            self.edges.remove(edge);
        }
        self.edges.extend(plan.mark.iter().copied());
        Ok(())
    }

    fn clear_all(&mut self) -> Result<()> {
        self.edges.clear();
        Ok(())
    }
}
