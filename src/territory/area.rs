//! Playable areas: maximal 4-connected groups of unlocked cells.

use std::collections::BTreeSet;

use crate::territory::types::CellAddress;

/// Immutable snapshot of one connected component.
///
/// Ids are assigned per recompute pass starting at 0 and are not stable across
/// cache invalidations; do not persist them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableArea {
    id: u32,
    cells: BTreeSet<CellAddress>,
    centroid: CellAddress,
}

impl PlayableArea {
    /// Build an area from its member cells. Returns `None` for an empty set.
    pub fn new(id: u32, cells: BTreeSet<CellAddress>) -> Option<Self> {
        let centroid = centroid_of(&cells)?;
        Some(Self {
            id,
            cells,
            centroid,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn cells(&self) -> &BTreeSet<CellAddress> {
        &self.cells
    }

    pub fn centroid(&self) -> CellAddress {
        self.centroid
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a constructed area; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: &CellAddress) -> bool {
        self.cells.contains(cell)
    }

    /// True when some member shares an edge with `cell`.
    pub fn is_adjacent_to(&self, cell: &CellAddress) -> bool {
        cell.neighbors().iter().any(|n| self.cells.contains(n))
    }
}

/// Arithmetic mean of the member coordinates, truncated toward zero.
fn centroid_of(cells: &BTreeSet<CellAddress>) -> Option<CellAddress> {
    if cells.is_empty() {
        return None;
    }
    let (sum_x, sum_z) = cells.iter().fold((0i64, 0i64), |(sx, sz), c| {
        (sx + c.x as i64, sz + c.z as i64)
    });
    let n = cells.len() as i64;
    Some(CellAddress::new((sum_x / n) as i32, (sum_z / n) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(list: &[(i32, i32)]) -> BTreeSet<CellAddress> {
        list.iter().map(|&(x, z)| CellAddress::new(x, z)).collect()
    }

    #[test]
    fn empty_set_is_not_an_area() {
        assert!(PlayableArea::new(0, BTreeSet::new()).is_none());
    }

    #[test]
    fn centroid_truncates_toward_zero() {
        let area = PlayableArea::new(0, cells(&[(0, 0), (1, 0)])).unwrap();
        assert_eq!(area.centroid(), CellAddress::new(0, 0));

        let negative = PlayableArea::new(1, cells(&[(-1, -3), (-2, -3)])).unwrap();
        // mean -1.5 truncates to -1
        assert_eq!(negative.centroid(), CellAddress::new(-1, -3));
    }

    #[test]
    fn adjacency_and_containment() {
        let area = PlayableArea::new(0, cells(&[(0, 0), (1, 0)])).unwrap();
        assert!(area.contains(&CellAddress::new(1, 0)));
        assert!(!area.contains(&CellAddress::new(2, 0)));
        assert!(area.is_adjacent_to(&CellAddress::new(2, 0)));
        assert!(area.is_adjacent_to(&CellAddress::new(0, 1)));
        assert!(!area.is_adjacent_to(&CellAddress::new(2, 1)));
        assert_eq!(area.len(), 2);
    }

    #[test]
    fn equality_uses_id_and_cells() {
        let a = PlayableArea::new(0, cells(&[(4, 4)])).unwrap();
        let b = PlayableArea::new(0, cells(&[(4, 4)])).unwrap();
        let c = PlayableArea::new(1, cells(&[(4, 4)])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
