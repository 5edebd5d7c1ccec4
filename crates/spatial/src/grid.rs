use echostep_common::{EntityId, Rect};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Errors from configuring the grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(i32),
}

/// A 2D cell coordinate in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Uniform grid over pixel bounding boxes.
///
/// An entity is placed in every cell its box touches. Queries return a
/// superset of the entities whose boxes intersect the query box; callers
/// re-test precisely. Results are a `BTreeSet`, so iteration is in id order
/// even though cells are hashed.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: i32,
    cells: HashMap<CellCoord, HashSet<EntityId>>,
    placements: HashMap<EntityId, Rect>,
}

impl SpatialGrid {
    pub fn new(cell_size: i32) -> Result<Self, SpatialError> {
        if cell_size <= 0 {
            return Err(SpatialError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            placements: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Cell containing a pixel coordinate.
    pub fn pixel_to_cell(&self, x: i32, y: i32) -> CellCoord {
        CellCoord::new(x.div_euclid(self.cell_size), y.div_euclid(self.cell_size))
    }

    fn covered(&self, aabb: &Rect) -> impl Iterator<Item = CellCoord> + use<> {
        let lo = self.pixel_to_cell(aabb.x, aabb.y);
        // Zero-extent boxes still occupy the cell of their origin.
        let hi = self.pixel_to_cell(
            aabb.x + aabb.w.max(1) - 1,
            aabb.y + aabb.h.max(1) - 1,
        );
        (lo.y..=hi.y).flat_map(move |y| (lo.x..=hi.x).map(move |x| CellCoord::new(x, y)))
    }

    /// Place an entity, replacing any previous placement.
    pub fn insert(&mut self, id: EntityId, aabb: Rect) {
        self.remove(id);
        for cell in self.covered(&aabb) {
            self.cells.entry(cell).or_default().insert(id);
        }
        self.placements.insert(id, aabb);
    }

    /// Remove an entity. Returns its last placement.
    pub fn remove(&mut self, id: EntityId) -> Option<Rect> {
        let aabb = self.placements.remove(&id)?;
        for cell in self.covered(&aabb) {
            if let Some(set) = self.cells.get_mut(&cell) {
                set.remove(&id);
                if set.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        Some(aabb)
    }

    /// Move an entity if its box changed.
    pub fn update(&mut self, id: EntityId, aabb: Rect) {
        if self.placements.get(&id) != Some(&aabb) {
            self.insert(id, aabb);
        }
    }

    /// Entities whose cells touch `aabb`.
    pub fn query(&self, aabb: &Rect) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for cell in self.covered(aabb) {
            if let Some(set) = self.cells.get(&cell) {
                out.extend(set.iter().copied());
            }
        }
        out
    }

    /// Rebuild from scratch.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (EntityId, Rect)>) {
        self.cells.clear();
        self.placements.clear();
        for (id, aabb) in entries {
            self.insert(id, aabb);
        }
        tracing::trace!(
            entities = self.placements.len(),
            cells = self.cells.len(),
            "spatial grid rebuilt"
        );
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.placements.contains_key(&id)
    }

    pub fn placement(&self, id: EntityId) -> Option<Rect> {
        self.placements.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total number of entity placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.cells.values().map(|s| s.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(32).unwrap()
    }

    #[test]
    fn rejects_non_positive_cell() {
        assert_eq!(SpatialGrid::new(0).unwrap_err(), SpatialError::InvalidCellSize(0));
    }

    #[test]
    fn pixel_to_cell_floors() {
        let g = grid();
        assert_eq!(g.pixel_to_cell(0, 0), CellCoord::new(0, 0));
        assert_eq!(g.pixel_to_cell(31, 32), CellCoord::new(0, 1));
        assert_eq!(g.pixel_to_cell(-1, -33), CellCoord::new(-1, -2));
    }

    #[test]
    fn box_spans_every_touched_cell() {
        let mut g = grid();
        g.insert(EntityId(1), Rect::new(0, 160, 320, 16));
        assert_eq!(g.cell_count(), 10);
        // An exact multiple of the cell size does not spill into the next cell.
        g.insert(EntityId(2), Rect::new(0, 0, 32, 32));
        assert!(g.query(&Rect::new(32, 0, 4, 4)).is_empty());
        assert!(g.query(&Rect::new(31, 31, 1, 1)).contains(&EntityId(2)));
    }

    #[test]
    fn query_is_sorted_superset() {
        let mut g = grid();
        g.insert(EntityId(9), Rect::new(0, 0, 16, 16));
        g.insert(EntityId(2), Rect::new(20, 20, 8, 8));
        g.insert(EntityId(5), Rect::new(200, 200, 8, 8));
        let hits: Vec<_> = g.query(&Rect::new(0, 0, 4, 4)).into_iter().collect();
        // Entity 2 does not intersect but shares the cell.
        assert_eq!(hits, vec![EntityId(2), EntityId(9)]);
    }

    #[test]
    fn remove_and_update() {
        let mut g = grid();
        g.insert(EntityId(1), Rect::new(0, 120, 48, 16));
        g.update(EntityId(1), Rect::new(100, 120, 48, 16));
        assert!(g.query(&Rect::new(0, 120, 8, 8)).is_empty());
        assert!(g.query(&Rect::new(130, 120, 8, 8)).contains(&EntityId(1)));
        assert_eq!(g.remove(EntityId(1)), Some(Rect::new(100, 120, 48, 16)));
        assert!(g.is_empty());
        assert_eq!(g.cell_count(), 0);
        assert_eq!(g.remove(EntityId(1)), None);
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut g = grid();
        g.insert(EntityId(1), Rect::new(0, 0, 8, 8));
        g.rebuild([(EntityId(2), Rect::new(40, 0, 8, 8))]);
        assert!(!g.contains(EntityId(1)));
        assert_eq!(g.placement(EntityId(2)), Some(Rect::new(40, 0, 8, 8)));
        assert_eq!(g.total_placements(), 1);
    }
}
