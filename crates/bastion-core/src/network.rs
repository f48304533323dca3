//! Breadth-first connectivity over structure footprints.
//!
//! Both the power grid and resource transport are instances of the same
//! search: start at the source footprints, step to 4-adjacent cells, pass
//! through conduits, and stop at terminals. Which structures are conduits
//! and which are terminals is decided per run by a classifier, so the
//! search itself knows nothing about structure kinds.
//!
//! Everything here is pure: it reads the structure store and returns a
//! [`Reachability`]. Writing flags back is the caller's job.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::grid::GridPosition;
use crate::id::StructureId;
use crate::structure::{Structure, StructureStore};

/// How one structure behaves during a propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Visited, and the search continues through its whole footprint.
    Conduit,
    /// Visited and recorded, but the search stops here.
    Terminal,
    /// Never entered.
    Blocked,
}

// ---------------------------------------------------------------------------
// ConnectivityIndex
// ---------------------------------------------------------------------------

/// Map from every footprint cell to the structure covering it.
///
/// Built fresh each tick from live, completed structures only. Structures
/// still under construction do not conduct.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityIndex {
    cells: BTreeMap<GridPosition, StructureId>,
}

impl ConnectivityIndex {
    pub fn build(structures: &StructureStore) -> Self {
        let mut cells = BTreeMap::new();
        for (id, s) in structures.iter() {
            if !s.is_operational() {
                continue;
            }
            for tile in s.tiles() {
                cells.insert(tile, id);
            }
        }
        Self { cells }
    }

    pub fn at(&self, pos: GridPosition) -> Option<StructureId> {
        self.cells.get(&pos).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// What one run reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    pub conduits: BTreeSet<StructureId>,
    pub terminals: BTreeSet<StructureId>,
}

impl Reachability {
    pub fn contains(&self, id: StructureId) -> bool {
        self.conduits.contains(&id) || self.terminals.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.conduits.len() + self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conduits.is_empty() && self.terminals.is_empty()
    }
}

/// A single breadth-first run.
pub struct Propagation<'a, F>
where
    F: Fn(&Structure) -> NodeClass,
{
    index: &'a ConnectivityIndex,
    structures: &'a StructureStore,
    classify: F,
    entered: BTreeSet<StructureId>,
    queue: VecDeque<GridPosition>,
    reach: Reachability,
}

impl<'a, F> Propagation<'a, F>
where
    F: Fn(&Structure) -> NodeClass,
{
    pub fn new(index: &'a ConnectivityIndex, structures: &'a StructureStore, classify: F) -> Self {
        Self {
            index,
            structures,
            classify,
            entered: BTreeSet::new(),
            queue: VecDeque::new(),
            reach: Reachability::default(),
        }
    }

    /// Start the search from a source structure's footprint. The source
    /// itself is not recorded.
    pub fn seed(&mut self, source: StructureId) {
        let Some(s) = self.structures.get(source) else {
            return;
        };
        if self.entered.insert(source) {
            self.queue.extend(s.tiles());
        }
    }

    /// Visit the structure on `pos` as if a source were adjacent to it.
    pub fn touch(&mut self, pos: GridPosition) {
        let Some(id) = self.index.at(pos) else {
            return;
        };
        if self.entered.contains(&id) {
            return;
        }
        let Some(s) = self.structures.get(id) else {
            return;
        };
        match (self.classify)(s) {
            NodeClass::Conduit => {
                self.entered.insert(id);
                self.reach.conduits.insert(id);
                self.queue.extend(s.tiles());
            }
            NodeClass::Terminal => {
                self.entered.insert(id);
                self.reach.terminals.insert(id);
            }
            NodeClass::Blocked => {}
        }
    }

    pub fn run(mut self) -> Reachability {
        while let Some(pos) = self.queue.pop_front() {
            for n in pos.neighbors_4() {
                self.touch(n);
            }
        }
        self.reach
    }
}

/// Seed from `sources`, run to completion, and return what was reached.
pub fn propagate<F>(
    index: &ConnectivityIndex,
    structures: &StructureStore,
    sources: impl IntoIterator<Item = StructureId>,
    classify: F,
) -> Reachability
where
    F: Fn(&Structure) -> NodeClass,
{
    let mut run = Propagation::new(index, structures, classify);
    for source in sources {
        run.seed(source);
    }
    run.run()
}
