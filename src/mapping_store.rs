/*
Global deduplicated store of vertex-subsets of G identified as images
of F. Keyed by the sorted vertex-subset so that two mappings covering
the same set of host vertices (however differently ordered) collapse
to one representative.

Grounded in examples/original_source/src/graph_result.c and
graph_result.h (graph_result_add, graph_result_reconstruct,
graph_result_size).
*/

use std::collections::HashMap;

use crate::bitmask::BitMask;
use crate::graph::GVertex;

/// One reconstructed subgraph isomorphism `psi : V(F) -> V(G)`,
/// ordered by F-vertex id, plus the set of colors its image used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphResult {
    pub psi: Vec<GVertex>,
    pub used_cols: BitMask,
}

impl GraphResult {
    pub fn new(psi: Vec<GVertex>, used_cols: BitMask) -> GraphResult {
        GraphResult { psi, used_cols }
    }

    fn sorted_key(&self) -> Vec<GVertex> {
        let mut key = self.psi.clone();
        key.sort_unstable();
        key
    }
}

#[derive(Debug, Default)]
pub struct MappingStore {
    seen: HashMap<Vec<GVertex>, GraphResult>,
}

impl MappingStore {
    pub fn new() -> MappingStore {
        MappingStore { seen: HashMap::new() }
    }

    /// Inserts each candidate if its sorted-image key is new; otherwise
    /// the candidate is dropped.
    pub fn add(&mut self, results: impl IntoIterator<Item = GraphResult>) {
        for r in results {
            let key = r.sorted_key();
            self.seen.entry(key).or_insert(r);
        }
    }

    pub fn size(&self) -> usize {
        self.seen.len()
    }

    /// Drains the store into a list, emptying it.
    pub fn reconstruct(&mut self) -> Vec<GraphResult> {
        std::mem::take(&mut self.seen).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_image_subsets_collapse() {
        let mut store = MappingStore::new();
        store.add(vec![
            GraphResult::new(vec![0, 1, 2], BitMask::full(3)),
            GraphResult::new(vec![2, 1, 0], BitMask::full(3)), // same subset, different order
        ]);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn distinct_image_subsets_are_kept() {
        let mut store = MappingStore::new();
        store.add(vec![
            GraphResult::new(vec![0, 1, 2], BitMask::full(3)),
            GraphResult::new(vec![1, 2, 3], BitMask::full(3)),
        ]);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn reconstruct_drains_the_store() {
        let mut store = MappingStore::new();
        store.add(vec![GraphResult::new(vec![0, 1], BitMask::full(2))]);
        let drained = store.reconstruct();
        assert_eq!(drained.len(), 1);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn first_seen_representative_is_kept() {
        let mut store = MappingStore::new();
        store.add(vec![GraphResult::new(vec![5, 6], BitMask::singleton(0))]);
        store.add(vec![GraphResult::new(vec![6, 5], BitMask::singleton(1))]);
        let drained = store.reconstruct();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].used_cols, BitMask::singleton(0));
    }
}
