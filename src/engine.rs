/*
Bottom-up DP (Leaf/Introduce/Forget/Join), top-down reconstruction of
vertex mappings, and the outer randomized-coloring loop.

Grounded in examples/original_source/src/subiso.c in full
(subiso_leaf, subiso_introduce, subiso_forget, subiso_join, subiso_dp,
can_add, subiso_reconstruct, subiso_run, subiso_colouring). The
Leaf/Introduce/Forget/Join dispatch skeleton also mirrors
diaz.rs::diaz_algorithm::diaz from the crate this workspace started
from (same per-node-kind match, same remove-child-table-after-use
discipline), generalized from a scalar homomorphism count to a
streamed set of colorful partial mappings.
*/

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rand::Rng;

use crate::bitmask::BitMask;
use crate::error::Result;
use crate::graph::{FVertex, Graph, GVertex};
use crate::mapping_store::{GraphResult, MappingStore};
use crate::nice_tree_decomposition::{NiceTreeDecomposition, NodeKind};
use crate::result_buffer::{Mode, ResultBuffer};

/// `3^n`, the default iteration budget: a Markov-bound heuristic for
/// drawing a coloring colorful on any fixed F-copy with high
/// probability, repeated across iterations.
pub fn default_rep_cnt(n: usize) -> u64 {
    3u64.saturating_pow(n as u32)
}

#[derive(Debug, Clone)]
struct PartialResult {
    psi: Vec<Option<GVertex>>,
    used_cols: BitMask,
}

pub struct SubIsoEngine<'a> {
    ntd: &'a NiceTreeDecomposition,
    f: &'a Graph,
    g: &'a Graph,
    f_adj: Vec<BitMask>,
    f_ecc: Vec<u32>,
    coloring: Vec<u32>,
    rbufs: Vec<ResultBuffer>,
}

impl<'a> SubIsoEngine<'a> {
    pub fn new(ntd: &'a NiceTreeDecomposition, f: &'a Graph, g: &'a Graph) -> SubIsoEngine<'a> {
        let f_adj: Vec<BitMask> = (0..f.n())
            .map(|v| {
                let mut m = BitMask::EMPTY;
                for &w in f.neighbours(v as u32) {
                    m = m.set(w);
                }
                m
            })
            .collect();
        let f_ecc = f.eccentricities();

        SubIsoEngine {
            ntd,
            f,
            g,
            f_adj,
            f_ecc,
            coloring: vec![0; g.n()],
            rbufs: vec![ResultBuffer::new(); ntd.nodes.len()],
        }
    }

    /// Draws a fresh uniform random coloring `V(G) -> {0..|V(F)|}`.
    fn draw_coloring(&mut self, rng: &mut impl Rng) {
        let k = self.f.n().max(1) as u32;
        for c in self.coloring.iter_mut() {
            *c = rng.gen_range(0..k);
        }
    }

    fn color_of(&self, v: GVertex) -> u32 {
        self.coloring[v as usize]
    }

    /// Runs `rep_cnt` coloring iterations, accumulating distinct
    /// subgraph images into a `MappingStore`, and returns the final
    /// deduplicated list.
    pub fn run(&mut self, rep_cnt: u64, rng: &mut impl Rng) -> Vec<GraphResult> {
        let mut store = MappingStore::new();
        let n = self.f.n();

        for iter in 0..rep_cnt {
            self.draw_coloring(rng);
            self.run_dp(self.ntd.root);

            let seed = vec![PartialResult { psi: vec![None; n], used_cols: BitMask::EMPTY }];
            let bound = self.reconstruct(self.ntd.root, seed);

            let results = bound.into_iter().map(|r| {
                let psi = r
                    .psi
                    .into_iter()
                    .map(|v| v.expect("reconstruction from an empty-bag root binds every F-vertex"))
                    .collect();
                GraphResult::new(psi, r.used_cols)
            });
            store.add(results);
            log::debug!("iteration {}/{rep_cnt}: unique subgraphs so far = {}", iter + 1, store.size());
        }

        store.reconstruct()
    }

    /// Rewinds/rebuilds `rbuf(x)` bottom-up, recursing into children
    /// first, then flips it to Read mode.
    fn run_dp(&mut self, x: usize) {
        let kind = self.ntd.nodes[x].kind;
        let children = self.ntd.nodes[x].children.clone();
        for &c in &children {
            self.run_dp(c);
        }

        self.rbufs[x] = ResultBuffer::new();
        match kind {
            NodeKind::Leaf => self.run_leaf(x),
            NodeKind::Introduce => self.run_introduce(x, children[0]),
            NodeKind::Forget => self.run_forget(x, children[0]),
            NodeKind::Join => self.run_join(x, children[0], children[1]),
        }
        self.rbufs[x].set_mode(Mode::Read);
    }

    /// Drains a child buffer (already filled) into an owned record
    /// list, sidestepping overlapping-borrow issues with `self.rbufs`.
    fn drain_read(&mut self, node: usize) -> Vec<(Vec<GVertex>, Vec<u32>)> {
        let bag_len = self.ntd.nodes[node].bag_sorted.len();
        let buf = &mut self.rbufs[node];
        buf.set_mode(Mode::Read);
        let mut out = Vec::new();
        while let Some(rec) = buf.read(bag_len) {
            out.push(rec);
        }
        out
    }

    /// One record per G-vertex, ascending id order.
    fn run_leaf(&mut self, x: usize) {
        let buf = &mut self.rbufs[x];
        buf.set_mode(Mode::Write);
        for u in 0..self.g.n() as GVertex {
            let mask = BitMask::singleton(self.coloring[u as usize]);
            buf.push(&[u], &[mask.0]);
        }
    }

    /// bag(x) = bag(child) ∪ {u}. Accumulates extended records into a
    /// key-ordered map so the output is pushed already sorted.
    fn run_introduce(&mut self, x: usize, child: usize) {
        let u = self.ntd.nodes[x].change_vertex.unwrap();
        let p = self.ntd.nodes[x].change_index.unwrap();
        let bag_sorted_x = self.ntd.nodes[x].bag_sorted.clone();
        let bag_sorted_child = self.ntd.nodes[child].bag_sorted.clone();

        let placed_neighbours: Vec<usize> = (0..bag_sorted_x.len())
            .filter(|&i| i != p && self.f_adj[u as usize].test(bag_sorted_x[i]))
            .collect();

        let min_ecc_child_pos = if placed_neighbours.is_empty() {
            (0..bag_sorted_child.len())
                .min_by_key(|&j| self.f_ecc[bag_sorted_child[j] as usize])
                .expect("Introduce always has a non-empty child bag")
        } else {
            0
        };

        let records = self.drain_read(child);
        let mut acc: BTreeMap<Vec<GVertex>, BTreeSet<u32>> = BTreeMap::new();

        for (phi_old, col_old) in &records {
            let used: HashSet<GVertex> = phi_old.iter().copied().collect();

            let candidates: Vec<GVertex> = if !placed_neighbours.is_empty() {
                let mut counts: HashMap<GVertex, usize> = HashMap::new();
                for &i in &placed_neighbours {
                    let child_idx = if i < p { i } else { i - 1 };
                    let anchor = phi_old[child_idx];
                    for &nb in self.g.neighbours(anchor) {
                        *counts.entry(nb).or_insert(0) += 1;
                    }
                }
                counts
                    .into_iter()
                    .filter(|&(s, c)| c == placed_neighbours.len() && !used.contains(&s))
                    .map(|(s, _)| s)
                    .collect()
            } else {
                let anchor_g = phi_old[min_ecc_child_pos];
                let anchor_f = bag_sorted_child[min_ecc_child_pos];
                let radius = self.f_ecc[anchor_f as usize];
                self.g
                    .bfs_within(anchor_g, radius)
                    .into_iter()
                    .filter(|s| !used.contains(s))
                    .collect()
            };

            for s in candidates {
                let color_s = self.color_of(s);
                let mut phi_new = Vec::with_capacity(bag_sorted_x.len());
                phi_new.extend_from_slice(&phi_old[..p]);
                phi_new.push(s);
                phi_new.extend_from_slice(&phi_old[p..]);

                let entry = acc.entry(phi_new).or_default();
                for &m in col_old {
                    if !BitMask(m).test(color_s) {
                        entry.insert(BitMask(m).set(color_s).0);
                    }
                }
            }
        }
        acc.retain(|_, masks| !masks.is_empty());

        let buf = &mut self.rbufs[x];
        buf.set_mode(Mode::Write);
        for (phi, masks) in acc {
            let colors: Vec<u32> = masks.into_iter().collect();
            buf.push(&phi, &colors);
        }
    }

    /// bag(x) = bag(child) \ {u}. Records merge into an associative
    /// staging tree keyed by the projected mapping.
    fn run_forget(&mut self, x: usize, child: usize) {
        let p = self.ntd.nodes[x].change_index.unwrap();
        let records = self.drain_read(child);

        let mut acc: BTreeMap<Vec<GVertex>, BTreeSet<u32>> = BTreeMap::new();
        for (phi_old, col_old) in records {
            let mut phi_new = phi_old;
            phi_new.remove(p);
            let entry = acc.entry(phi_new).or_default();
            for m in col_old {
                entry.insert(m);
            }
        }
        acc.retain(|_, masks| !masks.is_empty());

        let buf = &mut self.rbufs[x];
        buf.set_mode(Mode::Write);
        for (phi, masks) in acc {
            let colors: Vec<u32> = masks.into_iter().collect();
            buf.push(&phi, &colors);
        }
    }

    /// Merge-walk both children's streams; emits `m1 ∪ m2` whenever
    /// `m1 ∩ m2` equals exactly the bag's own colors (no forgotten
    /// color double-counted across the join).
    fn run_join(&mut self, x: usize, c0: usize, c1: usize) {
        let r0 = self.drain_read(c0);
        let r1 = self.drain_read(c1);

        let mut out: Vec<(Vec<GVertex>, Vec<u32>)> = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < r0.len() && j < r1.len() {
            match r0[i].0.cmp(&r1[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let phi = r0[i].0.clone();
                    let mut bag_colors = BitMask::EMPTY;
                    for &v in &phi {
                        bag_colors = bag_colors.set(self.color_of(v));
                    }

                    let mut merged: BTreeSet<u32> = BTreeSet::new();
                    for &m1 in &r0[i].1 {
                        for &m2 in &r1[j].1 {
                            if BitMask(m1).intersect(BitMask(m2)) == bag_colors {
                                merged.insert(BitMask(m1).union(BitMask(m2)).0);
                            }
                        }
                    }
                    if !merged.is_empty() {
                        out.push((phi, merged.into_iter().collect()));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        let buf = &mut self.rbufs[x];
        buf.set_mode(Mode::Write);
        for (phi, colors) in out {
            buf.push(&phi, &colors);
        }
    }

    /// Top-down reconstruction (spec.md §4.7): only Forget nodes bind
    /// an F-vertex image; Leaf/Introduce/Join pass the result list
    /// through unchanged (or, for Join, through both children).
    fn reconstruct(&mut self, x: usize, results: Vec<PartialResult>) -> Vec<PartialResult> {
        let kind = self.ntd.nodes[x].kind;
        let children = self.ntd.nodes[x].children.clone();

        match kind {
            NodeKind::Leaf => results,
            NodeKind::Introduce => self.reconstruct(children[0], results),
            NodeKind::Join => {
                let via_first = self.reconstruct(children[0], results);
                self.reconstruct(children[1], via_first)
            }
            NodeKind::Forget => {
                let child = children[0];
                let change_vertex = self.ntd.nodes[x].change_vertex.unwrap();
                let change_index = self.ntd.nodes[x].change_index.unwrap();
                let bag_sorted_child = self.ntd.nodes[child].bag_sorted.clone();
                let records = self.drain_read(child);

                let mut next = Vec::new();
                for r in &results {
                    if r.psi[change_vertex as usize].is_some() {
                        continue;
                    }
                    for (phi, _colors) in &records {
                        let candidate = phi[change_index];
                        let color_c = self.color_of(candidate);
                        if r.used_cols.test(color_c) {
                            continue;
                        }

                        let consistent = bag_sorted_child.iter().enumerate().all(|(j, &fv)| {
                            fv == change_vertex || r.psi[fv as usize].map_or(true, |bound| bound == phi[j])
                        });
                        if !consistent {
                            continue;
                        }

                        let mut psi = r.psi.clone();
                        psi[change_vertex as usize] = Some(candidate);
                        next.push(PartialResult { psi, used_cols: r.used_cols.set(color_c) });
                    }
                }
                self.reconstruct(child, next)
            }
        }
    }
}

/// Validates every returned mapping against F and G directly
/// (spec.md §8, property 3): total, injective, edge-preserving.
pub fn check_results(f: &Graph, g: &Graph, results: &[GraphResult]) -> Result<()> {
    use crate::error::Error;

    for r in results {
        if r.psi.len() != f.n() {
            return Err(Error::InvariantViolation {
                detail: format!("mapping has {} images, expected {}", r.psi.len(), f.n()),
            });
        }
        let distinct: HashSet<GVertex> = r.psi.iter().copied().collect();
        if distinct.len() != r.psi.len() {
            return Err(Error::InvariantViolation { detail: "mapping is not injective".to_string() });
        }
        for u in 0..f.n() as FVertex {
            for &v in f.neighbours(u) {
                if !g.is_adj(r.psi[u as usize], r.psi[v as usize]) {
                    return Err(Error::InvariantViolation {
                        detail: format!("edge ({u},{v}) of F not preserved by mapping"),
                    });
                }
            }
        }
    }

    let mut seen_subsets = HashSet::new();
    for r in results {
        let mut key = r.psi.clone();
        key.sort_unstable();
        if !seen_subsets.insert(key) {
            return Err(Error::InvariantViolation { detail: "duplicate image subset in result list".to_string() });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn path(n: usize, edges: &[(u32, u32)]) -> Graph {
        let mut g = Graph::new(n);
        for &(u, v) in edges {
            g.add_edge(u, v);
            g.add_edge(v, u);
        }
        g
    }

    fn run_engine(f: &Graph, g: &Graph, rep_cnt: u64, seed: u64) -> Vec<GraphResult> {
        let ntd = NiceTreeDecomposition::build(f).unwrap();
        let mut engine = SubIsoEngine::new(&ntd, f, g);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        engine.run(rep_cnt, &mut rng)
    }

    #[test]
    fn empty_pattern_finds_every_host_vertex() {
        let f = Graph::new(1);
        let g = Graph::new(5);
        let results = run_engine(&f, &g, default_rep_cnt(1), 1);
        assert_eq!(results.len(), 5);
        check_results(&f, &g, &results).unwrap();
    }

    #[test]
    fn triangle_in_k4_has_four_copies() {
        let f = path(3, &[(0, 1), (1, 2), (0, 2)]);
        let g = {
            let mut g = Graph::new(4);
            for i in 0..4u32 {
                for j in 0..4u32 {
                    if i != j {
                        g.add_edge(i, j);
                    }
                }
            }
            g
        };
        let results = run_engine(&f, &g, default_rep_cnt(3) * 4, 7);
        assert_eq!(results.len(), 4);
        check_results(&f, &g, &results).unwrap();
    }

    #[test]
    fn path_p3_in_c5_has_five_copies() {
        let f = path(3, &[(0, 1), (1, 2)]);
        let g = path(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
        let results = run_engine(&f, &g, default_rep_cnt(3) * 4, 3);
        assert_eq!(results.len(), 5);
        check_results(&f, &g, &results).unwrap();
    }

    #[test]
    fn disconnected_pattern_in_disconnected_host_has_one_copy() {
        let f = Graph::new(2);
        let g = Graph::new(2);
        let results = run_engine(&f, &g, default_rep_cnt(2) * 4, 11);
        assert_eq!(results.len(), 1);
        check_results(&f, &g, &results).unwrap();
    }
}
