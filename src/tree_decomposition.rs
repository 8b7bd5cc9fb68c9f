/*
Bitmask DP computing the exact treewidth of a small pattern graph F,
the associated optimal elimination ordering, and a tree decomposition
built from that ordering.

Grounded in examples/original_source/src/tree_dec.c (get_q_component,
q_function, get_perm_dp, get_best_perm, eliminate, td_from_perm).
*/

use crate::bitmask::BitMask;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::MAX_F_VERTICES;

#[derive(Debug, Clone)]
pub struct TreeDecomposition {
    pub n: usize,
    pub tw: i32,
    pub bags: Vec<BitMask>,
    /// Adjacency among TD nodes; node `i` is the TD-node created for
    /// pattern-vertex `i` in TreeDecomposition::build.
    pub adj: Vec<BitMask>,
}

/// Q(T, v): number of vertices outside T ∪ {v} adjacent (in F) to the
/// connected component of v within F[T ∪ {v}].
fn q_function(f_adj: &[BitMask], t: BitMask, v: u32) -> u32 {
    let universe = t.set(v);
    let mut component = BitMask::singleton(v);
    loop {
        let mut next = component;
        for w in component.iter() {
            next = next.union(f_adj[w as usize]);
        }
        next = next.intersect(universe);
        if next == component {
            break;
        }
        component = next;
    }
    let mut count = 0;
    for w in 0..f_adj.len() as u32 {
        if t.test(w) || w == v {
            continue;
        }
        if !f_adj[w as usize].intersect(component).is_empty() {
            count += 1;
        }
    }
    count
}

/// Reconstructs the elimination ordering minimizing tw_dp[S\{v}] at
/// each step, filling positions from last to first.
fn best_ordering(tw_dp: &[i32], n: usize, full: u32) -> Vec<u32> {
    let mut order = vec![0u32; n];
    let mut s = full;
    for pos in (0..n).rev() {
        let mut best_v = None;
        let mut best_val = i32::MAX;
        for v in BitMask(s).iter() {
            let t = BitMask(s).unset(v);
            if tw_dp[t.0 as usize] < best_val {
                best_val = tw_dp[t.0 as usize];
                best_v = Some(v);
            }
        }
        let v = best_v.expect("non-empty S always has a minimizing vertex");
        order[pos] = v;
        s = BitMask(s).unset(v).0;
    }
    order
}

impl TreeDecomposition {
    pub fn build(f: &Graph) -> Result<TreeDecomposition> {
        let n = f.n();
        if n > MAX_F_VERTICES {
            return Err(Error::PatternTooLarge { n, max: MAX_F_VERTICES });
        }
        if n == 0 {
            return Ok(TreeDecomposition { n: 0, tw: -1, bags: vec![], adj: vec![] });
        }

        let f_adj: Vec<BitMask> = (0..n)
            .map(|v| {
                let mut m = BitMask::EMPTY;
                for &w in f.neighbours(v as u32) {
                    m = m.set(w);
                }
                m
            })
            .collect();

        let full = (1u32 << n) - 1;
        let size = 1usize << n;
        let mut tw_dp = vec![-1i32; size];
        for s in 1..=(full as usize) {
            let mask = BitMask(s as u32);
            let mut best = i32::MAX;
            for v in mask.iter() {
                let t = mask.unset(v);
                let val = tw_dp[t.0 as usize].max(q_function(&f_adj, t, v) as i32);
                best = best.min(val);
            }
            tw_dp[s] = best;
        }
        let tw = tw_dp[full as usize];

        let order = best_ordering(&tw_dp, n, full);
        let mut rank = vec![0usize; n];
        for (i, &v) in order.iter().enumerate() {
            rank[v as usize] = i;
        }

        let mut working = f_adj;
        let mut bags = vec![BitMask::EMPTY; n];
        let mut adj = vec![BitMask::EMPTY; n];

        for (i, &v) in order.iter().enumerate() {
            let higher: Vec<u32> = working[v as usize]
                .iter()
                .filter(|&w| rank[w as usize] > i)
                .collect();

            let mut bag = BitMask::singleton(v);
            for &w in &higher {
                bag = bag.set(w);
            }
            bags[v as usize] = bag;

            if let Some(&parent) = higher.iter().min_by_key(|&&w| rank[w as usize]) {
                adj[v as usize] = adj[v as usize].set(parent);
                adj[parent as usize] = adj[parent as usize].set(v);
            }

            for a in 0..higher.len() {
                for b in (a + 1)..higher.len() {
                    let (x, y) = (higher[a], higher[b]);
                    working[x as usize] = working[x as usize].set(y);
                    working[y as usize] = working[y as usize].set(x);
                }
            }
        }

        Ok(TreeDecomposition { n, tw, bags, adj })
    }

    pub fn max_bag_size(&self) -> u32 {
        self.bags.iter().map(|b| b.popcount()).max().unwrap_or(0)
    }
}
