/*
Structural checkers for tree decompositions, nice tree decompositions,
and reconstructed mappings (spec.md §8).

Grounded in examples/original_source/src/tests.c in full
(test_tree_dec, test_nice_tree_dec, dfs_trv_td, dfs_trv_ntd;
test_results is covered instead by engine::check_results, which needs
direct access to the engine's internal types).
*/

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::nice_tree_decomposition::{NiceTreeDecomposition, NodeKind};
use crate::tree_decomposition::TreeDecomposition;

fn invariant(detail: impl Into<String>) -> Error {
    Error::InvariantViolation { detail: detail.into() }
}

fn is_connected(subset: &[usize], neighbours: impl Fn(usize) -> Vec<usize>) -> bool {
    if subset.is_empty() {
        return true;
    }
    let set: HashSet<usize> = subset.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut stack = vec![subset[0]];
    seen.insert(subset[0]);
    while let Some(x) = stack.pop() {
        for y in neighbours(x) {
            if set.contains(&y) && seen.insert(y) {
                stack.push(y);
            }
        }
    }
    seen.len() == subset.len()
}

/// Vertex coverage, edge coverage, per-vertex connectivity, and
/// `tw = max|bag| - 1` (spec.md §8, invariant 1).
pub fn check_tree_decomposition(f: &Graph, td: &TreeDecomposition) -> Result<()> {
    let n = td.n;

    for v in 0..n as u32 {
        if !td.bags.iter().any(|b| b.test(v)) {
            return Err(invariant(format!("vertex {v} missing from every TD bag")));
        }
    }

    for u in 0..n as u32 {
        for &v in f.neighbours(u) {
            if !td.bags.iter().any(|b| b.test(u) && b.test(v)) {
                return Err(invariant(format!("edge ({u},{v}) shares no common TD bag")));
            }
        }
    }

    for v in 0..n as u32 {
        let containing: Vec<usize> = (0..n).filter(|&i| td.bags[i].test(v)).collect();
        let ok = is_connected(&containing, |i| td.adj[i].iter().map(|x| x as usize).collect());
        if !ok {
            return Err(invariant(format!("TD bags containing vertex {v} are not connected")));
        }
    }

    let expected_tw = td.max_bag_size() as i32 - 1;
    if n > 0 && td.tw != expected_tw {
        return Err(invariant(format!("tw {} != max bag size - 1 = {}", td.tw, expected_tw)));
    }

    Ok(())
}

/// Degree/shape constraints plus vertex/edge coverage and connectivity
/// over the nice tree decomposition (spec.md §8, invariant 2).
pub fn check_nice_tree_decomposition(f: &Graph, ntd: &NiceTreeDecomposition) -> Result<()> {
    let n = f.n();

    for (idx, node) in ntd.nodes.iter().enumerate() {
        let is_root = idx == ntd.root;
        match node.kind {
            NodeKind::Leaf => {
                if node.children.len() != 0 || node.bag.popcount() != 1 {
                    return Err(invariant(format!("leaf {idx} must have 0 children and |bag|=1")));
                }
            }
            NodeKind::Introduce | NodeKind::Forget => {
                if node.children.len() != 1 {
                    return Err(invariant(format!("node {idx} ({:?}) must have 1 child", node.kind)));
                }
                if is_root {
                    if node.kind != NodeKind::Forget || !node.bag.is_empty() || node.parent.is_some() {
                        return Err(invariant("root must be a parentless Forget node with empty bag"));
                    }
                }
            }
            NodeKind::Join => {
                if node.children.len() != 2 {
                    return Err(invariant(format!("join {idx} must have 2 children")));
                }
                if ntd.node(node.children[0]).bag != node.bag || ntd.node(node.children[1]).bag != node.bag {
                    return Err(invariant(format!("join {idx}'s children must share its bag")));
                }
                if is_root && (!node.bag.is_empty() || node.parent.is_some()) {
                    return Err(invariant("a Join root is only valid with an empty bag (disconnected F)"));
                }
            }
        }
    }

    for v in 0..n as u32 {
        if !ntd.nodes.iter().any(|nd| nd.bag.test(v)) {
            return Err(invariant(format!("vertex {v} missing from every NTD bag")));
        }
    }
    for u in 0..n as u32 {
        for &v in f.neighbours(u) {
            if !ntd.nodes.iter().any(|nd| nd.bag.test(u) && nd.bag.test(v)) {
                return Err(invariant(format!("edge ({u},{v}) shares no common NTD bag")));
            }
        }
    }

    let tree_adj = |i: usize| -> Vec<usize> {
        let mut out = ntd.nodes[i].children.clone();
        if let Some(p) = ntd.nodes[i].parent {
            out.push(p);
        }
        out
    };
    for v in 0..n as u32 {
        let containing: Vec<usize> = (0..ntd.nodes.len()).filter(|&i| ntd.nodes[i].bag.test(v)).collect();
        if !is_connected(&containing, tree_adj) {
            return Err(invariant(format!("NTD nodes containing vertex {v} are not connected")));
        }
    }

    let max_bag = ntd.nodes.iter().map(|nd| nd.bag.popcount()).max().unwrap_or(0) as i32;
    if n > 0 && ntd.tw != max_bag - 1 {
        return Err(invariant(format!("NTD tw {} != max bag size - 1 = {}", ntd.tw, max_bag - 1)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn triangle() -> Graph {
        let mut g = Graph::new(3);
        for (u, v) in [(0, 1), (1, 0), (1, 2), (2, 1), (0, 2), (2, 0)] {
            g.add_edge(u, v);
        }
        g
    }

    #[test]
    fn triangle_td_and_ntd_satisfy_invariants() {
        let f = triangle();
        let td = TreeDecomposition::build(&f).unwrap();
        check_tree_decomposition(&f, &td).unwrap();
        let ntd = NiceTreeDecomposition::build(&f).unwrap();
        check_nice_tree_decomposition(&f, &ntd).unwrap();
    }

    #[test]
    fn disconnected_pattern_satisfies_invariants() {
        let f = Graph::new(2);
        let td = TreeDecomposition::build(&f).unwrap();
        check_tree_decomposition(&f, &td).unwrap();
        let ntd = NiceTreeDecomposition::build(&f).unwrap();
        check_nice_tree_decomposition(&f, &ntd).unwrap();
    }

    #[test]
    fn path_p3_satisfies_invariants() {
        let mut f = Graph::new(3);
        for (u, v) in [(0, 1), (1, 0), (1, 2), (2, 1)] {
            f.add_edge(u, v);
        }
        let td = TreeDecomposition::build(&f).unwrap();
        check_tree_decomposition(&f, &td).unwrap();
        let ntd = NiceTreeDecomposition::build(&f).unwrap();
        check_nice_tree_decomposition(&f, &ntd).unwrap();
    }
}
