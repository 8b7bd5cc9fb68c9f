/*
Adjacency-set graph over dense integer vertex ids, shared by both the
host graph G and the pattern graph F. Edges are stored directed;
callers insert both directions to model an undirected graph.
*/

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub type FVertex = u32;
pub type GVertex = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    adj: Vec<HashSet<u32>>,
}

impl Graph {
    pub fn new(n: usize) -> Graph {
        Graph {
            adj: vec![HashSet::new(); n],
        }
    }

    pub fn n(&self) -> usize {
        self.adj.len()
    }

    /// Inserts `to` into `adj[from]`. Idempotent; no self-loops recorded.
    pub fn add_edge(&mut self, from: u32, to: u32) {
        if from == to {
            return;
        }
        self.adj[from as usize].insert(to);
    }

    pub fn is_adj(&self, from: u32, to: u32) -> bool {
        self.adj[from as usize].contains(&to)
    }

    pub fn neighbours(&self, v: u32) -> &HashSet<u32> {
        &self.adj[v as usize]
    }

    pub fn degree(&self, v: u32) -> usize {
        self.adj[v as usize].len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.iter().map(|s| s.len()).sum()
    }

    /// Parses the ASCII format of SPEC_FULL.md §6: `n`, then per vertex
    /// `deg_v` followed by `deg_v` neighbour ids. The file already lists
    /// each undirected edge from both endpoints.
    ///
    /// `too_large` builds the `Error` to raise when `n` exceeds
    /// `max_vertices`, so callers can distinguish an oversized host
    /// graph (`Error::HostTooLarge`) from an oversized pattern graph
    /// (`Error::PatternTooLarge`).
    pub fn load(
        path: impl AsRef<Path>,
        max_vertices: usize,
        too_large: impl Fn(usize, usize) -> Error,
    ) -> Result<Graph> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut nums = text.split_ascii_whitespace().map(|tok| {
            tok.parse::<usize>().map_err(|_| Error::MalformedInput {
                path: path.to_path_buf(),
                detail: format!("expected integer, found {tok:?}"),
            })
        });

        let mut next = || -> Result<usize> {
            nums.next().ok_or_else(|| Error::MalformedInput {
                path: path.to_path_buf(),
                detail: "unexpected end of input".to_string(),
            })?
        };

        let n = next()?;
        if n > max_vertices {
            return Err(too_large(n, max_vertices));
        }

        let mut g = Graph::new(n);
        for v in 0..n {
            let deg = next()?;
            for _ in 0..deg {
                let to = next()?;
                if to >= n {
                    return Err(Error::MalformedInput {
                        path: path.to_path_buf(),
                        detail: format!("neighbour id {to} out of range for n={n}"),
                    });
                }
                g.add_edge(v as u32, to as u32);
            }
        }
        Ok(g)
    }

    /// BFS eccentricity of every vertex, used to bound Introduce Case B
    /// candidate search (SPEC_FULL.md §4.1, §4.6.2).
    pub fn eccentricities(&self) -> Vec<u32> {
        let n = self.n();
        let mut ecc = vec![0u32; n];
        for start in 0..n {
            let mut dist = vec![-1i64; n];
            let mut q = VecDeque::new();
            dist[start] = 0;
            q.push_back(start as u32);
            while let Some(x) = q.pop_front() {
                for &y in self.neighbours(x) {
                    if dist[y as usize] < 0 {
                        dist[y as usize] = dist[x as usize] + 1;
                        q.push_back(y);
                    }
                }
            }
            ecc[start] = dist.iter().copied().max().unwrap_or(0).max(0) as u32;
        }
        ecc
    }

    /// Dumps every vertex's adjacency set at trace level, analogous to
    /// `original_source/src/graph.c`'s `graph_print` debug trace.
    pub fn trace_dump(&self, label: &str) {
        for v in 0..self.n() as u32 {
            log::trace!("{label}: {v} -> {:?}", self.neighbours(v));
        }
    }

    /// All vertices reachable from `start`, including `start` itself.
    pub fn bfs_within(&self, start: u32, radius: u32) -> HashSet<u32> {
        let mut dist = vec![-1i64; self.n()];
        let mut out = HashSet::new();
        let mut q = VecDeque::new();
        dist[start as usize] = 0;
        out.insert(start);
        q.push_back(start);
        while let Some(x) = q.pop_front() {
            if dist[x as usize] as u32 >= radius {
                continue;
            }
            for &y in self.neighbours(x) {
                if dist[y as usize] < 0 {
                    dist[y as usize] = dist[x as usize] + 1;
                    out.insert(y);
                    q.push_back(y);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_is_idempotent_and_directed() {
        let mut g = Graph::new(3);
        g.add_edge(0, 1);
        g.add_edge(0, 1);
        assert_eq!(g.edge_count(), 1);
        assert!(g.is_adj(0, 1));
        assert!(!g.is_adj(1, 0));
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut g = Graph::new(2);
        g.add_edge(0, 0);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn eccentricity_of_path() {
        // 0 - 1 - 2
        let mut g = Graph::new(3);
        for (u, v) in [(0, 1), (1, 0), (1, 2), (2, 1)] {
            g.add_edge(u, v);
        }
        let ecc = g.eccentricities();
        assert_eq!(ecc, vec![2, 1, 2]);
    }

    #[test]
    fn load_parses_metis_like_format() {
        let dir = std::env::temp_dir();
        let path = dir.join("subiso_graph_load_test.txt");
        std::fs::write(&path, "3\n1 1\n2 0 2\n1 1\n").unwrap();
        let g = Graph::load(&path, 10, |n, max| Error::HostTooLarge { n, max }).unwrap();
        assert_eq!(g.n(), 3);
        assert!(g.is_adj(0, 1));
        assert!(g.is_adj(1, 0));
        assert!(g.is_adj(1, 2));
        assert!(g.is_adj(2, 1));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_oversized_host_graph() {
        let dir = std::env::temp_dir();
        let path = dir.join("subiso_graph_load_oversized.txt");
        std::fs::write(&path, "3\n0\n0\n0\n").unwrap();
        let err = Graph::load(&path, 2, |n, max| Error::HostTooLarge { n, max }).unwrap_err();
        assert!(matches!(err, Error::HostTooLarge { n: 3, max: 2 }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_oversized_pattern_graph() {
        let dir = std::env::temp_dir();
        let path = dir.join("subiso_graph_load_oversized_pattern.txt");
        std::fs::write(&path, "3\n0\n0\n0\n").unwrap();
        let err = Graph::load(&path, 2, |n, max| Error::PatternTooLarge { n, max }).unwrap_err();
        assert!(matches!(err, Error::PatternTooLarge { n: 3, max: 2 }));
        std::fs::remove_file(&path).ok();
    }
}
