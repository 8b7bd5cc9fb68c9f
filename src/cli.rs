/*
Command-line argument parsing for the `grs` harness (spec.md §6).

Grounded in examples/original_source/src/main.c's argv handling
(graph_big, graph_pattern, optional seed, optional iteration count),
reimplemented with clap's derive API per the acweathersby-radlr
workspace's own CLI crate precedent.
*/

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "grs", about = "Colored subgraph isomorphism via color-coding and tree-decomposition DP")]
pub struct Cli {
    /// Host graph file (large graph G).
    pub graph_big: PathBuf,

    /// Pattern graph file (small graph F, |V(F)| <= 20).
    pub graph_pattern: PathBuf,

    /// RNG seed; defaults to the process epoch seconds.
    pub seed: Option<u64>,

    /// Iteration count; defaults to 3^|V(F)|.
    pub iterations: Option<u64>,
}
