/*
Harness: load both graphs, build F's (nice) tree decomposition, run
the coloring engine, and report results on stdout (spec.md §6).

Grounded in examples/original_source/src/main.c for orchestration
order and defaults (SEED, rep_cnt = 3^n, max-vertex caps).
*/

use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use rand::SeedableRng;

use subiso::cli::Cli;
use subiso::engine::{check_results, default_rep_cnt, SubIsoEngine};
use subiso::error::{Error, Result};
use subiso::graph::Graph;
use subiso::nice_tree_decomposition::NiceTreeDecomposition;
use subiso::{MAX_F_VERTICES, MAX_G_VERTICES};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    });

    let g = Graph::load(&cli.graph_big, MAX_G_VERTICES, |n, max| Error::HostTooLarge { n, max })?;
    let f = Graph::load(&cli.graph_pattern, MAX_F_VERTICES, |n, max| Error::PatternTooLarge { n, max })?;
    log::debug!("loaded G with {} vertices, F with {} vertices", g.n(), f.n());
    g.trace_dump("G");
    f.trace_dump("F");

    let ntd = NiceTreeDecomposition::build(&f)?;
    log::debug!("built nice tree decomposition: tw = {}, {} nodes", ntd.tw, ntd.nodes.len());

    let rep_cnt = cli.iterations.unwrap_or_else(|| default_rep_cnt(f.n()));
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let start = Instant::now();
    let mut engine = SubIsoEngine::new(&ntd, &f, &g);
    let results = engine.run(rep_cnt, &mut rng);
    let elapsed = start.elapsed();

    if cfg!(debug_assertions) {
        check_results(&f, &g, &results)?;
    }

    for r in &results {
        let line = r.psi.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        println!("{line}");
    }
    println!("UNIQUE subgraphs found after {rep_cnt} runs = {}", results.len());
    println!("Time = {:.6}s, avg time per iteration = {:.6}s", elapsed.as_secs_f64(), elapsed.as_secs_f64() / rep_cnt.max(1) as f64);

    Ok(())
}
