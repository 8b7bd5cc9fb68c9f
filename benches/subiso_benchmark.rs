use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;

use subiso::engine::{default_rep_cnt, SubIsoEngine};
use subiso::graph::Graph;
use subiso::nice_tree_decomposition::NiceTreeDecomposition;

fn complete_graph(n: usize) -> Graph {
    let mut g = Graph::new(n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                g.add_edge(i as u32, j as u32);
            }
        }
    }
    g
}

fn triangle_in_cycle(c: &mut Criterion) {
    let f = complete_graph(3);
    let g = complete_graph(30);
    let ntd = NiceTreeDecomposition::build(&f).unwrap();

    c.bench_function("triangle_in_k30", |b| {
        b.iter(|| {
            let mut engine = SubIsoEngine::new(&ntd, &f, &g);
            let mut rng = rand::rngs::StdRng::seed_from_u64(42);
            black_box(engine.run(default_rep_cnt(f.n()), &mut rng))
        })
    });
}

criterion_group!(benches, triangle_in_cycle);
criterion_main!(benches);
