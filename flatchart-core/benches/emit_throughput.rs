//! Emission throughput over synthetic machines: a deep linear chain
//! (stresses the ancestor walks) and a wide flat machine (stresses the
//! table and switch emission).

use criterion::{criterion_group, criterion_main, Criterion};

use flatchart_core::{Hsm, HsmBuilder, RenderConfig, TableCodeGenerator};

fn deep_machine(depth: usize) -> Hsm {
    let mut b = HsmBuilder::new("deep");
    b.event("STEP");
    b.event("RESET");
    let top = b.state(Hsm::ROOT, "L0");
    b.initial(Hsm::ROOT, top, None);
    let mut chain = vec![top];
    for i in 1..depth {
        let next = b.state(chain[i - 1], &format!("L{i}"));
        chain.push(next);
    }
    for i in 0..depth - 1 {
        b.transition(chain[i], &["STEP"], None, Some("n = n + 1;"), chain[i + 1]);
    }
    b.transition(chain[0], &["RESET"], None, None, chain[depth - 1]);
    b.finish().expect("deep machine builds")
}

fn wide_machine(states: usize) -> Hsm {
    let mut b = HsmBuilder::new("wide");
    b.event("NEXT");
    b.event("HOME");
    let mut ids = Vec::with_capacity(states);
    for i in 0..states {
        ids.push(b.state(Hsm::ROOT, &format!("W{i}")));
    }
    b.initial(Hsm::ROOT, ids[0], None);
    for i in 0..states {
        b.transition(
            ids[i],
            &["NEXT"],
            Some("n < 100"),
            Some("n = n + 1;"),
            ids[(i + 1) % states],
        );
        b.transition(ids[i], &["HOME"], None, None, ids[0]);
    }
    b.finish().expect("wide machine builds")
}

fn bench_emit(c: &mut Criterion) {
    let deep = deep_machine(24);
    let wide = wide_machine(64);

    c.bench_function("emit_deep_chain_24", |bench| {
        bench.iter(|| {
            let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
            generator
                .bind(&deep)
                .generate()
                .expect("generation succeeds")
        });
    });

    c.bench_function("emit_wide_flat_64", |bench| {
        bench.iter(|| {
            let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
            generator
                .bind(&wide)
                .generate()
                .expect("generation succeeds")
        });
    });
}

criterion_group!(benches, bench_emit);
criterion_main!(benches);
