use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reactor::{Attribute, Reactor};

fn linear_chain(len: usize) -> Reactor<u32> {
    let mut r: Reactor<u32> = Reactor::new();
    let attrs: Vec<Attribute<u32>> = (0..=len).map(|i| Attribute::on(1, format!("a{i}"))).collect();

    for i in 0..len {
        let from = attrs[i].clone();
        let to = attrs[i + 1].clone();
        r.rule(vec![to]).using(vec![from]).by(|cx| {
            let v = *cx.get(0).downcast_ref::<i64>().unwrap();
            cx.set(0, v + 1);
        });
    }

    r.set(attrs[0].clone(), 0i64).unwrap();
    r
}

fn wide_fanout(width: usize) -> Reactor<u32> {
    let mut r: Reactor<u32> = Reactor::new();
    let root = Attribute::on(1, "root");

    for i in 0..width {
        let leaf = Attribute::on(1, format!("leaf{i}"));
        let root_dep = root.clone();
        r.rule(vec![leaf]).using(vec![root_dep]).by(|cx| {
            let v = *cx.get(0).downcast_ref::<i64>().unwrap();
            cx.set(0, v * 2);
        });
    }

    r.set(root, 1i64).unwrap();
    r
}

fn bench_linear_chain(c: &mut Criterion) {
    c.bench_function("linear_chain_1000", |b| {
        b.iter(|| {
            let mut r = linear_chain(1000);
            black_box(r.run().unwrap());
        });
    });
}

fn bench_wide_fanout(c: &mut Criterion) {
    c.bench_function("wide_fanout_1000", |b| {
        b.iter(|| {
            let mut r = wide_fanout(1000);
            black_box(r.run().unwrap());
        });
    });
}

criterion_group!(benches, bench_linear_chain, bench_wide_fanout);
criterion_main!(benches);
