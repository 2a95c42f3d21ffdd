//! Propagation and reconciliation benchmarks.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use petal_core::reactive::{batch, Computed, Effect, Signal};
use petal_core::vdom::{patch, MemoryTree, Namespace, RetainedTree, VNode};

// =============================================================================
// Reactive Graph
// =============================================================================

/// One signal fanning out to `width` computeds that join in one effect.
fn wide_diamond(width: usize) -> (Signal<i64>, Effect) {
    let source = Signal::new(0i64);
    let branches: Vec<Computed<i64>> = (0..width)
        .map(|i| {
            let source = source.clone();
            Computed::new(move || source.get() + i as i64)
        })
        .collect();
    let effect = Effect::new(move || {
        let sum: i64 = branches.iter().map(Computed::get).sum();
        black_box(sum);
    });
    (source, effect)
}

fn bench_wide_diamond(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_diamond");
    for width in [10, 100, 1000] {
        let (source, _effect) = wide_diamond(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| source.update(|v| v + 1));
        });
    }
    group.finish();
}

fn bench_batched_writes(c: &mut Criterion) {
    let signals: Vec<Signal<i64>> = (0..100).map(Signal::new).collect();
    let readers = signals.clone();
    let _effect = Effect::new(move || {
        black_box(readers.iter().map(Signal::get).sum::<i64>());
    });

    c.bench_function("batched_writes_100", |b| {
        b.iter(|| {
            batch(|| {
                for signal in &signals {
                    signal.update(|v| v + 1);
                }
            })
        });
    });
}

// =============================================================================
// Reconciliation
// =============================================================================

fn list(len: usize, offset: usize) -> Rc<VNode> {
    Rc::new(
        VNode::element("ul").children_from(
            (0..len).map(|i| VNode::element("li").prop("data-index", i as i64).child(format!("item {}", i + offset)).into()),
        ),
    )
}

fn bench_patch_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_list");
    for len in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let mut tree = MemoryTree::new();
            let Ok(container) = tree.create_element("body", Namespace::Html) else {
                return;
            };
            let first = list(len, 0);
            let Ok(live) = patch(&mut tree, &first, &first, &container, None) else {
                return;
            };
            let mut current = first;
            let mut offset = 0;
            b.iter(|| {
                offset += 1;
                let next = list(len, offset);
                let _ = black_box(patch(&mut tree, &current, &next, &container, Some(&live)));
                tree.take_mutations();
                current = next;
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wide_diamond, bench_batched_writes, bench_patch_list);
criterion_main!(benches);
