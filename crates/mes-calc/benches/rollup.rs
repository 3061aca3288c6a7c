//! 扁平化與用量累乘基準測試

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mes_calc::{MethodTree, QuantityRollup};
use mes_core::{ItemId, MakeMethodId, MethodNode, NewNode, NodeId};
use rust_decimal::Decimal;

/// 每層 `width` 個子件、共 `depth` 層的樹
fn wide_tree(width: usize, depth: usize) -> Vec<MethodNode> {
    let method = MakeMethodId::new();
    let mut nodes = Vec::new();
    let mut frontier: Vec<Option<NodeId>> = vec![None];

    for _ in 0..depth {
        let mut next = Vec::new();
        for parent in &frontier {
            for order in 0..width {
                let node = NewNode::material(ItemId::new(), Decimal::from(2))
                    .with_order(order as i32)
                    .into_node(NodeId::new(), method, *parent);
                next.push(Some(node.id));
                nodes.push(node);
            }
        }
        frontier = next;
    }

    nodes
}

fn bench_flatten(c: &mut Criterion) {
    let nodes = wide_tree(4, 4);

    c.bench_function("flatten_340_nodes", |b| {
        b.iter(|| {
            let tree = MethodTree::build(black_box(nodes.clone())).unwrap();
            tree.flatten(16).unwrap()
        })
    });
}

fn bench_rollup(c: &mut Criterion) {
    let nodes = wide_tree(4, 4);

    c.bench_function("rollup_all_nodes", |b| {
        b.iter(|| {
            let rollup = QuantityRollup::new(&nodes);
            nodes
                .iter()
                .map(|n| rollup.total_quantity(n).unwrap())
                .fold(Decimal::ZERO, |acc, q| acc + q)
        })
    });
}

criterion_group!(benches, bench_flatten, bench_rollup);
criterion_main!(benches);
