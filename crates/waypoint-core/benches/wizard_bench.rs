//! # Wizard Benchmarks
//!
//! Performance benchmarks for waypoint-core wizard operations.
//!
//! Run with: `cargo bench -p waypoint-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use waypoint_core::sample::gateway_dataset;
use waypoint_core::{
    CompatibilityEngine, CompatibilityRule, ComponentId, Dataset, Graph, GraphStore, Node, NodeId,
    NodeOption, NodeType, Path, PathReconstructor, RecipeComposer, RuleKind,
};

/// A chain of N question nodes, each with one option to the next.
fn create_linear_graph(size: usize) -> Graph {
    let mut dataset = Dataset {
        nodes: vec![Node::new("n0", "Start?", NodeType::Root)],
        ..Dataset::default()
    };
    for i in 1..size {
        let from = format!("n{}", i - 1);
        let to = format!("n{i}");
        let option = format!("o{i}");
        dataset
            .nodes
            .push(Node::new(to.as_str(), format!("Question {i}?"), NodeType::Question));
        dataset
            .options
            .push(NodeOption::new(option.as_str(), from.as_str(), format!("Choice {i}")));
        dataset.paths.push(Path::new(from, option, to));
    }
    Graph::try_from(dataset).expect("linear graph")
}

/// N components with a warning rule between each neighbouring pair.
fn create_rule_set(size: usize) -> (CompatibilityEngine, Vec<ComponentId>) {
    let ids: Vec<ComponentId> = (0..size).map(|i| ComponentId::new(format!("c{i}"))).collect();
    let rules = ids.chunks(2).filter_map(|pair| match pair {
        [a, b] => Some(CompatibilityRule::new(a.clone(), b.clone(), RuleKind::Warning, "pair")),
        _ => None,
    });
    (CompatibilityEngine::new(rules), ids)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_graph_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_load");

    for size in [100, 1000, 10000].iter() {
        let dataset = create_linear_graph(*size).to_dataset();
        group.bench_with_input(BenchmarkId::from_parameter(size), &dataset, |b, dataset| {
            b.iter(|| black_box(Graph::from_dataset(dataset.clone())));
        });
    }

    group.finish();
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    for size in [100, 1000, 10000].iter() {
        let graph = create_linear_graph(*size);
        let target = NodeId::new(format!("n{}", size - 1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &target, |b, target| {
            b.iter(|| black_box(PathReconstructor::reconstruct(&graph, target)));
        });
    }

    group.finish();
}

fn bench_check_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_all");

    for size in [10, 50, 200].iter() {
        let (engine, ids) = create_rule_set(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ids, |b, ids| {
            b.iter(|| black_box(engine.check_all(ids)));
        });
    }

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let graph = Graph::try_from(gateway_dataset()).expect("sample");
    let recipe = graph
        .recipe(&NodeId::from("recipe-prod"))
        .expect("lookup")
        .expect("recipe");
    let engine = CompatibilityEngine::default();

    let selections: [(&str, &[&str]); 3] = [
        ("empty", &[]),
        ("granular", &["token-limits-request", "azure-openai-gpt4"]),
        (
            "broad",
            &[
                "token-limits",
                "token-metrics",
                "content-safety",
                "model-backends",
                "load-balancing",
                "circuit-breaker",
                "authentication",
                "resilience-retry",
            ],
        ),
    ];

    for (name, features) in selections {
        let ids: Vec<ComponentId> = features.iter().map(|s| ComponentId::from(*s)).collect();
        let selection = engine.admit(&ids).expect("no rules");
        group.bench_with_input(BenchmarkId::from_parameter(name), &selection, |b, selection| {
            b.iter(|| black_box(RecipeComposer::compose(&recipe, selection)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_load,
    bench_reconstruct,
    bench_check_all,
    bench_compose,
);

criterion_main!(benches);
