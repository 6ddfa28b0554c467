//! Evaluation engine benchmarks for pennant-core

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pennant_core::{
    Condition, DEFAULT_SEED, EvaluationContext, FlagRules, FlagSchema, FlagValue,
    PercentageRollout, RolloutRule, bucket_of, evaluate, merge,
};
use std::hint::black_box;

fn bucket_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket");
    group.throughput(Throughput::Elements(1));

    for subject in ["u1", "user-1234567890", "a-much-longer-subject-identifier-for-tenants"] {
        group.bench_with_input(BenchmarkId::new("bucket_of", subject.len()), &subject, |b, s| {
            b.iter(|| bucket_of(black_box(s), black_box("new-checkout"), DEFAULT_SEED))
        });
    }

    group.finish();
}

fn rules_with(rule_count: usize) -> FlagRules {
    let schema = FlagSchema::new()
        .with_enum("theme", ["light", "dark", "system"])
        .unwrap();

    let mut builder = FlagRules::builder()
        .schema(schema)
        .static_flag("checkout", "control")
        .rollout(PercentageRollout::new("checkout", 50.0, "rollout-variant").unwrap());

    for i in 0..rule_count {
        builder = builder.rule(RolloutRule::when_all(
            "checkout",
            vec![Condition::is_in("plan", [format!("plan-{i}")])],
            "vip-variant",
        ));
    }
    builder.build()
}

fn evaluate_benchmark(c: &mut Criterion) {
    let ctx = EvaluationContext::new()
        .with_user_id("user-42")
        .with_attribute("plan", "free");
    let fallback = FlagValue::string("fallback");

    let mut group = c.benchmark_group("evaluate");
    group.throughput(Throughput::Elements(1));

    for rule_count in [0, 10, 100] {
        let rules = rules_with(rule_count);
        group.bench_with_input(
            BenchmarkId::new("rules_then_rollout", rule_count),
            &rules,
            |b, rules| b.iter(|| evaluate(black_box("checkout"), &ctx, Some(&fallback), rules)),
        );
    }

    let rules = rules_with(0);
    group.bench_function("schema_default", |b| {
        b.iter(|| evaluate(black_box("theme"), &ctx, None, &rules))
    });

    group.finish();
}

fn merge_benchmark(c: &mut Criterion) {
    let base = (0..20).fold(
        EvaluationContext::new().with_user_id("default-user"),
        |ctx, i| ctx.with_attribute(format!("attr-{i}"), i),
    );
    let call = EvaluationContext::new()
        .with_user_id("123")
        .with_attribute("plan", "premium");

    c.bench_function("context_merge_20_attributes", |b| {
        b.iter(|| merge(black_box(&base), black_box(&call)))
    });
}

criterion_group!(benches, bucket_benchmark, evaluate_benchmark, merge_benchmark);
criterion_main!(benches);
