//! # LLO Plugin Benchmarks
//!
//! Outcome and Reports are on the consensus critical path and must stay pure
//! and fast as the channel set grows.
//!
//! | Phase | Input | Target |
//! |-------|-------|--------|
//! | Outcome | 4 nodes, 1 000 channels | < 50ms |
//! | Reports | 1 000 reportable channels | < 50ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use llo_plugin::{
    AttributedObservation, Decimal, Outcome, OutcomeCodec, OutcomeContext, ReportingPlugin,
    StreamValue,
};
use llo_tests::integration::network::{Deployment, Instance, NANOS_PER_SECOND, GENESIS_SECONDS};
use llo_types::{
    Aggregator, ChannelDefinition, ConfigDigest, LifeCycleStage, ReportFormat, StreamDefinition,
};
use std::time::Duration;

/// Production outcome whose channels each reference their own stream plus a
/// stream shared by all of them.
fn outcome_with_channels(channels: u32) -> Outcome {
    let mut outcome = Outcome::bootstrap(LifeCycleStage::Production);
    outcome.observations_timestamp_nanoseconds = GENESIS_SECONDS * NANOS_PER_SECOND;
    for id in 1..=channels {
        outcome.channel_definitions.insert(
            id,
            ChannelDefinition::new(
                ReportFormat::Json,
                vec![
                    StreamDefinition::new(id, Aggregator::Median),
                    StreamDefinition::new(0, Aggregator::Median),
                ],
            ),
        );
        outcome
            .valid_after_seconds
            .insert(id, (GENESIS_SECONDS - 1) as u32);
        for stream_id in [id, 0] {
            outcome
                .stream_aggregates
                .entry(stream_id)
                .or_default()
                .insert(Aggregator::Median, StreamValue::Decimal(Decimal::from(1)));
        }
    }
    outcome
}

fn setup(channels: u32) -> (Deployment, Instance, OutcomeContext, Vec<AttributedObservation>) {
    let deployment = Deployment::new();
    for stream_id in 0..=channels {
        deployment
            .feed
            .set(stream_id, StreamValue::Decimal(Decimal::from(i64::from(stream_id))));
    }
    let instance = deployment
        .instance(ConfigDigest([0xbe; 32]), 4, 1, None)
        .expect("instance");

    let previous = OutcomeCodec
        .encode(&outcome_with_channels(channels))
        .expect("encode outcome");
    deployment.clock.advance(1);
    let outctx = instance.outcome_context(2, previous);

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let aos = runtime
        .block_on(instance.observe_all(&outctx))
        .expect("observations");
    (deployment, instance, outctx, aos)
}

fn bench_outcome(c: &mut Criterion) {
    let mut group = c.benchmark_group("llo-outcome");
    group.measurement_time(Duration::from_secs(10));

    for channels in [10u32, 100, 1_000] {
        let (_deployment, instance, outctx, aos) = setup(channels);
        let plugin = &instance.nodes[0].plugin;

        group.throughput(Throughput::Elements(u64::from(channels)));
        group.bench_with_input(BenchmarkId::new("outcome", channels), &aos, |b, aos| {
            b.iter(|| black_box(plugin.outcome(&outctx, &[], aos).expect("outcome")))
        });
    }

    group.finish();
}

fn bench_reports(c: &mut Criterion) {
    let mut group = c.benchmark_group("llo-reports");

    for channels in [10u32, 100, 1_000] {
        let (_deployment, instance, _outctx, _aos) = setup(channels);
        let plugin = &instance.nodes[0].plugin;
        let outcome = OutcomeCodec
            .encode(&outcome_with_channels(channels))
            .expect("encode outcome");

        group.throughput(Throughput::Elements(u64::from(channels)));
        group.bench_with_input(BenchmarkId::new("reports", channels), &outcome, |b, outcome| {
            b.iter(|| black_box(plugin.reports(3, outcome).expect("reports")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_outcome, bench_reports);
criterion_main!(benches);
