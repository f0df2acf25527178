//! Benchmarks for offset estimation

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stake_timesync::core::{CommunicationTimestamps, Height, Importance, NodeAge, PeerKey, TimeSyncConfig};
use stake_timesync::sync::{
    AggregateSynchronizationFilter, ImportanceSnapshot, TimeSynchronizationSample, TimeSynchronizationSamples,
    TimeSynchronizer,
};

fn peer_key(index: usize) -> PeerKey {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&(index as u64).to_be_bytes());
    PeerKey(bytes)
}

fn create_round(count: usize) -> (ImportanceSnapshot, TimeSynchronizationSamples) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut importances = ImportanceSnapshot::new();
    let mut samples = TimeSynchronizationSamples::new();

    for index in 0..count {
        let key = peer_key(index);
        importances.set(key, Importance(rng.gen_range(10_000..1_000_000)), Height(1));

        let local_send = 1_000_000;
        let local_receive = local_send + rng.gen_range(0..800);
        let remote_receive = (local_send as i64 + rng.gen_range(-5_000i64..5_000)) as u64;
        samples.insert(TimeSynchronizationSample::new(
            key,
            CommunicationTimestamps::new(local_send, local_receive),
            CommunicationTimestamps::new(remote_receive, remote_receive),
        ));
    }

    (importances, samples)
}

fn bench_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");
    let filter = AggregateSynchronizationFilter::default();

    for count in [10, 100, 1_000] {
        let (_, samples) = create_round(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter_batched(
                || samples.clone(),
                |mut samples| {
                    filter.apply(&mut samples, NodeAge(3));
                    black_box(samples)
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_calculate_time_offset(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_time_offset");

    for count in [10, 100, 1_000] {
        let (importances, samples) = create_round(count);
        let mut config = TimeSyncConfig::default();
        config.total_chain_importance = importances.total_importance();
        let synchronizer = TimeSynchronizer::from_config(&config);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter_batched(
                || samples.clone(),
                |samples| black_box(synchronizer.calculate_time_offset(&importances, Height(1), samples, NodeAge(8))),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter_chain, bench_calculate_time_offset);
criterion_main!(benches);
