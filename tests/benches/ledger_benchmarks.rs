//! # Tally-Chain Benchmarks
//!
//! | Crate | Operation | Expected cost |
//! |-------|-----------|---------------|
//! | tc-01 Commitment | build tree / prove | O(n) / O(log n) |
//! | tc-02 Revenue Ledger | addRevenue | O(active members) |
//! | tc-03 Event Merger | k-way merge | O(events · log k) |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{Address, ChainEvent};
use tc_01_commitment::{CommitmentTree, LeafEntry};
use tc_02_revenue_ledger::RevenueLedger;
use tc_03_event_merger::merge_event_streams;

fn address(i: u32) -> Address {
    let mut a = [0u8; 20];
    a[16..].copy_from_slice(&i.to_be_bytes());
    a
}

fn entries(n: u32) -> Vec<LeafEntry> {
    (0..n)
        .map(|i| LeafEntry::new(address(i), u64::from(i) * 1_000))
        .collect()
}

// ============================================================================
// TC-01: Commitment
// ============================================================================

fn bench_commitment(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-01-commitment");
    for size in [100u32, 1_000, 10_000] {
        let leaves = entries(size);
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("build", size), &leaves, |b, leaves| {
            b.iter(|| black_box(CommitmentTree::build(leaves.iter().cloned()).map(|t| t.root())))
        });

        let tree = CommitmentTree::build(leaves).expect("unique addresses");
        let target = address(size / 2);
        group.bench_with_input(BenchmarkId::new("proof", size), &tree, |b, tree| {
            b.iter(|| black_box(tree.proof(&target)))
        });
    }
    group.finish();
}

// ============================================================================
// TC-02: Revenue Ledger
// ============================================================================

fn bench_add_revenue(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-02-revenue-ledger");
    for size in [100u32, 1_000, 10_000] {
        let mut ledger = RevenueLedger::default();
        ledger.add_members((0..size).map(address));
        group.bench_function(BenchmarkId::new("add_revenue", size), |b| {
            b.iter(|| black_box(ledger.add_revenue(black_box(1_000_003u64))))
        });
        group.bench_function(BenchmarkId::new("digest_after_deposit", size), |b| {
            b.iter(|| {
                let _ = ledger.add_revenue(7u64);
                black_box(ledger.digest())
            })
        });
    }
    group.finish();
}

// ============================================================================
// TC-03: Event Merger
// ============================================================================

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-03-event-merger");
    for per_stream in [1_000u64, 10_000] {
        let deposits: Vec<ChainEvent> = (0..per_stream)
            .map(|b| ChainEvent::deposit(b + 1, b))
            .collect();
        let joins: Vec<ChainEvent> = (0..per_stream)
            .step_by(3)
            .map(|b| ChainEvent::joined(vec![address(b as u32)], b))
            .collect();
        group.throughput(Throughput::Elements(per_stream + joins.len() as u64));
        group.bench_function(BenchmarkId::new("two_streams", per_stream), |b| {
            b.iter(|| black_box(merge_event_streams([deposits.clone(), joins.clone()])))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_commitment, bench_add_revenue, bench_merge);
criterion_main!(benches);
