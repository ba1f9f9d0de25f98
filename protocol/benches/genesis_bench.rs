// Genesis reconciliation and ledger hot-path benchmarks.
//
// Covers snapshot validation with its supply proof, initializing a store
// from a snapshot, and local transfers between existing accounts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use token_protocol::genesis::{GenesisStore, GenesisSupplyEntry, GenesisUserEntry};
use token_protocol::identifiers::Address;
use token_protocol::storage::MemoryStore;
use token_protocol::test_utils::{Harness, ALICE, BOB, NATIVE_TOKEN, OWN_CHAIN};

/// Snapshot with `n` holders of 1_000 native units each.
fn snapshot(n: usize) -> GenesisStore {
    let user_substore: Vec<GenesisUserEntry> = (0..n as u32)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[16..].copy_from_slice(&i.to_be_bytes());
            GenesisUserEntry {
                address: Address::from_bytes(bytes),
                token_id: NATIVE_TOKEN,
                available_balance: 1_000,
                locked_balances: Vec::new(),
            }
        })
        .collect();
    GenesisStore {
        user_substore,
        supply_substore: vec![GenesisSupplyEntry {
            token_id: NATIVE_TOKEN,
            total_supply: n as u64 * 1_000,
        }],
        ..GenesisStore::default()
    }
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("genesis/validate");
    for n in [100usize, 1_000, 10_000] {
        let genesis = snapshot(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &genesis, |b, genesis| {
            b.iter(|| genesis.validate(OWN_CHAIN));
        });
    }
    group.finish();
}

fn bench_init(c: &mut Criterion) {
    let genesis = snapshot(1_000);
    let h = Harness::new();

    c.bench_function("genesis/init_1000", |b| {
        b.iter(|| {
            let mut store = MemoryStore::new();
            h.method.init_genesis_state(&mut store, &genesis)
        });
    });
}

fn bench_transfer(c: &mut Criterion) {
    let mut h = Harness::new().with_native_balances(&[(ALICE, u64::MAX / 2), (BOB, 1)]);

    c.bench_function("ledger/transfer", |b| {
        b.iter(|| h.run(|m, ctx| m.transfer(ctx, ALICE, BOB, NATIVE_TOKEN, 1)));
    });
}

criterion_group!(benches, bench_validate, bench_init, bench_transfer);
criterion_main!(benches);
