//! Benchmarks linearizing a full dispatch into its handle output.

#[path = "../tests/mock_dispatch.rs"]
mod mock_dispatch;

use {
    crate::mock_dispatch::{
        config, consensus_time, exchange_rates, new_arena, new_user_stack, ACCOUNTS,
        TOKEN_SERVICE,
    },
    criterion::{criterion_group, criterion_main, BatchSize, Criterion},
    ledger_savepoint::{StackArena, StackId},
    ledger_state::WritableStates,
    ledger_stream::{ResponseCode, ReversingBehavior, StreamMode, TransactionCategory},
};

const NUM_PRECEDING: usize = 3;
const NUM_CHILDREN: usize = 50;

/// A committed root stack holding the most builders the default limits allow,
/// each created in its own savepoint.
fn setup_dispatch(stream_mode: StreamMode) -> (StackArena, StackId) {
    let mut arena = new_arena(config(NUM_PRECEDING, NUM_CHILDREN, stream_mode));
    let root = new_user_stack(&mut arena);
    let categories = std::iter::repeat(TransactionCategory::Preceding)
        .take(NUM_PRECEDING)
        .chain(std::iter::repeat(TransactionCategory::Child).take(NUM_CHILDREN));
    for (index, category) in categories.enumerate() {
        arena.push_savepoint(root).unwrap();
        let id = arena
            .create_builder(root, ReversingBehavior::Reversible, category, None)
            .unwrap();
        arena
            .builder_mut(id)
            .unwrap()
            .set_status(ResponseCode::Success);
        arena
            .writable_states(root, TOKEN_SERVICE)
            .unwrap()
            .put(ACCOUNTS, (index as u64).to_le_bytes().to_vec(), vec![1]);
    }
    arena.commit_full_stack(root).unwrap();
    (arena, root)
}

fn bench_handle_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_handle_output");
    for stream_mode in [StreamMode::Records, StreamMode::Blocks, StreamMode::Both] {
        group.bench_function(format!("{stream_mode:?}"), |bencher| {
            bencher.iter_batched(
                || setup_dispatch(stream_mode),
                |(mut arena, root)| {
                    arena
                        .build_handle_output(root, consensus_time(), &exchange_rates())
                        .unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_nested_commit(c: &mut Criterion) {
    c.bench_function("commit_full_stack", |bencher| {
        bencher.iter_batched(
            || {
                let mut arena = new_arena(config(NUM_PRECEDING, NUM_CHILDREN, StreamMode::Records));
                let root = new_user_stack(&mut arena);
                for key in 0..NUM_CHILDREN as u64 {
                    arena.push_savepoint(root).unwrap();
                    arena
                        .writable_states(root, TOKEN_SERVICE)
                        .unwrap()
                        .put(ACCOUNTS, key.to_le_bytes().to_vec(), vec![2]);
                }
                (arena, root)
            },
            |(mut arena, root)| arena.commit_full_stack(root).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_handle_output, bench_nested_commit);
criterion_main!(benches);
