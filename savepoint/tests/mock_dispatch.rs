#![allow(dead_code)]

use {
    ledger_savepoint::{StackArena, StackConfig, StackId},
    ledger_state::MemoryState,
    ledger_stream::{
        exchange::{ExchangeRate, ExchangeRateSet},
        AccountId, ResponseCode, ReversingBehavior, StreamMode, Timestamp, TransactionCategory,
        TransactionId,
    },
};

pub const TOKEN_SERVICE: &str = "TokenService";
pub const ACCOUNTS: &str = "ACCOUNTS";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn user_transaction_id() -> TransactionId {
    TransactionId::new(AccountId::new(0, 0, 1001), Timestamp::new(1_700_000_000, 0))
}

pub fn consensus_time() -> Timestamp {
    Timestamp::new(1_700_000_005, 500)
}

pub fn exchange_rates() -> ExchangeRateSet {
    ExchangeRateSet {
        current: ExchangeRate {
            hbar_equiv: 1,
            cent_equiv: 12,
            expiration_seconds: 1_700_003_600,
        },
        next: ExchangeRate {
            hbar_equiv: 1,
            cent_equiv: 14,
            expiration_seconds: 1_700_007_200,
        },
    }
}

pub fn config(max_preceding: usize, max_following: usize, stream_mode: StreamMode) -> StackConfig {
    StackConfig {
        max_preceding_records: max_preceding,
        max_following_records: max_following,
        stream_mode,
    }
}

/// An arena over a provider holding account 1 with balance 100.
pub fn new_arena(config: StackConfig) -> StackArena {
    let mut state = MemoryState::default();
    state.insert(TOKEN_SERVICE, ACCOUNTS, vec![1], vec![100]);
    StackArena::new(Box::new(state), config)
}

/// A root stack for a successful user transaction with a known id.
pub fn new_user_stack(arena: &mut StackArena) -> StackId {
    let root = arena
        .new_root_stack(TransactionCategory::User, ReversingBehavior::Reversible, None)
        .unwrap();
    let base = arena.base_builder(root).unwrap();
    arena
        .builder_mut(base)
        .unwrap()
        .set_transaction_id(user_transaction_id())
        .set_status(ResponseCode::Success);
    root
}
