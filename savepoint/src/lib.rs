//! Nested savepoints for dispatched transactions.
//!
//! Every top-level transaction executes on a root stack of savepoints held in
//! a [`StackArena`]. Each savepoint owns the state changes and the stream
//! builders produced while it was on top. Committing a savepoint folds both
//! into the savepoint below it; rolling it back discards its state changes
//! and keeps only the builders whose [`ReversingBehavior`] survives a
//! rollback. Transactions dispatched from inside another one run on child
//! stacks that read through to, and commit into, their parent.
//!
//! Once a root stack is fully resolved, [`StackArena::build_handle_output`]
//! orders the surviving builders around the user (or node) transaction,
//! assigns their consensus times and transaction ids, and finalizes them into
//! a [`HandleOutput`].
//!
//! [`ReversingBehavior`]: ledger_stream::ReversingBehavior

pub mod config;
pub mod error;
pub mod output;
pub mod preset_id;
pub mod savepoint;
pub mod sink;
pub mod stack;
pub mod state_diff;
pub mod store;
pub mod views;

pub use {
    config::StackConfig,
    error::StackError,
    output::{BlockRecordSource, HandleOutput, RecordSource},
    preset_id::PresetIds,
    savepoint::{FlushMode, Savepoint, SavepointKind, SavepointStatus},
    sink::BuilderSink,
    stack::{StackArena, StackId, StateSource},
    state_diff::block_state_changes,
    store::{BuilderId, BuilderStore},
    views::{StackReadableStates, StackWritableStates},
};
