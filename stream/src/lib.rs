//! Stream builders and the immutable items they finalize into.
//!
//! Every transaction handled by a node, including the transactions it
//! triggers (preceding, child and scheduled dispatches), is described by a
//! [`StreamBuilder`](builder::StreamBuilder) while it executes. Once all work
//! for a top-level transaction is done, each surviving builder is assigned its
//! final consensus timestamp and transaction id and is built into a record
//! stream item, a set of block stream items, or both, depending on the
//! node's [`StreamMode`](mode::StreamMode).
//!
//! This crate owns only the value types. Deciding which builders survive and
//! in what order they are externalized is the job of `ledger-savepoint`.

pub mod block;
pub mod builder;
pub mod exchange;
pub mod ids;
pub mod mode;
pub mod record;
pub mod status;
pub mod transaction;

pub use {
    builder::{ReversingBehavior, StreamBuilder, TransactionCategory},
    ids::{AccountId, Timestamp, TransactionId},
    mode::StreamMode,
    status::ResponseCode,
};
