//! The state a dispatch reads and writes, seen through layers of uncommitted
//! changes.
//!
//! A [`State`] provider holds the committed state of every service. Everything
//! a dispatch writes lands in a [`StateChanges`] overlay first; overlays are
//! stacked on top of the provider and only reach it through
//! [`State::commit`]. Reads resolve top-down through the overlays and fall
//! back to the provider.

pub mod changes;
pub mod error;
pub mod layered;
pub mod listener;
pub mod memory;
pub mod typed;

pub use {
    changes::{queue_diff, ServiceChanges, StateChanges},
    error::StateError,
    layered::{LayeredReadableStates, LayeredState, LayeredWritableStates},
    listener::StateChangeListener,
    memory::MemoryState,
    typed::{
        ReadableKVState, ReadableQueueState, ReadableSingletonState, WritableKVState,
        WritableQueueState, WritableSingletonState,
    },
};

/// Raw encoded keys, values and queue elements.
pub type Bytes = Vec<u8>;

/// Committed state of every service, addressed by service name and state key.
pub trait State {
    fn get(&self, service: &str, state_key: &str, key: &[u8]) -> Option<Bytes>;

    /// Number of entries in a key/value state.
    fn size(&self, service: &str, state_key: &str) -> usize;

    fn singleton(&self, service: &str, state_key: &str) -> Option<Bytes>;

    /// Queue contents, head first.
    fn queue(&self, service: &str, state_key: &str) -> Vec<Bytes>;

    /// Makes `changes` part of the committed state.
    fn commit(&mut self, changes: StateChanges);

    /// A view of `service` with no uncommitted changes on top.
    fn readable_states(&self, service: &str) -> LayeredReadableStates<'_>
    where
        Self: Sized,
    {
        LayeredReadableStates::new(LayeredState::new(self, Vec::new()), service)
    }
}

/// Read access to the states of one service.
pub trait ReadableStates {
    fn get(&self, state_key: &str, key: &[u8]) -> Option<Bytes>;

    fn contains(&self, state_key: &str, key: &[u8]) -> bool {
        self.get(state_key, key).is_some()
    }

    fn size(&self, state_key: &str) -> usize;

    fn singleton(&self, state_key: &str) -> Option<Bytes>;

    /// Queue contents, head first.
    fn queue(&self, state_key: &str) -> Vec<Bytes>;
}

/// Read and write access to the states of one service. Writes are recorded
/// as uncommitted changes.
pub trait WritableStates: ReadableStates {
    fn put(&mut self, state_key: &str, key: Bytes, value: Bytes);

    fn remove(&mut self, state_key: &str, key: Bytes);

    fn put_singleton(&mut self, state_key: &str, value: Bytes);

    fn add_to_queue(&mut self, state_key: &str, element: Bytes);

    /// Removes and returns the head of the queue.
    fn poll_queue(&mut self, state_key: &str) -> Option<Bytes>;

    /// Keys put or removed through this view, in key order.
    fn modified_keys(&self, state_key: &str) -> Vec<Bytes>;
}
