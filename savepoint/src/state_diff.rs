//! Block stream state changes for changes about to reach the provider.

use {
    ledger_state::{queue_diff, State, StateChanges},
    ledger_stream::block::{StateChange, StateChangeKind},
};

/// Describes `changes` as the block stream sees them, relative to what
/// `state` holds before they are committed.
///
/// Removing a key the provider never held is not a change. A modified queue
/// becomes the pops from its head followed by the pushes to its tail.
pub fn block_state_changes(state: &dyn State, changes: &StateChanges) -> Vec<StateChange> {
    let mut block_changes = Vec::new();
    for (service, service_changes) in changes.services() {
        let mut push = |state_key: &str, change| {
            block_changes.push(StateChange {
                service: service.to_string(),
                state_key: state_key.to_string(),
                change,
            })
        };

        for state_key in service_changes.kv_state_keys() {
            for (key, value) in service_changes.kv_changes(state_key) {
                match value {
                    Some(value) => push(
                        state_key,
                        StateChangeKind::MapUpdate {
                            key: key.clone(),
                            value: value.clone(),
                        },
                    ),
                    None if state.get(service, state_key, key).is_some() => {
                        push(state_key, StateChangeKind::MapDelete { key: key.clone() })
                    }
                    None => {}
                }
            }
        }

        for (state_key, value) in service_changes.singletons() {
            push(
                state_key,
                StateChangeKind::SingletonUpdate {
                    value: value.clone(),
                },
            );
        }

        for (state_key, queue) in service_changes.queues() {
            let old = state.queue(service, state_key);
            let new: Vec<_> = queue.iter().cloned().collect();
            let (pops, pushes) = queue_diff(&old, &new);
            for _ in 0..pops {
                push(state_key, StateChangeKind::QueuePop);
            }
            for element in pushes {
                push(
                    state_key,
                    StateChangeKind::QueuePush {
                        element: element.clone(),
                    },
                );
            }
        }
    }
    block_changes
}
