//! An ordered, in-memory [`State`] provider.

use {
    crate::{
        changes::{queue_diff, StateChanges},
        listener::StateChangeListener,
        Bytes, State,
    },
    log::*,
    std::{
        collections::{BTreeMap, VecDeque},
        sync::Arc,
    },
};

#[derive(Debug, Default, Clone)]
struct ServiceState {
    kv: BTreeMap<String, BTreeMap<Bytes, Bytes>>,
    singletons: BTreeMap<String, Bytes>,
    queues: BTreeMap<String, VecDeque<Bytes>>,
}

/// Committed state held in ordered maps.
///
/// [`State::commit`] applies changes service by service, and within a service
/// key/value states first, then singletons, then queues, each in key order.
/// Listeners see every applied change in exactly that order.
#[derive(Default)]
pub struct MemoryState {
    services: BTreeMap<String, ServiceState>,
    listeners: Vec<Arc<dyn StateChangeListener>>,
}

impl MemoryState {
    pub fn register_listener(&mut self, listener: Arc<dyn StateChangeListener>) {
        self.listeners.push(listener);
    }

    /// Seeds a key/value entry without notifying listeners.
    pub fn insert(&mut self, service: &str, state_key: &str, key: Bytes, value: Bytes) {
        self.service_mut(service)
            .kv
            .entry(state_key.to_string())
            .or_default()
            .insert(key, value);
    }

    /// Seeds a singleton without notifying listeners.
    pub fn set_singleton(&mut self, service: &str, state_key: &str, value: Bytes) {
        self.service_mut(service)
            .singletons
            .insert(state_key.to_string(), value);
    }

    /// Seeds a queue element without notifying listeners.
    pub fn push_queue(&mut self, service: &str, state_key: &str, element: Bytes) {
        self.service_mut(service)
            .queues
            .entry(state_key.to_string())
            .or_default()
            .push_back(element);
    }

    fn service_mut(&mut self, service: &str) -> &mut ServiceState {
        self.services.entry(service.to_string()).or_default()
    }
}

impl State for MemoryState {
    fn get(&self, service: &str, state_key: &str, key: &[u8]) -> Option<Bytes> {
        self.services
            .get(service)
            .and_then(|state| state.kv.get(state_key))
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn size(&self, service: &str, state_key: &str) -> usize {
        self.services
            .get(service)
            .and_then(|state| state.kv.get(state_key))
            .map_or(0, BTreeMap::len)
    }

    fn singleton(&self, service: &str, state_key: &str) -> Option<Bytes> {
        self.services
            .get(service)
            .and_then(|state| state.singletons.get(state_key))
            .cloned()
    }

    fn queue(&self, service: &str, state_key: &str) -> Vec<Bytes> {
        self.services
            .get(service)
            .and_then(|state| state.queues.get(state_key))
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn commit(&mut self, changes: StateChanges) {
        let listeners = &self.listeners;
        let mut applied = 0usize;
        for (service, service_changes) in changes.services() {
            let target = self.services.entry(service.to_string()).or_default();

            for state_key in service_changes.kv_state_keys() {
                let entries = target.kv.entry(state_key.to_string()).or_default();
                for (key, value) in service_changes.kv_changes(state_key) {
                    match value {
                        Some(value) => {
                            entries.insert(key.clone(), value.clone());
                            for listener in listeners {
                                listener.map_update(service, state_key, key, value);
                            }
                        }
                        None => {
                            if entries.remove(key).is_some() {
                                for listener in listeners {
                                    listener.map_delete(service, state_key, key);
                                }
                            }
                        }
                    }
                    applied += 1;
                }
            }

            for (state_key, value) in service_changes.singletons() {
                target.singletons.insert(state_key.to_string(), value.clone());
                for listener in listeners {
                    listener.singleton_update(service, state_key, value);
                }
                applied += 1;
            }

            for (state_key, queue) in service_changes.queues() {
                let old: Vec<Bytes> = target
                    .queues
                    .get(state_key)
                    .map(|queue| queue.iter().cloned().collect())
                    .unwrap_or_default();
                let new: Vec<Bytes> = queue.iter().cloned().collect();
                let (pops, pushes) = queue_diff(&old, &new);
                for listener in listeners {
                    for _ in 0..pops {
                        listener.queue_pop(service, state_key);
                    }
                    for element in pushes {
                        listener.queue_push(service, state_key, element);
                    }
                }
                applied += pops + pushes.len();
                target.queues.insert(state_key.to_string(), queue.clone());
            }
        }
        trace!("committed {applied} state changes");
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex};

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl StateChangeListener for RecordingListener {
        fn map_update(&self, service: &str, state_key: &str, key: &[u8], value: &[u8]) {
            self.push(format!("put {service}.{state_key} {key:?}={value:?}"));
        }

        fn map_delete(&self, service: &str, state_key: &str, key: &[u8]) {
            self.push(format!("delete {service}.{state_key} {key:?}"));
        }

        fn singleton_update(&self, service: &str, state_key: &str, value: &[u8]) {
            self.push(format!("singleton {service}.{state_key} {value:?}"));
        }

        fn queue_push(&self, service: &str, state_key: &str, element: &[u8]) {
            self.push(format!("push {service}.{state_key} {element:?}"));
        }

        fn queue_pop(&self, service: &str, state_key: &str) {
            self.push(format!("pop {service}.{state_key}"));
        }
    }

    #[test]
    fn test_commit_applies_changes() {
        let mut state = MemoryState::default();
        state.insert("TokenService", "ACCOUNTS", vec![1], vec![10]);

        let mut changes = StateChanges::default();
        let token = changes.service_mut("TokenService");
        token.put("ACCOUNTS", vec![2], vec![20]);
        token.remove("ACCOUNTS", vec![1]);
        token.put_singleton("SUPPLY", vec![5]);
        token
            .queue_mut("EXPIRIES", Vec::new)
            .push_back(vec![3]);
        state.commit(changes);

        assert_eq!(state.get("TokenService", "ACCOUNTS", &[1]), None);
        assert_eq!(state.get("TokenService", "ACCOUNTS", &[2]), Some(vec![20]));
        assert_eq!(state.size("TokenService", "ACCOUNTS"), 1);
        assert_eq!(state.singleton("TokenService", "SUPPLY"), Some(vec![5]));
        assert_eq!(state.queue("TokenService", "EXPIRIES"), vec![vec![3]]);
        assert_eq!(state.size("FileService", "FILES"), 0);
    }

    #[test]
    fn test_commit_notifies_listeners_in_order() {
        let listener = Arc::new(RecordingListener::default());
        let mut state = MemoryState::default();
        state.insert("TokenService", "ACCOUNTS", vec![1], vec![10]);
        state.push_queue("TokenService", "EXPIRIES", vec![7]);
        state.push_queue("TokenService", "EXPIRIES", vec![8]);
        state.register_listener(listener.clone());

        let mut changes = StateChanges::default();
        let token = changes.service_mut("TokenService");
        token.put_singleton("SUPPLY", vec![5]);
        token.remove("ACCOUNTS", vec![1]);
        // Removing an absent key is not an observable change.
        token.remove("ACCOUNTS", vec![4]);
        token.put("ACCOUNTS", vec![2], vec![20]);
        let queue = token.queue_mut("EXPIRIES", || vec![vec![7], vec![8]]);
        queue.pop_front();
        queue.push_back(vec![9]);
        changes.service_mut("FileService").put("FILES", vec![0], vec![1]);
        state.commit(changes);

        assert_eq!(
            listener.events(),
            vec![
                "put FileService.FILES [0]=[1]",
                "delete TokenService.ACCOUNTS [1]",
                "put TokenService.ACCOUNTS [2]=[20]",
                "singleton TokenService.SUPPLY [5]",
                "pop TokenService.EXPIRIES",
                "push TokenService.EXPIRIES [9]",
            ]
        );
    }
}
