//! Views that resolve reads through stacked [`StateChanges`] overlays.

use {
    crate::{changes::StateChanges, Bytes, ReadableStates, State, WritableStates},
    std::collections::{BTreeMap, VecDeque},
};

/// A provider seen through a list of overlays, topmost first.
#[derive(Clone)]
pub struct LayeredState<'a> {
    base: &'a dyn State,
    layers: Vec<&'a StateChanges>,
}

impl<'a> LayeredState<'a> {
    pub fn new(base: &'a dyn State, layers: Vec<&'a StateChanges>) -> Self {
        Self { base, layers }
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// The same view with `top` laid over every other layer.
    pub fn with_top<'b>(&'b self, top: &'b StateChanges) -> LayeredState<'b> {
        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        layers.push(top);
        layers.extend(self.layers.iter().copied());
        LayeredState {
            base: self.base,
            layers,
        }
    }

    pub fn get(&self, service: &str, state_key: &str, key: &[u8]) -> Option<Bytes> {
        for layer in &self.layers {
            if let Some(entry) = layer
                .service(service)
                .and_then(|changes| changes.kv_entry(state_key, key))
            {
                return entry.cloned();
            }
        }
        self.base.get(service, state_key, key)
    }

    pub fn size(&self, service: &str, state_key: &str) -> usize {
        // Bottom to top, so the topmost modification of each key wins.
        let mut present = BTreeMap::new();
        for layer in self.layers.iter().rev() {
            if let Some(changes) = layer.service(service) {
                for (key, value) in changes.kv_changes(state_key) {
                    present.insert(key, value.is_some());
                }
            }
        }
        let mut size = self.base.size(service, state_key);
        for (key, is_present) in present {
            let in_base = self.base.get(service, state_key, key).is_some();
            match (in_base, is_present) {
                (false, true) => size += 1,
                (true, false) => size = size.saturating_sub(1),
                _ => {}
            }
        }
        size
    }

    pub fn singleton(&self, service: &str, state_key: &str) -> Option<Bytes> {
        self.layers
            .iter()
            .find_map(|layer| {
                layer
                    .service(service)
                    .and_then(|changes| changes.singleton(state_key))
            })
            .cloned()
            .or_else(|| self.base.singleton(service, state_key))
    }

    pub fn queue(&self, service: &str, state_key: &str) -> Vec<Bytes> {
        self.layers
            .iter()
            .find_map(|layer| {
                layer
                    .service(service)
                    .and_then(|changes| changes.queue(state_key))
            })
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_else(|| self.base.queue(service, state_key))
    }
}

/// Read-only view of one service through a [`LayeredState`].
#[derive(Clone)]
pub struct LayeredReadableStates<'a> {
    state: LayeredState<'a>,
    service: String,
}

impl<'a> LayeredReadableStates<'a> {
    pub fn new(state: LayeredState<'a>, service: &str) -> Self {
        Self {
            state,
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl ReadableStates for LayeredReadableStates<'_> {
    fn get(&self, state_key: &str, key: &[u8]) -> Option<Bytes> {
        self.state.get(&self.service, state_key, key)
    }

    fn size(&self, state_key: &str) -> usize {
        self.state.size(&self.service, state_key)
    }

    fn singleton(&self, state_key: &str) -> Option<Bytes> {
        self.state.singleton(&self.service, state_key)
    }

    fn queue(&self, state_key: &str) -> Vec<Bytes> {
        self.state.queue(&self.service, state_key)
    }
}

/// Writable view of one service: writes go to `top`, reads see `top` over
/// everything below it.
pub struct LayeredWritableStates<'a> {
    top: &'a mut StateChanges,
    below: LayeredState<'a>,
    service: String,
}

impl<'a> LayeredWritableStates<'a> {
    pub fn new(top: &'a mut StateChanges, below: LayeredState<'a>, service: &str) -> Self {
        Self {
            top,
            below,
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn with_queue<R>(
        &mut self,
        state_key: &str,
        f: impl FnOnce(&mut VecDeque<Bytes>) -> R,
    ) -> R {
        let Self {
            top,
            below,
            service,
        } = self;
        let service: &str = service;
        let queue = top
            .service_mut(service)
            .queue_mut(state_key, || below.queue(service, state_key));
        f(queue)
    }
}

impl ReadableStates for LayeredWritableStates<'_> {
    fn get(&self, state_key: &str, key: &[u8]) -> Option<Bytes> {
        self.below
            .with_top(&*self.top)
            .get(&self.service, state_key, key)
    }

    fn size(&self, state_key: &str) -> usize {
        self.below.with_top(&*self.top).size(&self.service, state_key)
    }

    fn singleton(&self, state_key: &str) -> Option<Bytes> {
        self.below
            .with_top(&*self.top)
            .singleton(&self.service, state_key)
    }

    fn queue(&self, state_key: &str) -> Vec<Bytes> {
        self.below.with_top(&*self.top).queue(&self.service, state_key)
    }
}

impl WritableStates for LayeredWritableStates<'_> {
    fn put(&mut self, state_key: &str, key: Bytes, value: Bytes) {
        self.top.service_mut(&self.service).put(state_key, key, value);
    }

    fn remove(&mut self, state_key: &str, key: Bytes) {
        self.top.service_mut(&self.service).remove(state_key, key);
    }

    fn put_singleton(&mut self, state_key: &str, value: Bytes) {
        self.top
            .service_mut(&self.service)
            .put_singleton(state_key, value);
    }

    fn add_to_queue(&mut self, state_key: &str, element: Bytes) {
        self.with_queue(state_key, |queue| queue.push_back(element));
    }

    fn poll_queue(&mut self, state_key: &str) -> Option<Bytes> {
        self.with_queue(state_key, |queue| queue.pop_front())
    }

    fn modified_keys(&self, state_key: &str) -> Vec<Bytes> {
        self.top
            .service(&self.service)
            .map(|changes| {
                changes
                    .kv_changes(state_key)
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::memory::MemoryState};

    const SERVICE: &str = "TokenService";

    fn provider() -> MemoryState {
        let mut state = MemoryState::default();
        state.insert(SERVICE, "ACCOUNTS", vec![1], vec![10]);
        state.insert(SERVICE, "ACCOUNTS", vec![2], vec![20]);
        state.set_singleton(SERVICE, "SUPPLY", vec![100]);
        state.push_queue(SERVICE, "EXPIRIES", vec![7]);
        state
    }

    #[test]
    fn test_reads_resolve_top_down() {
        let state = provider();
        let mut lower = StateChanges::default();
        lower.service_mut(SERVICE).put("ACCOUNTS", vec![1], vec![11]);
        lower.service_mut(SERVICE).put_singleton("SUPPLY", vec![101]);
        let mut upper = StateChanges::default();
        upper.service_mut(SERVICE).remove("ACCOUNTS", vec![2]);
        upper.service_mut(SERVICE).put("ACCOUNTS", vec![1], vec![12]);

        let layered = LayeredState::new(&state, vec![&upper, &lower]);
        assert_eq!(layered.get(SERVICE, "ACCOUNTS", &[1]), Some(vec![12]));
        assert_eq!(layered.get(SERVICE, "ACCOUNTS", &[2]), None);
        assert_eq!(layered.singleton(SERVICE, "SUPPLY"), Some(vec![101]));
        assert_eq!(layered.queue(SERVICE, "EXPIRIES"), vec![vec![7]]);

        let lower_only = LayeredState::new(&state, vec![&lower]);
        assert_eq!(lower_only.get(SERVICE, "ACCOUNTS", &[2]), Some(vec![20]));
    }

    #[test]
    fn test_size_counts_net_additions_and_removals() {
        let state = provider();
        let mut lower = StateChanges::default();
        lower.service_mut(SERVICE).put("ACCOUNTS", vec![3], vec![30]);
        lower.service_mut(SERVICE).put("ACCOUNTS", vec![4], vec![40]);
        let mut upper = StateChanges::default();
        upper.service_mut(SERVICE).remove("ACCOUNTS", vec![4]);
        upper.service_mut(SERVICE).remove("ACCOUNTS", vec![1]);
        // Removing a key that never existed changes nothing.
        upper.service_mut(SERVICE).remove("ACCOUNTS", vec![9]);
        // Overwriting an existing key changes nothing either.
        upper.service_mut(SERVICE).put("ACCOUNTS", vec![2], vec![21]);

        assert_eq!(LayeredState::new(&state, vec![]).size(SERVICE, "ACCOUNTS"), 2);
        assert_eq!(LayeredState::new(&state, vec![&lower]).size(SERVICE, "ACCOUNTS"), 4);
        assert_eq!(
            LayeredState::new(&state, vec![&upper, &lower]).size(SERVICE, "ACCOUNTS"),
            2
        );
    }

    #[test]
    fn test_writable_view_writes_only_to_top() {
        let state = provider();
        let lower = StateChanges::default();
        let mut top = StateChanges::default();
        {
            let below = LayeredState::new(&state, vec![&lower]);
            let mut writable = LayeredWritableStates::new(&mut top, below, SERVICE);
            writable.put("ACCOUNTS", vec![3], vec![30]);
            writable.remove("ACCOUNTS", vec![1]);
            assert_eq!(writable.get("ACCOUNTS", &[3]), Some(vec![30]));
            assert!(!writable.contains("ACCOUNTS", &[1]));
            assert_eq!(writable.size("ACCOUNTS"), 2);
            assert_eq!(writable.modified_keys("ACCOUNTS"), vec![vec![1], vec![3]]);
        }
        assert!(lower.is_empty());
        assert_eq!(
            top.service(SERVICE).and_then(|changes| changes.kv_entry("ACCOUNTS", &[3])),
            Some(Some(&vec![30]))
        );
        assert_eq!(state.get(SERVICE, "ACCOUNTS", &[1]), Some(vec![10]));
    }

    #[test]
    fn test_writable_queue_copies_from_below() {
        let state = provider();
        let mut lower = StateChanges::default();
        lower
            .service_mut(SERVICE)
            .queue_mut("EXPIRIES", || vec![vec![7]])
            .push_back(vec![8]);
        let mut top = StateChanges::default();
        {
            let below = LayeredState::new(&state, vec![&lower]);
            let mut writable = LayeredWritableStates::new(&mut top, below, SERVICE);
            assert_eq!(writable.poll_queue("EXPIRIES"), Some(vec![7]));
            writable.add_to_queue("EXPIRIES", vec![9]);
            assert_eq!(writable.queue("EXPIRIES"), vec![vec![8], vec![9]]);
        }
        assert_eq!(
            LayeredState::new(&state, vec![&lower]).queue(SERVICE, "EXPIRIES"),
            vec![vec![7], vec![8]]
        );
    }

    #[test]
    fn test_provider_readable_states() {
        let state = provider();
        let readable = state.readable_states(SERVICE);
        assert_eq!(readable.service(), SERVICE);
        assert_eq!(readable.get("ACCOUNTS", &[2]), Some(vec![20]));
        assert_eq!(readable.size("ACCOUNTS"), 2);
        assert_eq!(readable.singleton("SUPPLY"), Some(vec![100]));
        assert!(readable.get("ACCOUNTS", &[5]).is_none());
    }
}
