//! Uncommitted modifications layered over a state provider.

use {
    crate::Bytes,
    std::collections::{BTreeMap, VecDeque},
};

/// Modifications to the states of a single service.
///
/// Key/value modifications record `None` for a removed key. Queues are
/// copy-on-write: the first modification copies the queue as seen from below
/// and every later one edits the copy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceChanges {
    kv: BTreeMap<String, BTreeMap<Bytes, Option<Bytes>>>,
    singletons: BTreeMap<String, Bytes>,
    queues: BTreeMap<String, VecDeque<Bytes>>,
}

impl ServiceChanges {
    pub fn is_empty(&self) -> bool {
        self.kv.values().all(BTreeMap::is_empty)
            && self.singletons.is_empty()
            && self.queues.is_empty()
    }

    /// `None` if `key` is untouched here, `Some(None)` if it was removed.
    pub fn kv_entry(&self, state_key: &str, key: &[u8]) -> Option<Option<&Bytes>> {
        self.kv
            .get(state_key)
            .and_then(|entries| entries.get(key))
            .map(Option::as_ref)
    }

    pub fn kv_changes(&self, state_key: &str) -> impl Iterator<Item = (&Bytes, Option<&Bytes>)> {
        self.kv
            .get(state_key)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(key, value)| (key, value.as_ref())))
    }

    pub fn put(&mut self, state_key: &str, key: Bytes, value: Bytes) {
        self.kv
            .entry(state_key.to_string())
            .or_default()
            .insert(key, Some(value));
    }

    pub fn remove(&mut self, state_key: &str, key: Bytes) {
        self.kv
            .entry(state_key.to_string())
            .or_default()
            .insert(key, None);
    }

    pub fn singleton(&self, state_key: &str) -> Option<&Bytes> {
        self.singletons.get(state_key)
    }

    pub fn put_singleton(&mut self, state_key: &str, value: Bytes) {
        self.singletons.insert(state_key.to_string(), value);
    }

    pub fn queue(&self, state_key: &str) -> Option<&VecDeque<Bytes>> {
        self.queues.get(state_key)
    }

    /// The queue copy for `state_key`, created from `below` on first use.
    pub fn queue_mut(
        &mut self,
        state_key: &str,
        below: impl FnOnce() -> Vec<Bytes>,
    ) -> &mut VecDeque<Bytes> {
        self.queues
            .entry(state_key.to_string())
            .or_insert_with(|| below().into())
    }

    pub fn kv_state_keys(&self) -> impl Iterator<Item = &str> {
        self.kv.keys().map(String::as_str)
    }

    pub fn singletons(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.singletons.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn queues(&self) -> impl Iterator<Item = (&str, &VecDeque<Bytes>)> {
        self.queues.iter().map(|(key, queue)| (key.as_str(), queue))
    }

    /// Applies `overlay` on top of these changes; the overlay wins.
    pub fn merge(&mut self, overlay: ServiceChanges) {
        for (state_key, entries) in overlay.kv {
            self.kv.entry(state_key).or_default().extend(entries);
        }
        self.singletons.extend(overlay.singletons);
        self.queues.extend(overlay.queues);
    }
}

/// Modifications to any number of services, kept in a deterministic order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateChanges {
    services: BTreeMap<String, ServiceChanges>,
}

impl StateChanges {
    pub fn is_empty(&self) -> bool {
        self.services.values().all(ServiceChanges::is_empty)
    }

    pub fn service(&self, service: &str) -> Option<&ServiceChanges> {
        self.services.get(service)
    }

    pub fn service_mut(&mut self, service: &str) -> &mut ServiceChanges {
        self.services.entry(service.to_string()).or_default()
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceChanges)> {
        self.services
            .iter()
            .map(|(service, changes)| (service.as_str(), changes))
    }

    /// Applies `overlay` on top of these changes; the overlay wins.
    pub fn merge(&mut self, overlay: StateChanges) {
        for (service, changes) in overlay.services {
            self.services.entry(service).or_default().merge(changes);
        }
    }
}

/// How to turn queue `old` into queue `new` with pops from the head followed
/// by pushes to the tail: returns the number of pops and the pushed elements.
///
/// Queues only ever lose elements at the head and gain them at the tail, so
/// the longest suffix of `old` that is a prefix of `new` is what survived.
pub fn queue_diff<'a>(old: &[Bytes], new: &'a [Bytes]) -> (usize, &'a [Bytes]) {
    let pops = (0..=old.len())
        .find(|&pops| {
            let kept = &old[pops..];
            kept.len() <= new.len() && new[..kept.len()] == *kept
        })
        .unwrap_or(old.len());
    (pops, &new[old.len() - pops..])
}
