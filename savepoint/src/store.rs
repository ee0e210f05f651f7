use {
    ledger_stream::StreamBuilder,
    std::{collections::HashMap, fmt},
};

/// Handle to a builder owned by a [`BuilderStore`]. Never reused, so a handle
/// to a removed builder stays dangling instead of aliasing a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuilderId(pub(crate) u64);

impl fmt::Display for BuilderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builder#{}", self.0)
    }
}

/// Owns every live builder. Sinks only hold ids, so moving a builder between
/// sinks never moves the builder itself.
#[derive(Debug, Default)]
pub struct BuilderStore {
    builders: HashMap<BuilderId, StreamBuilder>,
    next_id: u64,
}

impl BuilderStore {
    pub fn insert(&mut self, builder: StreamBuilder) -> BuilderId {
        let id = BuilderId(self.next_id);
        self.next_id += 1;
        self.builders.insert(id, builder);
        id
    }

    pub fn get(&self, id: BuilderId) -> Option<&StreamBuilder> {
        self.builders.get(&id)
    }

    pub fn get_mut(&mut self, id: BuilderId) -> Option<&mut StreamBuilder> {
        self.builders.get_mut(&id)
    }

    pub fn remove(&mut self, id: BuilderId) -> Option<StreamBuilder> {
        self.builders.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}
