//! A single transactional frame: uncommitted state plus the builders created
//! while the frame was on top of its stack.

use {
    crate::{error::StackError, sink::BuilderSink, store::BuilderId, store::BuilderStore},
    ledger_state::StateChanges,
    ledger_stream::{
        transaction::SharedCustomizer, ResponseCode, ReversingBehavior, StreamBuilder,
        TransactionCategory,
    },
    log::*,
};

/// Where in a stack a savepoint sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavepointKind {
    /// First frame of a root stack; flushes into the stack's outward sink.
    RootFirst,
    /// First frame of a child stack; flushes into the parent stack's top
    /// frame.
    ChildFirst,
    /// Any frame pushed on top of a first frame.
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavepointStatus {
    Active,
    Committed,
    RolledBack,
}

/// How a savepoint's builders land in the sink it flushes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Preceding into preceding, following into following.
    InOrder,
    /// Everything into the preceding list.
    AllPreceding,
    /// Everything into the following list.
    AllFollowing,
}

impl FlushMode {
    /// How the first frame of a child stack with base `category` flushes into
    /// its parent.
    pub fn for_child_base(category: TransactionCategory) -> Self {
        match category {
            TransactionCategory::Preceding => Self::AllPreceding,
            _ => Self::AllFollowing,
        }
    }

    /// Whether `parent` can take `preceding` and `following` builders
    /// flushed this way.
    fn check_room(
        &self,
        parent: &BuilderSink,
        preceding: usize,
        following: usize,
    ) -> Result<(), StackError> {
        match self {
            Self::InOrder => parent.check_room(preceding, following),
            Self::AllPreceding => parent.check_room(preceding + following, 0),
            Self::AllFollowing => parent.check_room(0, preceding + following),
        }
    }

    fn flush(&self, sink: &mut BuilderSink, parent: &mut BuilderSink) -> Result<(), StackError> {
        match self {
            Self::InOrder => sink.flush_in_order(parent),
            Self::AllPreceding => sink.flush_preceding(parent),
            Self::AllFollowing => sink.flush_following(parent),
        }
    }
}

#[derive(Debug)]
pub struct Savepoint {
    kind: SavepointKind,
    status: SavepointStatus,
    flush_mode: FlushMode,
    state: StateChanges,
    sink: BuilderSink,
}

impl Savepoint {
    pub fn new(kind: SavepointKind, sink: BuilderSink, flush_mode: FlushMode) -> Self {
        Self {
            kind,
            status: SavepointStatus::Active,
            flush_mode,
            state: StateChanges::default(),
            sink,
        }
    }

    pub fn kind(&self) -> SavepointKind {
        self.kind
    }

    pub fn status(&self) -> SavepointStatus {
        self.status
    }

    pub fn state(&self) -> &StateChanges {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateChanges {
        &mut self.state
    }

    pub fn sink(&self) -> &BuilderSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut BuilderSink {
        &mut self.sink
    }

    fn ensure_active(&self) -> Result<(), StackError> {
        match self.status {
            SavepointStatus::Active => Ok(()),
            _ => Err(StackError::StackAlreadyFinalized),
        }
    }

    /// Creates a builder in `store` and adds it to this savepoint's sink,
    /// unless its customizer suppresses the record. A base builder always
    /// goes to the following list, since it is the transaction the preceding
    /// list precedes.
    pub fn create_builder(
        &mut self,
        store: &mut BuilderStore,
        reversing_behavior: ReversingBehavior,
        category: TransactionCategory,
        customizer: Option<SharedCustomizer>,
        is_base: bool,
    ) -> Result<BuilderId, StackError> {
        self.ensure_active()?;
        let builder = StreamBuilder::new(reversing_behavior, category, customizer);
        if builder.should_suppress_record() {
            return Ok(store.insert(builder));
        }
        let preceding = category == TransactionCategory::Preceding && !is_base;
        let has_room = if preceding {
            self.sink.preceding_capacity() > 0
        } else {
            self.sink.following_capacity() > 0
        };
        if !has_room {
            warn!("no room left for a {category:?} builder");
            return Err(StackError::CapacityExceeded);
        }
        let id = store.insert(builder);
        if preceding {
            self.sink.add_preceding(id)?;
        } else {
            self.sink.add_following(id)?;
        }
        Ok(id)
    }

    /// Moves every builder into `parent` and hands back the state changes for
    /// the caller to merge into whatever sits below this savepoint.
    ///
    /// Nothing changes if `parent` has no room for the builders.
    pub fn commit(&mut self, parent: &mut BuilderSink) -> Result<StateChanges, StackError> {
        self.ensure_active()?;
        self.flush_mode.flush(&mut self.sink, parent)?;
        self.status = SavepointStatus::Committed;
        Ok(std::mem::take(&mut self.state))
    }

    /// Discards the state changes and moves the builders that survive their
    /// reversing behavior into `parent`.
    ///
    /// Reversible builders lose their side effects and report a success as
    /// reverted; removable builders are erased from `store`; irreversible
    /// builders are kept as they are.
    ///
    /// Nothing changes if `parent` has no room for the surviving builders.
    pub fn rollback(
        &mut self,
        parent: &mut BuilderSink,
        store: &mut BuilderStore,
    ) -> Result<(), StackError> {
        self.ensure_active()?;
        let survives = |id: &&BuilderId| {
            store
                .get(**id)
                .is_some_and(|builder| {
                    builder.reversing_behavior() != ReversingBehavior::Removable
                })
        };
        let preceding = self.sink.preceding().iter().filter(survives).count();
        let following = self.sink.following().iter().filter(survives).count();
        self.flush_mode.check_room(parent, preceding, following)?;

        self.sink.retain(|id| {
            let Some(builder) = store.get_mut(id) else {
                return false;
            };
            match builder.reversing_behavior() {
                ReversingBehavior::Reversible => {
                    builder.null_out_side_effect_fields();
                    if builder.status().is_success() {
                        builder.set_status(ResponseCode::RevertedSuccess);
                    }
                    true
                }
                ReversingBehavior::Removable => {
                    store.remove(id);
                    false
                }
                ReversingBehavior::Irreversible => true,
            }
        });
        self.flush_mode.flush(&mut self.sink, parent)?;
        self.state = StateChanges::default();
        self.status = SavepointStatus::RolledBack;
        Ok(())
    }
}
