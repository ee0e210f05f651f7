//! Dispatch stacks of savepoints, kept in an arena that owns the state
//! provider and every builder.

use {
    crate::{
        config::StackConfig,
        error::StackError,
        output::{self, HandleOutput},
        preset_id::PresetIds,
        savepoint::{FlushMode, Savepoint, SavepointKind},
        sink::BuilderSink,
        state_diff::block_state_changes,
        store::{BuilderId, BuilderStore},
    },
    ledger_state::{State, StateChanges},
    ledger_stream::{
        exchange::ExchangeRateSet, transaction::SharedCustomizer, ReversingBehavior,
        StreamBuilder, Timestamp, TransactionCategory, TransactionId,
    },
    log::*,
    std::{cell::RefCell, collections::HashMap, fmt, rc::Rc},
};

/// Handle to a stack in a [`StackArena`].
///
/// Ids are handed out in increasing order and never reused, so a released
/// id keeps failing with [`StackError::UnknownStack`]. A child is always
/// created after its parent, so a parent's id is always lower than its
/// child's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackId(pub(crate) usize);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack#{}", self.0)
    }
}

/// What a stack's bottom frame reads through to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    /// The arena's state provider.
    Provider,
    /// The top frame of another stack.
    Stack(StackId),
}

#[derive(Debug)]
pub(crate) struct RootState {
    /// Receives the builders of the first frame when it commits or rolls
    /// back; linearization drains it.
    pub(crate) outward: BuilderSink,
    pub(crate) preset_ids: PresetIds,
    pub(crate) builders_linearized: u64,
}

#[derive(Debug)]
pub(crate) enum StackRole {
    Root(RootState),
    Child { parent: StackId },
}

#[derive(Debug)]
pub(crate) struct StackEntry {
    pub(crate) role: StackRole,
    pub(crate) first: Savepoint,
    pub(crate) nested: Vec<Savepoint>,
    pub(crate) base_builder: BuilderId,
    pub(crate) base_category: TransactionCategory,
    pub(crate) child: Option<StackId>,
    /// Builders created without being added to any sink.
    pub(crate) suppressed: Vec<BuilderId>,
}

impl StackEntry {
    pub(crate) fn depth(&self) -> usize {
        1 + self.nested.len()
    }

    pub(crate) fn frame(&self, index: usize) -> Option<&Savepoint> {
        match index {
            0 => Some(&self.first),
            _ => self.nested.get(index - 1),
        }
    }

    pub(crate) fn top(&self) -> &Savepoint {
        self.nested.last().unwrap_or(&self.first)
    }

    pub(crate) fn top_mut(&mut self) -> &mut Savepoint {
        self.nested.last_mut().unwrap_or(&mut self.first)
    }

    pub(crate) fn parent(&self) -> Option<StackId> {
        match self.role {
            StackRole::Root(_) => None,
            StackRole::Child { parent } => Some(parent),
        }
    }

    pub(crate) fn sinks(&self) -> impl Iterator<Item = &BuilderSink> {
        let outward = match &self.role {
            StackRole::Root(root) => Some(&root.outward),
            StackRole::Child { .. } => None,
        };
        outward
            .into_iter()
            .chain(std::iter::once(self.first.sink()))
            .chain(self.nested.iter().map(Savepoint::sink))
    }

    /// Whether the stack holds nothing the caller still has to resolve.
    fn is_finished(&self) -> bool {
        self.child.is_none()
            && self.nested.is_empty()
            && self.first.sink().is_empty()
            && self.first.state().is_empty()
    }
}

/// One frame of the layer path of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayerRef {
    pub(crate) stack: StackId,
    pub(crate) frame: usize,
}

/// Owns the state provider, the builders, and every live dispatch stack.
///
/// A root stack belongs to a top-level dispatch and commits into the
/// provider. A child stack belongs to a dispatch triggered by another one:
/// it reads through to its parent's top frame and commits into it. A stack
/// with a live child cannot be modified until the child is released.
pub struct StackArena {
    pub(crate) state: Box<dyn State>,
    pub(crate) config: StackConfig,
    pub(crate) builders: BuilderStore,
    pub(crate) stacks: StackSlots,
    generation: u64,
    layer_paths: RefCell<HashMap<StackId, (u64, Rc<[LayerRef]>)>>,
}

/// Every stack created since the last time all of them were released,
/// indexed by id.
#[derive(Debug, Default)]
pub(crate) struct StackSlots {
    /// Id of the stack in `entries[0]`.
    first_id: usize,
    entries: Vec<Option<StackEntry>>,
}

impl StackSlots {
    fn view(&self) -> StackView<'_> {
        StackView {
            first_id: self.first_id,
            entries: &self.entries,
        }
    }

    pub(crate) fn get(&self, id: StackId) -> Result<&StackEntry, StackError> {
        self.view().get(id)
    }

    fn index(&self, id: StackId) -> Result<usize, StackError> {
        id.0.checked_sub(self.first_id)
            .filter(|index| *index < self.entries.len())
            .ok_or(StackError::UnknownStack(id))
    }

    fn get_mut(&mut self, id: StackId) -> Result<&mut StackEntry, StackError> {
        let index = self.index(id)?;
        self.entries
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(StackError::UnknownStack(id))
    }

    /// The entry of a stack that may be modified, i.e. has no live child.
    pub(crate) fn idle_mut(&mut self, id: StackId) -> Result<&mut StackEntry, StackError> {
        let entry = self.get_mut(id)?;
        if entry.child.is_some() {
            return Err(StackError::ActiveChildStack(id));
        }
        Ok(entry)
    }

    /// The idle entry of `id` together with every stack created before it.
    pub(crate) fn split_idle_mut(
        &mut self,
        id: StackId,
    ) -> Result<(EarlierStacks<'_>, &mut StackEntry), StackError> {
        let index = self.index(id)?;
        let (earlier, rest) = self.entries.split_at_mut(index);
        let entry = rest
            .first_mut()
            .and_then(Option::as_mut)
            .ok_or(StackError::UnknownStack(id))?;
        if entry.child.is_some() {
            return Err(StackError::ActiveChildStack(id));
        }
        let earlier = EarlierStacks {
            first_id: self.first_id,
            entries: earlier,
        };
        Ok((earlier, entry))
    }

    /// Mutable access to an idle child stack and to its parent at once.
    fn child_and_parent(
        &mut self,
        child: StackId,
        parent: StackId,
    ) -> Result<(&mut StackEntry, &mut StackEntry), StackError> {
        let (earlier, child_entry) = self.split_idle_mut(child)?;
        let parent_entry = earlier.into_entry_mut(parent)?;
        Ok((child_entry, parent_entry))
    }

    fn push(&mut self, entry: StackEntry) -> StackId {
        let id = StackId(self.first_id + self.entries.len());
        self.entries.push(Some(entry));
        id
    }

    /// Removes a stack. Once no stack is left the slots are dropped, and
    /// numbering continues after the last id handed out.
    fn take(&mut self, id: StackId) -> Option<StackEntry> {
        let index = self.index(id).ok()?;
        let entry = self.entries.get_mut(index).and_then(Option::take)?;
        if self.entries.iter().all(Option::is_none) {
            self.first_id += self.entries.len();
            self.entries.clear();
        }
        Some(entry)
    }
}

/// Shared lookups into a range of stack slots.
#[derive(Clone, Copy)]
pub(crate) struct StackView<'a> {
    first_id: usize,
    entries: &'a [Option<StackEntry>],
}

impl<'a> StackView<'a> {
    pub(crate) fn get(&self, id: StackId) -> Result<&'a StackEntry, StackError> {
        id.0.checked_sub(self.first_id)
            .and_then(|index| self.entries.get(index))
            .and_then(Option::as_ref)
            .ok_or(StackError::UnknownStack(id))
    }
}

/// The stacks created before the one handed out by
/// [`StackSlots::split_idle_mut`]. Ancestors of that stack are among them.
pub(crate) struct EarlierStacks<'a> {
    first_id: usize,
    entries: &'a mut [Option<StackEntry>],
}

impl<'a> EarlierStacks<'a> {
    fn into_entry_mut(self, id: StackId) -> Result<&'a mut StackEntry, StackError> {
        let Self { first_id, entries } = self;
        let index = id
            .0
            .checked_sub(first_id)
            .ok_or(StackError::UnknownStack(id))?;
        entries
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(StackError::UnknownStack(id))
    }

    pub(crate) fn into_view(self) -> StackView<'a> {
        StackView {
            first_id: self.first_id,
            entries: self.entries,
        }
    }
}

/// Budget and flush mode for the first frame of a child stack whose parent
/// currently has `parent_top` on top.
fn child_first_frame(parent_top: &BuilderSink, base_category: TransactionCategory) -> Savepoint {
    let flush_mode = FlushMode::for_child_base(base_category);
    let budget = match flush_mode {
        FlushMode::AllPreceding => parent_top.preceding_capacity(),
        _ => parent_top.following_capacity(),
    };
    Savepoint::new(
        SavepointKind::ChildFirst,
        BuilderSink::shared(budget),
        flush_mode,
    )
}

fn root_first_frame(outward: &BuilderSink) -> Savepoint {
    Savepoint::new(SavepointKind::RootFirst, outward.nested(), FlushMode::InOrder)
}

#[derive(Clone, Copy)]
enum Resolution {
    Commit,
    Rollback,
}

impl StackArena {
    pub fn new(state: Box<dyn State>, config: StackConfig) -> Self {
        Self {
            state,
            config,
            builders: BuilderStore::default(),
            stacks: StackSlots::default(),
            generation: 0,
            layer_paths: RefCell::default(),
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// The committed state every root stack writes into.
    pub fn state(&self) -> &dyn State {
        self.state.as_ref()
    }

    pub fn builder(&self, id: BuilderId) -> Option<&StreamBuilder> {
        self.builders.get(id)
    }

    pub fn builder_mut(&mut self, id: BuilderId) -> Option<&mut StreamBuilder> {
        self.builders.get_mut(id)
    }

    /// Number of live builders, whether or not they sit in a sink.
    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }

    fn invalidate_layer_paths(&mut self) {
        self.generation += 1;
    }

    fn insert_entry(&mut self, entry: StackEntry) -> StackId {
        let id = self.stacks.push(entry);
        self.invalidate_layer_paths();
        id
    }

    /// Creates the stack of a top-level dispatch, with its base builder in
    /// the first frame.
    pub fn new_root_stack(
        &mut self,
        base_category: TransactionCategory,
        base_reversing: ReversingBehavior,
        customizer: Option<SharedCustomizer>,
    ) -> Result<StackId, StackError> {
        let outward = BuilderSink::new(
            self.config.max_preceding_records,
            self.config.max_following_records + 1,
        );
        let mut first = root_first_frame(&outward);
        let base_builder =
            first.create_builder(&mut self.builders, base_reversing, base_category, customizer, true)?;
        let suppressed = self.suppressed(base_builder);
        let id = self.insert_entry(StackEntry {
            role: StackRole::Root(RootState {
                outward,
                preset_ids: PresetIds::default(),
                builders_linearized: 0,
            }),
            first,
            nested: Vec::new(),
            base_builder,
            base_category,
            child: None,
            suppressed,
        });
        debug!("created root {id} for a {base_category:?} dispatch");
        Ok(id)
    }

    /// Creates the stack of a dispatch triggered from `parent`'s top frame.
    ///
    /// The child stack may produce as many builders, its base builder
    /// included, as `parent`'s top frame still has room for in the list the
    /// child flushes into.
    pub fn new_child_stack(
        &mut self,
        parent: StackId,
        base_category: TransactionCategory,
        base_reversing: ReversingBehavior,
        customizer: Option<SharedCustomizer>,
    ) -> Result<StackId, StackError> {
        let parent_entry = self.stacks.idle_mut(parent)?;
        let mut first = child_first_frame(parent_entry.top().sink(), base_category);
        let base_builder =
            first.create_builder(&mut self.builders, base_reversing, base_category, customizer, true)?;
        let suppressed = self.suppressed(base_builder);
        let id = self.insert_entry(StackEntry {
            role: StackRole::Child { parent },
            first,
            nested: Vec::new(),
            base_builder,
            base_category,
            child: None,
            suppressed,
        });
        if let Ok(parent_entry) = self.stacks.get_mut(parent) {
            parent_entry.child = Some(id);
        }
        debug!("created child {id} of {parent} for a {base_category:?} dispatch");
        Ok(id)
    }

    fn suppressed(&self, id: BuilderId) -> Vec<BuilderId> {
        self.builders
            .get(id)
            .filter(|builder| builder.should_suppress_record())
            .map(|_| vec![id])
            .unwrap_or_default()
    }

    /// Removes a stack whose work is fully committed or rolled back. A root
    /// stack must also have been linearized.
    pub fn release_stack(&mut self, stack: StackId) -> Result<(), StackError> {
        let entry = self.stacks.get(stack)?;
        if entry.child.is_some() {
            return Err(StackError::ActiveChildStack(stack));
        }
        let outward_drained = match &entry.role {
            StackRole::Root(root) => root.outward.is_empty(),
            StackRole::Child { .. } => true,
        };
        if !entry.is_finished() || !outward_drained {
            return Err(StackError::UnfinishedStack(stack));
        }
        let Some(entry) = self.stacks.take(stack) else {
            return Err(StackError::UnknownStack(stack));
        };
        if let Some(parent) = entry.parent() {
            if let Ok(parent_entry) = self.stacks.get_mut(parent) {
                parent_entry.child = None;
            }
        }
        for id in entry.suppressed {
            self.builders.remove(id);
        }
        self.layer_paths.borrow_mut().remove(&stack);
        self.invalidate_layer_paths();
        debug!("released {stack}");
        Ok(())
    }

    pub fn state_source(&self, stack: StackId) -> Result<StateSource, StackError> {
        Ok(match self.stacks.get(stack)?.parent() {
            None => StateSource::Provider,
            Some(parent) => StateSource::Stack(parent),
        })
    }

    pub fn base_builder(&self, stack: StackId) -> Result<BuilderId, StackError> {
        Ok(self.stacks.get(stack)?.base_builder)
    }

    /// Number of frames on the stack, the first frame included.
    pub fn depth(&self, stack: StackId) -> Result<usize, StackError> {
        Ok(self.stacks.get(stack)?.depth())
    }

    /// Total number of builders linearized by a root stack so far.
    pub fn builders_linearized(&self, root: StackId) -> Result<u64, StackError> {
        match &self.stacks.get(root)?.role {
            StackRole::Root(root_state) => Ok(root_state.builders_linearized),
            StackRole::Child { .. } => Err(StackError::NotRootStack(root)),
        }
    }

    /// Creates a builder in the top frame of `stack`.
    pub fn create_builder(
        &mut self,
        stack: StackId,
        reversing_behavior: ReversingBehavior,
        category: TransactionCategory,
        customizer: Option<SharedCustomizer>,
    ) -> Result<BuilderId, StackError> {
        let entry = self.stacks.idle_mut(stack)?;
        let id = entry.top_mut().create_builder(
            &mut self.builders,
            reversing_behavior,
            category,
            customizer,
            false,
        )?;
        if self
            .builders
            .get(id)
            .is_some_and(StreamBuilder::should_suppress_record)
        {
            entry.suppressed.push(id);
        }
        Ok(id)
    }

    /// Opens a nested frame whose state overlays the current top frame.
    pub fn push_savepoint(&mut self, stack: StackId) -> Result<(), StackError> {
        let entry = self.stacks.idle_mut(stack)?;
        let sink = entry.top().sink().nested();
        entry
            .nested
            .push(Savepoint::new(SavepointKind::Nested, sink, FlushMode::InOrder));
        let depth = entry.depth();
        self.invalidate_layer_paths();
        trace!("pushed savepoint on {stack}, depth {depth}");
        Ok(())
    }

    /// Commits the top frame into the frame below it.
    ///
    /// The first frame is only resolved by [`Self::commit_full_stack`] or
    /// [`Self::rollback_full_stack`]; with no nested frame left this fails
    /// with [`StackError::StackAlreadyFinalized`] and changes nothing.
    pub fn commit_top(&mut self, stack: StackId) -> Result<(), StackError> {
        let entry = self.stacks.idle_mut(stack)?;
        Self::resolve_top(entry, &mut self.builders, Resolution::Commit)?;
        self.invalidate_layer_paths();
        trace!("committed top savepoint of {stack}");
        Ok(())
    }

    /// Rolls back the top frame into the frame below it. Same preconditions
    /// as [`Self::commit_top`].
    pub fn rollback_top(&mut self, stack: StackId) -> Result<(), StackError> {
        let entry = self.stacks.idle_mut(stack)?;
        Self::resolve_top(entry, &mut self.builders, Resolution::Rollback)?;
        self.invalidate_layer_paths();
        trace!("rolled back top savepoint of {stack}");
        Ok(())
    }

    fn resolve_top(
        entry: &mut StackEntry,
        builders: &mut BuilderStore,
        resolution: Resolution,
    ) -> Result<(), StackError> {
        let Some(mut savepoint) = entry.nested.pop() else {
            return Err(StackError::StackAlreadyFinalized);
        };
        let below = entry.nested.last_mut().unwrap_or(&mut entry.first);
        let result = match resolution {
            Resolution::Commit => savepoint
                .commit(below.sink_mut())
                .map(|changes| below.state_mut().merge(changes)),
            Resolution::Rollback => savepoint.rollback(below.sink_mut(), builders),
        };
        if result.is_err() {
            entry.nested.push(savepoint);
        }
        result
    }

    fn resolve_nested(
        &mut self,
        stack: StackId,
        resolution: Resolution,
    ) -> Result<(), StackError> {
        let entry = self.stacks.idle_mut(stack)?;
        while !entry.nested.is_empty() {
            Self::resolve_top(entry, &mut self.builders, resolution)?;
        }
        Ok(())
    }

    /// Commits every frame, innermost first, and starts a fresh first frame.
    ///
    /// A root stack commits its state into the provider; when the stream mode
    /// produces blocks, the base builder also gets the resulting state
    /// changes. A child stack commits into its parent's top frame.
    pub fn commit_full_stack(&mut self, stack: StackId) -> Result<(), StackError> {
        let base_builder = self.base_builder(stack)?;
        self.commit_full_stack_into(stack, base_builder)
    }

    /// Like [`Self::commit_full_stack`], but the block state changes go to
    /// `builder` instead of the base builder.
    pub fn commit_transaction(
        &mut self,
        stack: StackId,
        builder: BuilderId,
    ) -> Result<(), StackError> {
        self.commit_full_stack_into(stack, builder)
    }

    fn commit_full_stack_into(
        &mut self,
        stack: StackId,
        state_changes_builder: BuilderId,
    ) -> Result<(), StackError> {
        self.resolve_nested(stack, Resolution::Commit)?;
        let parent = self.stacks.get(stack)?.parent();
        match parent {
            None => {
                let entry = self.stacks.idle_mut(stack)?;
                let StackRole::Root(root) = &mut entry.role else {
                    return Err(StackError::NotRootStack(stack));
                };
                let changes = entry.first.commit(&mut root.outward)?;
                entry.first = root_first_frame(&root.outward);
                self.commit_to_provider(changes, state_changes_builder);
            }
            Some(parent) => {
                let (entry, parent_entry) = self.stacks.child_and_parent(stack, parent)?;
                let parent_top = parent_entry.top_mut();
                let changes = entry.first.commit(parent_top.sink_mut())?;
                parent_top.state_mut().merge(changes);
                entry.first = child_first_frame(parent_top.sink(), entry.base_category);
            }
        }
        self.invalidate_layer_paths();
        debug!("committed full {stack}");
        Ok(())
    }

    fn commit_to_provider(&mut self, changes: StateChanges, state_changes_builder: BuilderId) {
        if self.config.stream_mode.produces_blocks() {
            let block_changes = block_state_changes(self.state.as_ref(), &changes);
            match self.builders.get_mut(state_changes_builder) {
                Some(builder) => {
                    builder.add_state_changes(block_changes);
                }
                None => warn!(
                    "{state_changes_builder} is gone, dropping {} block state changes",
                    block_changes.len()
                ),
            }
        }
        self.state.commit(changes);
    }

    /// Rolls back every frame, innermost first, and starts a fresh first
    /// frame. Surviving builders still flow outward.
    pub fn rollback_full_stack(&mut self, stack: StackId) -> Result<(), StackError> {
        self.resolve_nested(stack, Resolution::Rollback)?;
        let parent = self.stacks.get(stack)?.parent();
        match parent {
            None => {
                let entry = self.stacks.idle_mut(stack)?;
                let StackRole::Root(root) = &mut entry.role else {
                    return Err(StackError::NotRootStack(stack));
                };
                entry.first.rollback(&mut root.outward, &mut self.builders)?;
                entry.first = root_first_frame(&root.outward);
            }
            Some(parent) => {
                let (entry, parent_entry) = self.stacks.child_and_parent(stack, parent)?;
                let parent_top = parent_entry.top_mut();
                entry
                    .first
                    .rollback(parent_top.sink_mut(), &mut self.builders)?;
                entry.first = child_first_frame(parent_top.sink(), entry.base_category);
            }
        }
        self.invalidate_layer_paths();
        debug!("rolled back full {stack}");
        Ok(())
    }

    /// Reserves a transaction id for a dispatch that needs its identity
    /// before it finishes. Child stacks reserve from their root.
    pub fn next_preset_transaction_id(
        &mut self,
        stack: StackId,
        is_last_allowed: bool,
    ) -> Result<TransactionId, StackError> {
        let mut root = stack;
        while let Some(parent) = self.stacks.get(root)?.parent() {
            root = parent;
        }
        let stride = i32::try_from(self.config.total_capacity())
            .map_err(|_| StackError::RecursiveSchedulingLimitReached)?;
        let entry = self.stacks.get_mut(root)?;
        let base_id = self
            .builders
            .get(entry.base_builder)
            .and_then(StreamBuilder::transaction_id)
            .copied()
            .ok_or(StackError::MissingBaseTransactionId(root))?;
        let StackRole::Root(root_state) = &mut entry.role else {
            return Err(StackError::NotRootStack(root));
        };
        root_state.preset_ids.next(&base_id, stride, is_last_allowed)
    }

    /// Whether any frame of `stack` holds a builder other than its base
    /// builder.
    pub fn has_non_base_builder(&self, stack: StackId) -> Result<bool, StackError> {
        let entry = self.stacks.get(stack)?;
        Ok(entry
            .sinks()
            .any(|sink| sink.has_builder_other_than(entry.base_builder)))
    }

    /// Calls `f` on every builder of `stack` other than its base builder,
    /// outermost frame first.
    pub fn for_each_non_base_builder(
        &mut self,
        stack: StackId,
        mut f: impl FnMut(&mut StreamBuilder),
    ) -> Result<(), StackError> {
        let entry = self.stacks.get(stack)?;
        let mut ids = Vec::new();
        for sink in entry.sinks() {
            sink.for_each_other_builder(entry.base_builder, |id| ids.push(id));
        }
        for id in ids {
            if let Some(builder) = self.builders.get_mut(id) {
                f(builder);
            }
        }
        Ok(())
    }

    /// Frames every read from `stack` resolves through, topmost first,
    /// ending with the bottom frame of its root stack.
    pub(crate) fn layer_path(&self, stack: StackId) -> Result<Rc<[LayerRef]>, StackError> {
        if let Some((generation, path)) = self.layer_paths.borrow().get(&stack) {
            if *generation == self.generation {
                return Ok(Rc::clone(path));
            }
        }
        let mut path = Vec::new();
        let mut current = Some(stack);
        while let Some(id) = current {
            let entry = self.stacks.get(id)?;
            path.extend((0..entry.depth()).rev().map(|frame| LayerRef { stack: id, frame }));
            current = entry.parent();
        }
        let path: Rc<[LayerRef]> = path.into();
        self.layer_paths
            .borrow_mut()
            .insert(stack, (self.generation, Rc::clone(&path)));
        Ok(path)
    }

    /// Linearizes everything a finished root stack produced.
    ///
    /// Every frame must be resolved first. The builders leave the arena: they
    /// are finalized into the returned output.
    pub fn build_handle_output(
        &mut self,
        root: StackId,
        consensus_time: Timestamp,
        exchange_rates: &ExchangeRateSet,
    ) -> Result<HandleOutput, StackError> {
        let entry = self.stacks.idle_mut(root)?;
        if !entry.is_finished() {
            return Err(StackError::UncommittedSavepoints);
        }
        let StackRole::Root(root_state) = &mut entry.role else {
            return Err(StackError::NotRootStack(root));
        };

        let anchor_index = output::find_anchor(
            root_state
                .outward
                .all_builders()
                .filter_map(|id| self.builders.get(id)),
        )?;
        let anchor_id = root_state
            .outward
            .all_builders()
            .filter_map(|id| self.builders.get(id))
            .nth(anchor_index)
            .and_then(StreamBuilder::transaction_id)
            .copied()
            .ok_or(StackError::MissingBaseTransactionId(root))?;

        let builders: Vec<StreamBuilder> = root_state
            .outward
            .drain()
            .into_iter()
            .filter_map(|id| self.builders.remove(id))
            .collect();
        for id in entry.suppressed.drain(..) {
            self.builders.remove(id);
        }
        root_state.builders_linearized += builders.len() as u64;
        let count = builders.len();
        let output = output::linearize(
            builders,
            anchor_id,
            consensus_time,
            exchange_rates,
            self.config.stream_mode,
        )?;
        debug!(
            "linearized {count} builders of {root} from {}",
            output.first_assigned_consensus_time
        );
        Ok(output)
    }
}
