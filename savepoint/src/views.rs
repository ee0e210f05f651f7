//! State views that always resolve through the frames currently on a stack.

use {
    crate::{
        error::StackError,
        savepoint::Savepoint,
        stack::{LayerRef, StackArena, StackEntry, StackId},
    },
    ledger_state::{LayeredReadableStates, LayeredState, LayeredWritableStates, StateChanges},
};

/// Reads one service through every frame of a stack, its ancestors' frames,
/// and the provider.
pub type StackReadableStates<'a> = LayeredReadableStates<'a>;

/// Writes one service into the top frame of a stack; reads like
/// [`StackReadableStates`].
pub type StackWritableStates<'a> = LayeredWritableStates<'a>;

impl StackArena {
    fn layer(&self, layer: &LayerRef) -> Result<&StateChanges, StackError> {
        self.stacks
            .get(layer.stack)?
            .frame(layer.frame)
            .map(Savepoint::state)
            .ok_or(StackError::UnknownStack(layer.stack))
    }

    /// A view of `service` as the top frame of `stack` sees it.
    pub fn readable_states(
        &self,
        stack: StackId,
        service: &str,
    ) -> Result<StackReadableStates<'_>, StackError> {
        let depth = self.depth(stack)?;
        self.readable_states_at(stack, depth - 1, service)
    }

    /// A view of `service` as frame `frame` of `stack` sees it, counting the
    /// first frame as 0. Frames above it are invisible; a frame that is no
    /// longer on the stack fails with [`StackError::StackAlreadyFinalized`].
    pub fn readable_states_at(
        &self,
        stack: StackId,
        frame: usize,
        service: &str,
    ) -> Result<StackReadableStates<'_>, StackError> {
        let depth = self.depth(stack)?;
        if frame >= depth {
            return Err(StackError::StackAlreadyFinalized);
        }
        let path = self.layer_path(stack)?;
        // The path starts with the stack's own frames, topmost first.
        let layers = path
            .iter()
            .skip(depth - 1 - frame)
            .map(|layer| self.layer(layer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LayeredReadableStates::new(
            LayeredState::new(self.state.as_ref(), layers),
            service,
        ))
    }

    /// A view of `service` that writes into the top frame of `stack`.
    pub fn writable_states(
        &mut self,
        stack: StackId,
        service: &str,
    ) -> Result<StackWritableStates<'_>, StackError> {
        let path = self.layer_path(stack)?;
        let Self { state, stacks, .. } = self;
        // Ancestors always have lower ids than their descendants.
        let (earlier, entry) = stacks.split_idle_mut(stack)?;
        let earlier = earlier.into_view();

        let StackEntry { first, nested, .. } = entry;
        let (top, mut layers) = match nested.split_last_mut() {
            None => (first.state_mut(), Vec::new()),
            Some((top, below)) => {
                let mut layers: Vec<&StateChanges> =
                    below.iter().rev().map(Savepoint::state).collect();
                layers.push(first.state());
                (top.state_mut(), layers)
            }
        };
        for layer in path.iter().filter(|layer| layer.stack != stack) {
            let changes = earlier
                .get(layer.stack)?
                .frame(layer.frame)
                .map(Savepoint::state)
                .ok_or(StackError::UnknownStack(layer.stack))?;
            layers.push(changes);
        }
        Ok(LayeredWritableStates::new(
            top,
            LayeredState::new(&**state, layers),
            service,
        ))
    }
}
