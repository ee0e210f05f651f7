//! Capacity-bounded accumulators of builder ids.

use crate::{error::StackError, store::BuilderId};

/// Builders ordered before and after the builder of the transaction that owns
/// the sink, each list bounded by the capacity the sink was created with.
///
/// A sink created with [`BuilderSink::shared`] has one budget for both lists:
/// a child dispatch that flushes everything into one list of its parent can
/// spend its budget on either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSink {
    preceding: Vec<BuilderId>,
    following: Vec<BuilderId>,
    max_preceding: usize,
    max_following: usize,
    shared: bool,
}

impl BuilderSink {
    pub fn new(max_preceding: usize, max_following: usize) -> Self {
        Self {
            preceding: Vec::new(),
            following: Vec::new(),
            max_preceding,
            max_following,
            shared: false,
        }
    }

    pub fn shared(max_total: usize) -> Self {
        Self {
            shared: true,
            ..Self::new(max_total, max_total)
        }
    }

    /// An empty sink whose capacity is whatever this one has left.
    pub fn nested(&self) -> Self {
        if self.shared {
            Self::shared(self.preceding_capacity())
        } else {
            Self::new(self.preceding_capacity(), self.following_capacity())
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// How many more builders `add_preceding` accepts.
    pub fn preceding_capacity(&self) -> usize {
        if self.shared {
            self.max_preceding.saturating_sub(self.len())
        } else {
            self.max_preceding.saturating_sub(self.preceding.len())
        }
    }

    /// How many more builders `add_following` accepts.
    pub fn following_capacity(&self) -> usize {
        if self.shared {
            self.max_following.saturating_sub(self.len())
        } else {
            self.max_following.saturating_sub(self.following.len())
        }
    }

    pub fn add_preceding(&mut self, id: BuilderId) -> Result<(), StackError> {
        if self.preceding_capacity() == 0 {
            return Err(StackError::CapacityExceeded);
        }
        self.preceding.push(id);
        Ok(())
    }

    pub fn add_following(&mut self, id: BuilderId) -> Result<(), StackError> {
        if self.following_capacity() == 0 {
            return Err(StackError::CapacityExceeded);
        }
        self.following.push(id);
        Ok(())
    }

    pub fn preceding(&self) -> &[BuilderId] {
        &self.preceding
    }

    pub fn following(&self) -> &[BuilderId] {
        &self.following
    }

    pub fn len(&self) -> usize {
        self.preceding.len() + self.following.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preceding.is_empty() && self.following.is_empty()
    }

    /// Preceding builders, then following builders, each in insertion order.
    pub fn all_builders(&self) -> impl Iterator<Item = BuilderId> + '_ {
        self.preceding.iter().chain(&self.following).copied()
    }

    pub fn has_builder_other_than(&self, base: BuilderId) -> bool {
        self.all_builders().any(|id| id != base)
    }

    pub fn for_each_other_builder(&self, base: BuilderId, mut f: impl FnMut(BuilderId)) {
        self.all_builders()
            .filter(|id| *id != base)
            .for_each(|id| f(id));
    }

    /// Keeps only the builders for which `keep` returns true, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(BuilderId) -> bool) {
        self.preceding.retain(|id| keep(*id));
        self.following.retain(|id| keep(*id));
    }

    /// Removes every builder, preceding first.
    pub fn drain(&mut self) -> Vec<BuilderId> {
        let mut ids = std::mem::take(&mut self.preceding);
        ids.append(&mut self.following);
        ids
    }

    pub(crate) fn check_room(&self, preceding: usize, following: usize) -> Result<(), StackError> {
        let fits = if self.shared {
            preceding + following <= self.preceding_capacity()
        } else {
            preceding <= self.preceding_capacity() && following <= self.following_capacity()
        };
        if fits {
            Ok(())
        } else {
            Err(StackError::CapacityExceeded)
        }
    }

    /// Moves every builder into the same list of `parent`.
    ///
    /// Nothing moves if `parent` cannot take all of them.
    pub fn flush_in_order(&mut self, parent: &mut BuilderSink) -> Result<(), StackError> {
        parent.check_room(self.preceding.len(), self.following.len())?;
        parent.preceding.append(&mut self.preceding);
        parent.following.append(&mut self.following);
        Ok(())
    }

    /// Moves every builder, preceding first, into the preceding list of
    /// `parent`.
    pub fn flush_preceding(&mut self, parent: &mut BuilderSink) -> Result<(), StackError> {
        parent.check_room(self.len(), 0)?;
        parent.preceding.append(&mut self.drain());
        Ok(())
    }

    /// Moves every builder, preceding first, into the following list of
    /// `parent`.
    pub fn flush_following(&mut self, parent: &mut BuilderSink) -> Result<(), StackError> {
        parent.check_room(0, self.len())?;
        parent.following.append(&mut self.drain());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    fn ids(range: std::ops::Range<u64>) -> Vec<BuilderId> {
        range.map(BuilderId).collect()
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut sink = BuilderSink::new(1, 2);
        sink.add_preceding(BuilderId(0)).unwrap();
        assert_matches!(sink.add_preceding(BuilderId(1)), Err(StackError::CapacityExceeded));
        sink.add_following(BuilderId(2)).unwrap();
        sink.add_following(BuilderId(3)).unwrap();
        assert_matches!(sink.add_following(BuilderId(4)), Err(StackError::CapacityExceeded));
        assert_eq!(
            sink.all_builders().collect::<Vec<_>>(),
            vec![BuilderId(0), BuilderId(2), BuilderId(3)]
        );
    }

    #[test]
    fn test_shared_budget() {
        let mut sink = BuilderSink::shared(3);
        sink.add_preceding(BuilderId(0)).unwrap();
        sink.add_following(BuilderId(1)).unwrap();
        assert_eq!(sink.preceding_capacity(), 1);
        assert_eq!(sink.following_capacity(), 1);
        sink.add_following(BuilderId(2)).unwrap();
        assert_matches!(sink.add_preceding(BuilderId(3)), Err(StackError::CapacityExceeded));
    }

    #[test]
    fn test_nested_inherits_remaining_capacity() {
        let mut sink = BuilderSink::new(2, 5);
        sink.add_preceding(BuilderId(0)).unwrap();
        sink.add_following(BuilderId(1)).unwrap();
        let nested = sink.nested();
        assert!(!nested.is_shared());
        assert_eq!(nested.preceding_capacity(), 1);
        assert_eq!(nested.following_capacity(), 4);

        let mut shared = BuilderSink::shared(4);
        shared.add_following(BuilderId(2)).unwrap();
        let nested = shared.nested();
        assert!(nested.is_shared());
        assert_eq!(nested.preceding_capacity(), 3);
    }

    #[test]
    fn test_flush_in_order_preserves_lists() {
        let mut parent = BuilderSink::new(3, 3);
        parent.add_preceding(BuilderId(0)).unwrap();
        parent.add_following(BuilderId(1)).unwrap();
        let mut child = parent.nested();
        child.add_preceding(BuilderId(2)).unwrap();
        child.add_following(BuilderId(3)).unwrap();

        child.flush_in_order(&mut parent).unwrap();
        assert!(child.is_empty());
        assert_eq!(parent.preceding(), &[BuilderId(0), BuilderId(2)]);
        assert_eq!(parent.following(), &[BuilderId(1), BuilderId(3)]);
    }

    #[test]
    fn test_flush_all_into_one_list() {
        let mut parent = BuilderSink::new(3, 3);
        let mut child = BuilderSink::shared(parent.preceding_capacity());
        child.add_following(BuilderId(0)).unwrap();
        child.add_preceding(BuilderId(1)).unwrap();
        child.flush_preceding(&mut parent).unwrap();
        assert_eq!(parent.preceding(), &[BuilderId(1), BuilderId(0)]);

        let mut child = BuilderSink::shared(parent.following_capacity());
        child.add_following(BuilderId(2)).unwrap();
        child.flush_following(&mut parent).unwrap();
        assert_eq!(parent.following(), &[BuilderId(2)]);
    }

    #[test]
    fn test_flush_without_room_moves_nothing() {
        let mut parent = BuilderSink::new(1, 1);
        let mut child = BuilderSink::new(2, 0);
        child.add_preceding(BuilderId(0)).unwrap();
        child.add_preceding(BuilderId(1)).unwrap();
        assert_matches!(child.flush_in_order(&mut parent), Err(StackError::CapacityExceeded));
        assert_eq!(child.len(), 2);
        assert!(parent.is_empty());
    }

    #[test]
    fn test_other_builders() {
        let mut sink = BuilderSink::new(2, 2);
        sink.add_following(BuilderId(7)).unwrap();
        assert!(!sink.has_builder_other_than(BuilderId(7)));
        sink.add_preceding(BuilderId(8)).unwrap();
        assert!(sink.has_builder_other_than(BuilderId(7)));

        let mut seen = Vec::new();
        sink.for_each_other_builder(BuilderId(7), |id| seen.push(id));
        assert_eq!(seen, vec![BuilderId(8)]);
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut sink = BuilderSink::new(3, 3);
        for id in ids(0..3) {
            sink.add_following(id).unwrap();
        }
        sink.retain(|id| id != BuilderId(1));
        assert_eq!(sink.following(), &[BuilderId(0), BuilderId(2)]);
    }
}
