use {crate::error::StackError, ledger_stream::TransactionId};

/// Transaction ids handed out before the transactions they identify finish
/// executing, e.g. to a scheduled transaction that may schedule more work.
///
/// Each reservation skips a whole stride of nonces past the previous one, so
/// the nonces linearization later assigns relative to any reserved id never
/// reach the next reserved id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PresetIds {
    reserved: i32,
    last_reserved: bool,
}

impl PresetIds {
    pub fn reserved(&self) -> i32 {
        self.reserved
    }

    /// Whether the last reservation was marked as the last one allowed.
    pub fn is_exhausted(&self) -> bool {
        self.last_reserved
    }

    pub fn next(
        &mut self,
        base: &TransactionId,
        stride: i32,
        is_last_allowed: bool,
    ) -> Result<TransactionId, StackError> {
        if self.last_reserved {
            return Err(StackError::NoSchedulingAllowedAfterRecursion);
        }
        let reserved = self
            .reserved
            .checked_add(1)
            .ok_or(StackError::RecursiveSchedulingLimitReached)?;
        let nonce = reserved
            .checked_mul(stride)
            .and_then(|skipped| base.nonce.checked_add(skipped))
            .ok_or(StackError::RecursiveSchedulingLimitReached)?;
        self.reserved = reserved;
        self.last_reserved = is_last_allowed;
        Ok(base.with_nonce(nonce))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        assert_matches::assert_matches,
        ledger_stream::{AccountId, Timestamp},
    };

    fn base() -> TransactionId {
        TransactionId::new(AccountId::new(0, 0, 1001), Timestamp::new(1_000, 0))
    }

    #[test]
    fn test_nonces_advance_by_stride() {
        let mut preset = PresetIds::default();
        assert_eq!(preset.next(&base(), 54, false).unwrap().nonce, 54);
        assert_eq!(preset.next(&base(), 54, false).unwrap().nonce, 108);
        assert_eq!(preset.reserved(), 2);
        let id = preset.next(&base().with_nonce(3), 54, false).unwrap();
        assert_eq!(id, base().with_nonce(3 + 3 * 54));
    }

    #[test]
    fn test_no_reservation_after_last_allowed() {
        let mut preset = PresetIds::default();
        preset.next(&base(), 10, true).unwrap();
        assert!(preset.is_exhausted());
        assert_matches!(
            preset.next(&base(), 10, false),
            Err(StackError::NoSchedulingAllowedAfterRecursion)
        );
        assert_eq!(preset.reserved(), 1);
    }

    #[test]
    fn test_overflow_is_a_scheduling_limit() {
        let mut preset = PresetIds::default();
        assert_matches!(
            preset.next(&base().with_nonce(i32::MAX - 5), 10, false),
            Err(StackError::RecursiveSchedulingLimitReached)
        );
        assert_eq!(preset.reserved(), 0);

        let mut preset = PresetIds {
            reserved: i32::MAX,
            last_reserved: false,
        };
        assert_matches!(
            preset.next(&base(), 1, false),
            Err(StackError::RecursiveSchedulingLimitReached)
        );
    }
}
