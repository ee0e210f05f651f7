//! Account and transaction identifiers, and consensus timestamps.

use {
    serde_derive::{Deserialize, Serialize},
    std::fmt,
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A ledger account, addressed by shard, realm and number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl AccountId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// A consensus timestamp with nanosecond resolution.
///
/// Always normalized so that `0 <= nanos < 1_000_000_000`; a timestamp before
/// the epoch carries a negative `seconds` and a non-negative `nanos`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub const EPOCH: Self = Self {
        seconds: 0,
        nanos: 0,
    };

    pub const MIN: Self = Self {
        seconds: i64::MIN,
        nanos: 0,
    };

    pub const MAX: Self = Self {
        seconds: i64::MAX,
        nanos: 999_999_999,
    };

    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self::from_total_nanos(
            i128::from(seconds) * i128::from(NANOS_PER_SECOND) + i128::from(nanos),
        )
    }

    fn total_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SECOND) + i128::from(self.nanos)
    }

    /// Saturates at [`Self::MIN`] and [`Self::MAX`].
    fn from_total_nanos(total: i128) -> Self {
        let per_second = i128::from(NANOS_PER_SECOND);
        let Ok(seconds) = i64::try_from(total.div_euclid(per_second)) else {
            return if total < 0 { Self::MIN } else { Self::MAX };
        };
        Self {
            seconds,
            // Below one second, so it always fits.
            nanos: total.rem_euclid(per_second) as i32,
        }
    }

    /// This timestamp shifted by `nanos` nanoseconds (which may be negative).
    pub fn plus_nanos(&self, nanos: i64) -> Self {
        Self::from_total_nanos(self.total_nanos() + i128::from(nanos))
    }

    pub fn minus_nanos(&self, nanos: i64) -> Self {
        Self::from_total_nanos(self.total_nanos() - i128::from(nanos))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Identity of a transaction.
///
/// Every builder produced while handling one top-level transaction shares its
/// payer and valid start; they are told apart by `nonce`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    pub payer: AccountId,
    pub valid_start: Timestamp,
    pub nonce: i32,
    pub scheduled: bool,
}

impl TransactionId {
    pub fn new(payer: AccountId, valid_start: Timestamp) -> Self {
        Self {
            payer,
            valid_start,
            nonce: 0,
            scheduled: false,
        }
    }

    pub fn with_nonce(&self, nonce: i32) -> Self {
        Self { nonce, ..*self }
    }

    pub fn with_scheduled(&self, scheduled: bool) -> Self {
        Self { scheduled, ..*self }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.payer, self.valid_start)?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        if self.nonce != 0 {
            write!(f, "/{}", self.nonce)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(Timestamp::new(10, 0), 1, Timestamp::new(10, 1); "forward")]
    #[test_case(Timestamp::new(10, 0), -1, Timestamp::new(9, 999_999_999); "backward across second")]
    #[test_case(Timestamp::new(0, 999_999_999), 2, Timestamp::new(1, 1); "forward across second")]
    #[test_case(Timestamp::EPOCH, -3, Timestamp::new(-1, 999_999_997); "before epoch")]
    fn test_plus_nanos(start: Timestamp, nanos: i64, expected: Timestamp) {
        assert_eq!(start.plus_nanos(nanos), expected);
        assert_eq!(expected.minus_nanos(nanos), start);
    }

    #[test]
    fn test_timestamp_ordering_follows_nanos() {
        let base = Timestamp::new(1_700_000_000, 5);
        let earlier = base.minus_nanos(2);
        let later = base.plus_nanos(2);
        assert!(earlier < base);
        assert!(base < later);
    }

    #[test]
    fn test_arithmetic_saturates_at_range_ends() {
        assert_eq!(Timestamp::new(i64::MAX, 999_999_999), Timestamp::MAX);
        assert_eq!(Timestamp::MAX.plus_nanos(1), Timestamp::MAX);
        assert_eq!(Timestamp::MAX.minus_nanos(i64::MIN), Timestamp::MAX);
        assert_eq!(Timestamp::MIN.minus_nanos(1), Timestamp::MIN);
        assert_eq!(Timestamp::MIN.plus_nanos(i64::MIN), Timestamp::MIN);
        assert_eq!(Timestamp::new(i64::MAX, 2_000_000_000), Timestamp::MAX);

        let near_end = Timestamp::MAX.minus_nanos(1);
        assert!(near_end < near_end.plus_nanos(1));
        assert!(near_end.plus_nanos(5) >= near_end);
    }

    #[test]
    fn test_new_normalizes_nanos() {
        assert_eq!(Timestamp::new(1, 1_500_000_000), Timestamp::new(2, 500_000_000));
        assert_eq!(Timestamp::new(1, -1), Timestamp::new(0, 999_999_999));
    }

    #[test]
    fn test_transaction_id_display() {
        let id = TransactionId::new(AccountId::new(0, 0, 2), Timestamp::new(5, 7));
        assert_eq!(id.to_string(), "0.0.2@5.000000007");
        assert_eq!(
            id.with_nonce(3).with_scheduled(true).to_string(),
            "0.0.2@5.000000007?scheduled/3"
        );
    }
}
