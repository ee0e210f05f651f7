//! Transaction status codes.

use serde_derive::{Deserialize, Serialize};

/// The status a transaction receipt reports.
///
/// Only the codes handling itself reads or writes are listed; the dispatched
/// business logic is free to set any of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    #[default]
    Ok,
    Success,
    FeeScheduleFilePartUploaded,
    SuccessButMissingExpectedOperation,
    /// A successful transaction whose effects were rolled back by an
    /// enclosing savepoint.
    RevertedSuccess,
    IdenticalScheduleAlreadyCreated,
    MaxChildRecordsExceeded,
    RecursiveSchedulingLimitReached,
    NoSchedulingAllowedAfterScheduledRecursion,
    InsufficientPayerBalance,
    InvalidTransaction,
}

impl ResponseCode {
    /// Whether this status reports success. These are exactly the statuses a
    /// rollback rewrites to [`ResponseCode::RevertedSuccess`].
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::FeeScheduleFilePartUploaded
                | Self::SuccessButMissingExpectedOperation
        )
    }
}
