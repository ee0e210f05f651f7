use {crate::StackId, ledger_stream::ResponseCode, thiserror::Error};

/// Errors returned by savepoint stacks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A sink has no room left for another builder
    #[error("Maximum number of child records exceeded")]
    CapacityExceeded,
    /// Reserving another preset transaction id would overflow its nonce
    #[error("Recursive scheduling limit reached")]
    RecursiveSchedulingLimitReached,
    /// A preset transaction id was already reserved as the last one allowed
    #[error("No scheduling allowed after scheduled recursion")]
    NoSchedulingAllowedAfterRecursion,
    /// The savepoint was already committed or rolled back
    #[error("Savepoint already finalized")]
    StackAlreadyFinalized,
    /// Linearization found no user or node builder
    #[error("No user or node builder to anchor the handle output")]
    MissingAnchorBuilder,
    /// Linearization found more than one user or node builder
    #[error("{0} user or node builders compete to anchor the handle output")]
    AmbiguousAnchorBuilder(usize),
    /// Linearization was asked for while frames or builders are still open
    #[error("Stack still has uncommitted savepoints")]
    UncommittedSavepoints,
    /// The stack does not exist or was already released
    #[error("Unknown stack: {0}")]
    UnknownStack(StackId),
    /// The operation is only meaningful on a root stack
    #[error("Stack {0} is not a root stack")]
    NotRootStack(StackId),
    /// The stack cannot be touched while one of its child stacks is live
    #[error("Stack {0} has an active child stack")]
    ActiveChildStack(StackId),
    /// A child stack was released before being fully committed or rolled back
    #[error("Stack {0} still has unfinished work")]
    UnfinishedStack(StackId),
    /// Preset ids derive from the base builder's id, which is not set
    #[error("Base builder of stack {0} has no transaction id")]
    MissingBaseTransactionId(StackId),
}

impl StackError {
    /// Whether this error is a violated usage contract rather than a failure
    /// of the transaction being dispatched.
    pub fn is_fatal(&self) -> bool {
        self.response_code().is_none()
    }

    /// The status a dispatch fails with when it runs into this error, if the
    /// error is a transaction-level failure at all.
    pub fn response_code(&self) -> Option<ResponseCode> {
        match self {
            Self::CapacityExceeded => Some(ResponseCode::MaxChildRecordsExceeded),
            Self::RecursiveSchedulingLimitReached => {
                Some(ResponseCode::RecursiveSchedulingLimitReached)
            }
            Self::NoSchedulingAllowedAfterRecursion => {
                Some(ResponseCode::NoSchedulingAllowedAfterScheduledRecursion)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(StackError::CapacityExceeded, Some(ResponseCode::MaxChildRecordsExceeded))]
    #[test_case(
        StackError::RecursiveSchedulingLimitReached,
        Some(ResponseCode::RecursiveSchedulingLimitReached)
    )]
    #[test_case(
        StackError::NoSchedulingAllowedAfterRecursion,
        Some(ResponseCode::NoSchedulingAllowedAfterScheduledRecursion)
    )]
    #[test_case(StackError::StackAlreadyFinalized, None)]
    #[test_case(StackError::MissingAnchorBuilder, None)]
    #[test_case(StackError::UnknownStack(StackId(3)), None)]
    fn test_response_code(error: StackError, expected: Option<ResponseCode>) {
        assert_eq!(error.response_code(), expected);
        assert_eq!(error.is_fatal(), expected.is_none());
    }
}
