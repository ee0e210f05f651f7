//! Block stream items.

use {
    crate::{
        exchange::ExchangeRateSet,
        ids::{AccountId, Timestamp, TransactionId},
        record::{AccountAmount, TokenTransferList, TransactionReceipt},
        status::ResponseCode,
        transaction::Transaction,
    },
    serde_derive::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChangeKind {
    MapUpdate { key: Vec<u8>, value: Vec<u8> },
    MapDelete { key: Vec<u8> },
    SingletonUpdate { value: Vec<u8> },
    QueuePush { element: Vec<u8> },
    QueuePop,
}

/// One change to committed state, scoped to a service's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub service: String,
    pub state_key: String,
    pub change: StateChangeKind,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub status: ResponseCode,
    pub consensus_timestamp: Timestamp,
    pub parent_consensus_timestamp: Option<Timestamp>,
    pub exchange_rate: Option<ExchangeRateSet>,
    pub transaction_fee: u64,
    pub transfer_list: Vec<AccountAmount>,
    pub token_transfer_lists: Vec<TokenTransferList>,
}

/// Entities created or updated by a transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub account_id: Option<AccountId>,
    pub token_num: Option<u64>,
    pub file_num: Option<u64>,
    pub schedule_num: Option<u64>,
    pub scheduled_transaction_id: Option<TransactionId>,
    pub serial_numbers: Vec<i64>,
    pub new_total_supply: u64,
}

impl TransactionOutput {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockItem {
    EventTransaction(Transaction),
    TransactionResult(TransactionResult),
    TransactionOutput(TransactionOutput),
    StateChanges {
        consensus_timestamp: Timestamp,
        changes: Vec<StateChange>,
    },
}

/// The block items produced by a single finalized builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStreamOutput {
    pub items: Vec<BlockItem>,
    pub transaction_id: Option<TransactionId>,
    pub receipt: TransactionReceipt,
}

impl BlockStreamOutput {
    pub fn transaction_result(&self) -> Option<&TransactionResult> {
        self.items.iter().find_map(|item| match item {
            BlockItem::TransactionResult(result) => Some(result),
            _ => None,
        })
    }

    pub fn state_changes(&self) -> impl Iterator<Item = &StateChange> {
        self.items
            .iter()
            .filter_map(|item| match item {
                BlockItem::StateChanges { changes, .. } => Some(changes),
                _ => None,
            })
            .flatten()
    }
}
