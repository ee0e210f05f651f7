//! Legacy record stream items.

use {
    crate::{
        exchange::ExchangeRateSet,
        ids::{AccountId, Timestamp, TransactionId},
        status::ResponseCode,
        transaction::Transaction,
    },
    serde_derive::{Deserialize, Serialize},
};

/// A signed change to an account's balance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account_id: AccountId,
    pub amount: i64,
    pub is_approval: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferList {
    pub token_num: u64,
    pub transfers: Vec<AccountAmount>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub status: ResponseCode,
    pub exchange_rate: Option<ExchangeRateSet>,
    pub account_id: Option<AccountId>,
    pub token_num: Option<u64>,
    pub file_num: Option<u64>,
    pub schedule_num: Option<u64>,
    pub scheduled_transaction_id: Option<TransactionId>,
    pub serial_numbers: Vec<i64>,
    pub new_total_supply: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub receipt: TransactionReceipt,
    pub transaction_hash: Vec<u8>,
    pub consensus_timestamp: Timestamp,
    pub parent_consensus_timestamp: Option<Timestamp>,
    pub transaction_id: Option<TransactionId>,
    pub memo: String,
    pub transaction_fee: u64,
    pub transfer_list: Vec<AccountAmount>,
    pub token_transfer_lists: Vec<TokenTransferList>,
    pub alias: Vec<u8>,
}

/// A finalized record together with the (possibly customized) transaction it
/// describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTransactionRecord {
    pub transaction: Transaction,
    pub record: TransactionRecord,
}

/// A receipt keyed by the id of the transaction it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedReceipt {
    pub transaction_id: TransactionId,
    pub receipt: TransactionReceipt,
}
