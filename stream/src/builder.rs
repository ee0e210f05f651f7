//! The in-progress description of one transaction's effects.

use {
    crate::{
        block::{BlockItem, BlockStreamOutput, StateChange, TransactionOutput, TransactionResult},
        exchange::ExchangeRateSet,
        ids::{AccountId, Timestamp, TransactionId},
        record::{
            AccountAmount, SingleTransactionRecord, TokenTransferList, TransactionReceipt,
            TransactionRecord,
        },
        status::ResponseCode,
        transaction::{SharedCustomizer, Transaction},
    },
    log::*,
    serde_derive::{Deserialize, Serialize},
};

/// What happens to a builder when the savepoint holding it rolls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReversingBehavior {
    /// Kept unchanged; its effects already escaped the rollback.
    Irreversible,
    /// Kept, with side effects cleared and success reported as reverted.
    Reversible,
    /// Dropped without a trace.
    Removable,
}

/// The role a transaction plays relative to the top-level transaction that
/// caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    User,
    Preceding,
    Child,
    Scheduled,
    Node,
}

impl TransactionCategory {
    /// Whether a builder of this category anchors the identity and consensus
    /// time of everything produced by its top-level transaction.
    pub fn is_anchor(&self) -> bool {
        matches!(self, Self::User | Self::Node)
    }

    /// Whether a builder of this category takes its own nonce offset from
    /// the anchor during linearization.
    pub fn takes_nonce_offset(&self) -> bool {
        matches!(self, Self::Preceding | Self::Child)
    }
}

/// A record (and/or block output) under construction.
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    reversing_behavior: ReversingBehavior,
    category: TransactionCategory,
    customizer: Option<SharedCustomizer>,

    transaction: Transaction,
    transaction_id: Option<TransactionId>,
    status: ResponseCode,
    // Provisional until linearization; builders removed between this one and
    // its parent shift it.
    consensus_timestamp: Timestamp,
    parent_consensus_timestamp: Option<Timestamp>,
    exchange_rate: Option<ExchangeRateSet>,
    memo: String,

    // Side effects.
    transaction_fee: u64,
    transfer_list: Vec<AccountAmount>,
    token_transfer_lists: Vec<TokenTransferList>,
    serial_numbers: Vec<i64>,
    new_total_supply: u64,
    account_id: Option<AccountId>,
    token_num: Option<u64>,
    file_num: Option<u64>,
    schedule_num: Option<u64>,
    scheduled_transaction_id: Option<TransactionId>,
    alias: Vec<u8>,

    state_changes: Vec<StateChange>,
}

impl StreamBuilder {
    pub fn new(
        reversing_behavior: ReversingBehavior,
        category: TransactionCategory,
        customizer: Option<SharedCustomizer>,
    ) -> Self {
        Self {
            reversing_behavior,
            category,
            customizer,
            transaction: Transaction::default(),
            transaction_id: None,
            status: ResponseCode::Ok,
            consensus_timestamp: Timestamp::EPOCH,
            parent_consensus_timestamp: None,
            exchange_rate: None,
            memo: String::new(),
            transaction_fee: 0,
            transfer_list: Vec::new(),
            token_transfer_lists: Vec::new(),
            serial_numbers: Vec::new(),
            new_total_supply: 0,
            account_id: None,
            token_num: None,
            file_num: None,
            schedule_num: None,
            scheduled_transaction_id: None,
            alias: Vec::new(),
            state_changes: Vec::new(),
        }
    }

    pub fn reversing_behavior(&self) -> ReversingBehavior {
        self.reversing_behavior
    }

    pub fn category(&self) -> TransactionCategory {
        self.category
    }

    pub fn should_suppress_record(&self) -> bool {
        self.customizer
            .as_ref()
            .is_some_and(|customizer| customizer.should_suppress_record())
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn set_transaction(&mut self, transaction: Transaction) -> &mut Self {
        self.transaction = transaction;
        self
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Copies this builder's transaction id into its transaction body, so a
    /// nonce assigned late is reflected in the externalized transaction.
    pub fn sync_body_id_from_record_id(&mut self) -> &mut Self {
        self.transaction.body.transaction_id = self.transaction_id;
        self
    }

    pub fn status(&self) -> ResponseCode {
        self.status
    }

    pub fn set_status(&mut self, status: ResponseCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn consensus_timestamp(&self) -> Timestamp {
        self.consensus_timestamp
    }

    pub fn set_consensus_timestamp(&mut self, consensus_timestamp: Timestamp) -> &mut Self {
        self.consensus_timestamp = consensus_timestamp;
        self
    }

    pub fn parent_consensus_timestamp(&self) -> Option<Timestamp> {
        self.parent_consensus_timestamp
    }

    pub fn set_parent_consensus_timestamp(&mut self, parent: Timestamp) -> &mut Self {
        self.parent_consensus_timestamp = Some(parent);
        self
    }

    pub fn exchange_rate(&self) -> Option<&ExchangeRateSet> {
        self.exchange_rate.as_ref()
    }

    pub fn set_exchange_rate(&mut self, exchange_rate: Option<ExchangeRateSet>) -> &mut Self {
        self.exchange_rate = exchange_rate;
        self
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.memo = memo.into();
        self
    }

    pub fn transaction_fee(&self) -> u64 {
        self.transaction_fee
    }

    pub fn set_transaction_fee(&mut self, transaction_fee: u64) -> &mut Self {
        self.transaction_fee = transaction_fee;
        self
    }

    pub fn transfer_list(&self) -> &[AccountAmount] {
        &self.transfer_list
    }

    pub fn set_transfer_list(&mut self, transfer_list: Vec<AccountAmount>) -> &mut Self {
        self.transfer_list = transfer_list;
        self
    }

    pub fn add_token_transfer_list(&mut self, list: TokenTransferList) -> &mut Self {
        self.token_transfer_lists.push(list);
        self
    }

    pub fn token_transfer_lists(&self) -> &[TokenTransferList] {
        &self.token_transfer_lists
    }

    pub fn serial_numbers(&self) -> &[i64] {
        &self.serial_numbers
    }

    pub fn set_serial_numbers(&mut self, serial_numbers: Vec<i64>) -> &mut Self {
        self.serial_numbers = serial_numbers;
        self
    }

    pub fn new_total_supply(&self) -> u64 {
        self.new_total_supply
    }

    pub fn set_new_total_supply(&mut self, new_total_supply: u64) -> &mut Self {
        self.new_total_supply = new_total_supply;
        self
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    pub fn set_account_id(&mut self, account_id: AccountId) -> &mut Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn token_num(&self) -> Option<u64> {
        self.token_num
    }

    pub fn set_token_num(&mut self, token_num: u64) -> &mut Self {
        self.token_num = Some(token_num);
        self
    }

    pub fn file_num(&self) -> Option<u64> {
        self.file_num
    }

    pub fn set_file_num(&mut self, file_num: u64) -> &mut Self {
        self.file_num = Some(file_num);
        self
    }

    pub fn schedule_num(&self) -> Option<u64> {
        self.schedule_num
    }

    pub fn set_schedule_num(&mut self, schedule_num: u64) -> &mut Self {
        self.schedule_num = Some(schedule_num);
        self
    }

    pub fn scheduled_transaction_id(&self) -> Option<&TransactionId> {
        self.scheduled_transaction_id.as_ref()
    }

    pub fn set_scheduled_transaction_id(&mut self, id: TransactionId) -> &mut Self {
        self.scheduled_transaction_id = Some(id);
        self
    }

    pub fn alias(&self) -> &[u8] {
        &self.alias
    }

    pub fn set_alias(&mut self, alias: Vec<u8>) -> &mut Self {
        self.alias = alias;
        self
    }

    pub fn state_changes(&self) -> &[StateChange] {
        &self.state_changes
    }

    pub fn add_state_changes(&mut self, changes: impl IntoIterator<Item = StateChange>) -> &mut Self {
        self.state_changes.extend(changes);
        self
    }

    /// Whether any externally observable side effect is set.
    pub fn has_side_effects(&self) -> bool {
        self.transaction_fee != 0
            || !self.transfer_list.is_empty()
            || !self.token_transfer_lists.is_empty()
            || !self.serial_numbers.is_empty()
            || self.new_total_supply != 0
            || self.account_id.is_some()
            || self.token_num.is_some()
            || self.file_num.is_some()
            || self.schedule_num.is_some()
            || self.scheduled_transaction_id.is_some()
            || !self.alias.is_empty()
    }

    /// Clears every externally observable side effect.
    ///
    /// A schedule that was found to already exist keeps pointing at it, since
    /// that reference is the whole content of the receipt.
    pub fn null_out_side_effect_fields(&mut self) {
        self.transaction_fee = 0;
        self.transfer_list.clear();
        self.token_transfer_lists.clear();
        self.serial_numbers.clear();
        self.new_total_supply = 0;
        self.account_id = None;
        self.token_num = None;
        self.file_num = None;
        if self.status != ResponseCode::IdenticalScheduleAlreadyCreated {
            self.schedule_num = None;
            self.scheduled_transaction_id = None;
        }
        self.alias.clear();
    }

    pub fn receipt(&self) -> TransactionReceipt {
        TransactionReceipt {
            status: self.status,
            exchange_rate: self.exchange_rate,
            account_id: self.account_id,
            token_num: self.token_num,
            file_num: self.file_num,
            schedule_num: self.schedule_num,
            scheduled_transaction_id: self.scheduled_transaction_id,
            serial_numbers: self.serial_numbers.clone(),
            new_total_supply: self.new_total_supply,
        }
    }

    fn externalized_transaction(&self) -> Transaction {
        match &self.customizer {
            Some(customizer) => customizer.customize(self.transaction.clone()),
            None => self.transaction.clone(),
        }
    }

    /// Finalizes this builder into a record stream item.
    pub fn build_record(&self) -> SingleTransactionRecord {
        let transaction = self.externalized_transaction();
        let record = TransactionRecord {
            receipt: self.receipt(),
            transaction_hash: transaction.hash(),
            consensus_timestamp: self.consensus_timestamp,
            parent_consensus_timestamp: self.parent_consensus_timestamp,
            transaction_id: self.transaction_id,
            memo: self.memo.clone(),
            transaction_fee: self.transaction_fee,
            transfer_list: self.transfer_list.clone(),
            token_transfer_lists: self.token_transfer_lists.clone(),
            alias: self.alias.clone(),
        };
        trace!(
            "built record for {:?} at {} with status {:?}",
            self.transaction_id,
            self.consensus_timestamp,
            self.status
        );
        SingleTransactionRecord {
            transaction,
            record,
        }
    }

    /// Finalizes this builder into its block items.
    pub fn build_block(&self) -> BlockStreamOutput {
        let mut items = vec![
            BlockItem::EventTransaction(self.externalized_transaction()),
            BlockItem::TransactionResult(TransactionResult {
                status: self.status,
                consensus_timestamp: self.consensus_timestamp,
                parent_consensus_timestamp: self.parent_consensus_timestamp,
                exchange_rate: self.exchange_rate,
                transaction_fee: self.transaction_fee,
                transfer_list: self.transfer_list.clone(),
                token_transfer_lists: self.token_transfer_lists.clone(),
            }),
        ];
        let output = TransactionOutput {
            account_id: self.account_id,
            token_num: self.token_num,
            file_num: self.file_num,
            schedule_num: self.schedule_num,
            scheduled_transaction_id: self.scheduled_transaction_id,
            serial_numbers: self.serial_numbers.clone(),
            new_total_supply: self.new_total_supply,
        };
        if !output.is_empty() {
            items.push(BlockItem::TransactionOutput(output));
        }
        if !self.state_changes.is_empty() {
            items.push(BlockItem::StateChanges {
                consensus_timestamp: self.consensus_timestamp,
                changes: self.state_changes.clone(),
            });
        }
        BlockStreamOutput {
            items,
            transaction_id: self.transaction_id,
            receipt: self.receipt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            block::StateChangeKind,
            transaction::{TransactionBody, TransactionCustomizer},
        },
        std::sync::Arc,
    };

    fn payer() -> AccountId {
        AccountId::new(0, 0, 1001)
    }

    fn builder_with_side_effects(status: ResponseCode) -> StreamBuilder {
        let mut builder = StreamBuilder::new(
            ReversingBehavior::Reversible,
            TransactionCategory::Child,
            None,
        );
        builder
            .set_status(status)
            .set_transaction_fee(10)
            .set_transfer_list(vec![AccountAmount {
                account_id: payer(),
                amount: -10,
                is_approval: false,
            }])
            .set_serial_numbers(vec![1, 2])
            .set_new_total_supply(2)
            .set_account_id(AccountId::new(0, 0, 2002))
            .set_schedule_num(7)
            .set_scheduled_transaction_id(TransactionId::new(payer(), Timestamp::new(1, 0)))
            .set_alias(vec![0xab]);
        builder
    }

    #[test]
    fn test_null_out_side_effect_fields() {
        let mut builder = builder_with_side_effects(ResponseCode::Success);
        assert!(builder.has_side_effects());
        builder.null_out_side_effect_fields();
        assert!(!builder.has_side_effects());
        assert_eq!(builder.status(), ResponseCode::Success);
    }

    #[test]
    fn test_null_out_keeps_existing_schedule_reference() {
        let mut builder = builder_with_side_effects(ResponseCode::IdenticalScheduleAlreadyCreated);
        builder.null_out_side_effect_fields();
        assert_eq!(builder.schedule_num(), Some(7));
        assert!(builder.scheduled_transaction_id().is_some());
        assert!(builder.transfer_list().is_empty());
        assert!(builder.account_id().is_none());
    }

    #[test]
    fn test_sync_body_id_from_record_id() {
        let mut builder = StreamBuilder::new(
            ReversingBehavior::Removable,
            TransactionCategory::Preceding,
            None,
        );
        let id = TransactionId::new(payer(), Timestamp::new(3, 0)).with_nonce(4);
        builder.set_transaction_id(id).sync_body_id_from_record_id();
        assert_eq!(builder.transaction().body.transaction_id, Some(id));
    }

    #[test]
    fn test_build_record_applies_customizer() {
        #[derive(Debug)]
        struct MemoRewriter;
        impl TransactionCustomizer for MemoRewriter {
            fn customize(&self, mut transaction: Transaction) -> Transaction {
                transaction.body.memo = "rewritten".to_string();
                transaction
            }
        }

        let mut builder = StreamBuilder::new(
            ReversingBehavior::Reversible,
            TransactionCategory::Child,
            Some(Arc::new(MemoRewriter)),
        );
        builder.set_transaction(Transaction::from_body(TransactionBody {
            memo: "original".to_string(),
            ..TransactionBody::default()
        }));

        let record = builder.build_record();
        assert_eq!(record.transaction.body.memo, "rewritten");
        assert_eq!(record.record.transaction_hash, record.transaction.hash());
        // The builder itself is untouched.
        assert_eq!(builder.transaction().body.memo, "original");
    }

    #[test]
    fn test_build_block_items() {
        let mut builder = StreamBuilder::new(
            ReversingBehavior::Reversible,
            TransactionCategory::User,
            None,
        );
        builder.set_status(ResponseCode::Success);
        let output = builder.build_block();
        assert_eq!(output.items.len(), 2);
        assert_eq!(
            output.transaction_result().map(|result| result.status),
            Some(ResponseCode::Success)
        );

        builder.set_token_num(5).add_state_changes([StateChange {
            service: "TokenService".to_string(),
            state_key: "TOKENS".to_string(),
            change: StateChangeKind::MapDelete { key: vec![5] },
        }]);
        let output = builder.build_block();
        assert_eq!(output.items.len(), 4);
        assert_eq!(output.state_changes().count(), 1);
        assert_eq!(output.receipt.token_num, Some(5));
    }
}
