//! Linearization of a finished dispatch into its durable output.

use {
    crate::error::StackError,
    ledger_stream::{
        block::{BlockItem, BlockStreamOutput},
        exchange::ExchangeRateSet,
        record::{IdentifiedReceipt, SingleTransactionRecord, TransactionReceipt},
        StreamBuilder, StreamMode, Timestamp, TransactionCategory, TransactionId,
    },
    log::*,
    std::collections::HashSet,
};

/// Finalized record stream items of one top-level transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordSource {
    pub records: Vec<SingleTransactionRecord>,
    pub receipts: Vec<IdentifiedReceipt>,
}

impl RecordSource {
    pub fn receipt_of(&self, transaction_id: &TransactionId) -> Option<&TransactionReceipt> {
        find_receipt(&self.receipts, transaction_id)
    }
}

/// Finalized block stream items of one top-level transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockRecordSource {
    pub outputs: Vec<BlockStreamOutput>,
    pub receipts: Vec<IdentifiedReceipt>,
}

impl BlockRecordSource {
    pub fn receipt_of(&self, transaction_id: &TransactionId) -> Option<&TransactionReceipt> {
        find_receipt(&self.receipts, transaction_id)
    }

    /// Every block item, in output order.
    pub fn items(&self) -> impl Iterator<Item = &BlockItem> {
        self.outputs.iter().flat_map(|output| output.items.iter())
    }
}

fn find_receipt<'a>(
    receipts: &'a [IdentifiedReceipt],
    transaction_id: &TransactionId,
) -> Option<&'a TransactionReceipt> {
    receipts
        .iter()
        .find(|identified| identified.transaction_id == *transaction_id)
        .map(|identified| &identified.receipt)
}

/// Everything one top-level transaction externalizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleOutput {
    /// Present when the stream mode produces records.
    pub record_source: Option<RecordSource>,
    /// Present when the stream mode produces blocks.
    pub block_source: Option<BlockRecordSource>,
    /// Consensus time of the first builder in the output.
    pub first_assigned_consensus_time: Timestamp,
}

impl HandleOutput {
    pub fn receipt_of(&self, transaction_id: &TransactionId) -> Option<&TransactionReceipt> {
        self.record_source
            .as_ref()
            .and_then(|source| source.receipt_of(transaction_id))
            .or_else(|| {
                self.block_source
                    .as_ref()
                    .and_then(|source| source.receipt_of(transaction_id))
            })
    }
}

/// Position of the single user or node builder among `builders`.
pub fn find_anchor<'a>(
    builders: impl IntoIterator<Item = &'a StreamBuilder>,
) -> Result<usize, StackError> {
    let anchors: Vec<usize> = builders
        .into_iter()
        .enumerate()
        .filter(|(_, builder)| builder.category().is_anchor())
        .map(|(index, _)| index)
        .collect();
    match anchors.as_slice() {
        [] => Err(StackError::MissingAnchorBuilder),
        [index] => Ok(*index),
        _ => Err(StackError::AmbiguousAnchorBuilder(anchors.len())),
    }
}

/// Assigns every builder its final consensus time and transaction id, then
/// finalizes it for the streams `stream_mode` produces.
///
/// `builders` must be in output order and contain exactly one anchor, whose
/// transaction id is `anchor_id`. Builders before the anchor get consecutive
/// nanoseconds before `consensus_time`, builders after it consecutive
/// nanoseconds after.
pub fn linearize(
    mut builders: Vec<StreamBuilder>,
    anchor_id: TransactionId,
    consensus_time: Timestamp,
    exchange_rates: &ExchangeRateSet,
    stream_mode: StreamMode,
) -> Result<HandleOutput, StackError> {
    let anchor_index = find_anchor(&builders)?;
    let top_level_nonce = anchor_id.nonce;
    let mut next_nonce_offset = 1i32;
    let mut assigned_nonces = HashSet::new();
    let mut preset_nonces = Vec::new();

    let mut record_source = stream_mode.produces_records().then(RecordSource::default);
    let mut block_source = stream_mode.produces_blocks().then(BlockRecordSource::default);

    for (index, builder) in builders.iter_mut().enumerate() {
        let nonce_offset = if builder.category().takes_nonce_offset() {
            let offset = next_nonce_offset;
            next_nonce_offset += 1;
            offset
        } else {
            0
        };
        match builder.transaction_id() {
            None => {
                let nonce = top_level_nonce
                    .checked_add(nonce_offset)
                    .ok_or(StackError::RecursiveSchedulingLimitReached)?;
                builder
                    .set_transaction_id(anchor_id.with_nonce(nonce))
                    .sync_body_id_from_record_id();
                assigned_nonces.insert(nonce);
            }
            Some(id) if index != anchor_index => preset_nonces.push(id.nonce),
            Some(_) => {}
        }

        let index_delta = index as i64 - anchor_index as i64;
        builder.set_consensus_timestamp(consensus_time.plus_nanos(index_delta));
        if index > anchor_index && builder.category() != TransactionCategory::Scheduled {
            builder
                .set_parent_consensus_timestamp(consensus_time)
                .set_exchange_rate(None);
        } else {
            builder.set_exchange_rate(Some(*exchange_rates));
        }

        let receipt = builder.transaction_id().map(|id| IdentifiedReceipt {
            transaction_id: *id,
            receipt: builder.receipt(),
        });
        if let Some(source) = record_source.as_mut() {
            source.records.push(builder.build_record());
            source.receipts.extend(receipt.clone());
        }
        if let Some(source) = block_source.as_mut() {
            source.outputs.push(builder.build_block());
            source.receipts.extend(receipt);
        }
        trace!(
            "linearized {:?} builder {index} at {}",
            builder.category(),
            builder.consensus_timestamp()
        );
    }

    for nonce in preset_nonces {
        if assigned_nonces.contains(&nonce) {
            warn!("preset nonce {nonce} collides with a nonce assigned during linearization");
        }
    }

    Ok(HandleOutput {
        record_source,
        block_source,
        first_assigned_consensus_time: consensus_time.minus_nanos(anchor_index as i64),
    })
}
