//! Transactions as they appear in the output streams, and the hook that lets
//! a dispatcher rewrite them right before they are externalized.

use {
    crate::ids::TransactionId,
    serde_derive::{Deserialize, Serialize},
    sha2::{Digest, Sha384},
    std::{fmt, sync::Arc},
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: Option<TransactionId>,
    pub memo: String,
    /// The encoded operation. Opaque to handling.
    pub data: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub body: TransactionBody,
    pub signatures: Vec<Vec<u8>>,
}

impl Transaction {
    pub fn from_body(body: TransactionBody) -> Self {
        Self {
            body,
            signatures: Vec::new(),
        }
    }

    /// SHA-384 over the transaction's signed contents.
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha384::new();
        hasher.update([u8::from(self.body.transaction_id.is_some())]);
        if let Some(id) = &self.body.transaction_id {
            hasher.update(id.payer.shard.to_le_bytes());
            hasher.update(id.payer.realm.to_le_bytes());
            hasher.update(id.payer.num.to_le_bytes());
            hasher.update(id.valid_start.seconds.to_le_bytes());
            hasher.update(id.valid_start.nanos.to_le_bytes());
            hasher.update(id.nonce.to_le_bytes());
            hasher.update([u8::from(id.scheduled)]);
        }
        hasher.update((self.body.memo.len() as u64).to_le_bytes());
        hasher.update(self.body.memo.as_bytes());
        hasher.update((self.body.data.len() as u64).to_le_bytes());
        hasher.update(&self.body.data);
        for signature in &self.signatures {
            hasher.update((signature.len() as u64).to_le_bytes());
            hasher.update(signature);
        }
        hasher.finalize().to_vec()
    }
}

/// Customizes how a dispatched transaction is externalized.
pub trait TransactionCustomizer: fmt::Debug + Send + Sync {
    /// A builder whose customizer returns `true` is created but never added
    /// to any sink, so it never reaches the output.
    fn should_suppress_record(&self) -> bool {
        false
    }

    /// Rewrites the transaction right before its builder is finalized.
    fn customize(&self, transaction: Transaction) -> Transaction {
        transaction
    }
}

/// Suppresses the record entirely, e.g. for a synthetic transaction that was
/// preempted by another one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuppressingCustomizer;

impl TransactionCustomizer for SuppressingCustomizer {
    fn should_suppress_record(&self) -> bool {
        true
    }
}

pub type SharedCustomizer = Arc<dyn TransactionCustomizer>;
