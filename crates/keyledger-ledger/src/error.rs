//! Ledger error types.
//!
//! Only faults live here. Rejected updates, failed signatures and CAS
//! conflicts are reported as `Ok(false)` by the operations themselves.

use keyledger_core::{CodecError, NodeError};
use keyledger_storage::StorageError;
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A persisted chain has a missing, misplaced or altered link.
    #[error("corrupt chain for {username}: {reason}")]
    CorruptChain {
        /// Affected username.
        username: String,
        /// What was wrong.
        reason: String,
    },

    /// A persisted record other than a link does not decode.
    #[error("corrupt {namespace} record {key}: {reason}")]
    CorruptRecord {
        /// Namespace of the record.
        namespace: &'static str,
        /// Record key.
        key: String,
        /// What was wrong.
        reason: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A record could not be written in the wire format.
    #[error("record does not encode: {0}")]
    Encoding(#[from] CodecError),

    /// A record kept changing under a read or a retried write.
    #[error("gave up after repeated contention on {0}")]
    Contention(String),
}

impl LedgerError {
    pub(crate) fn corrupt_record(
        namespace: &'static str,
        key: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::CorruptRecord {
            namespace,
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn codec(namespace: &'static str, key: impl Into<String>, e: &CodecError) -> Self {
        Self::corrupt_record(namespace, key, e)
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for NodeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::CorruptChain { username, reason } => {
                Self::CorruptChain { username, reason }
            },
            e @ (LedgerError::CorruptRecord { .. } | LedgerError::Encoding(_)) => {
                Self::CorruptRecord(e.to_string())
            },
            e @ (LedgerError::Storage(_) | LedgerError::Contention(_)) => {
                Self::StorageUnavailable(e.to_string())
            },
        }
    }
}
