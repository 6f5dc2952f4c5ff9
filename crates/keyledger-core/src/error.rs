//! Error types for chains, merges, codecs and the trust store.

use thiserror::Error;

/// Why a chain (or chain tail) failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No links at all.
    #[error("chain is empty")]
    Empty,

    /// Link indices are not contiguous (or a full chain does not start at 0).
    #[error("expected link index {expected}, found {found}")]
    NonContiguousIndex {
        /// Index the position required.
        expected: u32,
        /// Index the link carried.
        found: u32,
    },

    /// A claim or key-change proof does not verify against the link's own key.
    #[error("bad signature on link {index}")]
    BadSignature {
        /// Offending link index.
        index: u32,
    },

    /// A claim verified but its body could not be decoded.
    #[error("malformed claim on link {index}: {reason}")]
    MalformedClaim {
        /// Offending link index.
        index: u32,
        /// Decoder message.
        reason: String,
    },

    /// The claim names a different username.
    #[error("link {index} claims a different username")]
    UsernameMismatch {
        /// Offending link index.
        index: u32,
    },

    /// The claim names a different index than the link carries.
    #[error("link {index} claims a different index")]
    IndexMismatch {
        /// Offending link index.
        index: u32,
    },

    /// Link `index` is not a proven rotation of link `index - 1`.
    #[error("link {index} does not continue from its predecessor")]
    BrokenContinuity {
        /// Index of the incoming link.
        index: u32,
    },

    /// Link `index` expires before its predecessor.
    #[error("link {index} expires before its predecessor")]
    ExpiryRegression {
        /// Index of the incoming link.
        index: u32,
    },
}

/// Result type for chain validation.
pub type ChainResult<T> = Result<T, ChainError>;

/// Why a proposed tail was not accepted onto an existing chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The tail has no links.
    #[error("proposed tail is empty")]
    EmptyTail,

    /// The tail rewrites more history than one update may.
    #[error("proposed tail has {len} links, at most {max} allowed")]
    TailTooLong {
        /// Links in the proposed tail.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The tail does not legally extend the current chain.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The merged chain is not valid.
    #[error(transparent)]
    InvalidChain(#[from] ChainError),
}

/// Result type for merges.
pub type MergeResult<T> = Result<T, MergeError>;

/// Binary decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before a field was complete.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the field needed.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// The record tag does not match the expected record kind.
    #[error("unexpected record tag: expected {expected}, found {found}")]
    UnexpectedTag {
        /// Tag the decoder was asked for.
        expected: u8,
        /// Tag found in the input.
        found: u8,
    },

    /// Bytes remain after the record was fully decoded.
    #[error("{count} trailing bytes after record")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// A string field is not UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A key field is not a valid public key.
    #[error("invalid public key field: {0}")]
    InvalidKey(String),

    /// A timestamp is outside the representable range.
    #[error("timestamp {0} out of range")]
    InvalidTimestamp(i64),

    /// An option flag byte is neither 0 nor 1.
    #[error("invalid presence flag {0}")]
    InvalidFlag(u8),

    /// A field or count does not fit its `u32` length prefix.
    #[error("field of {len} bytes does not fit a u32 length prefix")]
    FieldTooLong {
        /// Length that was refused.
        len: usize,
    },
}

/// Result type for decoding.
pub type CodecResult<T> = Result<T, CodecError>;

/// Why a signed payload was refused.
///
/// Callers outside the ledger should not be able to tell these apart; the
/// distinction is for server-side logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The signature does not verify against the claimed key.
    #[error("signature does not verify")]
    BadSignature,

    /// The signature verified but the body did not decode.
    #[error("malformed payload: {0}")]
    Malformed(#[from] CodecError),
}

/// Why a username is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    /// Zero-length username.
    #[error("username is empty")]
    Empty,

    /// Longer than the configured limit (in bytes).
    #[error("username is {len} bytes, limit is {max}")]
    TooLong {
        /// Username length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Contains a control character or a path separator.
    #[error("username contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Failures of the local trust-on-first-use store.
#[derive(Debug, Error)]
pub enum TofuError {
    /// A chain (pinned, loaded or observed) failed validation.
    #[error("untrusted chain for {username}: {source}")]
    InvalidChain {
        /// Username the chain belongs to.
        username: String,
        /// Validation failure.
        #[source]
        source: ChainError,
    },

    /// A proposed update does not extend the pinned chain.
    #[error("rejected update for {username}: {source}")]
    Rejected {
        /// Username the update targeted.
        username: String,
        /// Merge failure.
        #[source]
        source: MergeError,
    },

    /// The remote chain is shorter than the one already pinned.
    #[error("remote chain for {username} has {observed} links, {pinned} already pinned")]
    Shortened {
        /// Username observed.
        username: String,
        /// Pinned chain length.
        pinned: usize,
        /// Remote chain length.
        observed: usize,
    },

    /// The remote chain does not grow out of the pinned chain.
    #[error("remote chain for {username} diverges from the pinned chain")]
    Diverged {
        /// Username observed.
        username: String,
    },

    /// A key is already pinned to another username.
    #[error("key {key} is already pinned to {pinned_to}")]
    KeyConflict {
        /// Hex key.
        key: String,
        /// Username that owns it locally.
        pinned_to: String,
    },

    /// Reading or writing the store file failed.
    #[error("trust store I/O error: {0}")]
    Io(String),

    /// The store file could not be (de)serialized.
    #[error("trust store serialization error: {0}")]
    Serialization(String),
}

/// Result type for trust store operations.
pub type TofuResult<T> = Result<T, TofuError>;

/// Errors surfaced through the [`CoreNode`](crate::CoreNode) and
/// [`MutablePointers`](crate::MutablePointers) traits.
///
/// Rejections are not errors: they come back as `Ok(false)`.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A stored chain is missing links.
    #[error("corrupt chain for {username}: {reason}")]
    CorruptChain {
        /// Affected username.
        username: String,
        /// What was wrong.
        reason: String,
    },

    /// A stored record other than a chain does not decode.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// The backing store failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A chain returned by a remote node failed local checks.
    #[error(transparent)]
    Untrusted(#[from] TofuError),
}

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
