//! Error types for the survivor indexer.
//!
//! Ingestion errors (decoding, projection integrity, storage) live in [`Error`].
//! The read side reports through [`crate::query::QueryError`], which separates
//! caller mistakes from storage failures.

use thiserror::Error;

/// Result type alias for indexer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the indexer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Codec Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Byte buffer does not have the fixed felt width
    #[error("Invalid felt width: expected {expected} bytes, got {got}")]
    InvalidWidth {
        /// Required width in bytes
        expected: usize,
        /// Actual width in bytes
        got: usize,
    },

    /// Value is not below the field modulus
    #[error("Value {0} is not a valid field element")]
    NotAFieldElement(String),

    /// Text contains a non-ASCII character
    #[error("Non-ASCII text in {field}: {text:?}")]
    InvalidAscii {
        /// Field being encoded or decoded
        field: String,
        /// Offending text (lossy)
        text: String,
    },

    /// Text does not fit into a single field element
    #[error("Short string too long: {len} bytes, capacity {capacity}")]
    StringTooLong {
        /// Length of the text in bytes
        len: usize,
        /// Maximum number of bytes
        capacity: usize,
    },

    /// Hex or decimal literal could not be parsed
    #[error("Invalid literal {literal:?}: {reason}")]
    InvalidLiteral {
        /// Input literal
        literal: String,
        /// Reason for rejection
        reason: String,
    },

    /// Felt does not fit into a narrower integer
    #[error("Felt {felt} overflows {target}")]
    Overflow {
        /// Hex form of the felt
        felt: String,
        /// Target integer type
        target: &'static str,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Decode Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Payload has the wrong number of field elements
    #[error("{kind} payload arity mismatch: expected {expected} felts, got {got}")]
    PayloadArity {
        /// Event kind name
        kind: &'static str,
        /// Expected arity
        expected: usize,
        /// Actual arity
        got: usize,
    },

    /// Event selector does not name a known event
    #[error("Unknown event selector: {0}")]
    UnknownSelector(String),

    /// Label is not part of an enumeration table
    #[error("Unknown {table} label: {label:?}")]
    UnknownLabel {
        /// Table name
        table: &'static str,
        /// Label that was not found
        label: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Projection Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Insert-only event targets an existing row
    #[error("Duplicate {collection} entity: {key}")]
    DuplicateEntity {
        /// Collection name
        collection: &'static str,
        /// Hex key of the entity
        key: String,
    },

    /// Blocks were applied out of order
    #[error("Block {got} is older than projection cursor {cursor}")]
    OutOfOrder {
        /// Current cursor
        cursor: u64,
        /// Block that was offered
        got: u64,
    },

    /// Rollback target lies behind the finality horizon, where superseded
    /// versions have already been compacted away
    #[error("Cannot roll back to block {target}: history is compacted up to block {horizon}")]
    RollbackPastFinality {
        /// Requested rollback block
        target: u64,
        /// Oldest block still reachable
        horizon: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns true if the failure is scoped to a single event and the
    /// pipeline can move on to the next one
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidWidth { .. }
                | Error::NotAFieldElement(_)
                | Error::InvalidAscii { .. }
                | Error::StringTooLong { .. }
                | Error::Overflow { .. }
                | Error::PayloadArity { .. }
                | Error::UnknownSelector(_)
                | Error::UnknownLabel { .. }
                | Error::DuplicateEntity { .. }
        )
    }

    /// Returns true if this error is a decode failure
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidWidth { .. }
                | Error::NotAFieldElement(_)
                | Error::InvalidAscii { .. }
                | Error::StringTooLong { .. }
                | Error::Overflow { .. }
                | Error::PayloadArity { .. }
                | Error::UnknownSelector(_)
                | Error::UnknownLabel { .. }
        )
    }

    /// Returns true if the projection refused a write to protect existing data
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Error::DuplicateEntity { .. } | Error::OutOfOrder { .. })
    }

    /// Returns true if the storage layer failed
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Lock | Error::Serialization(_) | Error::Deserialization(_)
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Codec errors: 1xxx
            Error::InvalidWidth { .. } => 1001,
            Error::NotAFieldElement(_) => 1002,
            Error::InvalidAscii { .. } => 1003,
            Error::StringTooLong { .. } => 1004,
            Error::InvalidLiteral { .. } => 1005,
            Error::Overflow { .. } => 1006,

            // Decode errors: 2xxx
            Error::PayloadArity { .. } => 2001,
            Error::UnknownSelector(_) => 2002,
            Error::UnknownLabel { .. } => 2003,

            // Projection errors: 3xxx
            Error::DuplicateEntity { .. } => 3001,
            Error::OutOfOrder { .. } => 3002,
            Error::RollbackPastFinality { .. } => 3003,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
            Error::Lock => 9002,
            Error::Storage(_) => 9003,
        }
    }
}
