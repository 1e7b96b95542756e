//! Lending error taxonomy.

use chrono::{DateTime, Utc};
use thiserror::Error;

use toolcrib_core::{DomainError, HolderId};

use crate::asset::AssetNumber;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every failure the ledger reports.
///
/// All variants are expected, recoverable outcomes. A call that returns an
/// error has left the ledger and the registry exactly as they were.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetNumber),

    #[error("asset already registered: {0}")]
    DuplicateAsset(AssetNumber),

    /// Carries the current hold so callers can say who has the tool.
    #[error("asset {asset} is checked out by {holder} since {checked_out_at}")]
    AssetAlreadyCheckedOut {
        asset: AssetNumber,
        holder: HolderId,
        checked_out_at: DateTime<Utc>,
    },

    #[error("asset is not checked out: {0}")]
    AssetNotCheckedOut(AssetNumber),

    #[error("due-back time {due_back} is earlier than now ({now})")]
    InvalidDueDate {
        due_back: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Malformed input (blank names, identifiers).
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// A persisted ledger could not be rebuilt without breaking an invariant.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl LedgerError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptSnapshot(msg.into())
    }

    /// Stable machine-readable code, e.g. for presentation layers.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UnknownAsset(_) => "unknown_asset",
            LedgerError::DuplicateAsset(_) => "duplicate_asset",
            LedgerError::AssetAlreadyCheckedOut { .. } => "asset_already_checked_out",
            LedgerError::AssetNotCheckedOut(_) => "asset_not_checked_out",
            LedgerError::InvalidDueDate { .. } => "invalid_due_date",
            LedgerError::Invalid(_) => "invalid_input",
            LedgerError::CorruptSnapshot(_) => "corrupt_snapshot",
        }
    }
}
