//! Contract with the authoritative grid service.
//!
//! The client only ever talks to the canvas through [`RemoteGridSource`]:
//! grid metadata, paginated cell reads, credit balances, positional batch
//! commits, and the opaque credit top-up call. `http.rs` implements it over
//! JSON/HTTP; `sim.rs` provides an in-process stand-in for offline mode and
//! tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque account identifier of the signed-in user (none when browsing
/// anonymously — credits are only fetched for a known account).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One purchasable credit bundle advertised by the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreditPlan {
    /// Credits granted by the plan.
    pub credits: u64,
    /// Price in the linked token's smallest unit.
    pub price: u128,
}

/// Canvas metadata fetched once per refresh.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridMetadata {
    pub width: u32,
    pub height: u32,
    pub credit_plans: Vec<CreditPlan>,
    /// Identifier of the payment service the canvas is linked to.
    pub linked_service: String,
}

/// One staged cell change, as sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelEdit {
    pub x: u32,
    pub y: u32,
    pub color: u8,
}

/// Per-edit rejection inside an otherwise-delivered batch. Other edits in
/// the same batch are unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitItemError {
    GenericError { message: String },
    /// The account has no payment link established.
    NotLinked,
    /// The service rejected the edit because it is momentarily locked.
    ServiceBusy,
    InsufficientBalance { balance: u128 },
    InsufficientAllowance { allowance: u128 },
}

impl std::fmt::Display for CommitItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitItemError::GenericError { message } => f.write_str(message),
            CommitItemError::NotLinked => f.write_str("account is not linked to a payment service"),
            CommitItemError::ServiceBusy => f.write_str("service is busy, try again"),
            CommitItemError::InsufficientBalance { balance } => {
                write!(f, "insufficient balance ({balance} available)")
            }
            CommitItemError::InsufficientAllowance { allowance } => {
                write!(f, "insufficient allowance ({allowance} approved)")
            }
        }
    }
}

/// Outcome of a single edit in a batch commit, positionally correlated with
/// the request list.
pub type EditOutcome = Result<(), CommitItemError>;

/// Transport/service failures, one variant per operation so a notice can
/// name what actually failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("metadata fetch failed: {0}")]
    MetaFetch(String),

    #[error("credit fetch failed: {0}")]
    CreditFetch(String),

    #[error("cell read failed: {0}")]
    Read(String),

    /// The batch never reached the service — no per-item outcomes exist.
    #[error("commit transport failed: {0}")]
    CommitTransport(String),

    #[error("top-up failed: {0}")]
    TopUp(String),
}

/// The authoritative store, as seen by the client.
///
/// `read_cells` returns `take` cells (or the server's own maximum when
/// `None`) starting at flat index `y * width + x`, row-major.
/// `commit_edits` returns exactly one outcome per submitted edit, in
/// request order — ordering is the only correlation key.
#[async_trait]
pub trait RemoteGridSource: Send + Sync {
    async fn grid_metadata(&self) -> Result<GridMetadata, RemoteError>;

    async fn credit_balance(&self, account: &AccountId) -> Result<u128, RemoteError>;

    async fn read_cells(&self, x: u32, y: u32, take: Option<u32>) -> Result<Vec<u8>, RemoteError>;

    async fn commit_edits(
        &self,
        account: &AccountId,
        edits: &[PixelEdit],
        memo: &str,
    ) -> Result<Vec<EditOutcome>, RemoteError>;

    /// Purchase a credit bundle. Returns the settlement block id on success,
    /// or a service-side rejection reusing the commit error taxonomy.
    async fn top_up(
        &self,
        account: &AccountId,
        plan: usize,
        fee: u128,
        credits: u64,
    ) -> Result<Result<u64, CommitItemError>, RemoteError>;
}
