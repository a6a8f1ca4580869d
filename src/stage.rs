//! Local edit staging and batch-commit bookkeeping.
//!
//! Pending edits live in an insertion-ordered map keyed by cell coordinate:
//! painting the same cell twice overwrites the color but keeps the cell's
//! original position, and the commit batch is built in that order. Order
//! matters because the service answers with a same-length, same-order
//! outcome list — position is the only key for re-associating outcomes
//! with edits.

use indexmap::IndexMap;

use crate::remote::{CommitItemError, EditOutcome, PixelEdit};

/// Staged-but-uncommitted cell changes.
#[derive(Default)]
pub struct EditStager {
    pending: IndexMap<(u32, u32), u8>,
}

impl EditStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit, overwriting any earlier color staged for the same
    /// cell (last write wins within a pending batch).
    pub fn stage(&mut self, x: u32, y: u32, color: u8) {
        self.pending.insert((x, y), color);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all pending edits. Called unconditionally after every commit
    /// attempt — the follow-up refresh re-reads the server's view instead of
    /// retrying failed items.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// The batch in staging order, as sent on the wire.
    pub fn edits(&self) -> Vec<PixelEdit> {
        self.pending
            .iter()
            .map(|(&(x, y), &color)| PixelEdit { x, y, color })
            .collect()
    }
}

/// Reasons a commit is refused before any prompt or network call.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitPrecondition {
    NothingToSave,
    InsufficientCredits { have: u128, need: usize },
}

/// Admission control: a batch must be non-empty and affordable. Checked
/// against the cached balance before confirming or dispatching anything.
pub fn check_preconditions(pending: usize, credits: u128) -> Result<(), CommitPrecondition> {
    if pending == 0 {
        return Err(CommitPrecondition::NothingToSave);
    }
    if credits < pending as u128 {
        return Err(CommitPrecondition::InsufficientCredits {
            have: credits,
            need: pending,
        });
    }
    Ok(())
}

/// One rejected edit, carrying its originating coordinate and color for the
/// failure notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEdit {
    pub edit: PixelEdit,
    pub error: CommitItemError,
}

/// Tally of a batch response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub succeeded: usize,
    pub failures: Vec<FailedEdit>,
}

/// Positionally correlate a batch response with the request list.
/// Returns `None` when the lengths differ — with no other key there is no
/// safe way to attribute outcomes, so the caller reports a transport-level
/// failure instead.
pub fn correlate(edits: &[PixelEdit], outcomes: &[EditOutcome]) -> Option<CommitReport> {
    if edits.len() != outcomes.len() {
        return None;
    }
    let mut report = CommitReport::default();
    for (edit, outcome) in edits.iter().zip(outcomes) {
        match outcome {
            Ok(()) => report.succeeded += 1,
            Err(error) => report.failures.push(FailedEdit {
                edit: *edit,
                error: error.clone(),
            }),
        }
    }
    Some(report)
}
