//! In-process grid service for `--offline` mode and the test suite.
//!
//! Behaves like the real service from the client's point of view: paginated
//! reads, per-edit settlement with credit deduction, credit plans, top-ups.
//! State lives behind an async mutex so overlapping hydration reads see a
//! consistent snapshot per call.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::hydrate::MAX_TAKE;
use crate::remote::{
    AccountId, CommitItemError, CreditPlan, EditOutcome, GridMetadata, PixelEdit, RemoteError,
    RemoteGridSource,
};

struct SimState {
    cells: Vec<u8>,
    credits: u128,
    next_block: u64,
}

pub struct SimGridSource {
    width: u32,
    height: u32,
    plans: Vec<CreditPlan>,
    state: Mutex<SimState>,
}

impl SimGridSource {
    pub fn new(width: u32, height: u32, credits: u128) -> Self {
        Self {
            width,
            height,
            plans: vec![
                CreditPlan { credits: 100, price: 1_000_000 },
                CreditPlan { credits: 600, price: 5_000_000 },
                CreditPlan { credits: 1_500, price: 10_000_000 },
            ],
            state: Mutex::new(SimState {
                cells: vec![0; width as usize * height as usize],
                credits,
                next_block: 1,
            }),
        }
    }

    /// Pre-fill cells (test setup / demo seeding).
    pub async fn seed<I: IntoIterator<Item = (u32, u32, u8)>>(&self, cells: I) {
        let mut state = self.state.lock().await;
        for (x, y, color) in cells {
            if x < self.width && y < self.height {
                state.cells[y as usize * self.width as usize + x as usize] = color;
            }
        }
    }
}

#[async_trait]
impl RemoteGridSource for SimGridSource {
    async fn grid_metadata(&self) -> Result<GridMetadata, RemoteError> {
        Ok(GridMetadata {
            width: self.width,
            height: self.height,
            credit_plans: self.plans.clone(),
            linked_service: "sim-ledger".to_string(),
        })
    }

    async fn credit_balance(&self, _account: &AccountId) -> Result<u128, RemoteError> {
        Ok(self.state.lock().await.credits)
    }

    async fn read_cells(&self, x: u32, y: u32, take: Option<u32>) -> Result<Vec<u8>, RemoteError> {
        if x >= self.width || y >= self.height {
            return Err(RemoteError::Read(format!(
                "read start ({x}, {y}) outside {}×{} grid",
                self.width, self.height
            )));
        }
        let state = self.state.lock().await;
        let start = y as usize * self.width as usize + x as usize;
        let take = take.unwrap_or(MAX_TAKE).min(MAX_TAKE) as usize;
        let end = (start + take).min(state.cells.len());
        Ok(state.cells[start..end].to_vec())
    }

    async fn commit_edits(
        &self,
        _account: &AccountId,
        edits: &[PixelEdit],
        _memo: &str,
    ) -> Result<Vec<EditOutcome>, RemoteError> {
        let mut state = self.state.lock().await;
        let mut outcomes = Vec::with_capacity(edits.len());
        for edit in edits {
            if edit.x >= self.width || edit.y >= self.height {
                outcomes.push(Err(CommitItemError::GenericError {
                    message: format!("({}, {}) is outside the canvas", edit.x, edit.y),
                }));
                continue;
            }
            if state.credits == 0 {
                outcomes.push(Err(CommitItemError::InsufficientBalance { balance: 0 }));
                continue;
            }
            let idx = edit.y as usize * self.width as usize + edit.x as usize;
            state.cells[idx] = edit.color;
            state.credits -= 1;
            outcomes.push(Ok(()));
        }
        Ok(outcomes)
    }

    async fn top_up(
        &self,
        _account: &AccountId,
        plan: usize,
        _fee: u128,
        _credits: u64,
    ) -> Result<Result<u64, CommitItemError>, RemoteError> {
        let Some(plan) = self.plans.get(plan) else {
            return Ok(Err(CommitItemError::GenericError {
                message: format!("unknown credit plan {plan}"),
            }));
        };
        let mut state = self.state.lock().await;
        state.credits += plan.credits as u128;
        let block = state.next_block;
        state.next_block += 1;
        Ok(Ok(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_are_row_major_from_flat_index() {
        let sim = SimGridSource::new(10, 10, 0);
        sim.seed([(3, 2, 7)]).await;
        // Flat index 23 == (x=3, y=2).
        let cells = sim.read_cells(0, 2, Some(10)).await.unwrap();
        assert_eq!(cells[3], 7);
        let cells = sim.read_cells(3, 2, Some(1)).await.unwrap();
        assert_eq!(cells, vec![7]);
    }

    #[tokio::test]
    async fn commit_settles_per_edit_and_deducts_credits() {
        let sim = SimGridSource::new(10, 10, 2);
        let account = AccountId("alice".into());
        let edits = [
            PixelEdit { x: 0, y: 0, color: 1 },
            PixelEdit { x: 99, y: 0, color: 2 },
            PixelEdit { x: 1, y: 0, color: 3 },
            PixelEdit { x: 2, y: 0, color: 4 },
        ];
        let outcomes = sim.commit_edits(&account, &edits, "memo").await.unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1],
            Err(CommitItemError::GenericError { .. })
        ));
        assert!(outcomes[2].is_ok());
        // Credits ran out after two successful settlements.
        assert!(matches!(
            outcomes[3],
            Err(CommitItemError::InsufficientBalance { balance: 0 })
        ));
        assert_eq!(sim.credit_balance(&account).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn top_up_grants_plan_credits() {
        let sim = SimGridSource::new(4, 4, 0);
        let account = AccountId("alice".into());
        let block = sim.top_up(&account, 0, 1_000_000, 100).await.unwrap();
        assert_eq!(block, Ok(1));
        assert_eq!(sim.credit_balance(&account).await.unwrap(), 100);
    }
}
