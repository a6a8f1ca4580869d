//! Canvas session: local state plus the network task pipeline.
//!
//! All remote work (refresh, commit, top-up) runs as tasks on a tokio
//! runtime owned by the session. Tasks never touch session state directly;
//! they report through an `mpsc` channel that the frame loop drains every
//! frame via [`CanvasSession::poll_events`]. The buffer, credit cache, and
//! pending edits therefore stay single-threaded while network calls overlap
//! freely.

use std::sync::Arc;
use std::sync::mpsc;

use uuid::Uuid;

use crate::grid::GridBuffer;
use crate::hydrate::{self, MAX_TAKE, PARALLEL};
use crate::log_info;
use crate::notify::Notifier;
use crate::remote::{
    AccountId, CommitItemError, EditOutcome, GridMetadata, PixelEdit, RemoteError,
    RemoteGridSource,
};
use crate::stage::{self, CommitPrecondition, EditStager};

/// Explicit per-operation progress machine. A state is reset to `Idle` or
/// `Failed` on every completion path so a failure can never leave an
/// operation permanently locked out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpState {
    Idle,
    Busy,
    Failed,
}

impl OpState {
    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(self, OpState::Busy)
    }
}

/// Completion messages from network tasks, drained once per frame.
pub enum NetEvent {
    MetaLoaded(GridMetadata),
    CreditsLoaded(u128),
    /// One hydration wave's successful chunks: `(flat offset, cells)`.
    HydrationChunks(Vec<(usize, Vec<u8>)>),
    RefreshFinished(Result<(), RemoteError>),
    CommitFinished {
        edits: Vec<PixelEdit>,
        result: Result<Vec<EditOutcome>, RemoteError>,
    },
    TopUpFinished(Result<Result<u64, CommitItemError>, RemoteError>),
}

/// Numbers shown in the confirm-save prompt.
#[derive(Clone, Copy, Debug)]
pub struct CommitSummary {
    pub pixels: usize,
    pub credits_before: u128,
    pub credits_after: u128,
}

pub struct CanvasSession {
    pub grid: GridBuffer,
    pub meta: Option<GridMetadata>,
    /// Cached remote balance; re-queried after every mutating action, never
    /// decremented locally.
    pub credits: u128,
    pub stager: EditStager,
    pub fetch_state: OpState,
    pub commit_state: OpState,
    pub topup_state: OpState,
    account: Option<AccountId>,
    source: Arc<dyn RemoteGridSource>,
    runtime: tokio::runtime::Runtime,
    events_tx: mpsc::Sender<NetEvent>,
    events_rx: mpsc::Receiver<NetEvent>,
}

impl CanvasSession {
    pub fn new(
        source: Arc<dyn RemoteGridSource>,
        account: Option<AccountId>,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (events_tx, events_rx) = mpsc::channel();
        Ok(Self {
            grid: GridBuffer::empty(),
            meta: None,
            credits: 0,
            stager: EditStager::new(),
            fetch_state: OpState::Idle,
            commit_state: OpState::Idle,
            topup_state: OpState::Idle,
            account,
            source,
            runtime,
            events_tx,
            events_rx,
        })
    }

    pub fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    /// Whether any network operation is outstanding (used to keep the frame
    /// loop repainting while results may arrive).
    pub fn is_network_busy(&self) -> bool {
        self.fetch_state.is_busy() || self.commit_state.is_busy() || self.topup_state.is_busy()
    }

    // ---- refresh (metadata + credits + chunked hydration) -------------------

    /// Full refresh: metadata, credit balance (when an account is known),
    /// then a chunked hydration pass. No-op while one is already running.
    pub fn refresh(&mut self) {
        if self.fetch_state.is_busy() {
            return;
        }
        self.fetch_state = OpState::Busy;

        let source = Arc::clone(&self.source);
        let account = self.account.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let meta = match source.grid_metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    let _ = tx.send(NetEvent::RefreshFinished(Err(e)));
                    return;
                }
            };
            let (width, height) = (meta.width, meta.height);
            let _ = tx.send(NetEvent::MetaLoaded(meta));

            if let Some(account) = account {
                match source.credit_balance(&account).await {
                    Ok(credits) => {
                        let _ = tx.send(NetEvent::CreditsLoaded(credits));
                    }
                    Err(e) => {
                        let _ = tx.send(NetEvent::RefreshFinished(Err(e)));
                        return;
                    }
                }
            }

            let plan = hydrate::plan_chunks(width, height, MAX_TAKE);
            let wave_tx = tx.clone();
            let result = hydrate::run_waves(source.as_ref(), &plan, PARALLEL, |wave| {
                if !wave.is_empty() {
                    let _ = wave_tx.send(NetEvent::HydrationChunks(wave));
                }
            })
            .await;
            let _ = tx.send(NetEvent::RefreshFinished(result));
        });
    }

    // ---- painting -----------------------------------------------------------

    /// Stage a paint at a grid cell. Out-of-range cells are ignored (the
    /// viewport is infinite, the grid is not). Returns whether the cell was
    /// painted, so the caller can update the last-paint marker.
    pub fn paint(&mut self, gx: i64, gy: i64, color: u8) -> bool {
        if !self.grid.in_bounds(gx, gy) {
            return false;
        }
        let (x, y) = (gx as u32, gy as u32);
        // Optimistic local overlay; the next refresh restores server truth.
        self.grid.set(x, y, color);
        self.stager.stage(x, y, color);
        true
    }

    // ---- commit -------------------------------------------------------------

    /// Admission check before the confirm prompt: batch non-empty, account
    /// known, balance sufficient. On failure one notice is posted and `None`
    /// is returned — nothing is sent anywhere.
    pub fn request_commit(&self, notifier: &mut Notifier) -> Option<CommitSummary> {
        if self.account.is_none() {
            notifier.error("Not signed in", "Pass --account to paint on the shared canvas");
            return None;
        }
        match stage::check_preconditions(self.stager.len(), self.credits) {
            Err(CommitPrecondition::NothingToSave) => {
                notifier.error("No pixels to save", "Place a pixel first");
                None
            }
            Err(CommitPrecondition::InsufficientCredits { have, need }) => {
                notifier.error(
                    "Insufficient pixel credit",
                    format!(
                        "You are placing {need} pixels but you have {have} pixel credits. \
                         Please top up your pixel credits."
                    ),
                );
                None
            }
            Ok(()) => Some(CommitSummary {
                pixels: self.stager.len(),
                credits_before: self.credits,
                credits_after: self.credits - self.stager.len() as u128,
            }),
        }
    }

    /// Dispatch the staged batch. Call only after [`Self::request_commit`]
    /// succeeded and the user confirmed.
    pub fn commit(&mut self) {
        if self.commit_state.is_busy() || self.stager.is_empty() {
            return;
        }
        let Some(account) = self.account.clone() else {
            return;
        };
        self.commit_state = OpState::Busy;

        let edits = self.stager.edits();
        let memo = Uuid::new_v4().to_string();
        log_info!("committing {} pixels (memo {})", edits.len(), memo);

        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = source.commit_edits(&account, &edits, &memo).await;
            let _ = tx.send(NetEvent::CommitFinished { edits, result });
        });
    }

    // ---- top-up -------------------------------------------------------------

    /// Purchase the credit plan at `plan_idx` of the current metadata.
    pub fn top_up(&mut self, plan_idx: usize) {
        if self.topup_state.is_busy() {
            return;
        }
        let Some(account) = self.account.clone() else {
            return;
        };
        let Some(plan) = self
            .meta
            .as_ref()
            .and_then(|m| m.credit_plans.get(plan_idx))
            .cloned()
        else {
            return;
        };
        self.topup_state = OpState::Busy;

        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = source
                .top_up(&account, plan_idx, plan.price, plan.credits)
                .await;
            let _ = tx.send(NetEvent::TopUpFinished(result));
        });
    }

    // ---- event pump ---------------------------------------------------------

    /// Drain completed network work into session state. Returns `true` when
    /// anything changed (the caller should repaint).
    pub fn poll_events(&mut self, notifier: &mut Notifier) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event, notifier);
            changed = true;
        }
        changed
    }

    fn apply_event(&mut self, event: NetEvent, notifier: &mut Notifier) {
        match event {
            NetEvent::MetaLoaded(meta) => {
                self.grid.ensure_size(meta.width, meta.height);
                self.meta = Some(meta);
            }
            NetEvent::CreditsLoaded(credits) => {
                self.credits = credits;
            }
            NetEvent::HydrationChunks(wave) => {
                for (offset, cells) in wave {
                    self.grid.write_chunk(offset, &cells);
                }
            }
            NetEvent::RefreshFinished(result) => match result {
                Ok(()) => {
                    self.fetch_state = OpState::Idle;
                    self.grid.bump_version();
                    notifier.success("Ready", "");
                }
                Err(e) => {
                    self.fetch_state = OpState::Failed;
                    let title = match &e {
                        RemoteError::MetaFetch(_) => "Canvas meta failed",
                        RemoteError::CreditFetch(_) => "Canvas credit failed",
                        _ => "Canvas pixels failed",
                    };
                    notifier.error(title, e.to_string());
                }
            },
            NetEvent::CommitFinished { edits, result } => {
                match result {
                    Ok(outcomes) => match stage::correlate(&edits, &outcomes) {
                        Some(report) => {
                            self.commit_state = OpState::Idle;
                            notifier.success(format!("{} pixels saved", report.succeeded), "");
                            for failed in &report.failures {
                                notifier.error(
                                    format!(
                                        "Pixel (x: {}, y: {}) save failed",
                                        failed.edit.x, failed.edit.y
                                    ),
                                    failed.error.to_string(),
                                );
                            }
                            if !report.failures.is_empty() {
                                notifier
                                    .info(format!("{} credits unused", report.failures.len()), "");
                            }
                        }
                        None => {
                            self.commit_state = OpState::Failed;
                            notifier.error(
                                "Save failed",
                                format!(
                                    "service answered {} outcomes for {} edits; \
                                     results cannot be attributed",
                                    outcomes.len(),
                                    edits.len()
                                ),
                            );
                        }
                    },
                    Err(e) => {
                        self.commit_state = OpState::Failed;
                        notifier.error(
                            "Save failed",
                            format!("{e}. {} credits unused.", edits.len()),
                        );
                    }
                }
                // The server's view is authoritative after any attempt:
                // drop the batch and re-read everything, including credits.
                self.stager.clear();
                self.refresh();
            }
            NetEvent::TopUpFinished(result) => match result {
                Ok(Ok(block)) => {
                    self.topup_state = OpState::Idle;
                    notifier.success("Top-up OK", format!("Block: {block}"));
                    self.refresh();
                }
                Ok(Err(rejection)) => {
                    self.topup_state = OpState::Failed;
                    notifier.error("Top-up error", rejection.to_string());
                }
                Err(e) => {
                    self.topup_state = OpState::Failed;
                    notifier.error("Top-up failed", e.to_string());
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimGridSource;
    use std::time::Duration;

    /// Blockingly apply events until one terminal event (refresh/commit/
    /// top-up completion) has been processed.
    fn drain_one_operation(session: &mut CanvasSession, notifier: &mut Notifier) {
        loop {
            let event = session
                .events_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("network task did not finish");
            let terminal = matches!(
                event,
                NetEvent::RefreshFinished(_)
                    | NetEvent::CommitFinished { .. }
                    | NetEvent::TopUpFinished(_)
            );
            session.apply_event(event, notifier);
            if terminal {
                return;
            }
        }
    }

    fn ready_session(width: u32, height: u32, credits: u128) -> (CanvasSession, Notifier) {
        let source = Arc::new(SimGridSource::new(width, height, credits));
        let mut session =
            CanvasSession::new(source, Some(AccountId("alice".into()))).expect("runtime");
        let mut notifier = Notifier::new();
        session.refresh();
        drain_one_operation(&mut session, &mut notifier);
        assert_eq!(session.fetch_state, OpState::Idle);
        (session, notifier)
    }

    #[test]
    fn refresh_populates_grid_and_bumps_version_once() {
        let (session, _) = ready_session(50, 40, 10);
        assert_eq!(session.grid.width(), 50);
        assert_eq!(session.grid.height(), 40);
        assert_eq!(session.grid.version(), 1);
        assert_eq!(session.credits, 10);
    }

    #[test]
    fn rehydrating_identical_content_only_bumps_version() {
        let (mut session, mut notifier) = ready_session(30, 30, 0);
        let before: Vec<u8> = session.grid.cells().to_vec();
        session.refresh();
        drain_one_operation(&mut session, &mut notifier);
        assert_eq!(session.grid.cells(), &before[..]);
        assert_eq!(session.grid.version(), 2);
    }

    #[test]
    fn paint_rejects_out_of_range_without_staging() {
        let (mut session, _) = ready_session(10, 10, 5);
        assert!(!session.paint(-1, 0, 3));
        assert!(!session.paint(0, 10, 3));
        assert!(session.stager.is_empty());

        assert!(session.paint(2, 3, 3));
        assert_eq!(session.grid.get(2, 3), 3);
        assert_eq!(session.stager.len(), 1);
    }

    #[test]
    fn commit_precondition_rejects_before_any_dispatch() {
        let (mut session, mut notifier) = ready_session(10, 10, 2);
        session.paint(0, 0, 1);
        session.paint(1, 0, 1);
        session.paint(2, 0, 1);

        let summary = session.request_commit(&mut notifier);
        assert!(summary.is_none());
        assert_eq!(session.commit_state, OpState::Idle);
        // Nothing was spawned: the channel stays silent.
        assert!(session.events_rx.try_recv().is_err());
        let last = notifier.notices().last().unwrap();
        assert!(last.detail.contains("3 pixels"));
        assert!(last.detail.contains("2 pixel credits"));
    }

    #[test]
    fn successful_commit_clears_batch_and_requeries_credits() {
        let (mut session, mut notifier) = ready_session(10, 10, 10);
        session.paint(1, 1, 5);
        session.paint(2, 2, 6);

        let summary = session.request_commit(&mut notifier).expect("affordable");
        assert_eq!(summary.pixels, 2);
        assert_eq!(summary.credits_after, 8);

        session.commit();
        drain_one_operation(&mut session, &mut notifier); // commit
        assert!(session.stager.is_empty());
        assert_eq!(session.commit_state, OpState::Idle);
        drain_one_operation(&mut session, &mut notifier); // follow-up refresh
        assert_eq!(session.credits, 8);
        assert_eq!(session.grid.get(1, 1), 5);
        assert!(
            notifier
                .notices()
                .iter()
                .any(|n| n.title == "2 pixels saved")
        );
    }

    #[test]
    fn per_item_failures_are_reported_with_coordinates() {
        use crate::remote::GridMetadata;
        use async_trait::async_trait;

        /// Commit script: middle edit rejected, rest accepted.
        struct MixedSource;
        #[async_trait]
        impl RemoteGridSource for MixedSource {
            async fn grid_metadata(&self) -> Result<GridMetadata, RemoteError> {
                Ok(GridMetadata {
                    width: 10,
                    height: 10,
                    credit_plans: Vec::new(),
                    linked_service: "test".into(),
                })
            }
            async fn credit_balance(&self, _a: &AccountId) -> Result<u128, RemoteError> {
                Ok(100)
            }
            async fn read_cells(
                &self,
                x: u32,
                y: u32,
                take: Option<u32>,
            ) -> Result<Vec<u8>, RemoteError> {
                let offset = y as usize * 10 + x as usize;
                Ok(vec![0; take.unwrap_or(0).min((100 - offset) as u32) as usize])
            }
            async fn commit_edits(
                &self,
                _a: &AccountId,
                edits: &[PixelEdit],
                _m: &str,
            ) -> Result<Vec<EditOutcome>, RemoteError> {
                Ok(edits
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        if i == 1 {
                            Err(CommitItemError::InsufficientBalance { balance: 5 })
                        } else {
                            Ok(())
                        }
                    })
                    .collect())
            }
            async fn top_up(
                &self,
                _a: &AccountId,
                _p: usize,
                _f: u128,
                _c: u64,
            ) -> Result<Result<u64, CommitItemError>, RemoteError> {
                unreachable!()
            }
        }

        let mut session =
            CanvasSession::new(Arc::new(MixedSource), Some(AccountId("alice".into())))
                .expect("runtime");
        let mut notifier = Notifier::new();
        session.refresh();
        drain_one_operation(&mut session, &mut notifier);

        session.paint(0, 0, 1);
        session.paint(5, 7, 2);
        session.paint(9, 9, 3);
        assert!(session.request_commit(&mut notifier).is_some());
        session.commit();
        drain_one_operation(&mut session, &mut notifier);

        let notices = notifier.notices();
        assert!(notices.iter().any(|n| n.title == "2 pixels saved"));
        assert!(
            notices
                .iter()
                .any(|n| n.title == "Pixel (x: 5, y: 7) save failed")
        );
        assert!(notices.iter().any(|n| n.title == "1 credits unused"));
        assert!(session.stager.is_empty());
    }

    #[test]
    fn transport_failure_reports_unused_credits_and_still_refreshes() {
        use crate::remote::GridMetadata;
        use async_trait::async_trait;

        struct UnreachableCommit;
        #[async_trait]
        impl RemoteGridSource for UnreachableCommit {
            async fn grid_metadata(&self) -> Result<GridMetadata, RemoteError> {
                Ok(GridMetadata {
                    width: 4,
                    height: 4,
                    credit_plans: Vec::new(),
                    linked_service: "test".into(),
                })
            }
            async fn credit_balance(&self, _a: &AccountId) -> Result<u128, RemoteError> {
                Ok(50)
            }
            async fn read_cells(
                &self,
                _x: u32,
                _y: u32,
                take: Option<u32>,
            ) -> Result<Vec<u8>, RemoteError> {
                Ok(vec![0; take.unwrap_or(16).min(16) as usize])
            }
            async fn commit_edits(
                &self,
                _a: &AccountId,
                _e: &[PixelEdit],
                _m: &str,
            ) -> Result<Vec<EditOutcome>, RemoteError> {
                Err(RemoteError::CommitTransport("connection reset".into()))
            }
            async fn top_up(
                &self,
                _a: &AccountId,
                _p: usize,
                _f: u128,
                _c: u64,
            ) -> Result<Result<u64, CommitItemError>, RemoteError> {
                unreachable!()
            }
        }

        let mut session =
            CanvasSession::new(Arc::new(UnreachableCommit), Some(AccountId("alice".into())))
                .expect("runtime");
        let mut notifier = Notifier::new();
        session.refresh();
        drain_one_operation(&mut session, &mut notifier);

        session.paint(0, 0, 1);
        session.paint(1, 1, 2);
        session.commit();
        drain_one_operation(&mut session, &mut notifier);

        assert_eq!(session.commit_state, OpState::Failed);
        assert!(session.stager.is_empty());
        // A follow-up refresh was triggered regardless of the failure.
        assert!(session.fetch_state.is_busy());
        let failure = notifier
            .notices()
            .iter()
            .find(|n| n.title == "Save failed")
            .expect("failure notice");
        assert!(failure.detail.contains("2 credits unused"));
        drain_one_operation(&mut session, &mut notifier);
        assert_eq!(session.fetch_state, OpState::Idle);
    }

    #[test]
    fn top_up_success_refreshes_credits() {
        let (mut session, mut notifier) = ready_session(8, 8, 0);
        session.top_up(0);
        drain_one_operation(&mut session, &mut notifier); // top-up
        assert_eq!(session.topup_state, OpState::Idle);
        drain_one_operation(&mut session, &mut notifier); // follow-up refresh
        assert_eq!(session.credits, 100);
        assert!(notifier.notices().iter().any(|n| n.title == "Top-up OK"));
    }
}
