//! JSON/HTTP implementation of [`RemoteGridSource`].
//!
//! Endpoint layout mirrors the canvas service API:
//!   GET  {base}/api/canvas/meta
//!   GET  {base}/api/canvas/cells?x=&y=&take=
//!   GET  {base}/api/canvas/credits/{account}
//!   POST {base}/api/canvas/commit
//!   POST {base}/api/canvas/topup
//!
//! Outcome lists use serde's externally-tagged `Result` encoding, e.g.
//! `[{"Ok":null},{"Err":{"InsufficientBalance":{"balance":5}}}]`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::remote::{
    AccountId, CommitItemError, EditOutcome, GridMetadata, PixelEdit, RemoteError,
    RemoteGridSource,
};

pub struct HttpGridSource {
    client: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
struct CellsResponse {
    cells: Vec<u8>,
}

#[derive(Deserialize)]
struct CreditsResponse {
    credits: u128,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    account: &'a str,
    memo: &'a str,
    edits: &'a [PixelEdit],
}

#[derive(Deserialize)]
struct CommitResponse {
    outcomes: Vec<EditOutcome>,
}

#[derive(Serialize)]
struct TopUpRequest<'a> {
    account: &'a str,
    plan: usize,
    fee: u128,
    credits: u64,
}

#[derive(Deserialize)]
struct TopUpResponse {
    result: Result<u64, CommitItemError>,
}

impl HttpGridSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, String> {
        self.client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?
            .json::<T>()
            .await
            .map_err(|e| e.to_string())
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, String> {
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?
            .json::<T>()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl RemoteGridSource for HttpGridSource {
    async fn grid_metadata(&self) -> Result<GridMetadata, RemoteError> {
        self.get_json(format!("{}/api/canvas/meta", self.base))
            .await
            .map_err(RemoteError::MetaFetch)
    }

    async fn credit_balance(&self, account: &AccountId) -> Result<u128, RemoteError> {
        let resp: CreditsResponse = self
            .get_json(format!("{}/api/canvas/credits/{}", self.base, account))
            .await
            .map_err(RemoteError::CreditFetch)?;
        Ok(resp.credits)
    }

    async fn read_cells(&self, x: u32, y: u32, take: Option<u32>) -> Result<Vec<u8>, RemoteError> {
        let mut url = format!("{}/api/canvas/cells?x={x}&y={y}", self.base);
        if let Some(take) = take {
            url.push_str(&format!("&take={take}"));
        }
        let resp: CellsResponse = self.get_json(url).await.map_err(RemoteError::Read)?;
        Ok(resp.cells)
    }

    async fn commit_edits(
        &self,
        account: &AccountId,
        edits: &[PixelEdit],
        memo: &str,
    ) -> Result<Vec<EditOutcome>, RemoteError> {
        let body = CommitRequest {
            account: &account.0,
            memo,
            edits,
        };
        let resp: CommitResponse = self
            .post_json(format!("{}/api/canvas/commit", self.base), &body)
            .await
            .map_err(RemoteError::CommitTransport)?;
        Ok(resp.outcomes)
    }

    async fn top_up(
        &self,
        account: &AccountId,
        plan: usize,
        fee: u128,
        credits: u64,
    ) -> Result<Result<u64, CommitItemError>, RemoteError> {
        let body = TopUpRequest {
            account: &account.0,
            plan,
            fee,
            credits,
        };
        let resp: TopUpResponse = self
            .post_json(format!("{}/api/canvas/topup", self.base), &body)
            .await
            .map_err(RemoteError::TopUp)?;
        Ok(resp.result)
    }
}
