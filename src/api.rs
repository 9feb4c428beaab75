use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};
use crate::model::{RawBundle, UpdatePromptRequest, VoteRequest};
use crate::util::now_millis;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/bundles";

/// Remote side of a report session: one dataset read, two write calls.
#[allow(async_fn_in_trait)]
pub trait ReportBackend {
    async fn fetch_bundles(&self) -> ReportResult<Vec<RawBundle>>;

    async fn update_prompt(&self, request: &UpdatePromptRequest) -> ReportResult<()>;

    async fn vote(&self, request: &VoteRequest) -> ReportResult<()>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ReportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ReportError::Fetch(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        prompt_id: &str,
        body: &T,
    ) -> ReportResult<()> {
        let url = self.endpoint(path);
        let save_error = |reason: String| ReportError::Save {
            prompt_id: prompt_id.to_string(),
            reason,
        };

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| save_error(format!("request failed: {err}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(save_error(format!("{url} returned {status}")));
        }

        debug!(url = %url, prompt_id, "post accepted");
        Ok(())
    }
}

impl ReportBackend for HttpBackend {
    async fn fetch_bundles(&self) -> ReportResult<Vec<RawBundle>> {
        info!(url = %self.base_url, "fetching bundles");

        // Timestamp defeats intermediate caches.
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("t", now_millis())])
            .send()
            .await
            .map_err(|err| ReportError::Fetch(format!("request failed: {err}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReportError::Fetch(format!(
                "{} returned {status}",
                self.base_url
            )));
        }

        resp.json::<Vec<RawBundle>>()
            .await
            .map_err(|err| ReportError::Fetch(format!("invalid bundle payload: {err}")))
    }

    async fn update_prompt(&self, request: &UpdatePromptRequest) -> ReportResult<()> {
        self.post_json("update_prompt", &request.prompt_id, request)
            .await
    }

    async fn vote(&self, request: &VoteRequest) -> ReportResult<()> {
        self.post_json("vote", &request.prompt_id, request).await
    }
}
