//! HTTP client for the broker's job queue protocol.

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;

use prover_types::{
    ApiResponse, HeartbeatRequest, JobAck, LeaseId, ProvingJobId, ProvingJobLease,
    ProvingJobResult, PullJobResponse, RejectRequest, ResolveRequest,
};

/// Client for the four-call queue protocol.
#[derive(Clone)]
pub struct BrokerClient {
    base_url: String,
    client: reqwest::Client,
}

impl BrokerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Lease one job, or `None` when the broker has no eligible work.
    pub async fn pull_job(&self) -> anyhow::Result<Option<ProvingJobLease>> {
        let response: PullJobResponse = self.post("/jobs/pull", &serde_json::json!({})).await?;
        Ok(response.lease)
    }

    pub async fn heartbeat(&self, job_id: &ProvingJobId, lease_id: LeaseId) -> anyhow::Result<()> {
        let _: JobAck = self
            .post(
                "/jobs/heartbeat",
                &HeartbeatRequest {
                    job_id: job_id.clone(),
                    lease_id,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn resolve(
        &self,
        job_id: &ProvingJobId,
        lease_id: LeaseId,
        result: ProvingJobResult,
    ) -> anyhow::Result<()> {
        let _: JobAck = self
            .post(
                "/jobs/resolve",
                &ResolveRequest {
                    job_id: job_id.clone(),
                    lease_id,
                    result,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn reject(
        &self,
        job_id: &ProvingJobId,
        lease_id: LeaseId,
        reason: impl Into<String>,
    ) -> anyhow::Result<()> {
        let _: JobAck = self
            .post(
                "/jobs/reject",
                &RejectRequest {
                    job_id: job_id.clone(),
                    lease_id,
                    reason: reason.into(),
                },
            )
            .await?;
        Ok(())
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Broker returned error status {} for {}",
                response.status(),
                url
            ));
        }

        match response.json::<ApiResponse<T>>().await? {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { message } => Err(anyhow!("Broker error: {}", message)),
        }
    }
}
