use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::dto::pipeline_dto::{ApiEnvelope, PipelineResponse};
use crate::dto::transition_dto::{
    AddCandidatePayload, ConvertCandidatePayload, UpdateStagePayload, UpdateStatusPayload,
};
use crate::error::{Error, Result};
use crate::models::job::Job;

/// Backend calls the pipeline screen issues. Every mutation is a single
/// all-or-nothing request; callers refetch afterwards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// `Ok(None)` when the pipeline does not exist.
    async fn fetch_pipeline(&self, pipeline_id: &str) -> Result<Option<Job>>;

    async fn update_stage(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: UpdateStagePayload,
    ) -> Result<()>;

    async fn update_status(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: UpdateStatusPayload,
    ) -> Result<()>;

    async fn remove_candidate(&self, pipeline_id: &str, candidate_id: &str) -> Result<()>;

    async fn add_candidate(&self, pipeline_id: &str, payload: AddCandidatePayload) -> Result<()>;

    async fn convert_temp_candidate(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: ConvertCandidatePayload,
    ) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Clone)]
pub struct HttpPipelineService {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpPipelineService {
    pub fn new(base_url: Url, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            config.http_timeout,
        )
    }

    /// Appends path segments to the base URL, percent-encoding ids.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        debug!(%request_id, %method, %url, "Pipeline API request");
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-Request-Id", request_id.to_string());
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        warn!(status = status.as_u16(), %message, "Pipeline API returned an error");
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let text = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineService {
    #[instrument(skip(self))]
    async fn fetch_pipeline(&self, pipeline_id: &str) -> Result<Option<Job>> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id])?;
        let response = self.request(Method::GET, url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(pipeline_id, "Pipeline not found");
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        let payload: PipelineResponse = Self::read_json(response).await?;
        Ok(Some(Job::try_from(payload)?))
    }

    #[instrument(skip(self, payload), fields(stage = %payload.new_stage))]
    async fn update_stage(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: UpdateStagePayload,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id, "candidates", candidate_id, "stage"])?;
        let response = self.request(Method::PUT, url).json(&payload).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self, payload), fields(status = %payload.status))]
    async fn update_status(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: UpdateStatusPayload,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id, "candidates", candidate_id, "status"])?;
        let response = self.request(Method::PUT, url).json(&payload).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_candidate(&self, pipeline_id: &str, candidate_id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id, "candidates", candidate_id])?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn add_candidate(&self, pipeline_id: &str, payload: AddCandidatePayload) -> Result<()> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id, "candidates"])?;
        let response = self.request(Method::POST, url).json(&payload).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn convert_temp_candidate(
        &self,
        pipeline_id: &str,
        candidate_id: &str,
        payload: ConvertCandidatePayload,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "pipeline", pipeline_id, "candidates", candidate_id, "convert"])?;
        let response = self.request(Method::POST, url).json(&payload).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
