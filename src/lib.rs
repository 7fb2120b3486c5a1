pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    pipeline_service::{HttpPipelineService, PipelineApi},
    pipeline_store::PipelineStore,
    transition_service::TransitionDispatcher,
};

/// Shared handles for every pipeline screen: one backend client and one query cache.
#[derive(Clone)]
pub struct AppState {
    pub pipeline_service: Arc<dyn PipelineApi>,
    pub pipeline_store: Arc<PipelineStore>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let service = HttpPipelineService::from_config(config)?;
        tracing::info!(base_url = %config.api_base_url, "Pipeline API client configured");
        Ok(Self::with_api(Arc::new(service), config.stale_after()))
    }

    pub fn from_global_config() -> Result<Self> {
        Self::new(crate::config::get_config()?)
    }

    pub fn with_api(api: Arc<dyn PipelineApi>, stale_after: Option<std::time::Duration>) -> Self {
        let pipeline_store = Arc::new(PipelineStore::new(api.clone(), stale_after));
        Self {
            pipeline_service: api,
            pipeline_store,
        }
    }

    pub fn dispatcher(&self, pipeline_id: impl Into<String>) -> TransitionDispatcher {
        TransitionDispatcher::new(
            pipeline_id,
            self.pipeline_service.clone(),
            self.pipeline_store.clone(),
        )
    }
}
