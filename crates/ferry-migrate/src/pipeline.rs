//! Downstream pipeline notification after a migration.

use crate::capability::PipelineTrigger;
use crate::client::{cancellable, send, HttpSettings};
use crate::error::{ClientError, MigrationError, Result};
use crate::types::TargetRepository;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the optional pipeline step through a [`PipelineTrigger`].
#[derive(Clone)]
pub struct PipelineLauncher {
    trigger: Arc<dyn PipelineTrigger>,
}

impl PipelineLauncher {
    /// Create the launcher.
    pub fn new(trigger: Arc<dyn PipelineTrigger>) -> Self {
        Self { trigger }
    }

    /// Announce `target`. Returns the step message.
    pub async fn launch(&self, target: &TargetRepository, ctx: &CancellationToken) -> Result<String> {
        self.trigger.trigger(target, ctx).await.map_err(|e| match e {
            ClientError::Canceled => MigrationError::Canceled,
            other => MigrationError::PipelineTriggerFailed(other.to_string()),
        })?;
        Ok(format!("Triggered pipeline for {}", target.full_name))
    }
}

#[derive(Debug, Serialize)]
struct PipelinePayload<'a> {
    event: &'static str,
    repository: &'a str,
    clone_url: &'a str,
    html_url: &'a str,
}

/// Posts a `repository_migrated` event to a fixed URL.
pub struct WebhookPipelineTrigger {
    http: Client,
    url: String,
}

impl WebhookPipelineTrigger {
    /// Create a trigger posting to `url`.
    pub fn new(url: impl Into<String>, settings: &HttpSettings) -> std::result::Result<Self, ClientError> {
        Ok(Self {
            http: settings.build_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PipelineTrigger for WebhookPipelineTrigger {
    async fn trigger(
        &self,
        target: &TargetRepository,
        ctx: &CancellationToken,
    ) -> std::result::Result<(), ClientError> {
        let payload = PipelinePayload {
            event: "repository_migrated",
            repository: &target.full_name,
            clone_url: &target.clone_url,
            html_url: &target.html_url,
        };
        let request = self.http.post(&self.url).json(&payload);
        cancellable(ctx, async { send(request).await.map(drop) }).await
    }
}
