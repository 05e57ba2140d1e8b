//! Webhook registration on the target repository.

use crate::capability::TargetClient;
use crate::error::{ClientError, MigrationError, Result};
use crate::types::{TargetRepository, WebhookConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Registers webhooks through a [`TargetClient`].
#[derive(Clone)]
pub struct NotificationConfigurator {
    client: Arc<dyn TargetClient>,
}

impl NotificationConfigurator {
    /// Create the configurator.
    pub fn new(client: Arc<dyn TargetClient>) -> Self {
        Self { client }
    }

    /// Register a JSON webhook for push, pull request and issue events.
    /// Without a URL nothing is called. Returns the step message.
    pub async fn configure(
        &self,
        organization: &str,
        target: &TargetRepository,
        url: Option<&str>,
        ctx: &CancellationToken,
    ) -> Result<String> {
        let Some(url) = url else {
            return Ok("No webhook to configure".to_string());
        };

        let config = WebhookConfig::new(url);
        self.client
            .create_webhook(organization, &target.name, &config, ctx)
            .await
            .map_err(|e| match e {
                ClientError::Canceled => MigrationError::Canceled,
                other => MigrationError::WebhookRegistrationFailed(other.to_string()),
            })?;

        Ok(format!("Registered webhook {url}"))
    }
}
