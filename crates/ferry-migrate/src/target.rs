//! Target provisioning.

use crate::capability::TargetClient;
use crate::error::{ClientError, MigrationError, Result};
use crate::types::TargetRepository;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Creates target repositories through a [`TargetClient`].
#[derive(Clone)]
pub struct TargetProvisioner {
    client: Arc<dyn TargetClient>,
}

impl TargetProvisioner {
    /// Create the provisioner.
    pub fn new(client: Arc<dyn TargetClient>) -> Self {
        Self { client }
    }

    /// Create `organization/name` as a private repository whose description
    /// names the source it was migrated from.
    pub async fn create_target(
        &self,
        name: &str,
        organization: &str,
        source_locator: &str,
        ctx: &CancellationToken,
    ) -> Result<TargetRepository> {
        let full_name = format!("{organization}/{name}");
        let description = format!("Migrated from {source_locator}");

        let target = self
            .client
            .create_repository(name, organization, true, &description, ctx)
            .await
            .map_err(|e| match e {
                ClientError::Unauthorized(_) => MigrationError::TargetUnauthorized(full_name.clone()),
                ClientError::Conflict(_) => MigrationError::TargetCreateConflict(full_name.clone()),
                ClientError::Canceled => MigrationError::Canceled,
                other => MigrationError::TargetTransportError(other.to_string()),
            })?;

        info!(repository = %target.full_name, url = %target.html_url, "Created target repository");
        Ok(target)
    }
}
