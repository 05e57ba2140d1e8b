//! Team access on the target repository.

use crate::capability::TargetClient;
use crate::error::{ClientError, MigrationError, Result};
use crate::types::{PermissionLevel, TargetRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Grants teams access through a [`TargetClient`].
#[derive(Clone)]
pub struct AccessConfigurator {
    client: Arc<dyn TargetClient>,
}

impl AccessConfigurator {
    /// Create the configurator.
    pub fn new(client: Arc<dyn TargetClient>) -> Self {
        Self { client }
    }

    /// Apply every grant in team-name order.
    ///
    /// The first failing grant stops the rest. Returns the step message.
    pub async fn configure(
        &self,
        organization: &str,
        target: &TargetRepository,
        grants: &BTreeMap<String, PermissionLevel>,
        ctx: &CancellationToken,
    ) -> Result<String> {
        if grants.is_empty() {
            return Ok("No teams to configure".to_string());
        }

        for (team, permission) in grants {
            self.client
                .add_team_to_repository(organization, team, &target.name, *permission, ctx)
                .await
                .map_err(|e| match e {
                    ClientError::Canceled => MigrationError::Canceled,
                    other => MigrationError::TeamGrantFailed {
                        team: team.clone(),
                        reason: other.to_string(),
                    },
                })?;
            debug!(%team, %permission, repository = %target.full_name, "Granted team access");
        }

        let summary: Vec<String> = grants
            .iter()
            .map(|(team, permission)| format!("{team} ({permission})"))
            .collect();
        Ok(format!("Granted access to {}", summary.join(", ")))
    }
}
