//! Source access: resolve a locator and confirm the repository exists.

use crate::capability::SourceClient;
use crate::error::{ClientError, MigrationError, Result};
use crate::locator;
use crate::types::SourceRepository;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Validates source repositories through a [`SourceClient`].
#[derive(Clone)]
pub struct SourceAccess {
    client: Option<Arc<dyn SourceClient>>,
}

impl SourceAccess {
    /// Create the adapter; without a client every lookup fails with
    /// [`MigrationError::SourceNotConfigured`].
    pub fn new(client: Option<Arc<dyn SourceClient>>) -> Self {
        Self { client }
    }

    /// Resolve `locator` and look the repository up.
    pub async fn validate_source(
        &self,
        locator: &str,
        ctx: &CancellationToken,
    ) -> Result<SourceRepository> {
        let client = self.client.as_ref().ok_or(MigrationError::SourceNotConfigured)?;
        let (project, slug) = locator::resolve(locator)?;
        debug!(%project, %slug, "Resolved source locator");

        match client.get_repository(&project, &slug, ctx).await {
            Ok(repository) => Ok(repository),
            Err(ClientError::Canceled) => Err(MigrationError::Canceled),
            Err(source) => Err(MigrationError::SourceUnreachable {
                project,
                slug,
                source,
            }),
        }
    }
}
