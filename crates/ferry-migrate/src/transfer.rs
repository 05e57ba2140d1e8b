//! Transport engine: clone the source into memory, publish it to the target.

use crate::capability::GitTransport;
use crate::error::{ClientError, MigrationError, Result};
use crate::locator::ssh_to_https;
use crate::types::{SourceRepository, TargetRepository};
use ferry_git::Credentials;
use ferry_storage::Repository;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Counts of what was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    /// Branches pushed.
    pub branches: usize,
    /// Tags pushed.
    pub tags: usize,
}

/// Moves history between hosts through a [`GitTransport`].
#[derive(Clone)]
pub struct TransportEngine {
    transport: Arc<dyn GitTransport>,
}

impl TransportEngine {
    /// Create the engine.
    pub fn new(transport: Arc<dyn GitTransport>) -> Self {
        Self { transport }
    }

    /// Clone every branch and tag of `source` over HTTPS.
    pub async fn transfer(
        &self,
        source: &SourceRepository,
        credentials: &Credentials,
        ctx: &CancellationToken,
    ) -> Result<Repository> {
        let url = ssh_to_https(&source.clone_url);
        debug!(%url, "Cloning source");

        let repository = self
            .transport
            .clone_all_branches(&url, &source.full_name, credentials, ctx)
            .await
            .map_err(|e| match e {
                ClientError::Unauthorized(reason) => MigrationError::CloneAuthFailure(reason),
                ClientError::Canceled => MigrationError::Canceled,
                other => MigrationError::CloneTransportError(other.to_string()),
            })?;

        info!(
            repository = %source.full_name,
            branches = repository.branches().len(),
            tags = repository.tags().len(),
            "Cloned source"
        );
        Ok(repository)
    }

    /// Apply `branch_renames`, then push every branch and tag to `target`.
    pub async fn publish(
        &self,
        repository: &Repository,
        target: &TargetRepository,
        credentials: &Credentials,
        branch_renames: &BTreeMap<String, String>,
        ctx: &CancellationToken,
    ) -> Result<PublishSummary> {
        for (from, to) in branch_renames {
            repository.rename_branch(from, to).map_err(|e| {
                MigrationError::InvalidRequest(format!("cannot rename branch {from} to {to}: {e}"))
            })?;
        }

        self.transport
            .push_all_branches(repository, &target.clone_url, credentials, ctx)
            .await
            .map_err(|e| match e {
                ClientError::Unauthorized(reason) => MigrationError::PushAuthFailure(reason),
                ClientError::Canceled => MigrationError::Canceled,
                other => MigrationError::PushTransportError(other.to_string()),
            })?;

        let summary = PublishSummary {
            branches: repository.branches().len(),
            tags: repository.tags().len(),
        };
        info!(
            repository = %target.full_name,
            branches = summary.branches,
            tags = summary.tags,
            "Published to target"
        );
        Ok(summary)
    }
}
