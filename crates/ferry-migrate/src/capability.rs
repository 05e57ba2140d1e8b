//! Interfaces to the external systems a migration drives.
//!
//! Every call takes the run's cancellation token; implementations race
//! their I/O against it and return [`ClientError::Canceled`] once it fires.

use crate::error::ClientError;
use crate::types::{PermissionLevel, SourceRepository, TargetRepository, WebhookConfig};
use async_trait::async_trait;
use ferry_git::Credentials;
use ferry_storage::Repository;
use tokio_util::sync::CancellationToken;

/// Source hosting API.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Look a repository up by project key and slug.
    async fn get_repository(
        &self,
        project_key: &str,
        slug: &str,
        ctx: &CancellationToken,
    ) -> Result<SourceRepository, ClientError>;
}

/// Target hosting API.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Create a repository owned by `organization`.
    async fn create_repository(
        &self,
        name: &str,
        organization: &str,
        private: bool,
        description: &str,
        ctx: &CancellationToken,
    ) -> Result<TargetRepository, ClientError>;

    /// Give `team` `permission` on `organization/repository`.
    async fn add_team_to_repository(
        &self,
        organization: &str,
        team: &str,
        repository: &str,
        permission: PermissionLevel,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError>;

    /// Register a webhook on `organization/repository`.
    async fn create_webhook(
        &self,
        organization: &str,
        repository: &str,
        config: &WebhookConfig,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError>;
}

/// Git transport between the two hosts.
#[async_trait]
pub trait GitTransport: Send + Sync {
    /// Clone every branch and tag of `https_url` into memory.
    async fn clone_all_branches(
        &self,
        https_url: &str,
        full_name: &str,
        credentials: &Credentials,
        ctx: &CancellationToken,
    ) -> Result<Repository, ClientError>;

    /// Push every branch and tag of `repository` to `clone_url`.
    async fn push_all_branches(
        &self,
        repository: &Repository,
        clone_url: &str,
        credentials: &Credentials,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError>;
}

/// Downstream pipeline notified once a repository has been migrated.
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    /// Announce the migrated repository.
    async fn trigger(
        &self,
        target: &TargetRepository,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError>;
}
