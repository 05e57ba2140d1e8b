//! [`GitTransport`] over git smart HTTP.

use crate::capability::GitTransport;
use crate::client::HttpSettings;
use crate::error::ClientError;
use async_trait::async_trait;
use ferry_git::{Credentials, RemoteClient};
use ferry_storage::Repository;
use tokio_util::sync::CancellationToken;

/// Clones and pushes with the in-process smart HTTP client; no `git`
/// binary and no working directory are involved.
pub struct SmartHttpTransport {
    remote: RemoteClient,
}

impl SmartHttpTransport {
    /// Create the transport.
    pub fn new(settings: &HttpSettings) -> Result<Self, ClientError> {
        let remote = RemoteClient::new(settings.timeout, &settings.user_agent)?;
        Ok(Self { remote })
    }
}

#[async_trait]
impl GitTransport for SmartHttpTransport {
    async fn clone_all_branches(
        &self,
        https_url: &str,
        full_name: &str,
        credentials: &Credentials,
        ctx: &CancellationToken,
    ) -> Result<Repository, ClientError> {
        Ok(self
            .remote
            .clone_all(https_url, full_name, Some(credentials), ctx)
            .await?)
    }

    async fn push_all_branches(
        &self,
        repository: &Repository,
        clone_url: &str,
        credentials: &Credentials,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.remote
            .push_all(repository, clone_url, Some(credentials), ctx)
            .await?;
        Ok(())
    }
}
