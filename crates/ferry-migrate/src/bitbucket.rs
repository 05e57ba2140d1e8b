//! Bitbucket Server / Data Center source client.

use crate::capability::SourceClient;
use crate::client::{cancellable, endpoint, send_json, HttpSettings};
use crate::error::ClientError;
use crate::types::SourceRepository;
use async_trait::async_trait;
use ferry_git::Credentials;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Bitbucket API response types
#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    slug: String,
    project: BitbucketProject,
    links: BitbucketLinks,
}

#[derive(Debug, Deserialize)]
struct BitbucketProject {
    key: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<BitbucketCloneLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCloneLink {
    href: String,
    name: String,
}

/// Client for the Bitbucket Server REST API (`/rest/api/1.0`).
pub struct BitbucketClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl BitbucketClient {
    /// Create a client for the server at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        settings: &HttpSettings,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl SourceClient for BitbucketClient {
    async fn get_repository(
        &self,
        project_key: &str,
        slug: &str,
        ctx: &CancellationToken,
    ) -> Result<SourceRepository, ClientError> {
        let url = endpoint(
            &self.base_url,
            &["rest", "api", "1.0", "projects", project_key, "repos", slug],
        )?;
        let request = self.http.get(url).basic_auth(
            &self.credentials.username,
            Some(self.credentials.password.expose()),
        );

        let repo: BitbucketRepo = cancellable(ctx, send_json(request)).await?;
        debug!(project = %repo.project.key, slug = %repo.slug, "Fetched repository info");

        let clone_url = clone_link(&repo.links.clone).ok_or_else(|| {
            ClientError::Transport(format!("{project_key}/{slug} has no http or ssh clone link"))
        })?;

        Ok(SourceRepository {
            full_name: format!("{}/{}", repo.project.key, repo.slug),
            project_key: repo.project.key,
            slug: repo.slug,
            clone_url,
        })
    }
}

/// Prefers the `http` clone link, falling back to `ssh`. User info embedded
/// by the server is stripped; credentials travel in headers.
fn clone_link(links: &[BitbucketCloneLink]) -> Option<String> {
    let link = links
        .iter()
        .find(|l| l.name == "http" || l.name == "https")
        .or_else(|| links.iter().find(|l| l.name == "ssh"))?;

    match Url::parse(&link.href) {
        Ok(mut url) if url.scheme().starts_with("http") => {
            // Only fails for cannot-be-a-base URLs, which http URLs are not.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            Some(url.to_string())
        }
        _ => Some(link.href.clone()),
    }
}
