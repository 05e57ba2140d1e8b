//! GitHub target client.

use crate::capability::TargetClient;
use crate::client::{cancellable, endpoint, send, send_json, HttpSettings};
use crate::error::ClientError;
use crate::types::{PermissionLevel, TargetRepository, WebhookConfig};
use async_trait::async_trait;
use ferry_git::SecretString;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    full_name: String,
    clone_url: String,
    html_url: String,
}

#[derive(Debug, Serialize)]
struct TeamPermissionRequest {
    permission: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateHookRequest<'a> {
    name: &'static str,
    active: bool,
    events: &'a [String],
    config: HookConfig<'a>,
}

#[derive(Debug, Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'a str,
}

/// Client for the GitHub REST API.
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: SecretString,
}

impl GitHubClient {
    /// Create a client for `api_url` authenticating with `token`.
    pub fn new(
        api_url: impl Into<String>,
        token: SecretString,
        settings: &HttpSettings,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: settings.build_client()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.token.expose())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

#[async_trait]
impl TargetClient for GitHubClient {
    async fn create_repository(
        &self,
        name: &str,
        organization: &str,
        private: bool,
        description: &str,
        ctx: &CancellationToken,
    ) -> Result<TargetRepository, ClientError> {
        let url = endpoint(&self.api_url, &["orgs", organization, "repos"])?;
        let body = CreateRepoRequest {
            name,
            description,
            private,
        };
        let request = self.authorize(self.http.post(url)).json(&body);

        let repo: RepoResponse = cancellable(ctx, send_json(request)).await?;
        debug!(repository = %repo.full_name, "Created GitHub repository");

        Ok(TargetRepository {
            full_name: repo.full_name,
            name: repo.name,
            clone_url: repo.clone_url,
            html_url: repo.html_url,
        })
    }

    async fn add_team_to_repository(
        &self,
        organization: &str,
        team: &str,
        repository: &str,
        permission: PermissionLevel,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError> {
        let url = endpoint(
            &self.api_url,
            &["orgs", organization, "teams", team, "repos", organization, repository],
        )?;
        let body = TeamPermissionRequest {
            permission: permission.as_api_str(),
        };
        let request = self.authorize(self.http.put(url)).json(&body);

        cancellable(ctx, async { send(request).await.map(drop) }).await
    }

    async fn create_webhook(
        &self,
        organization: &str,
        repository: &str,
        config: &WebhookConfig,
        ctx: &CancellationToken,
    ) -> Result<(), ClientError> {
        let url = endpoint(&self.api_url, &["repos", organization, repository, "hooks"])?;
        let body = CreateHookRequest {
            name: "web",
            active: config.active,
            events: &config.events,
            config: HookConfig {
                url: &config.url,
                content_type: &config.content_type,
            },
        };
        let request = self.authorize(self.http.post(url)).json(&body);

        cancellable(ctx, async { send(request).await.map(drop) }).await
    }
}
