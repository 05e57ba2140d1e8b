//! Smart HTTP client that mirrors every branch and tag of a remote into an
//! in-memory [`Repository`] and pushes one back out.

use crate::credentials::Credentials;
use crate::pack::{PackBuilder, PackParser};
use crate::protocol::{
    build_receive_request, build_upload_request, parse_report_status, read_upload_response,
    upload_capabilities, RefAdvertisement, RefUpdate, RECEIVE_PACK, UPLOAD_PACK,
};
use crate::{GitError, Result};
use bytes::Bytes;
use ferry_storage::{ObjectId, Repository, BRANCH_PREFIX, TAG_PREFIX};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What a push changed on the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// References created or moved.
    pub updated: Vec<String>,
    /// References that already matched.
    pub up_to_date: usize,
    /// Objects sent in the pack.
    pub objects_sent: usize,
}

/// Git smart HTTP client.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
}

impl RemoteClient {
    /// Creates a client with a per-request timeout.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| GitError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetches the ref advertisement for `service`.
    pub async fn discover(
        &self,
        url: &str,
        service: &str,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<RefAdvertisement> {
        let endpoint = format!("{}/info/refs?service={service}", base(url));
        let request = self.authorize(self.http.get(&endpoint), credentials);
        let body = run(cancel, execute(request, &endpoint)).await?;
        RefAdvertisement::parse(&body, service)
    }

    /// Clones every branch and tag of `url` into a new repository named `name`.
    ///
    /// HEAD follows the remote's default branch. The result is checked for
    /// connectivity before it is returned.
    #[instrument(skip(self, credentials, cancel))]
    pub async fn clone_all(
        &self,
        url: &str,
        name: &str,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<Repository> {
        let adv = self.discover(url, UPLOAD_PACK, credentials, cancel).await?;
        let repo = Repository::new(name);

        let mut wants: Vec<ObjectId> = adv.transferable().map(|r| r.id).collect();
        wants.sort();
        wants.dedup();
        if wants.is_empty() {
            warn!(url, "Remote has no branches or tags, nothing to fetch");
            return Ok(repo);
        }

        let capabilities = upload_capabilities(&adv);
        let side_band = capabilities.iter().any(|c| c.starts_with("side-band"));
        let body = build_upload_request(&wants, &capabilities)?;

        let endpoint = format!("{}/{UPLOAD_PACK}", base(url));
        let request = self.authorize(self.http.post(&endpoint), credentials)
            .header(header::CONTENT_TYPE, "application/x-git-upload-pack-request")
            .header(header::ACCEPT, "application/x-git-upload-pack-result")
            .body(body);
        let response = run(cancel, execute(request, &endpoint)).await?;
        debug!(bytes = response.len(), "Received upload-pack response");

        for advertised in adv.transferable() {
            repo.refs.set(&advertised.name, advertised.id);
        }
        if let Some(head) = default_branch(&adv) {
            repo.refs.set_symbolic("HEAD", &head);
        }

        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<(Repository, usize, usize)> {
            let pack = read_upload_response(&response, side_band)?;
            let parsed = PackParser::new(&pack)
                .with_cancel(token)
                .parse(&repo.objects)?
                .len();
            let reachable = repo.reachable_objects(&repo.ref_tips())?.len();
            Ok((repo, parsed, reachable))
        });
        let (repo, parsed, reachable) = run(cancel, join(task, "pack decoding")).await?;

        info!(
            objects = parsed,
            reachable,
            branches = repo.branches().len(),
            tags = repo.tags().len(),
            "Cloned remote"
        );
        Ok(repo)
    }

    /// Pushes every branch and tag of `repo` to `url`.
    ///
    /// Only objects the remote does not already advertise are packed.
    #[instrument(skip(self, repo, credentials, cancel), fields(name = %repo.name))]
    pub async fn push_all(
        &self,
        repo: &Repository,
        url: &str,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<PushSummary> {
        let adv = self.discover(url, RECEIVE_PACK, credentials, cancel).await?;

        let mut summary = PushSummary::default();
        let mut updates = Vec::new();
        for prefix in [BRANCH_PREFIX, TAG_PREFIX] {
            for (name, id) in repo.refs.list_direct(prefix) {
                let old = adv.get(&name).unwrap_or(ObjectId::ZERO);
                if old == id {
                    summary.up_to_date += 1;
                    continue;
                }
                updates.push(RefUpdate { name, old, new: id });
            }
        }
        if updates.is_empty() {
            info!(up_to_date = summary.up_to_date, "Remote already up to date");
            return Ok(summary);
        }

        let snapshot = Repository {
            name: repo.name.clone(),
            objects: repo.objects.clone(),
            refs: repo.refs.clone(),
        };
        let remote_ids: Vec<ObjectId> = adv.refs().iter().map(|r| r.id).collect();
        let new_tips: Vec<ObjectId> = updates.iter().map(|u| u.new).collect();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, usize)> {
            let remote_tips: Vec<ObjectId> = remote_ids
                .into_iter()
                .filter(|id| snapshot.objects.contains(id))
                .collect();
            let remote_has: HashSet<ObjectId> =
                snapshot.reachable_objects(&remote_tips)?.into_iter().collect();
            let to_send: Vec<ObjectId> = snapshot
                .reachable_objects(&new_tips)?
                .into_iter()
                .filter(|id| !remote_has.contains(id))
                .collect();

            let mut builder = PackBuilder::new().with_cancel(token);
            builder.add_from_store(&snapshot.objects, &to_send)?;
            let count = builder.len();
            Ok((builder.build()?, count))
        });
        let (pack, objects_sent) = run(cancel, join(task, "pack encoding")).await?;
        summary.objects_sent = objects_sent;

        let body = build_receive_request(&updates, &adv, &pack)?;
        let endpoint = format!("{}/{RECEIVE_PACK}", base(url));
        let request = self.authorize(self.http.post(&endpoint), credentials)
            .header(header::CONTENT_TYPE, "application/x-git-receive-pack-request")
            .header(header::ACCEPT, "application/x-git-receive-pack-result")
            .body(body);
        let response = run(cancel, execute(request, &endpoint)).await?;

        parse_report_status(&response)?.into_result()?;
        summary.updated = updates.into_iter().map(|u| u.name).collect();
        info!(
            updated = summary.updated.len(),
            up_to_date = summary.up_to_date,
            objects = summary.objects_sent,
            pack_bytes = pack.len(),
            "Pushed to remote"
        );
        Ok(summary)
    }

    fn authorize(&self, request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
        match credentials {
            Some(credentials) => credentials.apply(request),
            None => request,
        }
    }
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Branch the remote's HEAD names, falling back to a branch at the same
/// commit when the remote does not send `symref`.
fn default_branch(adv: &RefAdvertisement) -> Option<String> {
    if let Some(target) = adv.head_target() {
        if adv.get(target).is_some() {
            return Some(target.to_string());
        }
    }
    let head = adv.get("HEAD")?;
    adv.refs()
        .iter()
        .find(|r| r.name.starts_with(BRANCH_PREFIX) && r.id == head)
        .map(|r| r.name.clone())
}

async fn execute(request: RequestBuilder, url: &str) -> Result<Bytes> {
    let response = request
        .send()
        .await
        .map_err(|e| GitError::Transport(format!("{url}: {e}")))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GitError::Unauthorized(url.to_string()));
    }
    if !status.is_success() {
        return Err(GitError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| GitError::Transport(format!("{url}: {e}")))
}

/// Waits for a blocking pack task.
async fn join<T>(task: JoinHandle<Result<T>>, what: &str) -> Result<T> {
    task.await
        .map_err(|e| GitError::Protocol(format!("{what} task failed: {e}")))?
}

/// Runs `fut` unless `cancel` fires first.
async fn run<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(GitError::Canceled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GitError::Canceled),
        result = fut => result,
    }
}
