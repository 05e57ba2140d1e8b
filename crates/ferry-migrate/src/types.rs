//! Common types for migration operations.

use crate::error::{MigrationError, Result};
use crate::progress::{MigrationStep, StepStatus};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// GitHub repository names: ASCII letters, digits, `.`, `_` and `-`.
static REPO_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("valid regex"));

/// Access a team is granted on the target repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Clone and pull.
    #[serde(rename = "pull")]
    Read,
    /// Read plus push.
    #[serde(rename = "push")]
    Write,
    /// Write plus repository settings short of destructive ones.
    #[serde(rename = "maintain")]
    Maintain,
    /// Full control.
    #[serde(rename = "admin")]
    Admin,
}

impl PermissionLevel {
    /// Value the GitHub API expects.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Read => "pull",
            Self::Write => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" | "pull" => Ok(Self::Read),
            "write" | "push" => Ok(Self::Write),
            "maintain" => Ok(Self::Maintain),
            "admin" => Ok(Self::Admin),
            _ => Err(MigrationError::InvalidPermission(s.to_string())),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// One migration, from a source locator to `organization/name` on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Source locator, in any shape the resolver accepts.
    pub source_locator: String,

    /// Organization that will own the target repository.
    pub target_organization: String,

    /// Name of the target repository.
    pub target_repository_name: String,

    /// Webhook to register on the target.
    pub webhook_url: Option<String>,

    /// Team name to permission, applied in name order.
    pub team_grants: BTreeMap<String, PermissionLevel>,

    /// Report every step without calling anything.
    pub dry_run: bool,

    /// Run the pipeline trigger after the webhook step.
    pub trigger_pipeline: bool,

    /// Branches to rename before pushing, old name to new name.
    pub branch_renames: BTreeMap<String, String>,
}

impl MigrationRequest {
    /// Create a request with no webhook, no team grants and no renames.
    pub fn new(
        source_locator: impl Into<String>,
        target_organization: impl Into<String>,
        target_repository_name: impl Into<String>,
    ) -> Self {
        Self {
            source_locator: source_locator.into(),
            target_organization: target_organization.into(),
            target_repository_name: target_repository_name.into(),
            webhook_url: None,
            team_grants: BTreeMap::new(),
            dry_run: false,
            trigger_pipeline: false,
            branch_renames: BTreeMap::new(),
        }
    }

    /// Set the webhook URL. A blank URL means no webhook.
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.webhook_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Grant a team a permission level.
    pub fn with_team(mut self, team: impl Into<String>, permission: PermissionLevel) -> Self {
        self.team_grants.insert(team.into(), permission);
        self
    }

    /// Grant teams permission levels given as text, e.g. `("platform", "push")`.
    pub fn with_team_grants<I, T, P>(mut self, grants: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, P)>,
        T: Into<String>,
        P: AsRef<str>,
    {
        for (team, permission) in grants {
            self.team_grants
                .insert(team.into(), permission.as_ref().parse()?);
        }
        Ok(self)
    }

    /// Rename a branch before pushing.
    pub fn with_branch_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.branch_renames.insert(from.into(), to.into());
        self
    }

    /// Enable or disable dry-run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable the pipeline trigger step.
    pub fn with_pipeline_trigger(mut self, trigger: bool) -> Self {
        self.trigger_pipeline = trigger;
        self
    }

    /// Webhook URL, if one is set and not blank.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// `organization/name` of the target.
    pub fn target_full_name(&self) -> String {
        format!("{}/{}", self.target_organization, self.target_repository_name)
    }

    /// Check the request before any step runs.
    pub fn validate(&self) -> Result<()> {
        if self.source_locator.trim().is_empty() {
            return Err(MigrationError::InvalidRequest(
                "source locator is empty".to_string(),
            ));
        }
        if self.target_organization.trim().is_empty() {
            return Err(MigrationError::InvalidRequest(
                "target organization is empty".to_string(),
            ));
        }

        let name = &self.target_repository_name;
        if !REPO_NAME_REGEX.is_match(name) || name == "." || name == ".." {
            return Err(MigrationError::InvalidRequest(format!(
                "invalid target repository name {name:?}"
            )));
        }

        if let Some(team) = self.team_grants.keys().find(|team| team.trim().is_empty()) {
            return Err(MigrationError::InvalidRequest(format!(
                "invalid team name {team:?}"
            )));
        }

        for (from, to) in &self.branch_renames {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(MigrationError::InvalidRequest(format!(
                    "invalid branch rename {from:?} -> {to:?}"
                )));
            }
        }

        Ok(())
    }
}

/// A repository found on the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepository {
    /// Project key, e.g. `PROJ`.
    pub project_key: String,
    /// Repository slug, e.g. `app`.
    pub slug: String,
    /// `PROJECT/slug`.
    pub full_name: String,
    /// Clone URL, HTTP or SSH.
    pub clone_url: String,
}

/// A repository created on the target host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRepository {
    /// `organization/name`.
    pub full_name: String,
    /// Repository name.
    pub name: String,
    /// HTTPS clone URL.
    pub clone_url: String,
    /// Browsable URL.
    pub html_url: String,
}

/// Webhook registration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookConfig {
    /// Delivery URL.
    pub url: String,
    /// Payload encoding.
    pub content_type: String,
    /// Subscribed events.
    pub events: Vec<String>,
    /// Deliver immediately.
    pub active: bool,
}

impl WebhookConfig {
    /// Events every migrated repository subscribes to.
    pub const DEFAULT_EVENTS: [&'static str; 3] = ["push", "pull_request", "issues"];

    /// JSON webhook for the default events, active immediately.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: "json".to_string(),
            events: Self::DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect(),
            active: true,
        }
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Whether every step completed.
    pub success: bool,

    /// Summary, naming the failed step on failure.
    pub message: String,

    /// Browsable URL of the target after a successful live run.
    pub target_repository_url: Option<String>,

    /// Every step in order with its final state.
    pub steps: Vec<MigrationStep>,

    /// Start time of the run.
    pub started_at: DateTime<Utc>,

    /// End time of the run.
    pub completed_at: DateTime<Utc>,
}

impl MigrationResult {
    /// The step that failed, if any.
    pub fn failed_step(&self) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parsing() {
        assert_eq!("read".parse::<PermissionLevel>().unwrap(), PermissionLevel::Read);
        assert_eq!("Pull".parse::<PermissionLevel>().unwrap(), PermissionLevel::Read);
        assert_eq!("push".parse::<PermissionLevel>().unwrap(), PermissionLevel::Write);
        assert_eq!("WRITE".parse::<PermissionLevel>().unwrap(), PermissionLevel::Write);
        assert_eq!("maintain".parse::<PermissionLevel>().unwrap(), PermissionLevel::Maintain);
        assert_eq!(" admin ".parse::<PermissionLevel>().unwrap(), PermissionLevel::Admin);

        let err = "owner".parse::<PermissionLevel>().unwrap_err();
        assert!(matches!(err, MigrationError::InvalidPermission(p) if p == "owner"));
    }

    #[test]
    fn test_permission_serializes_to_api_value() {
        assert_eq!(serde_json::to_string(&PermissionLevel::Write).unwrap(), "\"push\"");
        assert_eq!(PermissionLevel::Read.as_api_str(), "pull");
        assert_eq!(PermissionLevel::Read.to_string(), "read");
    }

    #[test]
    fn test_request_builder() {
        let request = MigrationRequest::new("/scm/PROJ/app.git", "acme", "app")
            .with_webhook("https://hooks.example.com/ci")
            .with_team("platform", PermissionLevel::Write)
            .with_branch_rename("master", "main")
            .with_dry_run(true);

        assert_eq!(request.webhook(), Some("https://hooks.example.com/ci"));
        assert_eq!(request.team_grants.len(), 1);
        assert_eq!(request.target_full_name(), "acme/app");
        assert!(request.dry_run);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_webhook_is_absent() {
        let request = MigrationRequest::new("/scm/PROJ/app.git", "acme", "app").with_webhook("");
        assert_eq!(request.webhook_url, None);

        let mut request = request;
        request.webhook_url = Some("   ".to_string());
        assert_eq!(request.webhook(), None);
    }

    #[test]
    fn test_team_grants_from_text() {
        let request = MigrationRequest::new("/scm/PROJ/app.git", "acme", "app")
            .with_team_grants([("platform", "push"), ("security", "admin")])
            .unwrap();
        assert_eq!(request.team_grants["platform"], PermissionLevel::Write);

        let err = MigrationRequest::new("/scm/PROJ/app.git", "acme", "app")
            .with_team_grants([("platform", "superuser")])
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidPermission(_)));
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let base = MigrationRequest::new("/scm/PROJ/app.git", "acme", "app");

        assert!(MigrationRequest { target_organization: " ".into(), ..base.clone() }
            .validate()
            .is_err());
        assert!(MigrationRequest { source_locator: String::new(), ..base.clone() }
            .validate()
            .is_err());
        for name in ["", ".", "..", "my repo", "app/x"] {
            let request = MigrationRequest {
                target_repository_name: name.into(),
                ..base.clone()
            };
            assert!(request.validate().is_err(), "accepted {name:?}");
        }
        assert!(base.clone().with_branch_rename("master", "").validate().is_err());
        assert!(base.with_team("", PermissionLevel::Read).validate().is_err());
    }
}
