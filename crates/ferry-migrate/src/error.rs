//! Error types for migration operations.

use crate::locator::ACCEPTED_SHAPES;
use ferry_git::GitError;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The locator matches none of the accepted shapes.
    #[error("Malformed repository locator {locator:?}; accepted shapes: {}", ACCEPTED_SHAPES.join(", "))]
    MalformedLocator {
        /// Locator as given.
        locator: String,
    },

    /// No source client was supplied.
    #[error("Source client is not configured")]
    SourceNotConfigured,

    /// The source repository could not be looked up.
    #[error("Source repository {project}/{slug} is unreachable: {source}")]
    SourceUnreachable {
        /// Project key.
        project: String,
        /// Repository slug.
        slug: String,
        /// Underlying client failure.
        source: ClientError,
    },

    /// No target client was supplied.
    #[error("Target client is not configured")]
    TargetNotConfigured,

    /// No git transport, or no credentials for it, was supplied.
    #[error("Git transport is not configured")]
    TransportNotConfigured,

    /// A pipeline trigger was requested but none is configured.
    #[error("Pipeline trigger is not configured")]
    PipelineNotConfigured,

    /// The target host refused the credentials.
    #[error("Not authorized to create {0}")]
    TargetUnauthorized(String),

    /// The target repository already exists.
    #[error("Repository {0} already exists")]
    TargetCreateConflict(String),

    /// Creating the target failed for another reason.
    #[error("Failed to create target repository: {0}")]
    TargetTransportError(String),

    /// The source host refused the clone credentials.
    #[error("Clone authentication failed: {0}")]
    CloneAuthFailure(String),

    /// Cloning failed for another reason.
    #[error("Clone failed: {0}")]
    CloneTransportError(String),

    /// The target host refused the push credentials.
    #[error("Push authentication failed: {0}")]
    PushAuthFailure(String),

    /// Pushing failed for another reason.
    #[error("Push failed: {0}")]
    PushTransportError(String),

    /// Granting a team access failed; later grants were not attempted.
    #[error("Failed to grant team {team} access: {reason}")]
    TeamGrantFailed {
        /// Team whose grant failed.
        team: String,
        /// Underlying failure.
        reason: String,
    },

    /// Registering the webhook failed.
    #[error("Failed to register webhook: {0}")]
    WebhookRegistrationFailed(String),

    /// Triggering the downstream pipeline failed.
    #[error("Failed to trigger pipeline: {0}")]
    PipelineTriggerFailed(String),

    /// A permission level outside read, write, maintain and admin.
    #[error("Invalid permission level {0:?}; expected read, write, maintain or admin")]
    InvalidPermission(String),

    /// The request is not well formed.
    #[error("Invalid migration request: {0}")]
    InvalidRequest(String),

    /// The run was canceled.
    #[error("Migration canceled")]
    Canceled,
}

/// Errors returned by capability implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Credentials missing or refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource already exists or the change conflicts with it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network failure or unexpected response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call was canceled.
    #[error("canceled")]
    Canceled,
}

impl From<GitError> for ClientError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Unauthorized(url) => Self::Unauthorized(url),
            GitError::Http { status: 404, url } => Self::NotFound(url),
            GitError::Canceled => Self::Canceled,
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
