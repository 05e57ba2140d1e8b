//! # Ferry Migration Orchestrator
//!
//! Moves one repository from Bitbucket Server to GitHub end to end:
//!
//! 1. validate the source repository
//! 2. create the target repository (private)
//! 3. clone every branch and tag into memory
//! 4. push every branch and tag to the target
//! 5. grant teams access
//! 6. register a webhook
//! 7. optionally notify a downstream pipeline
//!
//! Steps run strictly in order and report progress through a callback. A
//! dry run reports what each step would do without calling anything.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ferry_migrate::{MigrationRequest, Migrator};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ferry_migrate::Result<()> {
//! let request = MigrationRequest::new("/projects/PROJ/repos/app", "acme", "app")
//!     .with_team_grants([("platform", "push")])?
//!     .with_dry_run(true);
//!
//! let result = Migrator::dry_run_only()
//!     .run_migration(&request, None, &CancellationToken::new())
//!     .await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod bitbucket;
pub mod capability;
pub mod client;
pub mod error;
pub mod github;
pub mod locator;
pub mod migrator;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod target;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod webhook;

// Re-export main types
pub use bitbucket::BitbucketClient;
pub use capability::{GitTransport, PipelineTrigger, SourceClient, TargetClient};
pub use client::HttpSettings;
pub use error::{ClientError, MigrationError, Result};
pub use github::{GitHubClient, GITHUB_API_URL};
pub use migrator::{Capabilities, LiveCapabilities, Migrator, MigratorBuilder};
pub use pipeline::WebhookPipelineTrigger;
pub use progress::{MigrationStep, ProgressCallback, StepKind, StepStatus, StepTracker};
pub use transport::SmartHttpTransport;
pub use types::*;

pub use ferry_git::{Credentials, SecretString};

/// Version of the migration tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
