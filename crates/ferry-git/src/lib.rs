//! Git wire formats and a smart HTTP client for Ferry.
//!
//! This crate speaks just enough of the git smart HTTP protocol to mirror a
//! repository: it fetches every branch and tag of a remote into a
//! [`ferry_storage::Repository`] and pushes that repository to another remote.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry_git::{Credentials, RemoteClient};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ferry_git::Result<()> {
//! let client = RemoteClient::new(Duration::from_secs(30), "ferry")?;
//! let cancel = CancellationToken::new();
//! let source = Credentials::basic("alice", "secret");
//! let repo = client
//!     .clone_all("https://bitbucket.example.com/scm/proj/app.git", "PROJ/app", Some(&source), &cancel)
//!     .await?;
//! client
//!     .push_all(&repo, "https://github.com/acme/app.git", Some(&Credentials::token("ghp_x")), &cancel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod credentials;
mod error;
mod http;
pub mod pack;
pub mod pktline;
pub mod protocol;

pub use credentials::{Credentials, SecretString};
pub use error::GitError;
pub use http::{PushSummary, RemoteClient};
pub use pack::{PackBuilder, PackParser};
pub use pktline::{PktLine, PktLineReader, PktLineWriter};
pub use protocol::{PushReport, RefAdvertisement, RefUpdate};

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;
