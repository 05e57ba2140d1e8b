//! The migration orchestrator.
//!
//! A run is a strict linear pipeline over [`StepKind::plan`]. Each step goes
//! `pending -> running -> completed | failed`; the first failure ends the
//! run and leaves every later step pending. Nothing is rolled back.

use crate::access::AccessConfigurator;
use crate::capability::{GitTransport, PipelineTrigger, SourceClient, TargetClient};
use crate::error::{MigrationError, Result};
use crate::pipeline::PipelineLauncher;
use crate::progress::{ProgressCallback, StepKind, StepTracker};
use crate::source::SourceAccess;
use crate::target::TargetProvisioner;
use crate::transfer::TransportEngine;
use crate::types::{MigrationRequest, MigrationResult, TargetRepository};
use crate::webhook::NotificationConfigurator;
use chrono::Utc;
use ferry_git::Credentials;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Message of a successful live run.
pub const SUCCESS_MESSAGE: &str = "Migration completed successfully";
/// Message of a successful dry run.
pub const DRY_RUN_MESSAGE: &str = "Migration dry run completed - no actual changes made";

/// Everything a live migration calls out to.
#[derive(Clone)]
pub struct LiveCapabilities {
    /// Source hosting API.
    pub source: Arc<dyn SourceClient>,
    /// Target hosting API.
    pub target: Arc<dyn TargetClient>,
    /// Git transport.
    pub transport: Arc<dyn GitTransport>,
    /// Optional downstream pipeline.
    pub pipeline: Option<Arc<dyn PipelineTrigger>>,
    /// Credentials for cloning from the source.
    pub source_credentials: Credentials,
    /// Credentials for pushing to the target.
    pub target_credentials: Credentials,
}

/// What a [`Migrator`] is able to do.
#[derive(Clone)]
pub enum Capabilities {
    /// Only dry runs; live requests are refused up front.
    DryRunOnly,
    /// Dry and live runs.
    Live(LiveCapabilities),
}

/// Builder for a live [`Migrator`].
#[derive(Default)]
pub struct MigratorBuilder {
    source: Option<Arc<dyn SourceClient>>,
    target: Option<Arc<dyn TargetClient>>,
    transport: Option<Arc<dyn GitTransport>>,
    pipeline: Option<Arc<dyn PipelineTrigger>>,
    source_credentials: Option<Credentials>,
    target_credentials: Option<Credentials>,
}

impl MigratorBuilder {
    /// Set the source client.
    pub fn source(mut self, client: Arc<dyn SourceClient>) -> Self {
        self.source = Some(client);
        self
    }

    /// Set the target client.
    pub fn target(mut self, client: Arc<dyn TargetClient>) -> Self {
        self.target = Some(client);
        self
    }

    /// Set the git transport.
    pub fn transport(mut self, transport: Arc<dyn GitTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the pipeline trigger.
    pub fn pipeline(mut self, trigger: Arc<dyn PipelineTrigger>) -> Self {
        self.pipeline = Some(trigger);
        self
    }

    /// Set the credentials used to clone from the source.
    pub fn source_credentials(mut self, credentials: Credentials) -> Self {
        self.source_credentials = Some(credentials);
        self
    }

    /// Set the credentials used to push to the target.
    pub fn target_credentials(mut self, credentials: Credentials) -> Self {
        self.target_credentials = Some(credentials);
        self
    }

    /// Build a live migrator, failing on the first missing capability.
    pub fn build(self) -> Result<Migrator> {
        let source = self.source.ok_or(MigrationError::SourceNotConfigured)?;
        let target = self.target.ok_or(MigrationError::TargetNotConfigured)?;
        let transport = self.transport.ok_or(MigrationError::TransportNotConfigured)?;
        let source_credentials = self
            .source_credentials
            .ok_or(MigrationError::TransportNotConfigured)?;
        let target_credentials = self
            .target_credentials
            .ok_or(MigrationError::TransportNotConfigured)?;

        Ok(Migrator::new(Capabilities::Live(LiveCapabilities {
            source,
            target,
            transport,
            pipeline: self.pipeline,
            source_credentials,
            target_credentials,
        })))
    }
}

/// Runs migrations.
#[derive(Clone)]
pub struct Migrator {
    capabilities: Capabilities,
}

impl Migrator {
    /// Create a migrator from explicit capabilities.
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// A migrator that can only simulate.
    pub fn dry_run_only() -> Self {
        Self::new(Capabilities::DryRunOnly)
    }

    /// Start building a live migrator.
    pub fn builder() -> MigratorBuilder {
        MigratorBuilder::default()
    }

    /// Whether live runs are possible.
    pub fn is_live(&self) -> bool {
        matches!(self.capabilities, Capabilities::Live(_))
    }

    /// Run one migration.
    ///
    /// Returns `Err` without running any step when the request is invalid or
    /// needs a capability this migrator lacks. Failures of individual steps
    /// are reported through an unsuccessful [`MigrationResult`].
    #[instrument(
        name = "migration",
        skip_all,
        fields(
            source = %request.source_locator,
            target = %request.target_full_name(),
            dry_run = request.dry_run,
        )
    )]
    pub async fn run_migration(
        &self,
        request: &MigrationRequest,
        callback: Option<ProgressCallback>,
        ctx: &CancellationToken,
    ) -> Result<MigrationResult> {
        request.validate()?;

        let live = match (&self.capabilities, request.dry_run) {
            (_, true) => None,
            (Capabilities::Live(live), false) => Some(live),
            (Capabilities::DryRunOnly, false) => return Err(MigrationError::SourceNotConfigured),
        };
        if let Some(live) = live {
            if request.trigger_pipeline && live.pipeline.is_none() {
                return Err(MigrationError::PipelineNotConfigured);
            }
        }

        let started_at = Utc::now();
        let mut tracker = StepTracker::new(&StepKind::plan(request.trigger_pipeline), callback);
        info!("Starting migration");

        let outcome = match live {
            Some(live) => execute(live, request, &mut tracker, ctx).await.map(Some),
            None => {
                simulate(request, &mut tracker);
                Ok(None)
            }
        };

        let (success, message, target_repository_url) = match outcome {
            Ok(Some(target)) => (true, SUCCESS_MESSAGE.to_string(), Some(target.html_url)),
            Ok(None) => (true, DRY_RUN_MESSAGE.to_string(), None),
            Err(e) => {
                let step = tracker
                    .failed_step()
                    .map(|s| s.description.clone())
                    .unwrap_or_else(|| "migration".to_string());
                (false, format!("Migration failed during {step}: {e}"), None)
            }
        };

        if success {
            info!(%message, "Migration finished");
        } else {
            warn!(%message, "Migration finished");
        }

        Ok(MigrationResult {
            success,
            message,
            target_repository_url,
            steps: tracker.into_steps(),
            started_at,
            completed_at: Utc::now(),
        })
    }
}

/// Runs one live step: `running`, then `completed` with `describe(value)` or
/// `failed` with the error.
async fn step<T, F>(
    tracker: &mut StepTracker,
    kind: StepKind,
    ctx: &CancellationToken,
    work: F,
    describe: impl FnOnce(&T) -> String,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tracker.start(kind);
    info!(step = %kind, "Step started");

    let result = if ctx.is_cancelled() {
        Err(MigrationError::Canceled)
    } else {
        work.await
    };

    match result {
        Ok(value) => {
            let message = describe(&value);
            info!(step = %kind, %message, "Step completed");
            tracker.complete(kind, message);
            Ok(value)
        }
        Err(e) => {
            warn!(step = %kind, error = %e, "Step failed");
            tracker.fail(kind, e.to_string());
            Err(e)
        }
    }
}

async fn execute(
    live: &LiveCapabilities,
    request: &MigrationRequest,
    tracker: &mut StepTracker,
    ctx: &CancellationToken,
) -> Result<TargetRepository> {
    let source_access = SourceAccess::new(Some(live.source.clone()));
    let provisioner = TargetProvisioner::new(live.target.clone());
    let engine = TransportEngine::new(live.transport.clone());
    let access = AccessConfigurator::new(live.target.clone());
    let notifications = NotificationConfigurator::new(live.target.clone());
    let org = request.target_organization.as_str();

    let source = step(
        tracker,
        StepKind::ValidateSource,
        ctx,
        source_access.validate_source(&request.source_locator, ctx),
        |s| format!("Found {}", s.full_name),
    )
    .await?;

    let target = step(
        tracker,
        StepKind::CreateTarget,
        ctx,
        provisioner.create_target(&request.target_repository_name, org, &request.source_locator, ctx),
        |t| format!("Created {}", t.full_name),
    )
    .await?;

    let repository = step(
        tracker,
        StepKind::CloneSource,
        ctx,
        engine.transfer(&source, &live.source_credentials, ctx),
        |r| {
            format!(
                "Cloned {} from {}",
                ref_counts(r.branches().len(), r.tags().len()),
                source.full_name
            )
        },
    )
    .await?;

    step(
        tracker,
        StepKind::PushTarget,
        ctx,
        engine.publish(
            &repository,
            &target,
            &live.target_credentials,
            &request.branch_renames,
            ctx,
        ),
        |s| {
            format!(
                "Pushed {} to {}",
                ref_counts(s.branches, s.tags),
                target.full_name
            )
        },
    )
    .await?;

    step(
        tracker,
        StepKind::ConfigureTeams,
        ctx,
        access.configure(org, &target, &request.team_grants, ctx),
        String::clone,
    )
    .await?;

    step(
        tracker,
        StepKind::ConfigureWebhook,
        ctx,
        notifications.configure(org, &target, request.webhook(), ctx),
        String::clone,
    )
    .await?;

    if request.trigger_pipeline {
        // Presence checked before the run started.
        let trigger = live
            .pipeline
            .clone()
            .ok_or(MigrationError::PipelineNotConfigured)?;
        let launcher = PipelineLauncher::new(trigger);
        step(
            tracker,
            StepKind::TriggerPipeline,
            ctx,
            launcher.launch(&target, ctx),
            String::clone,
        )
        .await?;
    }

    Ok(target)
}

/// "2 branches and 1 tag"
fn ref_counts(branches: usize, tags: usize) -> String {
    let plural = |n: usize, one: &str, many: &str| format!("{n} {}", if n == 1 { one } else { many });
    format!(
        "{} and {}",
        plural(branches, "branch", "branches"),
        plural(tags, "tag", "tags")
    )
}

/// Marks every step completed with what a live run would do. Calls nothing.
fn simulate(request: &MigrationRequest, tracker: &mut StepTracker) {
    let target = request.target_full_name();

    let teams = if request.team_grants.is_empty() {
        "No teams to configure".to_string()
    } else {
        let grants: Vec<String> = request
            .team_grants
            .iter()
            .map(|(team, permission)| format!("{team} ({permission})"))
            .collect();
        format!("Would grant access to {}", grants.join(", "))
    };
    let webhook = match request.webhook() {
        Some(url) => format!("Would register webhook {url}"),
        None => "No webhook to configure".to_string(),
    };
    let push = if request.branch_renames.is_empty() {
        format!("Would push all branches and tags to {target}")
    } else {
        let renames: Vec<String> = request
            .branch_renames
            .iter()
            .map(|(from, to)| format!("{from} -> {to}"))
            .collect();
        format!(
            "Would push all branches and tags to {target}, renaming {}",
            renames.join(", ")
        )
    };

    let plan = StepKind::plan(request.trigger_pipeline);
    for kind in plan {
        let message = match kind {
            StepKind::ValidateSource => {
                format!("Would validate source repository {}", request.source_locator)
            }
            StepKind::CreateTarget => format!("Would create repository {target}"),
            StepKind::CloneSource => {
                format!("Would clone all branches and tags from {}", request.source_locator)
            }
            StepKind::PushTarget => push.clone(),
            StepKind::ConfigureTeams => teams.clone(),
            StepKind::ConfigureWebhook => webhook.clone(),
            StepKind::TriggerPipeline => format!("Would trigger pipeline for {target}"),
        };
        info!(step = %kind, %message, "Dry run step");
        tracker.complete(kind, message);
    }
}
