//! CLI command implementations.

use crate::config::FerryConfig;
use crate::progress::{self, ConsoleProgressReporter};
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use ferry_migrate::{
    locator, BitbucketClient, GitHubClient, MigrationRequest, MigrationResult, Migrator,
    SmartHttpTransport, StepKind, WebhookPipelineTrigger,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Arguments of `ferry migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Source repository: Bitbucket URL, `/projects/P/repos/R`, `/scm/P/R.git` or `/P/R`
    #[arg(short, long)]
    pub source: String,

    /// GitHub organization to create the repository in
    #[arg(short, long)]
    pub org: String,

    /// Name of the new repository
    #[arg(short, long)]
    pub name: String,

    /// Webhook to register on the new repository
    #[arg(long)]
    pub webhook: Option<String>,

    /// Grant a team access, e.g. `platform=write` (repeatable)
    #[arg(long = "team", value_name = "NAME=LEVEL", value_parser = parse_pair)]
    pub teams: Vec<(String, String)>,

    /// Rename a branch before pushing, e.g. `master=main` (repeatable)
    #[arg(long = "rename-branch", value_name = "OLD=NEW", value_parser = parse_pair)]
    pub renames: Vec<(String, String)>,

    /// Report what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Notify the configured pipeline once the migration is done
    #[arg(long)]
    pub trigger_pipeline: bool,

    /// Print step updates and the result as JSON lines
    #[arg(long)]
    pub json: bool,
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

impl MigrateArgs {
    fn request(&self) -> Result<MigrationRequest> {
        let mut request = MigrationRequest::new(&self.source, &self.org, &self.name)
            .with_team_grants(self.teams.iter().map(|(team, level)| (team.as_str(), level)))?
            .with_dry_run(self.dry_run)
            .with_pipeline_trigger(self.trigger_pipeline);
        if let Some(url) = &self.webhook {
            request = request.with_webhook(url);
        }
        for (from, to) in &self.renames {
            request = request.with_branch_rename(from, to);
        }
        Ok(request)
    }
}

/// Wire the HTTP capabilities from configuration.
pub fn live_migrator(config: &FerryConfig) -> Result<Migrator> {
    config.check_live()?;
    let settings = config.http_settings();

    let source = BitbucketClient::new(&config.bitbucket.url, config.source_credentials(), &settings)
        .context("failed to create Bitbucket client")?;
    let target = GitHubClient::new(&config.github.api_url, config.github.token.clone(), &settings)
        .context("failed to create GitHub client")?;
    let transport =
        SmartHttpTransport::new(&settings).context("failed to create git transport")?;

    let mut builder = Migrator::builder()
        .source(Arc::new(source))
        .target(Arc::new(target))
        .transport(Arc::new(transport))
        .source_credentials(config.source_credentials())
        .target_credentials(config.target_credentials());

    if let Some(url) = config.pipeline.url.as_deref().filter(|u| !u.trim().is_empty()) {
        let trigger = WebhookPipelineTrigger::new(url, &settings)
            .context("failed to create pipeline trigger")?;
        builder = builder.pipeline(Arc::new(trigger));
    }

    Ok(builder.build()?)
}

/// Run `ferry migrate`. Returns whether the migration succeeded.
pub async fn migrate(config: &FerryConfig, args: MigrateArgs) -> Result<bool> {
    let request = args.request()?;
    let migrator = if request.dry_run {
        Migrator::dry_run_only()
    } else {
        live_migrator(config)?
    };

    let ctx = CancellationToken::new();
    let canceler = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, canceling migration");
            canceler.cancel();
        }
    });

    let result = if args.json {
        let result = migrator
            .run_migration(&request, Some(progress::json_lines()), &ctx)
            .await?;
        println!("{}", serde_json::to_string(&result)?);
        result
    } else {
        let steps = StepKind::plan(request.trigger_pipeline).len();
        let reporter = ConsoleProgressReporter::new(steps);
        let result = migrator
            .run_migration(&request, Some(reporter.callback()), &ctx)
            .await?;
        reporter.finish(if result.success { "done" } else { "failed" });
        print_summary(&request, &result);
        result
    };

    Ok(result.success)
}

fn print_summary(request: &MigrationRequest, result: &MigrationResult) {
    println!();
    if result.success {
        println!("{} {}", style("✔").green().bold(), result.message);
    } else {
        println!("{} {}", style("✘").red().bold(), result.message);
    }
    println!("  Source:   {}", request.source_locator);
    println!("  Target:   {}", request.target_full_name());
    if let Some(url) = &result.target_repository_url {
        println!("  URL:      {url}");
    }
    println!("  Duration: {}s", result.duration().num_seconds());
}

/// Run `ferry resolve`.
pub fn resolve(source: &str) -> Result<()> {
    let (project, slug) = locator::resolve(source)?;
    println!("Project: {project}");
    println!("Slug:    {slug}");
    println!("HTTPS:   {}", locator::ssh_to_https(source));
    Ok(())
}
