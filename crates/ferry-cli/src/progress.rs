//! Terminal progress output for a migration run.

use console::style;
use ferry_migrate::{MigrationStep, ProgressCallback, StepStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

/// Console progress reporter using indicatif.
pub struct ConsoleProgressReporter {
    progress_bar: ProgressBar,
}

impl ConsoleProgressReporter {
    /// Create a bar with one tick per step.
    pub fn new(steps: usize) -> Self {
        let progress_bar = ProgressBar::new(steps as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress_bar.set_style(style);

        Self { progress_bar }
    }

    /// Callback that advances the bar as steps finish.
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.progress_bar.clone();
        Box::new(move |step: MigrationStep| match step.status {
            StepStatus::Running => pb.set_message(step.description),
            StepStatus::Completed => {
                pb.inc(1);
                pb.println(format!("{} {}", style("✔").green(), step.message));
            }
            StepStatus::Failed => {
                pb.println(format!(
                    "{} {}: {}",
                    style("✘").red(),
                    step.description,
                    step.message
                ));
            }
            StepStatus::Pending => {}
        })
    }

    /// Stop the bar, leaving it on screen.
    pub fn finish(&self, message: &str) {
        self.progress_bar.finish_with_message(message.to_string());
    }
}

/// Callback printing each step change as one JSON line on stdout.
pub fn json_lines() -> ProgressCallback {
    Box::new(|step: MigrationStep| {
        if let Ok(line) = serde_json::to_string(&step) {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{line}");
        }
    })
}
