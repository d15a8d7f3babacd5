//! `dealsync submit`: reconcile one submission from a file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dealsync_core::DealSubmission;
use dealsync_reconcile::{pipeline, Disposition};
use dealsync_server::initialize;

use super::{in_memory_gateway, ConfigArgs};

/// Arguments for `dealsync submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// JSON file holding one submission, as accepted by `POST /api/v1`.
    pub file: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Reconcile against a process-local CRM instead of a portal.
    #[arg(long, conflicts_with = "config")]
    pub in_memory: bool,
}

impl SubmitArgs {
    pub fn run(self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let submission: DealSubmission = serde_json::from_str(&raw)
            .with_context(|| format!("invalid submission in {}", self.file.display()))?;

        let gateway = if self.in_memory {
            in_memory_gateway()
        } else {
            self.config.gateway()?
        };
        let ready = initialize(gateway).context("custom field check failed")?;

        let result = pipeline::submit(ready.gateway().as_ref(), &submission)
            .context("CRM lookup failed")?;

        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to render result JSON")?
        );
        let marker = match result.disposition {
            Disposition::Conflict | Disposition::PartialFailure => "✗".red().bold(),
            _ => "✓".green().bold(),
        };
        eprintln!("{marker} {} ({})", result.disposition, submission.delivery_code);
        Ok(())
    }
}
