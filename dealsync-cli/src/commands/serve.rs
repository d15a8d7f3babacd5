//! `dealsync serve`: verify custom fields, then serve `POST /api/v1`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dealsync_core::config::ServerSettings;
use dealsync_crm::{Bitrix24Gateway, CrmGateway};
use dealsync_server::{init_tracing, initialize, start_blocking};

use super::{in_memory_gateway, ConfigArgs};

/// Arguments for `dealsync serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default: configured bind, then 127.0.0.1:8000).
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Serve against a process-local CRM instead of a portal.
    #[arg(long, conflicts_with = "config")]
    pub in_memory: bool,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();

        let (gateway, bind): (Arc<dyn CrmGateway>, String) = if self.in_memory {
            let bind = self.bind.unwrap_or_else(|| ServerSettings::from_env().bind);
            (in_memory_gateway(), bind)
        } else {
            let settings = self.config.settings()?;
            let bind = self.bind.unwrap_or(settings.server.bind);
            (Arc::new(Bitrix24Gateway::from_settings(&settings.crm)), bind)
        };

        let ready = initialize(gateway).context("refusing to start")?;
        for failed in ready.fields.failures() {
            eprintln!(
                "{} custom field {} is not usable: {}",
                "!".yellow().bold(),
                failed.crm_id,
                failed.action
            );
        }

        start_blocking(ready, &bind).context("server exited with error")
    }
}
