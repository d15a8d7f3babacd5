pub mod fields;
pub mod lookup;
pub mod serve;
pub mod submit;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use dealsync_core::{config, Settings};
use dealsync_crm::{Bitrix24Gateway, CrmGateway, InMemoryCrm};

/// Where the CRM connection comes from.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// YAML configuration file (default: <config dir>/dealsync/config.yaml,
    /// then B24_* environment variables).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn settings(&self) -> Result<Settings> {
        Settings::resolve(self.config.as_deref()).with_context(|| {
            let file = config::default_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|_| "a config file".to_string());
            format!(
                "failed to load configuration (set {} and {} or create {file})",
                config::ENV_PORTAL,
                config::ENV_WEBHOOK_KEY
            )
        })
    }

    pub fn gateway(&self) -> Result<Arc<dyn CrmGateway>> {
        let settings = self.settings()?;
        Ok(Arc::new(Bitrix24Gateway::from_settings(&settings.crm)))
    }
}

/// A fresh process-local CRM, for trying the service without a portal.
pub fn in_memory_gateway() -> Arc<dyn CrmGateway> {
    eprintln!("using in-memory CRM; nothing is sent to a portal");
    Arc::new(InMemoryCrm::new())
}
