//! `dealsync fields`: run the custom field check on demand.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use dealsync_crm::{ensure_custom_fields, FieldAction, FieldReport};

use super::ConfigArgs;

/// Arguments for `dealsync fields`.
#[derive(Args, Debug)]
pub struct FieldsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "field")]
    field: String,
    #[tabled(rename = "crm id")]
    crm_id: &'static str,
    #[tabled(rename = "action")]
    action: String,
}

impl FieldsArgs {
    pub fn run(self) -> Result<()> {
        let gateway = self.config.gateway()?;
        let report =
            ensure_custom_fields(gateway.as_ref()).context("could not check custom fields")?;

        print_report(&report);
        let failed = report.failures().len();
        if failed > 0 {
            bail!("{failed} custom field(s) could not be repaired");
        }
        Ok(())
    }
}

fn print_report(report: &FieldReport) {
    if report.is_clean() {
        println!("✓ all custom fields present");
    } else {
        println!(
            "✓ custom fields checked ({} changed, {} failed)",
            report.changed(),
            report.failures().len()
        );
    }

    let rows: Vec<FieldRow> = report
        .fields
        .iter()
        .map(|status| FieldRow {
            field: status.field.to_string(),
            crm_id: status.crm_id,
            action: action_label(&status.action),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn action_label(action: &FieldAction) -> String {
    let text = action.to_string();
    match action {
        FieldAction::Present => text.green().to_string(),
        FieldAction::Added | FieldAction::Recreated { .. } => text.yellow().to_string(),
        FieldAction::Failed { .. } => text.red().to_string(),
    }
}
