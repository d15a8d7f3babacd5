//! `dealsync lookup`: read-only CRM queries.

use anyhow::{Context, Result};
use clap::Subcommand;

use dealsync_core::{DeliveryCode, Phone};

use super::ConfigArgs;

#[derive(Subcommand, Debug)]
pub enum LookupCommand {
    /// Find a contact by phone number.
    Contact {
        phone: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Find a deal by delivery code.
    Deal {
        code: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

pub fn run(command: LookupCommand) -> Result<()> {
    match command {
        LookupCommand::Contact { phone, config } => {
            let phone: Phone = phone.parse()?;
            let gateway = config.gateway()?;
            match gateway
                .find_contact_by_phone(&phone)
                .context("contact lookup failed")?
            {
                Some(contact) => print_json(&contact)?,
                None => println!("no contact with phone {phone}"),
            }
        }
        LookupCommand::Deal { code, config } => {
            let code: DeliveryCode = code.parse()?;
            let gateway = config.gateway()?;
            match gateway
                .find_deal_by_delivery_code(&code)
                .context("deal lookup failed")?
            {
                Some(deal) => print_json(&deal)?,
                None => println!("no deal with delivery code {code}"),
            }
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render JSON")?
    );
    Ok(())
}
