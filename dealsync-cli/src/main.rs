//! dealsync: reconcile storefront orders with Bitrix24 contacts and deals.
//!
//! # Usage
//!
//! ```text
//! dealsync serve [--bind ADDR] [--config FILE] [--in-memory]
//! dealsync fields [--config FILE]
//! dealsync submit <FILE> [--config FILE] [--in-memory]
//! dealsync lookup contact <PHONE> [--config FILE]
//! dealsync lookup deal <CODE> [--config FILE]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    fields::FieldsArgs, lookup::LookupCommand, serve::ServeArgs, submit::SubmitArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "dealsync",
    version,
    about = "Reconcile order submissions with Bitrix24 contacts and deals",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify custom fields, then accept submissions over HTTP.
    Serve(ServeArgs),

    /// Verify and repair the deal custom fields.
    Fields(FieldsArgs),

    /// Reconcile one JSON submission read from a file.
    Submit(SubmitArgs),

    /// Show a stored contact or deal.
    Lookup {
        #[command(subcommand)]
        command: LookupCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Fields(args) => args.run(),
        Commands::Submit(args) => args.run(),
        Commands::Lookup { command } => commands::lookup::run(command),
    }
}
