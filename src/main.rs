mod app;
mod server;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use famcal_calendar::CalendarError;
use famcal_core::Config;
use famcal_feeds::load_feed_list;
use famcal_sync::directory;

use crate::app::App;

#[derive(Parser)]
#[command(name = "famcal", version)]
#[command(about = "Aggregate ICS calendar feeds into one shared Google calendar")]
struct Cli {
    /// Configuration file (defaults to <config dir>/famcal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the calendar's events with the events of every listed feed
    Sync {
        /// Feed list: a `name,url` header row followed by one feed per line
        #[arg(long)]
        calendar_file: PathBuf,

        /// Display name of the destination calendar (created if missing)
        #[arg(long)]
        calendar_name: String,
    },
    /// Find or create a calendar and print its id
    Create {
        #[arg(long)]
        calendar_name: String,
    },
    /// Delete a calendar by display name
    Delete {
        #[arg(long)]
        calendar_name: String,
    },
    /// List the calendars visible to the configured account
    List,
    /// Serve the JSON HTTP API
    Serve {
        /// Listen address, overriding server.bind
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = famcal_core::init() {
        eprintln!("{:#}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if is_auth_failure(&e) {
                eprintln!(
                    "Google rejected the credentials; check GOOGLE_ACCESS_TOKEN or the [google] section of the config file"
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_validated(cli.config.as_deref())?;
    let app = App::new(config)?;

    match cli.command {
        Commands::Sync {
            calendar_file,
            calendar_name,
        } => {
            let feeds = load_feed_list(&calendar_file)?;
            let service = app.calendar().await?;
            let calendar_id = directory::resolve_or_create(&service, &calendar_name).await?;

            let report = famcal_sync::sync(
                &service,
                &app.fetcher(),
                &calendar_id,
                &feeds,
                &app.window(),
            )
            .await
            .with_context(|| format!("Sync of calendar {} failed", calendar_name))?;

            println!(
                "{}: removed {} events, imported {}",
                calendar_name,
                report.deleted,
                report.imported.total()
            );
            for feed in &report.imported.feeds {
                println!("  {:<24} {}", feed.feed, feed.inserted);
            }
        }
        Commands::Create { calendar_name } => {
            let service = app.calendar().await?;
            let id = directory::resolve_or_create(&service, &calendar_name).await?;
            println!("{}", id);
        }
        Commands::Delete { calendar_name } => {
            let service = app.calendar().await?;
            match directory::delete(&service, &calendar_name).await? {
                Some(id) => println!("Deleted {} ({})", calendar_name, id),
                None => println!("No calendar named {}", calendar_name),
            }
        }
        Commands::List => {
            let service = app.calendar().await?;
            for calendar in directory::list(&service).await? {
                println!(
                    "{}\t{}\t{}{}",
                    calendar.id,
                    calendar.display_name(),
                    calendar.access_role,
                    if calendar.is_primary { "\tprimary" } else { "" }
                );
            }
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| app.config().server.bind.clone());
            server::serve(app, &bind).await?;
        }
    }

    Ok(())
}

/// Whether any error in the chain is a rejected Google credential.
fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<CalendarError>())
        .any(CalendarError::is_auth_failure)
}
