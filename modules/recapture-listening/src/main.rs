use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use recapture_common::Config;
use recapture_listening::store::PgStore;
use recapture_listening::{ListeningDeps, ListeningService};

#[derive(Parser)]
#[command(name = "recapture")]
#[command(about = "Query the listening feed, risk analyses and authority recommendations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show one page of the listening feed, newest first
    Feed {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// List subjects whose current risk needs intervention
    AtRisk,

    /// Run a risk analysis for one subject
    Analyze { subject_id: Uuid },

    /// Rank the authorities best placed to reach a subject
    Recommend {
        subject_id: Uuid,

        /// Defaults to AUTHORITY_TOP_N
        #[arg(long)]
        top: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("recapture=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let store = PgStore::connect(&config.database_url).await?;
    info!("Connected to Postgres");

    let service = ListeningService::new(
        ListeningDeps::builder()
            .store(Arc::new(store))
            .config(config.listening.clone())
            .build(),
    );

    match cli.command {
        Command::Feed { page, page_size } => print(&service.latest_feed(page, page_size).await?),
        Command::AtRisk => print(&service.at_risk_subjects().await?),
        Command::Analyze { subject_id } => print(&service.risk_analysis(subject_id).await?),
        Command::Recommend { subject_id, top } => {
            let top_n = top.unwrap_or(config.authority_top_n);
            print(&service.recommended_authorities(subject_id, top_n).await?)
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
