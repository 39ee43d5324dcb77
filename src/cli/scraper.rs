//! `ddb-scraper` – download campaign characters from D&D Beyond.

use crate::api::DdbClient;
use crate::config::{self, ScraperConfig};
use crate::scrape::{self, ScrapeOutcome, ScrapeReport};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "ddb-scraper")]
#[command(
    about = "Download D&D Beyond characters into campaign directories",
    long_about = "Download D&D Beyond characters into campaign directories.\n\n\
                  Requires DNDBEYOND_SESSION to hold your CobaltSession cookie. \
                  With no subcommand every active campaign is scraped."
)]
pub struct ScraperCli {
    /// Output directory (default: $DNDBEYOND_CAMPAIGNS_DIR or ./campaigns).
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<ScraperCommand>,
}

#[derive(Debug, Subcommand)]
pub enum ScraperCommand {
    /// List all your campaigns.
    Campaigns,

    /// Scrape one campaign.
    Campaign {
        /// Campaign id (see `campaigns`).
        id: u64,
        /// Directory name for the campaign (default: campaign_<id>).
        name: Option<String>,
    },
}

/// How a scraper run ended, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl RunStatus {
    /// Fold per-campaign reports into one status.
    pub fn from_reports(reports: &[ScrapeReport]) -> Self {
        let written: usize = reports.iter().map(|r| r.written.len()).sum();
        let troubled = reports
            .iter()
            .any(|r| matches!(r.outcome(), ScrapeOutcome::Partial | ScrapeOutcome::Failed));
        match (troubled, written) {
            (false, _) => RunStatus::Success,
            (true, 0) => RunStatus::Failure,
            (true, _) => RunStatus::PartialSuccess,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Failure => ExitCode::from(1),
            RunStatus::PartialSuccess => ExitCode::from(2),
        }
    }
}

pub fn run(cli: ScraperCli) -> Result<RunStatus> {
    let cfg = ScraperConfig::from_env()?;
    tracing::debug!("loaded config: {:?}", cfg);
    let client = DdbClient::new(&cfg)?;
    let base = config::campaigns_dir(cli.dir);

    match cli.command {
        Some(ScraperCommand::Campaigns) => {
            list_campaigns(&client)?;
            Ok(RunStatus::Success)
        }
        Some(ScraperCommand::Campaign { id, name }) => {
            let report = scrape::scrape_campaign(&client, id, name.as_deref(), &base)?;
            Ok(finish(&[report]))
        }
        None => {
            std::fs::create_dir_all(&base)
                .with_context(|| format!("creating {}", base.display()))?;
            let reports = scrape::scrape_all(&client, &base)?;
            println!("\n{}", "=".repeat(60));
            println!("All campaigns scraped!");
            println!("{}", "=".repeat(60));
            Ok(finish(&reports))
        }
    }
}

fn list_campaigns(client: &DdbClient) -> Result<()> {
    println!("Fetching your campaigns...");
    let campaigns = client.list_campaigns().context("listing campaigns")?;
    println!("\nFound {} campaigns:\n", campaigns.len());
    for c in &campaigns {
        println!("  ID: {}", c.id);
        println!("  Name: {}", c.name);
        if let Some(dm) = &c.dm {
            println!("  DM: {}", dm);
        }
        println!("  URL: {}\n", c.url);
    }
    println!("To scrape a campaign, run: ddb-scraper campaign <campaign_id> [name]");
    Ok(())
}

fn finish(reports: &[ScrapeReport]) -> RunStatus {
    let status = RunStatus::from_reports(reports);
    for r in reports {
        match r.outcome() {
            ScrapeOutcome::Empty => {
                eprintln!("warning: campaign {} has no accessible characters", r.campaign_id)
            }
            ScrapeOutcome::Partial | ScrapeOutcome::Failed => {
                let ids: Vec<String> = r
                    .failures
                    .iter()
                    .map(|f| f.character_id.to_string())
                    .collect();
                eprintln!(
                    "warning: campaign {}: {} of {} characters failed ({})",
                    r.campaign_id,
                    r.failures.len(),
                    r.found,
                    ids.join(", ")
                );
            }
            ScrapeOutcome::Complete => {}
        }
    }
    status
}
