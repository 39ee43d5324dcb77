//! Campaign download: fetch every character in a campaign and write one
//! JSON file per character under `<base>/<campaign>/characters/`.

use crate::api::{CampaignCharacter, DdbClient};
use crate::error::ApiError;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CHARACTERS_SUBDIR: &str = "characters";

/// A character that could not be downloaded or written.
#[derive(Debug)]
pub struct ScrapeFailure {
    pub character_id: u64,
    pub error: anyhow::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Every character was written.
    Complete,
    /// Some characters failed, at least one was written.
    Partial,
    /// Characters were found but none could be written.
    Failed,
    /// The campaign had no visible characters.
    Empty,
}

/// What happened while scraping one campaign.
#[derive(Debug)]
pub struct ScrapeReport {
    pub campaign_id: u64,
    pub directory: PathBuf,
    pub found: usize,
    pub written: Vec<PathBuf>,
    pub failures: Vec<ScrapeFailure>,
}

impl ScrapeReport {
    pub fn outcome(&self) -> ScrapeOutcome {
        match (self.found, self.written.len(), self.failures.len()) {
            (0, _, _) => ScrapeOutcome::Empty,
            (_, _, 0) => ScrapeOutcome::Complete,
            (_, 0, _) => ScrapeOutcome::Failed,
            _ => ScrapeOutcome::Partial,
        }
    }
}

/// "Grimgor Iron/hide" -> "Grimgor_Iron_hide"
pub fn sanitize_component(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Directory name for a campaign listed by the API.
pub fn campaign_dir_name(name: &str) -> String {
    sanitize_component(name).to_lowercase()
}

/// `<Name>_<id>.json`
pub fn character_file_name(name: &str, id: u64) -> String {
    let name = sanitize_component(name);
    let name = if name.is_empty() { format!("Character_{id}") } else { name };
    format!("{}_{}.json", name, id)
}

/// Write `doc` to `dir/file_name`, replacing any previous file for the same
/// character id (including ones saved under an older name).
pub fn write_character(dir: &Path, file_name: &str, id: u64, doc: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let target = dir.join(file_name);

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, doc).context("serializing character")?;
    tmp.write_all(b"\n")?;
    tmp.persist(&target)
        .with_context(|| format!("writing {}", target.display()))?;

    let suffix = format!("_{}.json", id);
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(&suffix) && name != file_name {
            tracing::info!("removing stale file {}", path.display());
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
    }
    Ok(target)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn fetch_one(
    client: &DdbClient,
    info: &CampaignCharacter,
    dir: &Path,
) -> Result<(String, PathBuf)> {
    let mut doc = client
        .character(info.id)
        .with_context(|| format!("fetching character {}", info.id))?;
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Character_{}", info.id));
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("_player".into(), Value::String(info.player.clone()));
    }
    let path = write_character(dir, &character_file_name(&name, info.id), info.id, &doc)?;
    Ok((name, path))
}

/// Download every character of one campaign into
/// `<base>/<campaign_name>/characters/`. Individual failures are recorded in
/// the report and do not stop the batch; an authentication failure does.
pub fn scrape_campaign(
    client: &DdbClient,
    campaign_id: u64,
    campaign_name: Option<&str>,
    base_dir: &Path,
) -> Result<ScrapeReport> {
    let dir_name = campaign_name
        .map(sanitize_component)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("campaign_{campaign_id}"));
    let dir = base_dir.join(dir_name).join(CHARACTERS_SUBDIR);

    println!("Fetching characters from campaign {}...", campaign_id);
    let characters = client
        .campaign_characters(campaign_id)
        .with_context(|| format!("listing characters of campaign {campaign_id}"))?;
    println!("Found {} characters in campaign", characters.len());
    if characters.is_empty() {
        tracing::warn!(campaign_id, "campaign has no visible characters");
    }

    let mut report = ScrapeReport {
        campaign_id,
        directory: dir.clone(),
        found: characters.len(),
        written: Vec::new(),
        failures: Vec::new(),
    };

    let pb = spinner();
    for info in &characters {
        pb.set_message(format!("Scraping character {} (Player: {})...", info.id, info.player));
        match fetch_one(client, info, &dir) {
            Ok((name, path)) => {
                tracing::info!(character_id = info.id, "saved {} to {}", name, path.display());
                pb.suspend(|| println!("  ✓ {} saved to {}", name, path.display()));
                report.written.push(path);
            }
            Err(err) => {
                if matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized { .. })) {
                    pb.finish_and_clear();
                    return Err(err);
                }
                tracing::warn!(character_id = info.id, "scrape failed: {:#}", err);
                pb.suspend(|| println!("  ✗ Error scraping character {}: {:#}", info.id, err));
                report.failures.push(ScrapeFailure {
                    character_id: info.id,
                    error: err,
                });
            }
        }
    }
    pb.finish_and_clear();

    println!(
        "Total characters scraped: {}/{}",
        report.written.len(),
        report.found
    );
    Ok(report)
}

/// Scrape every active campaign into its own directory. A campaign that
/// fails outright is logged and skipped, except on authentication errors.
pub fn scrape_all(client: &DdbClient, base_dir: &Path) -> Result<Vec<ScrapeReport>> {
    println!("Fetching campaigns...");
    let campaigns = client.list_campaigns().context("listing campaigns")?;
    println!("Found {} campaigns", campaigns.len());

    let mut reports = Vec::new();
    for campaign in &campaigns {
        println!("\n{}", "=".repeat(60));
        println!("Campaign: {} (ID: {})", campaign.name, campaign.id);
        println!("{}", "=".repeat(60));

        let dir_name = campaign_dir_name(&campaign.name);
        match scrape_campaign(client, campaign.id, Some(dir_name.as_str()), base_dir) {
            Ok(report) => reports.push(report),
            Err(err) => {
                if matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized { .. })) {
                    return Err(err);
                }
                tracing::warn!(campaign_id = campaign.id, "campaign scrape failed: {:#}", err);
                println!("  ✗ Error scraping campaign {}: {:#}", campaign.name, err);
            }
        }
    }
    Ok(reports)
}
