//! `ddb-sheet` – render views of downloaded characters.

use crate::character::Character;
use crate::config;
use crate::library;
use crate::views::{self, View};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "ddb-sheet")]
#[command(about = "Query downloaded D&D Beyond character sheets", long_about = None)]
pub struct SheetCli {
    /// Campaigns directory (default: $DNDBEYOND_CAMPAIGNS_DIR or ./campaigns).
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SheetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SheetCommand {
    /// Full character sheet with all stats.
    Sheet(NameArgs),
    /// Brief overview: abilities, HP, AC, saves, spellcasting.
    Overview(NameArgs),
    /// Spells grouped by level.
    Spells(NameArgs),
    /// Race and class features and feats.
    Features(NameArgs),
    /// Equipment and currency.
    Inventory(NameArgs),
    /// One-line summary.
    Summary(NameArgs),
    /// List all available characters.
    List {
        /// Print the one-line summary for each character.
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Debug, Args)]
pub struct NameArgs {
    /// Character name or part of it (case-insensitive). Use
    /// `campaign/name` to pick between characters in different campaigns.
    #[arg(required = true, num_args = 1..)]
    pub name: Vec<String>,
}

impl NameArgs {
    pub fn query(&self) -> String {
        self.name.join(" ")
    }
}

impl SheetCommand {
    /// The view and name for view commands; `None` for `list`.
    pub fn view(&self) -> Option<(View, &NameArgs)> {
        match self {
            SheetCommand::Sheet(a) => Some((View::Sheet, a)),
            SheetCommand::Overview(a) => Some((View::Overview, a)),
            SheetCommand::Spells(a) => Some((View::Spells, a)),
            SheetCommand::Features(a) => Some((View::Features, a)),
            SheetCommand::Inventory(a) => Some((View::Inventory, a)),
            SheetCommand::Summary(a) => Some((View::Summary, a)),
            SheetCommand::List { .. } => None,
        }
    }
}

/// Run a parsed command, returning the text to print.
pub fn execute(cli: SheetCli) -> Result<String> {
    let base = config::campaigns_dir(cli.dir);
    tracing::debug!("campaigns directory: {}", base.display());

    match cli.command.view() {
        Some((view, args)) => render_one(&base, view, &args.query()),
        None => list(
            &base,
            matches!(cli.command, SheetCommand::List { summary: true }),
        ),
    }
}

fn render_one(base: &Path, view: View, query: &str) -> Result<String> {
    let file = library::locate(base, query)?;
    tracing::info!("{} {} -> {}", view, query, file.path.display());
    let character = Character::from_path(&file.path)?;
    Ok(views::render(view, &character))
}

fn list(base: &Path, summary: bool) -> Result<String> {
    let entries = library::enumerate(base)?;
    if entries.is_empty() {
        return Ok(format!("No characters found in {}\n", base.display()));
    }

    let mut out = String::from("Available characters:\n\n");
    if summary {
        for e in &entries {
            match Character::from_path(&e.path) {
                Ok(c) => out.push_str(&views::render(View::Summary, &c)),
                Err(err) => {
                    tracing::warn!("{}", err);
                    out.push_str(&format!("{}: (unreadable)\n", e.name));
                }
            }
        }
        return Ok(out);
    }

    let width = entries
        .iter()
        .map(|e| e.campaign.chars().count())
        .max()
        .unwrap_or(0)
        .max("CAMPAIGN".len());
    out.push_str(&format!("{:<width$}  {}\n", "CAMPAIGN", "CHARACTER"));
    for e in &entries {
        out.push_str(&format!("{:<width$}  {}\n", e.campaign, e.name));
    }
    Ok(out)
}
