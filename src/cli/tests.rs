//! CLI parse tests.

use super::scraper::{RunStatus, ScraperCommand};
use super::sheet::SheetCommand;
use super::{ScraperCli, SheetCli};
use crate::scrape::{ScrapeFailure, ScrapeReport};
use crate::views::View;
use clap::Parser;
use std::path::PathBuf;

fn sheet(args: &[&str]) -> SheetCli {
    SheetCli::try_parse_from(args).unwrap()
}

fn scraper(args: &[&str]) -> ScraperCli {
    ScraperCli::try_parse_from(args).unwrap()
}

#[test]
fn view_command_joins_name_words() {
    let cli = sheet(&["ddb-sheet", "overview", "grimgor", "iron"]);
    let (view, args) = cli.command.view().unwrap();
    assert_eq!(view, View::Overview);
    assert_eq!(args.query(), "grimgor iron");
    assert!(cli.dir.is_none());
}

#[test]
fn dir_flag_before_or_after_command() {
    let before = sheet(&["ddb-sheet", "--dir", "/data", "spells", "trig"]);
    let after = sheet(&["ddb-sheet", "spells", "trig", "--dir", "/data"]);
    assert_eq!(before.dir, Some(PathBuf::from("/data")));
    assert_eq!(after.dir, Some(PathBuf::from("/data")));
}

#[test]
fn every_view_has_a_command() {
    for view in View::ALL {
        let cli = sheet(&["ddb-sheet", view.name(), "x"]);
        assert_eq!(cli.command.view().unwrap().0, view);
    }
}

#[test]
fn view_command_requires_a_name() {
    assert!(SheetCli::try_parse_from(["ddb-sheet", "overview"]).is_err());
    assert!(SheetCli::try_parse_from(["ddb-sheet", "bogus", "x"]).is_err());
}

#[test]
fn list_takes_no_name() {
    let cli = sheet(&["ddb-sheet", "list", "--summary"]);
    assert!(matches!(cli.command, SheetCommand::List { summary: true }));
    assert!(cli.command.view().is_none());
}

#[test]
fn scraper_defaults_to_all_campaigns() {
    let cli = scraper(&["ddb-scraper"]);
    assert!(cli.command.is_none());
}

#[test]
fn scraper_campaign_with_optional_name() {
    match scraper(&["ddb-scraper", "campaign", "4242", "bkb-primary"]).command {
        Some(ScraperCommand::Campaign { id, name }) => {
            assert_eq!(id, 4242);
            assert_eq!(name.as_deref(), Some("bkb-primary"));
        }
        other => panic!("unexpected {other:?}"),
    }
    match scraper(&["ddb-scraper", "campaign", "7"]).command {
        Some(ScraperCommand::Campaign { id, name }) => {
            assert_eq!(id, 7);
            assert!(name.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(ScraperCli::try_parse_from(["ddb-scraper", "campaign", "abc"]).is_err());
}

fn report(found: usize, written: usize, failed: usize) -> ScrapeReport {
    ScrapeReport {
        campaign_id: 1,
        directory: PathBuf::new(),
        found,
        written: vec![PathBuf::new(); written],
        failures: (0..failed)
            .map(|i| ScrapeFailure {
                character_id: i as u64,
                error: anyhow::anyhow!("HTTP 500"),
            })
            .collect(),
    }
}

#[test]
fn run_status_reflects_partial_success() {
    assert_eq!(RunStatus::from_reports(&[report(5, 5, 0)]), RunStatus::Success);
    assert_eq!(RunStatus::from_reports(&[report(5, 4, 1)]), RunStatus::PartialSuccess);
    assert_eq!(RunStatus::from_reports(&[report(2, 0, 2)]), RunStatus::Failure);
    assert_eq!(RunStatus::from_reports(&[report(0, 0, 0)]), RunStatus::Success);
    assert_eq!(
        RunStatus::from_reports(&[report(3, 3, 0), report(2, 0, 2)]),
        RunStatus::PartialSuccess
    );
}
