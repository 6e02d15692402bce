//! Command-line interface definitions.
//!
//! One subcommand per site. Anything the crossword downloader needs but is
//! not given on the command line (or in the environment) is asked for
//! interactively.

use crate::scrapers::{aact, crossword, mitre};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Prompts for credentials, start date and folder
/// soup_scrape crossword
///
/// # Fully non-interactive
/// PUZZLE_PASSWORD=... soup_scrape crossword -u alice -s 2018/10/01 -f ./puzzles
///
/// # Resumable archive download
/// soup_scrape aact -f ./data
///
/// # Print the techniques table and keep a JSON copy
/// soup_scrape mitre --json ./ta0043.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download daily crossword PDFs from a start date onward
    Crossword(CrosswordArgs),
    /// Download clinical-trial archives and keep one table from each
    Aact(AactArgs),
    /// Print the techniques table of an ATT&CK tactic page
    Mitre(MitreArgs),
}

#[derive(clap::Args, Debug)]
pub struct CrosswordArgs {
    /// First puzzle date, yyyy/mm/dd
    #[arg(short, long)]
    pub start_date: Option<String>,

    /// Output folder for the PDFs
    #[arg(short, long)]
    pub folder: Option<PathBuf>,

    /// Website username
    #[arg(short, long, env = "PUZZLE_USERNAME")]
    pub username: Option<String>,

    /// Website password
    #[arg(long, env = "PUZZLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Stop after this many puzzles
    #[arg(long, default_value_t = crossword::MAX_PUZZLES)]
    pub max_puzzles: usize,

    /// Pause between puzzles, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Site root
    #[arg(long, default_value = crossword::ROOT_URL)]
    pub root_url: String,
}

#[derive(clap::Args, Debug)]
pub struct AactArgs {
    /// Output folder for the extracted tables
    #[arg(short, long)]
    pub folder: PathBuf,

    /// Site root
    #[arg(long, default_value = aact::BASE_URL)]
    pub base_url: String,

    /// CSS selector for the elements that hold the archive links; by default
    /// every link named like a daily export is used. `<select>` lists match
    /// as `div[data-select]`
    #[arg(long)]
    pub catalog_selector: Option<String>,

    /// Which element matching --catalog-selector (zero-based) lists the archives
    #[arg(long, default_value_t = aact::CATALOG_INDEX, requires = "catalog_selector")]
    pub catalog_index: usize,

    /// Archive member to keep
    #[arg(long, default_value = aact::MEMBER)]
    pub member: String,
}

#[derive(clap::Args, Debug)]
pub struct MitreArgs {
    /// Tactic page
    #[arg(long, default_value = mitre::TACTIC_URL)]
    pub url: String,

    /// Also write the cells to this JSON file
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossword_defaults() {
        let cli = Cli::try_parse_from(["soup_scrape", "crossword"]).unwrap();
        let Command::Crossword(args) = cli.command else {
            panic!("expected crossword");
        };
        assert_eq!(args.max_puzzles, 10_000);
        assert_eq!(args.delay_ms, 1000);
        assert_eq!(args.root_url, "https://www.puzzlesociety.com");
        assert!(args.start_date.is_none());
        assert!(args.folder.is_none());
    }

    #[test]
    fn test_crossword_short_flags() {
        let cli = Cli::try_parse_from([
            "soup_scrape", "crossword", "-s", "2018/10/01", "-f", "/tmp/p", "-u", "alice",
        ])
        .unwrap();
        let Command::Crossword(args) = cli.command else {
            panic!("expected crossword");
        };
        assert_eq!(args.start_date.as_deref(), Some("2018/10/01"));
        assert_eq!(args.folder, Some(PathBuf::from("/tmp/p")));
        assert_eq!(args.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_aact_requires_folder() {
        assert!(Cli::try_parse_from(["soup_scrape", "aact"]).is_err());
        let cli = Cli::try_parse_from(["soup_scrape", "aact", "-f", "./data"]).unwrap();
        let Command::Aact(args) = cli.command else {
            panic!("expected aact");
        };
        assert!(args.catalog_selector.is_none());
        assert_eq!(args.member, "studies.txt");
    }

    #[test]
    fn test_catalog_index_needs_selector() {
        assert!(Cli::try_parse_from(["soup_scrape", "aact", "-f", "d", "--catalog-index", "1"]).is_err());
        let cli = Cli::try_parse_from([
            "soup_scrape", "aact", "-f", "d", "--catalog-selector", "div[data-select]", "--catalog-index", "1",
        ])
        .unwrap();
        let Command::Aact(args) = cli.command else {
            panic!("expected aact");
        };
        assert_eq!(args.catalog_selector.as_deref(), Some("div[data-select]"));
        assert_eq!(args.catalog_index, 1);
    }

    #[test]
    fn test_mitre_json_flag() {
        let cli = Cli::try_parse_from(["soup_scrape", "mitre", "--json", "out.json"]).unwrap();
        let Command::Mitre(args) = cli.command else {
            panic!("expected mitre");
        };
        assert_eq!(args.url, "https://attack.mitre.org/tactics/TA0043");
        assert_eq!(args.json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
