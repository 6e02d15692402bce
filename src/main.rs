//! # soup_scrape
//!
//! Small scrapers for three specific sites:
//!
//! - **crossword**: logs into the Puzzle Society and downloads the daily
//!   commuter crossword PDF for every date from a chosen start date, following
//!   the site's own "next puzzle" links
//! - **aact**: downloads the AACT clinical-trial daily exports, keeping only
//!   `studies.txt` from each zip as `<yyyymmdd>.txt`; safe to stop and resume
//! - **mitre**: prints the techniques table of an ATT&CK tactic page
//!
//! ## Usage
//!
//! ```sh
//! soup_scrape crossword
//! soup_scrape aact -f ./data
//! soup_scrape mitre
//! ```
//!
//! ## Exit status
//!
//! `0` on normal completion or Ctrl-C, `1` on failed login or any other
//! error, and the HTTP status itself when a response aborts the crossword run.

use chrono::{Days, Local};
use clap::Parser;
use std::error::Error;
use std::io;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod classify;
mod cli;
mod error;
mod html;
mod http;
mod models;
mod outputs;
mod prompt;
mod scrapers;
mod storage;
#[cfg(test)]
mod testing;
mod utils;

use cli::{AactArgs, Cli, Command, CrosswordArgs, MitreArgs};
use http::ReqwestClient;
use outputs::json;
use prompt::{ask_password, ask_until, non_empty};
use scrapers::{aact, crossword, mitre};
use storage::FsStorage;
use utils::{skip_weekday, validate_date, validate_folder};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest silence tolerated while a response is streaming in.
const READ_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!("Parsed CLI arguments");

    let code = match args.command {
        Command::Crossword(args) => run_crossword(args).await?,
        Command::Aact(args) => run_aact(args).await?,
        Command::Mitre(args) => run_mitre(args).await?,
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), exit_code = code, "Execution complete");

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Token cancelled on the first Ctrl-C.
///
/// Installed only once prompting is over, so Ctrl-C at a prompt still kills
/// the process the usual way.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Keyboard interrupt received, stopping.");
            token.cancel();
        }
    });
    cancel
}

async fn run_crossword(args: CrosswordArgs) -> Result<i32, Box<dyn Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let username = match args.username {
        Some(u) => non_empty(&u)?,
        None => ask_until(&mut stdin.lock(), &mut stdout, "Enter website username: ", non_empty)?,
    };
    let password = match args.password {
        Some(p) => p,
        None => ask_password("Enter website password: ")?,
    };

    let client = ReqwestClient::new(CONNECT_TIMEOUT, READ_TIMEOUT)?;
    if let Some(outcome) = crossword::login(&client, &args.root_url, &username, &password).await? {
        return Ok(outcome.exit_code());
    }

    let lower = crossword::first_date();
    let upper = Local::now().date_naive() + Days::new(1);
    let start = match args.start_date {
        Some(s) => validate_date(&s, lower, upper)?,
        None => ask_until(
            &mut stdin.lock(),
            &mut stdout,
            "Enter puzzle start date (format \"yyyy/mm/dd\"): ",
            |s| validate_date(s, lower, upper),
        )?,
    };
    let start = skip_weekday(start, crossword::NO_PUZZLE_DAY);

    let folder = match args.folder {
        Some(f) => validate_folder(f)?,
        None => ask_until(&mut stdin.lock(), &mut stdout, "Enter output folder path: ", |s| {
            validate_folder(s.trim())
        })?,
    };

    let config = crossword::CrosswordConfig {
        root_url: args.root_url,
        start,
        last_date: upper,
        max_puzzles: args.max_puzzles,
        delay: Duration::from_millis(args.delay_ms),
    };
    let storage = FsStorage::new(folder);
    let cancel = cancel_on_ctrl_c();

    let summary = crossword::run(&client, &storage, &config, &cancel).await?;
    info!(
        outcome = ?summary.outcome,
        saved = summary.saved,
        skipped = summary.skipped.len(),
        pages = summary.visited.len(),
        folder = %storage.root().display(),
        "Crossword run finished"
    );
    Ok(summary.outcome.exit_code())
}

async fn run_aact(args: AactArgs) -> Result<i32, Box<dyn Error>> {
    let folder = validate_folder(&args.folder)?;
    let config = aact::CatalogConfig {
        base_url: args.base_url,
        container: args.catalog_selector,
        index: args.catalog_index,
        member: args.member,
    };
    let client = ReqwestClient::new(CONNECT_TIMEOUT, READ_TIMEOUT)?;
    let storage = FsStorage::new(folder);
    let cancel = cancel_on_ctrl_c();

    let summary = aact::run(&client, &storage, &config, &cancel).await?;
    if summary.interrupted {
        info!("Stopped by user; rerun to resume");
    }
    Ok(0)
}

async fn run_mitre(args: MitreArgs) -> Result<i32, Box<dyn Error>> {
    info!("Starting.");
    let client = ReqwestClient::new(CONNECT_TIMEOUT, READ_TIMEOUT)?;
    let cells = mitre::scrape(&client, &args.url).await?;

    for line in mitre::render_lines(&cells) {
        println!("{line}");
    }
    if let Some(path) = args.json {
        json::write_cells(&cells, &path).await?;
    }
    info!("Done.");
    Ok(0)
}
