use chrono::Local;
use std::env;
use std::io::{self, IsTerminal};
use std::path::Path;

use crate::config::{APP_DESC, APP_NAME, APP_VERSION, HarvestConfig};
use crate::error::HarvestResult;
use crate::fetch::fetch_if_absent;
use crate::gz::normalize_logs;
use crate::paths::{resolve_destination, scenarios_dir};
use crate::scan::{Reporter, scan_for_failures};
use crate::transfer::SshTransport;

fn print_help() {
    println!("{APP_NAME} {APP_VERSION} - {APP_DESC}");
    println!();
    println!("Usage:");
    println!("  {APP_NAME} [DESTINATION_DIR]");
    println!();
    println!("Copies the service log archives and the latest run of every scenario");
    println!("from the configured CI hosts into DESTINATION_DIR/MM-DD-YYYY (default:");
    println!("current directory), gzips any plain *.log files, and prints a report");
    println!("for every scenario whose run log never recorded success: result");
    println!("messages, node errors/exceptions, and node stderr without the");
    println!("Starting/Stopped lifecycle noise.");
    println!();
    println!("The fetch is skipped entirely when the dated directory already exists;");
    println!("delete it to force a re-download.");
    println!();
    println!("Environment overrides:");
    println!("  SP_SERVICE_HOST      services host to copy archives from");
    println!("  SP_SERVICE_DIR       remote directory holding the service archives");
    println!("  SP_SERVICE_FILES     comma-separated archive file names");
    println!("  SP_SCENARIO_HOSTS    comma-separated host=defs_dir entries");
    println!("  SP_DATA_DIR          remote scenario-player data root");
    println!("  SP_SSH_BIN/SP_SCP_BIN/SP_TAR_BIN  tool binaries (default ssh/scp/tar)");
    println!("  SP_CMD_TIMEOUT_SECS  per-command timeout, 0 disables (default 0)");
}

enum Cli {
    Help,
    Harvest(Option<String>),
    Usage(String),
}

fn parse_args(args: &[String]) -> Cli {
    if args.iter().any(|a| a == "--help") {
        return Cli::Help;
    }
    let mut positional = Vec::new();
    for arg in args {
        if arg.starts_with('-') {
            return Cli::Usage(format!("unknown flag '{arg}'"));
        }
        positional.push(arg.clone());
    }
    if positional.len() > 1 {
        return Cli::Usage("expected at most one DESTINATION_DIR argument".to_string());
    }
    Cli::Harvest(positional.into_iter().next())
}

pub fn run() -> i32 {
    let args: Vec<String> = env::args().skip(1).collect();
    match parse_args(&args) {
        Cli::Help => {
            print_help();
            1
        }
        Cli::Usage(msg) => {
            eprintln!("{APP_NAME}: {msg}");
            eprintln!("Usage: {APP_NAME} [DESTINATION_DIR]");
            2
        }
        Cli::Harvest(dest) => match harvest(dest.as_deref().map(Path::new)) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{APP_NAME}: {e}");
                1
            }
        },
    }
}

fn harvest(dest_arg: Option<&Path>) -> HarvestResult<()> {
    let cfg = HarvestConfig::from_env();
    let destination = resolve_destination(dest_arg, Local::now().date_naive())?;
    let transport = SshTransport::new(&cfg);
    if fetch_if_absent(&cfg, &transport, &destination)? {
        println!(
            "{APP_NAME}: fetched logs into {}",
            destination.display()
        );
    } else {
        println!(
            "{APP_NAME}: {} already exists; skipping fetch",
            destination.display()
        );
    }

    // Always normalize right before scanning: a rerun after an interrupted
    // fetch can still hold plain logs, and the scan only matches *.gz.
    // Once nothing plain remains this is a no-op.
    let scenarios = scenarios_dir(&destination);
    if scenarios.is_dir() {
        let compressed = normalize_logs(&scenarios)?;
        if compressed > 0 {
            println!("{APP_NAME}: compressed {compressed} plain logs");
        }
    }

    let stdout = io::stdout();
    let bold = stdout.is_terminal();
    let mut lock = stdout.lock();
    let mut reporter = Reporter::new(&mut lock, bold);
    scan_for_failures(&destination, &mut reporter)
}
