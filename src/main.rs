use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod cycle;
mod tooling;
mod utils;

use config::Config;
use cycle::{Cycle, Failure, RunResult};
use tooling::Toolbox;
use utils::{bins::missing_bins, exec_policy, process::ProcessRunner};

#[derive(Parser, Debug)]
#[command(
    name = "luks-backup",
    about = "Open and mount a LUKS backup volume, run the backup command, then unmount and close it",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// TOML file; LUKS_BACKUP_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    debug: bool,

    /// Log external commands instead of running them.
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    check_config: bool,

    #[arg(long)]
    print_config: bool,

    /// Passed through as the last argument of the backup command (e.g. `daily`).
    interval: Option<String>,
}

fn init_tracing(debug: bool) {
    let default = if debug { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let tools = Toolbox::new(Arc::new(ProcessRunner::new()));
    let result = run(&cli, &tools);
    if let Err(ref failure) = result {
        if failure.is_expected() {
            tracing::warn!("{failure}");
        } else {
            tracing::error!("{failure}");
        }
    }
    ExitCode::from(exit_byte(cycle::exit_code(&result)))
}

fn run(cli: &Cli, tools: &Toolbox) -> RunResult {
    let cfg = Config::load(cli.config.as_deref())
        .map_err(|e| Failure::BadConfig(format!("{e:#}")))?;

    if cli.print_config {
        match cfg.to_toml() {
            Ok(s) => print!("{s}"),
            Err(e) => return Err(Failure::BadConfig(format!("{e:#}"))),
        }
        return Ok(());
    }
    if cli.check_config {
        cycle::check_config(&cfg)?;
        tracing::info!("config OK");
        return Ok(());
    }

    let cycle = Cycle::prepare(&cfg, cli.interval.as_deref())?;

    // Advisory only: a step whose binary cannot start reports 127 by itself.
    let missing = missing_bins(tooling::required_bins(&cfg));
    if !missing.is_empty() {
        tracing::warn!("not found in PATH: {}", missing.join(", "));
    }

    if cli.dry_run {
        tracing::warn!("running in dry-run mode");
    }
    exec_policy::with_dry_run_enabled(cli.dry_run, || cycle.run(tools))
}

/// Codes outside 0..=255 cannot be reported to the parent; they become 1.
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
