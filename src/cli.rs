use crate::api::{self, count_events};
use crate::config::{FetchConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_SPORT};
use crate::tools::fetch::FetchResult;
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "qfetch",
    version,
    about = "Fetch scheduled events as JSON, rotating proxies and browser identities"
)]
pub struct Cli {
    /// Date to fetch (YYYY-MM-DD). Defaults to today (UTC).
    date: Option<String>,

    /// Sport slug used in the endpoint path.
    #[arg(long, default_value = DEFAULT_SPORT)]
    sport: String,

    /// Maximum number of attempts.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    attempts: usize,

    /// Never use the proxy pool.
    #[arg(long)]
    direct_only: bool,

    /// Skip the landing page visit.
    #[arg(long)]
    no_warmup: bool,

    /// Print the full fetch report (attempts, egress, timing) instead of the payload.
    #[arg(long)]
    report: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> FetchConfig {
        let mut cfg = FetchConfig::default().with_max_attempts(self.attempts);
        if self.direct_only {
            cfg = cfg.direct_only();
        }
        if self.no_warmup {
            cfg = cfg.without_warmup();
        }
        cfg
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match execute(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("Error: could not retrieve data after {} attempts", cli.attempts);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays pure JSON.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: &Cli) -> anyhow::Result<bool> {
    let date = cli.date.clone().unwrap_or_else(api::today);
    let cfg = cli.config();
    info!(
        sport = %cli.sport,
        %date,
        egress = cfg.egress.len(),
        attempts = cfg.max_attempts,
        "fetching scheduled events"
    );

    let report = api::fetch_scheduled_events(&cli.sport, &date, cfg)
        .with_context(|| format!("cannot fetch {} events for {date}", cli.sport))?;

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.result.is_success());
    }

    match report.result {
        FetchResult::Success(payload) => {
            if let Some(n) = count_events(&payload) {
                info!(events = n, attempts = report.attempts.len(), "done");
            }
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(true)
        }
        FetchResult::ExhaustedFailure => Ok(false),
    }
}
