//! # tt — optimizer events and recommendations from the command line
//!
//! - `tt events [-n ns] [-w wl] [-c cluster] [-i id] [-f]` — event log, optionally tailed.
//! - `tt recommendations [...]` — recommendations with their ignored blockers.

mod config;
mod http;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tt_core::{EventRow, FilterCriteria};
use tt_engine::{list_events, list_recommendations, Follower, Listing};

use crate::config::Config;
use crate::http::HttpQueryClient;
use crate::output::{render, OutputFormat};

const NO_ENTITIES: &str = "No optimization entities found matching the given criteria";
const NO_EVENTS: &str = "No event results found for given input";
const NO_RECOMMENDATIONS: &str = "No recommendation results found for given input";

/// Inspect optimizer lifecycle events and tuning recommendations.
#[derive(Parser)]
#[command(name = "tt", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "tunetail.toml")]
    config: PathBuf,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List optimization events.
    Events(EventsArgs),

    /// List optimization recommendations.
    Recommendations(RecommendationsArgs),
}

#[derive(Args, Debug)]
struct ScopeArgs {
    /// Filter by cluster id.
    #[arg(short = 'c', long)]
    cluster_id: Option<String>,

    /// Filter by namespace.
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Filter by workload name.
    #[arg(short = 'w', long)]
    workload_name: Option<String>,

    /// Filter by optimizer id.
    #[arg(short = 'i', long, conflicts_with_all = ["cluster_id", "namespace", "workload_name"])]
    optimizer_id: Option<String>,

    /// Override the solution name used to qualify types.
    #[arg(long, hide = true)]
    solution_name: Option<String>,
}

#[derive(Args, Debug)]
struct EventsArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Retrieve events since this timestamp (relative, e.g. -1h, or absolute).
    #[arg(short = 's', long)]
    since: Option<String>,

    /// Retrieve events until this timestamp.
    #[arg(short = 'u', long)]
    until: Option<String>,

    /// Include progress events.
    #[arg(short = 'p', long, conflicts_with = "events")]
    include_progress: bool,

    /// Comma separated list of event types to retrieve.
    #[arg(short = 'e', long, value_delimiter = ',')]
    events: Option<Vec<String>>,

    /// Maximum number of events to retrieve (at most 1000; negative for no limit).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    count: i64,

    /// Keep polling for new events.
    #[arg(short = 'f', long, conflicts_with = "count")]
    follow: bool,

    /// Wait between follow polls when no new events arrived (e.g. 30s, 5m).
    #[arg(short = 't', long, value_parser = parse_interval)]
    follow_interval: Option<Duration>,
}

#[derive(Args, Debug)]
struct RecommendationsArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Retrieve recommendations since this timestamp.
    #[arg(short = 's', long, default_value = "-52w")]
    since: String,

    /// Retrieve recommendations until this timestamp.
    #[arg(short = 'u', long)]
    until: Option<String>,

    /// Also list identified and invalidated recommendations.
    #[arg(long)]
    include_invalidated: bool,

    /// Maximum number of recommendations to retrieve (at most 1000; negative for no limit).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    count: i64,
}

impl ScopeArgs {
    fn criteria(&self, config: &Config) -> FilterCriteria {
        FilterCriteria {
            cluster_id: self.cluster_id.clone(),
            namespace: self.namespace.clone(),
            workload_name: self.workload_name.clone(),
            optimizer_id: self.optimizer_id.clone(),
            solution_name: self
                .solution_name
                .clone()
                .unwrap_or_else(|| config.query.solution_name.clone()),
            ..Default::default()
        }
    }
}

impl EventsArgs {
    fn criteria(&self, config: &Config) -> FilterCriteria {
        FilterCriteria {
            since: self.since.clone(),
            until: self.until.clone(),
            result_cap: result_cap(self.count),
            event_types: self.events.clone(),
            include_progress: self.include_progress,
            ..self.scope.criteria(config)
        }
    }
}

impl RecommendationsArgs {
    fn criteria(&self, config: &Config) -> FilterCriteria {
        FilterCriteria {
            since: Some(self.since.clone()),
            until: self.until.clone(),
            result_cap: result_cap(self.count),
            include_invalidated: self.include_invalidated,
            ..self.scope.criteria(config)
        }
    }
}

/// Negative counts mean "no cap"; oversized ones are left for validation.
fn result_cap(count: i64) -> Option<u32> {
    if count < 0 {
        None
    } else {
        Some(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// `500ms`, `30s`, `5m`, `1h`, or bare seconds.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(at) => raw.split_at(at),
        None => (raw, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid interval `{}`", raw))?;
    let seconds_per = match unit {
        "ms" => return positive(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => return Err(format!("unknown interval unit `{}` in `{}`", other, raw)),
    };
    let seconds = value
        .checked_mul(seconds_per)
        .ok_or_else(|| format!("interval `{}` is too large", raw))?;
    positive(Duration::from_secs(seconds))
}

fn positive(interval: Duration) -> Result<Duration, String> {
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tt=info,tt_engine=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let client = HttpQueryClient::new(&config.service)
        .map_err(|e| anyhow::anyhow!("building query client: {}", e))?;
    let client = Arc::new(client);

    match cli.command {
        Commands::Events(args) => run_events(client, &config, &args, cli.output).await,
        Commands::Recommendations(args) => {
            run_recommendations(client.as_ref(), &config, &args, cli.output).await
        }
    }
}

async fn run_events(
    client: Arc<HttpQueryClient>,
    config: &Config,
    args: &EventsArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let criteria = args.criteria(config);
    let listing = list_events(client.as_ref(), &criteria, args.follow)
        .await
        .context("listing events")?;

    let (rows, last_page) = match listing {
        Listing::NoEntities => {
            eprintln!("{}", NO_ENTITIES);
            return Ok(());
        }
        Listing::NoResults => {
            eprintln!("{}", NO_EVENTS);
            return Ok(());
        }
        Listing::Rows { rows, last_page } => (rows, last_page),
    };

    if rows.is_empty() && !args.follow {
        eprintln!("{}", NO_EVENTS);
        return Ok(());
    }
    if !rows.is_empty() {
        println!("{}", render(&rows, format, true)?);
    }
    if !args.follow {
        return Ok(());
    }

    let interval = args
        .follow_interval
        .unwrap_or_else(|| config.query.follow_interval());
    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());

    info!("following new events every {:?} when idle", interval);
    let mut header = rows.is_empty();
    Follower::new(client, interval)
        .run(last_page, cancel, |batch: Vec<EventRow>| {
            match render(&batch, format, header) {
                Ok(out) => println!("{}", out),
                Err(e) => error!("rendering followed events: {}", e),
            }
            header = false;
        })
        .await
        .context("following events")?;
    Ok(())
}

async fn run_recommendations(
    client: &HttpQueryClient,
    config: &Config,
    args: &RecommendationsArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let criteria = args.criteria(config);
    let listing = list_recommendations(client, &criteria)
        .await
        .context("listing recommendations")?;

    match listing {
        Listing::NoEntities => eprintln!("{}", NO_ENTITIES),
        Listing::NoResults => eprintln!("{}", NO_RECOMMENDATIONS),
        Listing::Rows { rows, .. } => println!("{}", render(&rows, format, true)?),
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("SIGTERM handler unavailable: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => info!("interrupted; stopping follow"),
            _ = terminate => info!("terminated; stopping follow"),
        }
        token.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tt").chain(args.iter().copied()))
    }

    fn events(args: &[&str]) -> EventsArgs {
        match parse(args).unwrap().command {
            Commands::Events(e) => e,
            Commands::Recommendations(_) => panic!("expected events"),
        }
    }

    #[test]
    fn test_events_defaults() {
        let args = events(&["events", "-n", "payments"]);
        let criteria = args.criteria(&Config::default());
        assert_eq!(criteria.namespace.as_deref(), Some("payments"));
        assert_eq!(criteria.result_cap, None);
        assert_eq!(criteria.since, None);
        assert_eq!(criteria.solution_name, "optimize");
        assert!(!args.follow);
    }

    #[test]
    fn test_event_list_is_comma_separated() {
        let args = events(&["events", "-e", "stage_started,stage_ended", "--count", "10"]);
        let criteria = args.criteria(&Config::default());
        assert_eq!(
            criteria.event_types,
            Some(vec!["stage_started".to_string(), "stage_ended".to_string()])
        );
        assert_eq!(criteria.result_cap, Some(10));
    }

    #[test]
    fn test_recommendation_defaults() {
        let cli = parse(&["recommendations", "-i", "ns-wl-1", "--include-invalidated"]).unwrap();
        let Commands::Recommendations(args) = cli.command else {
            panic!("expected recommendations");
        };
        let criteria = args.criteria(&Config::default());
        assert_eq!(criteria.since.as_deref(), Some("-52w"));
        assert_eq!(criteria.result_cap, Some(1));
        assert!(criteria.include_invalidated);
    }

    #[test]
    fn test_mutually_exclusive_flags() {
        assert!(parse(&["events", "-i", "x", "-n", "payments"]).is_err());
        assert!(parse(&["events", "-p", "-e", "stage_started"]).is_err());
        assert!(parse(&["events", "-f", "--count", "5"]).is_err());
        assert!(parse(&["events", "-f"]).is_ok());
    }

    #[test]
    fn test_hidden_solution_override() {
        let args = events(&["events", "--solution-name", "tuning"]);
        assert_eq!(args.criteria(&Config::default()).solution_name, "tuning");
    }

    #[test]
    fn test_output_flag_after_subcommand() {
        let cli = parse(&["events", "-o", "json"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_negative_count_means_uncapped() {
        assert_eq!(result_cap(-1), None);
        assert_eq!(result_cap(0), Some(0));
        assert_eq!(result_cap(5_000_000_000), Some(u32::MAX));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_interval("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_interval("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_interval("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_interval("250ms"), Ok(Duration::from_millis(250)));
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("5d").is_err());
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("307445734561825861m").is_err());
        assert!(parse_interval("5124095576030432h").is_err());
        assert_eq!(
            parse_interval("307445734561825860m"),
            Ok(Duration::from_secs(307445734561825860 * 60))
        );
    }
}
