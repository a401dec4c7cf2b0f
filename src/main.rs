use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use towerscope::analysis::aggregator::{aggregate, regional_breakdown};
use towerscope::analysis::correlation::correlate;
use towerscope::analysis::hexgrid::MAX_RESOLUTION;
use towerscope::analysis::runner::{build_report, ticket_anomalies};
use towerscope::analysis::towers::{find_tower, TowerDetail, TowerFilter, TowerStats};
use towerscope::analysis::trend::{forecast, ForecastSummary, MAX_HORIZON};
use towerscope::config::Config;
use towerscope::dataset::source::DatasetKind;
use towerscope::dataset::Field;
use towerscope::detect::{classify, severity_score};

#[derive(Parser)]
#[command(
    name = "towerscope",
    about = "Cell-tower reliability and support-ticket analytics",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (else $TOWERSCOPE_CONFIG, else ./towerscope.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the full network report
    Report {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Forecast daily ticket volume
    Forecast {
        /// Number of trailing days to fit
        #[arg(long)]
        window: Option<usize>,

        /// Days to predict (1-365)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_HORIZON as u64))]
        horizon: Option<u64>,
    },

    /// List anomalous days in the ticket series
    Anomalies {
        /// Z-score threshold
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Pearson correlation between two tower fields
    Correlate {
        /// First field, e.g. failure_rate
        a: Field,
        /// Second field, e.g. ticket_count
        b: Field,
    },

    /// Hexagonal and named-region rollups of towers
    Regions {
        /// Hex grid resolution (0-15)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_RESOLUTION as i64))]
        resolution: Option<u8>,
    },

    /// List towers, or show one tower by ID
    Towers {
        /// Tower ID, e.g. CT-0042
        id: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Maximum failure rate as a fraction, e.g. 0.05
        #[arg(long)]
        max_failure_rate: Option<f64>,
    },

    /// Classify a single (failure rate, ticket count) pair
    Classify {
        failure_rate: f64,
        ticket_count: i64,
    },

    /// Write the synthetic sample into the configured database
    Seed,
}

fn init_tracing(config: &Config, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json || config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config warnings are logged before the configured subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let config =
        tracing::subscriber::with_default(bootstrap, || Config::resolve(cli.config.as_deref()))?;
    init_tracing(&config, cli.log_json);

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.api.bind = bind;
            }
            tracing::info!(bind = %config.api.bind, "Starting towerscope API");
            towerscope::serve(&config).await?;
        }
        Commands::Report { json } => {
            let source = towerscope::build_source(&config);
            let towers = source.load(DatasetKind::Towers)?;
            let series = source.load(DatasetKind::TicketSeries)?;
            let report = build_report(&towers.dataset, &series.dataset, &config.analytics)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let s = &report.summary;
                println!("\n=== towerscope Network Report ===");
                println!("Towers:            {}", s.total_towers);
                println!("Avg failure rate:  {:.2}%", s.avg_failure_rate * 100.0);
                println!("High-risk towers:  {}", s.high_risk_towers);
                println!("Total tickets:     {:.0}", s.total_tickets);
                println!("Avg sentiment:     {:.2}", s.avg_sentiment);
                println!("\nSeverity:");
                for (level, count) in &report.severity_distribution {
                    println!(" - {:<9} {}", level, count);
                }
                println!("\nInsights:");
                for insight in &report.insights {
                    println!(" - {}: {}", insight.title, insight.message);
                }
                println!("\nPriority towers:");
                for t in &report.priority_towers {
                    println!(
                        " - {:<8} {:<8} score {:>6.2}  {}",
                        t.id,
                        t.region.as_deref().unwrap_or("-"),
                        t.priority_score,
                        t.severity
                    );
                }
                println!(
                    "\nForecast: {:?} ({:+.1}% vs last {} days)",
                    report.forecast_summary.outlook,
                    report.forecast_summary.change_pct,
                    config.analytics.recent_days
                );
                println!("Anomalous days: {}", report.anomalies.len());
                println!("=================================\n");
            }
        }
        Commands::Forecast { window, horizon } => {
            let window = window.unwrap_or(config.analytics.forecast_window);
            let horizon = match horizon {
                Some(h) => usize::try_from(h)?,
                None => config.analytics.forecast_horizon,
            };
            let source = towerscope::build_source(&config);
            let series = source.load(DatasetKind::TicketSeries)?;
            let history = series.dataset.series(Field::TicketCount);
            let predicted = forecast(&history, window, horizon)
                .context("cannot forecast the ticket series")?;
            let summary =
                ForecastSummary::from_forecast(&history, &predicted, config.analytics.recent_days);

            for p in &predicted {
                println!("{}  {:>8.1}", p.timestamp.format("%Y-%m-%d"), p.predicted);
            }
            println!(
                "Outlook: {:?} (predicted mean {:.1}, recent mean {:.1})",
                summary.outlook, summary.predicted_mean, summary.recent_mean
            );
        }
        Commands::Anomalies { threshold } => {
            let threshold = threshold.unwrap_or(config.analytics.anomaly_threshold);
            let source = towerscope::build_source(&config);
            let series = source.load(DatasetKind::TicketSeries)?;
            let flagged = ticket_anomalies(&series.dataset.series(Field::TicketCount), threshold);
            if flagged.is_empty() {
                println!("No anomalies above z = {}.", threshold);
            } else {
                for a in flagged {
                    println!(
                        "{}  {:>6.0} tickets  z = {:+.2}",
                        a.timestamp.format("%Y-%m-%d"),
                        a.value,
                        a.z_score
                    );
                }
            }
        }
        Commands::Correlate { a, b } => {
            let source = towerscope::build_source(&config);
            let towers = source.load(DatasetKind::Towers)?;
            let r = correlate(&towers.dataset, a, b);
            println!(
                "{} vs {}: r = {:.4}, p = {:.4} ({} pairs)",
                a, b, r.coefficient, r.p_value, r.pairs
            );
        }
        Commands::Regions { resolution } => {
            let resolution = resolution.unwrap_or(config.analytics.hex_resolution);
            let source = towerscope::build_source(&config);
            let towers = source.load(DatasetKind::Towers)?;

            println!("{:<16} | {:>6} | {:>9} | {:>10}", "Cell", "Towers", "Lat", "Lon");
            for (cell, stats) in aggregate(&towers.dataset, Field::Latitude, Field::Longitude, resolution) {
                println!(
                    "{:<16} | {:>6} | {:>9.4} | {:>10.4}",
                    cell.to_string(),
                    stats.tower_count,
                    stats.latitude,
                    stats.longitude
                );
            }
            println!();
            for region in regional_breakdown(&towers.dataset) {
                println!(
                    "{:<8} {:>4} towers  {:>6.0} tickets",
                    region.region, region.tower_count, region.total_tickets
                );
            }
        }
        Commands::Towers {
            id,
            region,
            status,
            max_failure_rate,
        } => {
            let source = towerscope::build_source(&config);
            let towers = source.load(DatasetKind::Towers)?;
            let today = chrono::Utc::now().date_naive();

            if let Some(id) = id {
                let row = find_tower(&towers.dataset, &id)
                    .with_context(|| format!("no tower with id {}", id))?;
                let detail = TowerDetail::new(row, today);
                println!("{}", serde_json::to_string_pretty(&detail)?);
                if detail.maintenance_due {
                    println!(
                        "Maintenance due: last serviced {} days ago",
                        detail.days_since_maintenance.unwrap_or_default()
                    );
                }
                return Ok(());
            }

            let filter = TowerFilter {
                region,
                status,
                max_failure_rate,
            };
            let matched = filter.apply(&towers.dataset);
            println!(
                "{:<8} | {:<8} | {:<11} | {:>7} | {:>8} | {:>8}",
                "Tower", "Region", "Status", "Fail %", "Signal", "Severity"
            );
            for row in &matched {
                let detail = TowerDetail::new(row, today);
                println!(
                    "{:<8} | {:<8} | {:<11} | {:>7.2} | {:>8.1} | {:>8}{}",
                    row.id,
                    row.region.as_deref().unwrap_or("-"),
                    row.status.as_deref().unwrap_or("-"),
                    row.get(Field::FailureRate).unwrap_or(0.0) * 100.0,
                    row.get(Field::SignalStrength).unwrap_or(f64::NAN),
                    detail.severity,
                    if detail.maintenance_due { "  (maintenance due)" } else { "" }
                );
            }
            let stats = TowerStats::from_dataset(&matched);
            println!(
                "\n{} towers, {} critical, avg failure {:.2}%, avg signal {:.1} dBm",
                stats.total,
                stats.critical_count,
                stats.avg_failure_rate.unwrap_or(0.0) * 100.0,
                stats.avg_signal_strength.unwrap_or(f64::NAN)
            );
        }
        Commands::Classify {
            failure_rate,
            ticket_count,
        } => {
            let level = classify(failure_rate, ticket_count);
            println!(
                "{} (score {:.2})",
                level,
                severity_score(failure_rate, ticket_count)
            );
        }
        Commands::Seed => {
            let path = &config.warehouse.database_path;
            tracing::info!(path = %path.display(), "Seeding database");
            let pool = towerscope::storage::open_pool(path)?;
            let (towers, tickets) = towerscope::storage::seed_sample(&pool)?;
            println!("Seeded {} towers and {} tickets into {}", towers, tickets, path.display());
        }
    }

    Ok(())
}
