use clap::Parser;
use productpilot::cli::commands::{Cli, Commands};
use productpilot::config::PilotConfig;
use productpilot::domain::ports::automation_worker::WorkRequest;
use productpilot::domain::ports::product_ledger::ProductFilter;
use productpilot::domain::values::metrics::MetricsSnapshot;
use productpilot::domain::values::product_status::ProductStatus;
use productpilot::domain::values::worker_id::WorkerId;
use productpilot::ProductPilot;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "productpilot=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match PilotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pilot = match ProductPilot::new(&config) {
        Ok(pilot) => pilot,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize");
            std::process::exit(1);
        }
    };

    let result = run_command(&pilot, &config, cli.command).await;
    pilot.shutdown().await;
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

async fn run_command(
    pilot: &ProductPilot,
    config: &PilotConfig,
    cmd: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Routine => {
            let report = pilot.run_daily_routine().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_success() {
                return Err("daily routine did not complete".into());
            }
        }
        Commands::Daemon { interval_hours } => {
            if interval_hours == 0 {
                return Err("--interval-hours must be at least 1".into());
            }
            run_daemon(pilot, Duration::from_secs(interval_hours * 3600)).await?;
        }
        Commands::Run {
            worker,
            niche,
            topic,
        } => {
            let id: WorkerId = worker.parse()?;
            let request = match id {
                WorkerId::MarketScanner => WorkRequest::Scan {
                    niche: niche.unwrap_or_else(|| config.routine.niche.clone()),
                },
                WorkerId::Social => WorkRequest::Authenticate,
                WorkerId::Research => WorkRequest::Research {
                    topic: topic.unwrap_or_else(|| config.routine.niche.clone()),
                },
            };
            let report = pilot.run_worker(&id.to_string(), request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => {
            let status = pilot.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Score { id } => {
            let outcome = pilot.rescore(&id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Metrics { id, json } => {
            let snapshot: MetricsSnapshot = serde_json::from_str(&json)?;
            let outcome = pilot.record_metrics(&id, &snapshot).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::RescoreAll => {
            let report = pilot.rescore_all().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Products { status, limit } => {
            let status: Option<ProductStatus> = status.map(|s| s.parse()).transpose()?;
            let products = pilot
                .products(&ProductFilter {
                    status,
                    limit: Some(limit),
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
    }
    Ok(())
}

/// Spawn a routine run every `every` until Ctrl-C, then halt all workers.
async fn run_daemon(pilot: &ProductPilot, every: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(every);
    tracing::info!(every_secs = every.as_secs(), "daemon started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ticket = pilot.start_daily_routine().await;
                if ticket.already_running {
                    tracing::warn!(run_id = %ticket.run_id, "previous routine still running, skipping");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("interrupt received, deactivating");
                pilot.deactivate().await;
                break;
            }
        }
    }
    Ok(())
}
