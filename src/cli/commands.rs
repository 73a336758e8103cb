use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "productpilot", about = "Affiliate product automation and scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Daily Routine once and print its report
    Routine,
    /// Run the Daily Routine on a schedule until interrupted
    Daemon {
        /// Hours between runs
        #[arg(long, default_value = "24")]
        interval_hours: u64,
    },
    /// Wake a worker and run one unit of work (market_scanner, social, research)
    Run {
        worker: String,
        /// Niche to scan (market_scanner). Defaults to the configured niche
        #[arg(long, conflicts_with = "topic")]
        niche: Option<String>,
        /// Topic to research (research). Defaults to the configured niche
        #[arg(long)]
        topic: Option<String>,
    },
    /// Show system state and which workers hold a session
    Status,
    /// Recompute score and status for a product from its stored counters
    Score {
        /// Product ID
        id: String,
    },
    /// Add a metrics snapshot to a product and rescore it
    Metrics {
        /// Product ID
        id: String,
        /// JSON with sales, clicks, social_engagement, refund_count
        json: String,
    },
    /// Rescore every tracked product
    RescoreAll,
    /// List tracked products, best score first
    Products {
        /// Status filter (testing, active, scaling, paused, killed)
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}
