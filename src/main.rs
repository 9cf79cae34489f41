mod chain;
mod config;
mod deribit;
mod edge;
mod errors;
mod http;
mod models;
mod polymarket;
mod scan;
mod server;
mod state;

use crate::edge::comparator::EdgeThresholds;
use crate::errors::{EngineError, EngineResult};
use crate::scan::orchestrator::ladder;
use crate::scan::report::render_ladder_text;
use crate::state::AppState;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "touch_edge")]
#[command(about = "Barrier-touch probabilities from the options chain vs prediction-market prices")]
struct Args {
    /// Underlying currency (overrides UNDERLYING)
    #[arg(long, global = true)]
    underlying: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scan and print the report
    Scan {
        /// Print JSON instead of the text table
        #[arg(long)]
        json: bool,

        /// Also write an HTML report to this path
        #[arg(long)]
        html: Option<PathBuf>,

        /// Symmetric edge threshold (overrides both env thresholds)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Replicated touch probabilities for a strike ladder at one expiry
    Ladder {
        /// Target expiry, YYYY-MM-DD
        #[arg(long)]
        expiry: NaiveDate,

        /// Comma-separated strikes
        #[arg(long, value_delimiter = ',', required = true)]
        strikes: Vec<f64>,

        #[arg(long)]
        json: bool,
    },
    /// Serve fresh scans over HTTP
    Serve {
        /// Listen port (overrides SERVER_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(u) = &args.underlying {
        cfg.underlying = u.to_uppercase();
    }

    if let Err(e) = run(args.command, cfg).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, mut cfg: config::AppConfig) -> EngineResult<()> {
    match command {
        Command::Scan { json, html, threshold } => {
            if let Some(t) = threshold {
                cfg.thresholds = EdgeThresholds::symmetric(t);
                cfg.validate()?;
            }
            let state = AppState::new(cfg)?;
            let report = state.run_fresh_scan().await?;

            if let Some(path) = html {
                std::fs::write(&path, report.render_html())?;
                tracing::info!(path = %path.display(), "html report written");
            }
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_text());
            }
        }

        Command::Ladder { expiry, strikes, json } => {
            let state = AppState::new(cfg)?;
            let chain = state.fetch_chain().await?;
            let ladder = ladder(&chain, expiry, &strikes)
                .map_err(|reason| EngineError::Parse(format!("ladder at {expiry}: {reason}")))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ladder)?);
            } else {
                print!("{}", render_ladder_text(&ladder));
            }
        }

        Command::Serve { port } => {
            if let Some(p) = port {
                cfg.server_port = p;
            }
            let addr = format!("0.0.0.0:{}", cfg.server_port);
            let state = AppState::new(cfg)?;
            let app = server::router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("server listening on {addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
