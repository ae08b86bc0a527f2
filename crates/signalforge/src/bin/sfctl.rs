//! `sfctl`: offline scoring, dataset building and training.
//!
//! `score` goes through the same data client, predictor and scoring path as
//! `POST /api/v1/score`, so results match the service for identical input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use signalforge::core::features::FEATURE_NAMES;
use signalforge::core::market::{Interval, SyntheticMode};
use signalforge::core::model::artifacts::save_artifacts;
use signalforge::core::model::dataset::{build_dataset, latest_dataset, load_dataset, save_dataset, DatasetConfig};
use signalforge::core::model::train::{train_and_evaluate, TrainParams};
use signalforge::core::model::{ArtifactPaths, Predictor};
use signalforge::core::scoring::{score_series, ScoreReport, ScoreRequest};
use signalforge::gateway::config::{self, SignalForgeConfig};
use signalforge::gateway::data::MarketDataClient;
use signalforge::gateway::obs::logging::env_filter;
use signalforge::gateway::obs::metrics::ServiceMetrics;

#[derive(Parser)]
#[command(name = "sfctl", version, about = "SignalForge offline tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a series and score it with the saved model (prints JSON)
    Score(ScoreArgs),
    /// Build a labelled training dataset from a fetched series
    BuildDataset(DatasetArgs),
    /// Train the baseline logistic regression on the newest dataset
    Train(TrainArgs),
}

#[derive(Args)]
struct ScoreArgs {
    #[arg(long)]
    symbol: String,
    #[arg(long)]
    interval: String,
    #[arg(long, default_value_t = 300)]
    limit: usize,
    #[arg(long)]
    threshold: Option<f64>,
    /// Use a synthetic random walk instead of the upstream provider
    #[arg(long)]
    synthetic: bool,
    #[arg(long, default_value = "up")]
    synthetic_mode: String,
    /// Overrides `model.dir` from config
    #[arg(long)]
    model_dir: Option<String>,
}

#[derive(Args)]
struct DatasetArgs {
    #[arg(long, default_value = "AAPL")]
    symbol: String,
    #[arg(long, default_value = "5m")]
    interval: String,
    #[arg(long, default_value_t = 1000)]
    limit: usize,
    #[arg(long, default_value_t = 3)]
    lookahead_n: usize,
    #[arg(long, default_value_t = 0.001)]
    up_threshold: f64,
    #[arg(long, default_value = "v0")]
    dataset_version: String,
    /// Fetch from the configured provider instead of generating bars
    #[arg(long)]
    live: bool,
    #[arg(long, default_value = "up")]
    synthetic_mode: String,
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct TrainArgs {
    /// Dataset file; defaults to the newest `dataset_*.json` in `--dataset-dir`
    #[arg(long)]
    dataset: Option<PathBuf>,
    #[arg(long, default_value = "data")]
    dataset_dir: PathBuf,
    #[arg(long = "C", default_value_t = 1.0)]
    c: f64,
    #[arg(long, default_value_t = 1000)]
    max_iter: usize,
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,
    #[arg(long, default_value = "data/eval_report.json")]
    out: PathBuf,
    /// Write model.json / scaler.json / model_meta.json into `--model-dir`
    #[arg(long)]
    save_artifacts: bool,
    #[arg(long, default_value = "data")]
    model_dir: PathBuf,
    #[arg(long, default_value = "0.1.0")]
    model_version: String,
}

fn data_client(cfg: &SignalForgeConfig) -> Result<MarketDataClient> {
    let client = MarketDataClient::from_config(&cfg.data, Arc::new(ServiceMetrics::default()))?;
    Ok(client)
}

async fn cmd_score(args: ScoreArgs, cfg: &SignalForgeConfig) -> Result<ScoreReport> {
    let req = ScoreRequest {
        symbol: args.symbol,
        interval: args.interval,
        limit: args.limit,
        threshold: args.threshold,
        synthetic: args.synthetic,
        synthetic_mode: SyntheticMode::parse(&args.synthetic_mode),
    }
    .validate()?;

    let dir = args.model_dir.unwrap_or_else(|| cfg.model.dir.clone());
    let predictor = Predictor::load(ArtifactPaths::in_dir(&dir))
        .with_context(|| format!("load model artifacts from {dir}"))?;

    let series = data_client(cfg)?
        .fetch(&req.symbol, req.interval, req.limit, req.synthetic, req.synthetic_mode)
        .await?;
    Ok(score_series(&series, &predictor, req.threshold)?)
}

async fn cmd_build_dataset(args: DatasetArgs, cfg: &SignalForgeConfig) -> Result<PathBuf> {
    let interval = Interval::parse(&args.interval)?;
    let mode = SyntheticMode::parse(&args.synthetic_mode);
    let series = data_client(cfg)?
        .fetch(&args.symbol, interval, args.limit, !args.live, mode)
        .await?;

    let ds_cfg = DatasetConfig {
        symbol: series.symbol.clone(),
        interval,
        lookahead_n: args.lookahead_n,
        up_threshold: args.up_threshold,
        dataset_version: args.dataset_version,
    };
    let ds = build_dataset(&series.candles, ds_cfg, &FEATURE_NAMES)?;
    tracing::info!(symbol = %series.symbol, bars = series.candles.len(), rows = ds.rows.len(), "dataset built");
    Ok(save_dataset(&ds, &args.out_dir)?)
}

fn write_report(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("write {}", path.display()))
}

fn cmd_train(args: TrainArgs) -> Result<()> {
    let path = match args.dataset {
        Some(p) => p,
        None => latest_dataset(&args.dataset_dir)?,
    };
    let ds = load_dataset(&path)?;
    let params = TrainParams {
        c: args.c,
        max_iter: args.max_iter,
        threshold: args.threshold,
        ..TrainParams::default()
    };
    tracing::info!(dataset = %path.display(), rows = ds.rows.len(), "training");
    let out = train_and_evaluate(&ds, &path.display().to_string(), params, &args.model_version)?;

    write_report(&args.out, &out.report)?;
    println!("Wrote eval report -> {}", args.out.display());

    if args.save_artifacts {
        let paths = ArtifactPaths::in_dir(&args.model_dir);
        save_artifacts(&paths, &out.model, &out.scaler, &out.meta)?;
        println!("Saved artifacts -> {}", args.model_dir.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load().context("load config")?;
    run(cli.command, &cfg).await
}

async fn run(command: Command, cfg: &SignalForgeConfig) -> Result<()> {
    match command {
        Command::Score(args) => {
            let report = cmd_score(args, cfg).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::BuildDataset(args) => {
            let path = cmd_build_dataset(args, cfg).await?;
            println!("Wrote dataset -> {}", path.display());
        }
        Command::Train(args) => cmd_train(args)?,
    }
    Ok(())
}
