//! Work-unit predictor command line interface
//!
//! Runs predictions against a JSON tree-ensemble model, shows the encoded
//! feature vector and fingerprint of an input, and inspects model artifacts.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wu_predictor::{EnsembleModel, PredictorConfig, PredictorKind, WorkUnitPredictor};

#[derive(Parser)]
#[command(name = "wu-predict")]
#[command(about = "Work-unit estimates from tree-ensemble models", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is unset (defaults to the config's level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the work units for a feature file
    Predict(PredictCommand),
    /// Print the encoded feature vector and its fingerprint
    Fingerprint(InputArgs),
    /// Show model metadata and its BLAKE3 hash
    Inspect {
        /// Model JSON path
        #[arg(long)]
        model: PathBuf,
    },
    /// Validate a model (and optionally a config file)
    Validate {
        /// Model JSON path
        #[arg(long)]
        model: PathBuf,
        /// Predictor config TOML path
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the feature names of a built-in predictor
    Schema {
        /// Predictor kind (cpufj, bounds_strengthening)
        kind: PredictorKind,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Model JSON path
    #[arg(long)]
    model: PathBuf,
    /// Feature file: flat JSON object of name -> number
    #[arg(long)]
    features: PathBuf,
}

#[derive(Args)]
struct PredictCommand {
    #[command(flatten)]
    input: InputArgs,
    /// Predictor config TOML path
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of times to run the prediction
    #[arg(long, default_value = "1")]
    repeat: usize,
    /// Print cache statistics after predicting
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Predict(cmd) => load_config(cmd.config.as_deref())?,
        Commands::Validate { config, .. } => load_config(config.as_deref())?,
        _ => load_config(None)?,
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level)?;

    match cli.command {
        Commands::Predict(cmd) => run_predict(cmd, config),
        Commands::Fingerprint(input) => run_fingerprint(input),
        Commands::Inspect { model } => run_inspect(&model),
        Commands::Validate { model, config: path } => run_validate(&model, path.is_some(), &config),
        Commands::Schema { kind } => {
            for name in kind.feature_names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("Failed to set tracing subscriber")
}

fn load_config(path: Option<&Path>) -> Result<PredictorConfig> {
    let mut config = match path {
        Some(path) => PredictorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PredictorConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid WU_PREDICTOR_* environment override")?;
    Ok(config)
}

fn load_features(path: &Path) -> Result<BTreeMap<String, f32>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Feature file {} is not a name -> number object", path.display()))
}

fn load_model(path: &Path) -> Result<EnsembleModel> {
    EnsembleModel::load_json(path).with_context(|| format!("Failed to load model {}", path.display()))
}

fn run_predict(cmd: PredictCommand, config: PredictorConfig) -> Result<()> {
    if cmd.repeat == 0 {
        bail!("--repeat must be at least 1");
    }
    let model = load_model(&cmd.input.model)?;
    let features = load_features(&cmd.input.features)?;
    let predictor = WorkUnitPredictor::from_model(model, config)
        .context("Failed to build predictor")?;

    let mut prediction = 0.0;
    for round in 0..cmd.repeat {
        prediction = predictor.predict_scalar(&features)?;
        debug!("Round {round}: {prediction}");
    }
    println!("{prediction}");

    if cmd.stats {
        let stats = predictor.stats();
        let report = json!({
            "stats": stats,
            "hit_rate": stats.hit_rate(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_fingerprint(input: InputArgs) -> Result<()> {
    let model = load_model(&input.model)?;
    let schema = model.schema()?;
    let features = load_features(&input.features)?;

    for name in features.keys().filter(|name| schema.index_of(name).is_none()) {
        warn!("Feature {name} is not used by model '{}'", model.name);
    }

    let encoded = schema.encode(&features);
    for (name, value) in schema.names().iter().zip(encoded.iter()) {
        println!("{name} = {value:?}");
    }
    println!("fingerprint = {:#010x}", encoded.fingerprint());
    Ok(())
}

fn run_inspect(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    let report = json!({
        "name": model.name,
        "version": model.version,
        "feature_names": model.feature_names,
        "num_feature": model.num_feature(),
        "num_target": model.num_target(),
        "num_trees": model.num_trees(),
        "num_nodes": model.num_nodes(),
        "base_score": model.base_score,
        "threshold_type": model.threshold_type(),
        "leaf_output_type": model.leaf_output_type(),
        "blake3": model.hash_hex()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_validate(path: &Path, check_config: bool, config: &PredictorConfig) -> Result<()> {
    let model = load_model(path)?;
    model
        .validate()
        .with_context(|| format!("Model {} is invalid", path.display()))?;
    info!(
        "Model '{}' is valid: {} trees, {} nodes",
        model.name,
        model.num_trees(),
        model.num_nodes()
    );

    if check_config {
        let warnings = config.validate().context("Config is invalid")?;
        for warning in &warnings {
            println!("warning: {warning}");
        }
    }
    println!("ok");
    Ok(())
}
