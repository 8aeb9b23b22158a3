use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::validate_config;
use crate::error::{Error, Result};
use crate::models::{ConnectorType, SimConfig};

#[derive(Parser, Debug)]
#[command(
    name = "chargesim",
    version,
    about = "Discrete-event simulation of a bank of charging posts"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one simulation and print its report.
    Run(RunArgs),
    /// Print the resolved configuration without running it.
    ShowConfig(ConfigArgs),
    /// Run independent replications in parallel, one per seed.
    Replicate(ReplicateArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[arg(long, value_enum, default_value = "human")]
    pub format: FormatArg,
}

#[derive(Args, Debug)]
pub struct ReplicateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[arg(long, default_value_t = 10)]
    pub replications: u64,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    #[arg(long, help = "TOML or JSON file; flags override its values")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Simulated time limit in minutes")]
    pub t_max: Option<f64>,
    #[arg(long, help = "Maximum number of events to process")]
    pub n_max: Option<u64>,
    #[arg(long, help = "Mean time between arrivals in minutes")]
    pub mean_interarrival: Option<f64>,
    #[arg(long, help = "Validation delay before charging starts, in minutes")]
    pub validation_time: Option<f64>,
    #[arg(long)]
    pub p_usb_c: Option<f64>,
    #[arg(long)]
    pub p_lightning: Option<f64>,
    #[arg(long)]
    pub p_microusb: Option<f64>,
    #[arg(long, help = "Number of charging posts (8 or 10)")]
    pub servers: Option<usize>,
    #[arg(long, help = "Seed for reproducible runs; omit for a fresh seed per run")]
    pub seed: Option<u64>,
    #[arg(long, help = "Abort the run after this many wall-clock milliseconds")]
    pub max_wall_ms: Option<u64>,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
    Csv,
}

/// Help and version requests print to stdout and exit 0; any other parse
/// failure comes back as `Error::Cli`.
pub fn parse_args() -> Result<Cli> {
    Cli::try_parse().map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => Error::Cli(e.to_string()),
    })
}

/// Loads the optional config file, applies flag overrides and validates the
/// result, so a bad parameter never reaches the engine.
pub fn build_config(args: &ConfigArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };

    if let Some(t_max) = args.t_max {
        config.t_max = t_max;
    }
    if let Some(n_max) = args.n_max {
        config.n_max = n_max;
    }
    if let Some(mean) = args.mean_interarrival {
        config.mean_interarrival = mean;
    }
    if let Some(validation_time) = args.validation_time {
        config.validation_time = validation_time;
    }
    if let Some(p) = args.p_usb_c {
        config.p_usb_c = p;
    }
    if let Some(p) = args.p_lightning {
        config.p_lightning = p;
    }
    if let Some(p) = args.p_microusb {
        config.p_microusb = p;
    }
    if let Some(servers) = args.servers {
        config.n_servers = servers;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.max_wall_ms.is_some() {
        config.max_wall_ms = args.max_wall_ms;
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<SimConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

pub fn describe_config(config: &SimConfig) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "T_max: {} min", config.t_max);
    let _ = writeln!(output, "N_max: {}", config.n_max);
    let _ = writeln!(output, "Mean interarrival: {} min", config.mean_interarrival);
    let _ = writeln!(output, "Validation time: {} min", config.validation_time);
    let _ = writeln!(output, "Servers: {}", config.n_servers);
    match config.seed {
        Some(seed) => {
            let _ = writeln!(output, "Seed: {}", seed);
        }
        None => output.push_str("Seed: entropy\n"),
    }
    output.push_str("Connectors:\n");
    for connector in ConnectorType::ALL {
        let profile = config.connectors.get(connector);
        let _ = writeln!(
            output,
            "- {} (p: {}, price/hour: {}, charge: {})",
            connector,
            config.probability(connector),
            profile.price_per_hour,
            profile.charge
        );
    }
    output
}
