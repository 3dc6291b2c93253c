/// earguard - adaptive loudness protection for shared audio endpoints
use clap::{Parser, Subcommand};
use earguard_limiter::LimiterEngine;
use earguard_monitor::{
    config::{MonitorConfig, DEFAULT_CONFIG_PATH},
    runner::{run_until_shutdown, Display},
    sim::SimScenario,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "earguard")]
#[command(about = "Adaptive loudness protection for audio sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor live audio sources
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Drive the engine against a simulated endpoint with a console meter
    Simulate {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(short, long)]
        duration: Option<f64>,
    },
    /// Inspect or create configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration file
    Init {
        /// Destination path
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "earguard=info,earguard_monitor=info,earguard_limiter=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run(config.as_deref()).await?;
        }
        Commands::Simulate { config, duration } => {
            simulate(config.as_deref(), duration).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Check { config } => config_check(config.as_deref())?,
            ConfigCommands::Init { path, force } => config_init(path.as_deref(), force)?,
        },
    }

    Ok(())
}

async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = MonitorConfig::load_or_default(config_path);
    config.validate()?;

    // Platform probes live behind the collaborator traits in
    // earguard-core; none are compiled into this build
    anyhow::bail!("no platform audio backend in this build; try `earguard simulate`")
}

async fn simulate(config_path: Option<&Path>, duration: Option<f64>) -> anyhow::Result<()> {
    let config = MonitorConfig::load_or_default(config_path);
    config.validate()?;

    tracing::info!("Starting simulated endpoint");
    let endpoint = SimScenario::demo().build();
    let engine = LimiterEngine::new(config.limiter.clone(), endpoint.clone(), endpoint)?;

    let run_for = duration
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .filter(|deadline| !deadline.is_zero());

    run_until_shutdown(engine, Display::meter(), run_for).await?;

    Ok(())
}

fn config_check(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if !path.exists() {
        anyhow::bail!("configuration file {} does not exist", path.display());
    }

    let config = MonitorConfig::load_from(path)?;
    config.validate()?;

    tracing::info!("Configuration at {} is valid", path.display());
    tracing::info!(
        "Threshold {:.0}%, safe level {:.0}%, hold {:.1}s, action {}",
        config.limiter.threshold * 100.0,
        config.limiter.safe_level * 100.0,
        config.limiter.hold_secs,
        config.limiter.action.as_str()
    );

    Ok(())
}

fn config_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    MonitorConfig::default().save(path)?;
    tracing::info!("Wrote default configuration to {}", path.display());

    Ok(())
}
