//! Eva CLI - drive a remote optimizer with a built-in objective.

mod objective;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eva_core::{ParameterDescriptor, ParameterStore};
use eva_session::{Session, SessionConfig, Step};
use eva_strategy::{OptimizerStrategy, Strategy};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::objective::Objective;

#[derive(Parser)]
#[command(name = "eva")]
#[command(about = "Client for the Eva remote optimizer", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an optimization against the server
    Run {
        #[command(flatten)]
        settings: Settings,
        /// Objective evaluated for each candidate
        #[arg(long, value_enum, default_value = "sphere")]
        objective: Objective,
    },
    /// Print the request document that would be sent
    Describe {
        #[command(flatten)]
        settings: Settings,
    },
    /// Write a starter configuration file
    Init {
        /// Output path
        #[arg(default_value = "eva.json")]
        path: PathBuf,
        /// Number of parameters
        #[arg(long, default_value = "2")]
        dimensions: usize,
    },
}

/// Configuration sources shared by several commands.
#[derive(Args)]
struct Settings {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Optimizer host
    #[arg(long)]
    host: Option<String>,
    /// Optimizer port
    #[arg(long)]
    port: Option<u16>,
    /// Optimization method (DE or GA)
    #[arg(long)]
    method: Option<String>,
    /// Generation cap, -1 for unbounded
    #[arg(long, allow_hyphen_values = true)]
    generations: Option<i64>,
    /// Parameters to generate when no configuration file is given
    #[arg(long, default_value = "2")]
    dimensions: usize,
}

impl Settings {
    /// Load the file (or defaults) and apply command line overrides.
    fn resolve(self, bound: f64) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load_from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => SessionConfig {
                parameters: default_parameters(self.dimensions, bound),
                ..Default::default()
            },
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(method) = self.method {
            config.strategy.method = method;
        }
        if let Some(generations) = self.generations {
            config.strategy.generations = generations;
        }

        config.validate()?;
        Ok(config)
    }
}

/// `x0..xN` over `[-bound, bound]`.
fn default_parameters(dimensions: usize, bound: f64) -> Vec<ParameterDescriptor> {
    (0..dimensions)
        .map(|i| ParameterDescriptor::double_range(format!("x{}", i), -bound, bound, 0.001))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            settings,
            objective,
        } => {
            let config = settings.resolve(objective.bound())?;
            run(&config, objective).await?;
        }
        Commands::Describe { settings } => {
            let config = settings.resolve(Objective::Sphere.bound())?;
            describe(&config)?;
        }
        Commands::Init { path, dimensions } => {
            init(&path, dimensions)?;
        }
    }

    Ok(())
}

async fn run(config: &SessionConfig, objective: Objective) -> Result<()> {
    let mut session = Session::new(config, config.connector(), ParameterStore::new())?;
    info!(
        "Optimizing {:?} with {} over {} parameters",
        objective,
        config.strategy.method,
        config.parameters.len()
    );

    let mut step = session.start().await?;
    let result = loop {
        match step {
            Step::Evaluate(_) => {
                let x = current_values(&session);
                step = session.finish(objective.evaluate(&x)).await?;
            }
            Step::Finished { result } => break result,
        }
    };

    let state = session.state();
    println!("Result: {}", result);
    println!(
        "Best fitness: {} after {} evaluations in {} generations",
        state.best_fitness, state.evaluations, state.generation
    );
    for (name, value) in session.sink().iter() {
        println!("  {} = {:?}", name, value);
    }

    Ok(())
}

/// Slot values of the live parameter set, in declaration order.
fn current_values<C: eva_session::Connector>(session: &Session<C, ParameterStore>) -> Vec<f64> {
    session
        .space()
        .descriptors()
        .iter()
        .filter_map(|descriptor| session.sink().get(&descriptor.name))
        .flat_map(|value| value.to_slots())
        .collect()
}

fn describe(config: &SessionConfig) -> Result<()> {
    let space = config.parameter_space()?;
    let mut strategy = Strategy::from_config(&config.strategy)?;
    let request = strategy.request(&space)?;

    let document: serde_json::Value = serde_json::from_str(&request.to_document()?)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn init(path: &Path, dimensions: usize) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    let config = SessionConfig {
        parameters: default_parameters(dimensions, Objective::Sphere.bound()),
        ..Default::default()
    };
    config.save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
