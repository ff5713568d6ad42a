//! Driver: flow past a cylinder in a channel
//!
//! cargo run --release -- --config run.json --steps 2000
use clap::Parser;
use log::{error, info, LevelFilter};
use rustipcs::config::{MeshSource, TentativeStrategy};
use rustipcs::{RunConfig, Simulation};
use std::path::PathBuf;
use std::str::FromStr;

/// Incremental pressure correction solver for channel flow
#[derive(Parser, Debug)]
#[command(name = "rustipcs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flow past a cylinder with the incremental pressure correction scheme", long_about = None)]
struct Cli {
    /// JSON run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gmsh (MSH 2.2) mesh instead of the built-in generator
    #[arg(short, long)]
    mesh: Option<PathBuf>,

    /// Mesh size of the built-in generator
    #[arg(long)]
    lcar: Option<f64>,

    /// Number of time steps
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Base output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fixed-point iteration of the convective term
    #[arg(long)]
    implicit: bool,

    /// Transport the density field
    #[arg(long)]
    transport: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(s).map_err(|_| format!("unknown log level '{}'", s))
}

impl Cli {
    fn run_config(&self) -> rustipcs::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(path) = &self.mesh {
            config.mesh = MeshSource::Gmsh { path: path.clone() };
        } else if let Some(lcar) = self.lcar {
            config.mesh = MeshSource::Channel { lcar };
        }
        if self.steps.is_some() {
            config.steps = self.steps;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.implicit {
            config.strategy = TentativeStrategy::Implicit {
                tolerance: 1e-6,
                max_iterations: 10,
            };
        }
        if self.transport {
            config.transport = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> rustipcs::Result<()> {
    let config = cli.run_config()?;
    let mut sim = Simulation::new(&config)?;
    info!("output: {:?}", sim.run_dir());
    let steps = sim.run()?;
    info!("finished after {} steps", steps);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new().filter_level(cli.log_level).init();

    if let Err(err) = run(&cli) {
        error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["rustipcs", "--log-level", "DEBUG"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Debug);
        let cli = Cli::try_parse_from(["rustipcs"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Info);
        assert!(Cli::try_parse_from(["rustipcs", "--log-level", "loud"]).is_err());
    }
}
