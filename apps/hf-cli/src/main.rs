use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use hf_buck::{BuckError, RunConfig, RunMode, RunSummary};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "hf-cli")]
#[command(about = "Buck converter hybrid model - simulation and verified evolution", long_about = None)]
struct Cli {
    /// Which drivers to run
    #[arg(long, value_enum, default_value_t = ModeArg::Both)]
    mode: ModeArg,
    /// Directory receiving the plot artifacts (overrides the config file)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Run configuration YAML file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulator step size in seconds (overrides the config file)
    #[arg(long)]
    step_size: Option<f64>,
    /// 0 = errors only, 1 = warnings, 2 = info, 3 = debug, 4 = trace
    #[arg(long, default_value_t = 2)]
    verbosity: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Simulate,
    Evolve,
    Both,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Simulate => RunMode::Simulate,
            ModeArg::Evolve => RunMode::Evolve,
            ModeArg::Both => RunMode::Both,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Buck(#[from] BuckError),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(-1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level(cli.verbosity))
        .init();

    let config = load_config(&cli)?;
    let summary = hf_buck::run(&config, cli.mode.into())?;
    print_summary(&summary);
    Ok(())
}

fn level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn load_config(cli: &Cli) -> CliResult<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading run configuration");
            RunConfig::load_yaml(path)?
        }
        None => RunConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(step) = cli.step_size {
        config.simulation.step_size = step;
    }
    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    if let Some(trajectory) = &summary.simulation {
        println!(
            "✓ Simulation: {} points, {} events, t_end = {:.6e} s ({:.2} s)",
            trajectory.len(),
            trajectory.event_count(),
            trajectory.final_time(),
            summary.simulation_time_s
        );
    }
    if let Some(orbit) = &summary.evolution {
        println!(
            "✓ Evolution: {} reach enclosures, {} final, t_end = {:.6e} s ({:.2} s)",
            orbit.reach.len(),
            orbit.final_enclosures.len(),
            orbit.final_time(),
            summary.evolution_time_s
        );
    }
    for path in &summary.artifacts {
        println!("  {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_both_drivers() {
        let cli = Cli::try_parse_from(["hf-cli"]).unwrap();
        assert!(matches!(cli.mode, ModeArg::Both));
        assert_eq!(cli.verbosity, 2);
        let config = load_config(&cli).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "hf-cli",
            "--mode",
            "simulate",
            "--output-dir",
            "out",
            "--step-size",
            "1e-5",
        ])
        .unwrap();
        assert_eq!(RunMode::from(cli.mode), RunMode::Simulate);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.simulation.step_size, 1e-5);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["hf-cli", "--mode", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["hf-cli", "--step-size", "fast"]).is_err());
        let cli = Cli::try_parse_from(["hf-cli", "--step-size", "0"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn help_is_not_a_failure() {
        let err = Cli::try_parse_from(["hf-cli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
