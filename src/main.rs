use std::path::PathBuf;

use clap::Parser;
use slog::{error, info, Logger};

use polarcheck::{
    config::StudyConfig,
    error::PolarError,
    geometry, logging,
    post_processor::{self, PolarFigure},
    solver::XFoil,
    surrogate::NeuralFoil,
    sweep,
};

/// Draws NeuralFoil and XFoil CL-CD polars of one airfoil across a Reynolds
/// number sweep
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON study file. Fields it leaves out keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Airfoil coordinate file in Selig format
    #[arg(long)]
    airfoil: Option<PathBuf>,

    /// Where to write the SVG figure
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding the nn-<size>.npz weight files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// XFoil executable
    #[arg(long)]
    xfoil: Option<PathBuf>,

    /// Write the figure without opening it
    #[arg(long)]
    no_show: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn study(&self) -> Result<StudyConfig, PolarError> {
        let mut config = match &self.config {
            Some(path) => StudyConfig::load(path)?,
            None => StudyConfig::default(),
        };

        if let Some(path) = &self.airfoil {
            config.airfoil = path.clone();
        }
        if let Some(path) = &self.output {
            config.output = path.clone();
        }
        if let Some(path) = &self.model_dir {
            config.model_dir = path.clone();
        }
        if let Some(path) = &self.xfoil {
            config.xfoil = path.clone();
        }
        if self.no_show {
            config.show = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args, logger: &Logger) -> Result<(), PolarError> {
    let config = args.study()?;

    let airfoil = geometry::load_coordinates(&config.airfoil)?;
    info!(logger, "loaded airfoil";
        "name" => &airfoil.name, "points" => airfoil.vertices.len());

    let surrogate = NeuralFoil::load(
        &config.model_dir,
        &[config.primary_model, config.secondary_model],
        logger,
    )?
    .with_transition(config.n_crit, config.xtr_upper, config.xtr_lower);

    let reference = XFoil::new(config.xfoil.clone(), logger)
        .with_max_iter(config.xfoil_max_iter)
        .with_n_crit(config.n_crit);

    let mut figure = PolarFigure::new(airfoil.clone(), config.y_min);
    sweep::run(&airfoil, &config, &surrogate, &reference, &mut figure, logger)?;

    figure.render(&config.output)?;
    info!(logger, "wrote figure"; "path" => %config.output.display());

    if config.show {
        post_processor::show(&config.output, logger);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    let logger = logging::build_logger(args.verbose);

    let code = match run(&args, &logger) {
        Ok(()) => 0,
        Err(err) => {
            error!(logger, "{}", err; "stage" => err.stage());
            1
        }
    };

    // flush the async drain before exiting
    drop(logger);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_study() {
        let args = Args::parse_from([
            "polarcheck",
            "--airfoil",
            "foils/naca0012.dat",
            "--output",
            "out.svg",
            "--no-show",
            "-vv",
        ]);
        assert_eq!(args.verbose, 2);

        let config = args.study().unwrap();
        assert_eq!(config.airfoil, PathBuf::from("foils/naca0012.dat"));
        assert_eq!(config.output, PathBuf::from("out.svg"));
        assert!(!config.show);
        assert_eq!(config.reynolds, StudyConfig::default().reynolds);
    }

    #[test]
    fn missing_study_file_is_input_error() {
        let args = Args::parse_from(["polarcheck", "--config", "/nonexistent/study.json"]);
        assert!(matches!(args.study(), Err(PolarError::Input(_))));
    }
}
