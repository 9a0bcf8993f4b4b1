use indicatif::{ProgressBar, ProgressStyle};
use slog::{debug, info, Logger};

use crate::{
    colors::Gradient,
    config::StudyConfig,
    datatypes::{AeroResult, Airfoil, Method},
    error::PolarError,
    format::eng_string,
    post_processor::{Curve, LineStyle, PolarFigure},
    solver::ReferenceSolver,
    surrogate::SurrogatePredictor,
};

/// `n` evenly spaced values from `start` to `stop`, both included
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// The two angle-of-attack grids of a study, in degrees
#[derive(Debug, Clone, PartialEq)]
pub struct AngleGrids {
    /// Coarse grid for the reference solver
    pub reference: Vec<f64>,
    /// Dense grid for the surrogate
    pub surrogate: Vec<f64>,
}

impl AngleGrids {
    pub fn from_config(config: &StudyConfig) -> AngleGrids {
        AngleGrids {
            reference: linspace(config.alpha_min, config.alpha_max, config.reference_points),
            surrogate: linspace(config.alpha_min, config.alpha_max, config.surrogate_points),
        }
    }
}

fn ensure_aligned(result: &AeroResult, grid: &[f64], method: Method, re: f64) -> Result<(), PolarError> {
    let lengths = [
        result.alpha.len(),
        result.cl.len(),
        result.cd.len(),
    ];
    if lengths.iter().all(|len| *len == grid.len()) {
        return Ok(());
    }

    let message = format!(
        "{} returned {} points at Re = {} for a {}-point angle grid",
        method.label(),
        result.cd.len().min(result.cl.len()),
        eng_string(re),
        grid.len()
    );
    Err(match method {
        Method::Reference => PolarError::Solver(message),
        Method::Surrogate(_) => PolarError::Surrogate(message),
    })
}

/// Runs every Reynolds number of the study through both services and adds
/// the resulting curves to `figure`, in sweep order.
///
/// # Arguments
/// * `airfoil` - The airfoil under test
/// * `config` - The study definition
/// * `surrogate` - Service producing the dashed and dotted curves
/// * `reference` - Service producing the solid curves
/// * `figure` - The figure accumulating curves
pub fn run(
    airfoil: &Airfoil,
    config: &StudyConfig,
    surrogate: &dyn SurrogatePredictor,
    reference: &dyn ReferenceSolver,
    figure: &mut PolarFigure,
    logger: &Logger,
) -> Result<(), PolarError> {
    let grids = AngleGrids::from_config(config);
    let colors = Gradient::reynolds().sample(config.reynolds.len());

    info!(logger, "starting sweep";
        "reynolds" => config.reynolds.len(),
        "reference_points" => grids.reference.len(),
        "surrogate_points" => grids.surrogate.len());

    let bar = ProgressBar::new(config.reynolds.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    let surrogate_runs = [
        (config.primary_model, LineStyle::Dashed),
        (config.secondary_model, LineStyle::Dotted),
    ];

    for (re, color) in std::iter::zip(&config.reynolds, colors) {
        let re = *re;
        bar.set_message(format!("Re = {}", eng_string(re)));

        for (size, style) in surrogate_runs {
            let method = Method::Surrogate(size);
            let start = std::time::Instant::now();
            let result = surrogate.predict(airfoil, &grids.surrogate, re, size)?;
            ensure_aligned(&result, &grids.surrogate, method, re)?;
            debug!(logger, "surrogate polar";
                "re" => re, "size" => size.as_str(),
                "seconds" => start.elapsed().as_secs_f64());

            figure.add_curve(Curve {
                re,
                method,
                style,
                color,
                result,
            });
        }

        let start = std::time::Instant::now();
        let result = reference.solve(airfoil, re, &grids.reference)?;
        ensure_aligned(&result, &grids.reference, Method::Reference, re)?;
        debug!(logger, "reference polar";
            "re" => re, "seconds" => start.elapsed().as_secs_f64());

        figure.add_curve(Curve {
            re,
            method: Method::Reference,
            style: LineStyle::Solid,
            color,
            result,
        });

        bar.inc(1);
    }
    bar.finish_with_message("done");

    info!(logger, "sweep complete"; "curves" => figure.curves().len());
    Ok(())
}
