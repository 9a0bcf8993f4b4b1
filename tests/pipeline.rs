use std::collections::HashMap;
use std::path::PathBuf;

use nalgebra::{DMatrix, DVector};

use polarcheck::{
    config::StudyConfig,
    datatypes::{AeroResult, Airfoil, ModelSize},
    error::PolarError,
    geometry, kulfan, logging,
    post_processor::{LineStyle, PolarFigure},
    solver::ReferenceSolver,
    surrogate::{self, NeuralFoil, Network, SurrogatePredictor},
    sweep,
};

fn hale_03() -> Airfoil {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/HALE_03.dat");
    geometry::load_coordinates(&path).unwrap()
}

/// Small network with fixed weights, wide enough for every decoded output
fn network(seed: f64) -> Network {
    let hidden = 5;
    let w1 = DMatrix::from_fn(hidden, surrogate::N_INPUTS, |i, j| {
        0.05 * ((seed + i as f64 * 1.3 + j as f64 * 0.7).sin())
    });
    let b1 = DVector::from_fn(hidden, |i, _| 0.01 * i as f64);
    let w2 = DMatrix::from_fn(surrogate::N_DECODED_OUTPUTS, hidden, |i, j| {
        0.1 * ((seed * 0.5 + i as f64 - j as f64 * 0.4).cos())
    });
    let b2 = DVector::zeros(surrogate::N_DECODED_OUTPUTS);
    Network::new(vec![(w1, b1), (w2, b2)]).unwrap()
}

/// Stands in for XFoil with a parabolic drag polar
struct ParabolicSolver;

impl ReferenceSolver for ParabolicSolver {
    fn solve(&self, _airfoil: &Airfoil, re: f64, alphas: &[f64]) -> Result<AeroResult, PolarError> {
        let cd0 = 0.05 * re.powf(-0.2);
        Ok(AeroResult {
            alpha: alphas.to_vec(),
            cl: alphas.iter().map(|a| 0.4 + 0.1 * a).collect(),
            cd: alphas
                .iter()
                .map(|a| cd0 + 0.01 * (0.4 + 0.1 * a).powi(2))
                .collect(),
            cm: vec![-0.1; alphas.len()],
            top_xtr: vec![0.5; alphas.len()],
            bot_xtr: vec![1.0; alphas.len()],
            confidence: None,
        })
    }
}

#[test]
fn bundled_airfoil_fits_kulfan_parameters() {
    let airfoil = hale_03();
    assert_eq!(airfoil.name, "HALE_03 (CST stand-in)");

    let prepared = geometry::repanel(
        &geometry::normalize(&airfoil).unwrap(),
        surrogate::N_POINTS_PER_SIDE,
    )
    .unwrap();
    let params = kulfan::fit(&prepared, kulfan::N_WEIGHTS_PER_SIDE).unwrap();

    assert_eq!(params.upper_weights.len(), 8);
    assert_eq!(params.lower_weights.len(), 8);
    assert!((params.te_thickness - 0.0015).abs() < 3e-4);
}

#[test]
fn surrogate_predicts_on_bundled_airfoil() {
    let networks = HashMap::from([
        (ModelSize::Xxxlarge, network(0.3)),
        (ModelSize::Medium, network(1.7)),
    ]);
    let neuralfoil = NeuralFoil::from_networks(networks, &logging::discard());
    let alphas = sweep::linspace(-5.0, 15.0, 40);

    let result = neuralfoil
        .predict(&hale_03(), &alphas, 1e6, ModelSize::Xxxlarge)
        .unwrap();
    assert_eq!(result.len(), 40);
    assert!(result.cd.iter().all(|cd| *cd > 0.0 && cd.is_finite()));
    assert!(result.cl.iter().all(|cl| cl.is_finite()));
    let confidence = result.confidence.unwrap();
    assert!(confidence.iter().all(|c| (0.0..=1.0).contains(c)));

    let missing = neuralfoil.predict(&hale_03(), &alphas, 1e6, ModelSize::Small);
    assert!(matches!(missing, Err(PolarError::Surrogate(_))));
}

#[test]
fn full_sweep_renders_figure() {
    let config = StudyConfig::default();
    let airfoil = hale_03();
    let networks = HashMap::from([
        (config.primary_model, network(0.3)),
        (config.secondary_model, network(1.7)),
    ]);
    let neuralfoil = NeuralFoil::from_networks(networks, &logging::discard());

    let mut figure = PolarFigure::new(airfoil.clone(), config.y_min);
    sweep::run(
        &airfoil,
        &config,
        &neuralfoil,
        &ParabolicSolver,
        &mut figure,
        &logging::discard(),
    )
    .unwrap();

    let curves = figure.curves();
    assert_eq!(curves.len(), 3 * config.reynolds.len());
    for (i, re) in config.reynolds.iter().enumerate() {
        let group = &curves[3 * i..3 * i + 3];
        assert!(group.iter().all(|c| c.re == *re));
        assert_eq!(group[0].style, LineStyle::Dashed);
        assert_eq!(group[0].result.len(), 1000);
        assert_eq!(group[1].style, LineStyle::Dotted);
        assert_eq!(group[2].style, LineStyle::Solid);
        assert_eq!(group[2].result.len(), 50);
    }

    let path = std::env::temp_dir().join(format!(
        "polarcheck-pipeline-{}.svg",
        std::process::id()
    ));
    figure.render(&path).unwrap();
    let svg = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    for label in ["Re = 10k", "Re = 100k", "Re = 1M", "Re = 10M", "Re = 100M"] {
        assert!(svg.contains(label), "missing annotation {label}");
    }
    assert!(svg.contains("HALE_03 (CST stand-in) Airfoil"));
}
