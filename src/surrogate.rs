//! Neural-network surrogate for airfoil aerodynamics.
//!
//! The airfoil is reduced to Kulfan parameters, combined with the flow
//! condition into a 25-wide input row per angle of attack, and pushed through
//! a dense network. The network runs on the airfoil and on its mirror image,
//! and the two answers are averaged so that the prediction is exactly
//! antisymmetric in camber.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};
use ndarray::{Array, Dimension, Ix1, Ix2, OwnedRepr};
use ndarray_npy::NpzReader;
use serde::Deserialize;
use slog::{debug, Logger};

use crate::{
    datatypes::{AeroResult, Airfoil, KulfanParameters, ModelSize},
    error::PolarError,
    geometry, kulfan,
};

pub const N_INPUTS: usize = 25;
/// confidence, CL, CD, CM, top transition, bottom transition
pub const N_DECODED_OUTPUTS: usize = 6;
pub const N_POINTS_PER_SIDE: usize = 200;
/// Weight file extensions tried for each model size, in order
pub const WEIGHT_EXTENSIONS: [&str; 2] = ["npz", "json"];

/// Produces aerodynamic coefficients without solving the flow
pub trait SurrogatePredictor {
    fn predict(
        &self,
        airfoil: &Airfoil,
        alphas: &[f64],
        re: f64,
        size: ModelSize,
    ) -> Result<AeroResult, PolarError>;
}

#[derive(Debug, Deserialize)]
struct LayerWeights {
    /// `out x in`
    weight: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct NetworkWeights {
    layers: Vec<LayerWeights>,
}

/// A dense network with swish activations between layers
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<(DMatrix<f64>, DVector<f64>)>,
}

fn swish(x: f64) -> f64 {
    x * sigmoid(x)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Network {
    /// Builds a network from `(weight, bias)` pairs, checking that the layer
    /// shapes chain together.
    pub fn new(layers: Vec<(DMatrix<f64>, DVector<f64>)>) -> Result<Network, PolarError> {
        if layers.is_empty() {
            return Err(PolarError::Surrogate("Network has no layers".to_owned()));
        }

        let mut width = N_INPUTS;
        for (i, (weight, bias)) in layers.iter().enumerate() {
            if weight.ncols() != width {
                return Err(PolarError::Surrogate(format!(
                    "Layer {i} expects {} inputs but receives {width}",
                    weight.ncols()
                )));
            }
            if bias.len() != weight.nrows() {
                return Err(PolarError::Surrogate(format!(
                    "Layer {i} has {} outputs but {} biases",
                    weight.nrows(),
                    bias.len()
                )));
            }
            width = weight.nrows();
        }

        if width < N_DECODED_OUTPUTS {
            return Err(PolarError::Surrogate(format!(
                "Network produces {width} outputs; at least {N_DECODED_OUTPUTS} are required"
            )));
        }

        Ok(Network { layers })
    }

    /// Parses the JSON weights format
    pub fn from_json(text: &str) -> Result<Network, PolarError> {
        let weights: NetworkWeights = match serde_json::from_str(text) {
            Ok(w) => w,
            Err(err) => {
                return Err(PolarError::Surrogate(format!(
                    "Malformed network weights: {err}"
                )))
            }
        };

        let mut layers = Vec::with_capacity(weights.layers.len());
        for (i, layer) in weights.layers.into_iter().enumerate() {
            let rows = layer.weight.len();
            let cols = layer.weight.first().map_or(0, |r| r.len());
            if layer.weight.iter().any(|r| r.len() != cols) {
                return Err(PolarError::Surrogate(format!(
                    "Layer {i} weight matrix is ragged"
                )));
            }
            let weight = DMatrix::from_row_iterator(rows, cols, layer.weight.into_iter().flatten());
            layers.push((weight, DVector::from_vec(layer.bias)));
        }

        Network::new(layers)
    }

    /// Reads a NeuralFoil weights archive. Layers are stored as
    /// `net.<i>.weight` (`out x in`) and `net.<i>.bias`, applied in order of
    /// increasing `i`; other arrays in the archive are ignored.
    pub fn from_npz(path: &Path) -> Result<Network, PolarError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                return Err(PolarError::Surrogate(format!(
                    "Unable to open network weights {}: {err}",
                    path.display()
                )))
            }
        };
        let mut npz = match NpzReader::new(file) {
            Ok(r) => r,
            Err(err) => {
                return Err(PolarError::Surrogate(format!(
                    "Malformed weights archive {}: {err}",
                    path.display()
                )))
            }
        };
        let names = match npz.names() {
            Ok(n) => n,
            Err(err) => {
                return Err(PolarError::Surrogate(format!(
                    "Malformed weights archive {}: {err}",
                    path.display()
                )))
            }
        };

        let mut indices: Vec<usize> = names.iter().filter_map(|n| layer_index(n)).collect();
        indices.sort_unstable();
        indices.dedup();

        let mut layers = Vec::with_capacity(indices.len());
        for i in indices {
            let weight_name = archive_entry(&names, &format!("net.{i}.weight"))?;
            let bias_name = archive_entry(&names, &format!("net.{i}.bias"))?;
            let weight = read_array::<Ix2>(&mut npz, weight_name)?;
            let bias = read_array::<Ix1>(&mut npz, bias_name)?;

            let (rows, cols) = weight.dim();
            layers.push((
                DMatrix::from_row_iterator(rows, cols, weight.iter().copied()),
                DVector::from_iterator(bias.len(), bias.iter().copied()),
            ));
        }

        Network::new(layers)
    }

    /// Loads a weights file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Network, PolarError> {
        if path.extension().is_some_and(|ext| ext == "npz") {
            return Network::from_npz(path);
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(err) => {
                return Err(PolarError::Surrogate(format!(
                    "Unable to open network weights {}: {err}",
                    path.display()
                )))
            }
        };
        Network::from_json(&text)
    }

    /// Evaluates the network on each row of `x` (`n x N_INPUTS`)
    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut h = x.clone();
        for (i, (weight, bias)) in self.layers.iter().enumerate() {
            if i > 0 {
                h.apply(|v| *v = swish(*v));
            }
            h = &h * weight.transpose();
            let bias_row = bias.transpose();
            for mut row in h.row_iter_mut() {
                row += &bias_row;
            }
        }
        h
    }
}

/// Layer index of a `net.<i>.weight` or `net.<i>.bias` entry
fn layer_index(name: &str) -> Option<usize> {
    let stem = name.strip_suffix(".npy").unwrap_or(name);
    let (index, kind) = stem.strip_prefix("net.")?.split_once('.')?;
    match kind {
        "weight" | "bias" => index.parse().ok(),
        _ => None,
    }
}

fn archive_entry<'a>(names: &'a [String], key: &str) -> Result<&'a str, PolarError> {
    match names
        .iter()
        .find(|n| n.strip_suffix(".npy").unwrap_or(n.as_str()) == key)
    {
        Some(n) => Ok(n.as_str()),
        None => Err(PolarError::Surrogate(format!(
            "Weights archive is missing {key}"
        ))),
    }
}

/// Reads an array stored as either `f64` or `f32`
fn read_array<D: Dimension>(
    npz: &mut NpzReader<File>,
    name: &str,
) -> Result<Array<f64, D>, PolarError> {
    if let Ok(array) = npz.by_name::<OwnedRepr<f64>, D>(name) {
        return Ok(array);
    }
    match npz.by_name::<OwnedRepr<f32>, D>(name) {
        Ok(array) => Ok(array.mapv(f64::from)),
        Err(err) => Err(PolarError::Surrogate(format!(
            "Unable to read {name} from network weights: {err}"
        ))),
    }
}

/// Network input rows, one per angle of attack
pub fn build_inputs(
    params: &KulfanParameters,
    alphas: &[f64],
    re: f64,
    n_crit: f64,
    xtr_upper: f64,
    xtr_lower: f64,
) -> DMatrix<f64> {
    let mut x: DMatrix<f64> = DMatrix::zeros(alphas.len(), N_INPUTS);
    let re_input = (re.ln() - 12.5) / 3.5;
    let n_crit_input = (n_crit - 9.0) / 4.5;

    for (i, alpha) in alphas.iter().enumerate() {
        let alpha = wrap_alpha(*alpha).to_radians();
        for j in 0..8 {
            x[(i, j)] = params.upper_weights[j];
            x[(i, 8 + j)] = params.lower_weights[j];
        }
        x[(i, 16)] = params.leading_edge_weight;
        x[(i, 17)] = params.te_thickness * 50.0;
        x[(i, 18)] = (2.0 * alpha).sin();
        x[(i, 19)] = alpha.cos();
        x[(i, 20)] = 1.0 - alpha.cos().powi(2);
        x[(i, 21)] = re_input;
        x[(i, 22)] = n_crit_input;
        x[(i, 23)] = xtr_upper;
        x[(i, 24)] = xtr_lower;
    }
    x
}

/// Wraps an angle in degrees into [-180, 180)
pub fn wrap_alpha(alpha: f64) -> f64 {
    (alpha + 180.0).rem_euclid(360.0) - 180.0
}

/// Input rows for the airfoil reflected about its chord line
fn mirror_inputs(x: &DMatrix<f64>) -> DMatrix<f64> {
    let mut mirrored = x.clone();
    for mut row in mirrored.row_iter_mut() {
        for j in 0..8 {
            let upper = row[j];
            row[j] = -row[8 + j];
            row[8 + j] = -upper;
        }
        row[16] = -row[16];
        row[18] = -row[18];
        row.swap_columns(23, 24);
    }
    mirrored
}

fn decode(y: &DMatrix<f64>, y_mirrored: &DMatrix<f64>, alphas: &[f64]) -> AeroResult {
    let n = alphas.len();
    let mut result = AeroResult {
        alpha: alphas.to_vec(),
        cl: Vec::with_capacity(n),
        cd: Vec::with_capacity(n),
        cm: Vec::with_capacity(n),
        top_xtr: Vec::with_capacity(n),
        bot_xtr: Vec::with_capacity(n),
        confidence: Some(Vec::with_capacity(n)),
    };

    for i in 0..n {
        let fused = |own: f64, unmirrored: f64| 0.5 * (own + unmirrored);

        let confidence = fused(y[(i, 0)], y_mirrored[(i, 0)]);
        let cl = fused(y[(i, 1)], -y_mirrored[(i, 1)]);
        let cd = fused(y[(i, 2)], y_mirrored[(i, 2)]);
        let cm = fused(y[(i, 3)], -y_mirrored[(i, 3)]);
        let top_xtr = fused(y[(i, 4)], y_mirrored[(i, 5)]);
        let bot_xtr = fused(y[(i, 5)], y_mirrored[(i, 4)]);

        if let Some(c) = result.confidence.as_mut() {
            c.push(sigmoid(confidence));
        }
        result.cl.push(cl / 2.0);
        result.cd.push(((cd - 2.0) * 2.0).exp());
        result.cm.push(cm / 20.0);
        result.top_xtr.push(top_xtr.clamp(0.0, 1.0));
        result.bot_xtr.push(bot_xtr.clamp(0.0, 1.0));
    }

    result
}

/// NeuralFoil-style predictor backed by a directory of `nn-<size>.npz`
/// weight files.
pub struct NeuralFoil {
    networks: HashMap<ModelSize, Network>,
    pub n_crit: f64,
    pub xtr_upper: f64,
    pub xtr_lower: f64,
    /// Kulfan parameters of the last airfoil seen by `predict`
    fitted: RefCell<Option<(Airfoil, KulfanParameters)>>,
    logger: Logger,
}

impl NeuralFoil {
    /// Loads the networks for each requested size from `model_dir`
    pub fn load(
        model_dir: &Path,
        sizes: &[ModelSize],
        logger: &Logger,
    ) -> Result<NeuralFoil, PolarError> {
        let mut networks = HashMap::new();
        for size in sizes {
            let path = weights_path(model_dir, *size)?;
            debug!(logger, "loading network weights"; "size" => size.as_str(), "path" => %path.display());
            networks.insert(*size, Network::load(&path)?);
        }
        Ok(NeuralFoil::from_networks(networks, logger))
    }

    pub fn from_networks(networks: HashMap<ModelSize, Network>, logger: &Logger) -> NeuralFoil {
        NeuralFoil {
            networks,
            n_crit: 9.0,
            xtr_upper: 1.0,
            xtr_lower: 1.0,
            fitted: RefCell::new(None),
            logger: logger.new(slog::o!("service" => "surrogate")),
        }
    }

    pub fn with_transition(mut self, n_crit: f64, xtr_upper: f64, xtr_lower: f64) -> NeuralFoil {
        self.n_crit = n_crit;
        self.xtr_upper = xtr_upper;
        self.xtr_lower = xtr_lower;
        self
    }

    /// Kulfan parameters for `airfoil`, reusing the previous fit when the
    /// geometry is unchanged
    pub fn kulfan_parameters(&self, airfoil: &Airfoil) -> Result<KulfanParameters, PolarError> {
        if let Some((cached, params)) = self.fitted.borrow().as_ref() {
            if cached == airfoil {
                return Ok(params.clone());
            }
        }

        let prepared = geometry::repanel(&geometry::normalize(airfoil)?, N_POINTS_PER_SIDE)?;
        let params = kulfan::fit(&prepared, kulfan::N_WEIGHTS_PER_SIDE)?;
        debug!(self.logger, "fitted kulfan parameters";
            "airfoil" => &airfoil.name,
            "le_weight" => params.leading_edge_weight,
            "te_thickness" => params.te_thickness);

        *self.fitted.borrow_mut() = Some((airfoil.clone(), params.clone()));
        Ok(params)
    }

    pub fn predict_from_kulfan(
        &self,
        params: &KulfanParameters,
        alphas: &[f64],
        re: f64,
        size: ModelSize,
    ) -> Result<AeroResult, PolarError> {
        let network = match self.networks.get(&size) {
            Some(n) => n,
            None => {
                return Err(PolarError::Surrogate(format!(
                    "No network loaded for model size {size}"
                )))
            }
        };
        if !(re.is_finite() && re > 0.0) {
            return Err(PolarError::Surrogate(format!(
                "Reynolds number must be positive, got {re}"
            )));
        }
        if params.upper_weights.len() != 8 || params.lower_weights.len() != 8 {
            return Err(PolarError::Surrogate(
                "Surrogate expects 8 Kulfan weights per side".to_owned(),
            ));
        }

        let x = build_inputs(
            params,
            alphas,
            re,
            self.n_crit,
            self.xtr_upper,
            self.xtr_lower,
        );
        let y = network.forward(&x);
        let y_mirrored = network.forward(&mirror_inputs(&x));

        Ok(decode(&y, &y_mirrored, alphas))
    }
}

impl SurrogatePredictor for NeuralFoil {
    fn predict(
        &self,
        airfoil: &Airfoil,
        alphas: &[f64],
        re: f64,
        size: ModelSize,
    ) -> Result<AeroResult, PolarError> {
        let params = self.kulfan_parameters(airfoil)?;
        self.predict_from_kulfan(&params, alphas, re, size)
    }
}

/// First existing `nn-<size>.<ext>` in `model_dir`, trying
/// [`WEIGHT_EXTENSIONS`] in order
pub fn weights_path(model_dir: &Path, size: ModelSize) -> Result<PathBuf, PolarError> {
    for ext in WEIGHT_EXTENSIONS {
        let path = model_dir.join(format!("nn-{}.{ext}", size.as_str()));
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(PolarError::Surrogate(format!(
        "No weights for model size {size} in {} (expected nn-{size}.npz or nn-{size}.json)",
        model_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 25 -> 4 -> 6 network with deterministic, asymmetric weights
    fn small_network() -> Network {
        let w0 = DMatrix::from_fn(4, N_INPUTS, |r, c| ((r * 7 + c * 3) % 11) as f64 / 10.0 - 0.5);
        let b0 = DVector::from_vec(vec![0.1, -0.2, 0.05, 0.3]);
        let w1 = DMatrix::from_fn(6, 4, |r, c| ((r * 5 + c * 2) % 7) as f64 / 5.0 - 0.6);
        let b1 = DVector::from_vec(vec![0.0, 0.1, -0.4, 0.0, 0.5, 0.5]);
        Network::new(vec![(w0, b0), (w1, b1)]).unwrap()
    }

    fn predictor() -> NeuralFoil {
        let mut networks = HashMap::new();
        networks.insert(ModelSize::Medium, small_network());
        NeuralFoil::from_networks(networks, &crate::logging::discard())
    }

    fn symmetric_params() -> KulfanParameters {
        let upper = vec![0.15, 0.18, 0.2, 0.19, 0.17, 0.16, 0.14, 0.13];
        KulfanParameters {
            lower_weights: upper.iter().map(|w| -w).collect(),
            upper_weights: upper,
            leading_edge_weight: 0.0,
            te_thickness: 0.002,
        }
    }

    #[test]
    fn swish_and_sigmoid() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert_abs_diff_eq!(swish(0.0), 0.0);
        assert_abs_diff_eq!(swish(2.0), 2.0 / (1.0 + (-2.0_f64).exp()), epsilon = 1e-15);
    }

    #[test]
    fn wraps_alpha_into_half_open_interval() {
        assert_abs_diff_eq!(wrap_alpha(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_alpha(-185.0), 175.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_alpha(180.0), -180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_alpha(12.5), 12.5, epsilon = 1e-12);
    }

    #[test]
    fn inputs_encode_flow_condition() {
        let x = build_inputs(&symmetric_params(), &[0.0, 90.0], 1e6, 9.0, 1.0, 0.5);
        assert_eq!(x.shape(), (2, N_INPUTS));
        assert_abs_diff_eq!(x[(0, 17)], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(0, 19)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(1, 20)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(0, 21)], (1e6_f64.ln() - 12.5) / 3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(0, 22)], 0.0);
        assert_abs_diff_eq!(x[(0, 24)], 0.5);
    }

    #[test]
    fn mirroring_twice_is_identity() {
        let x = build_inputs(&symmetric_params(), &[-3.0, 7.0], 1e5, 9.0, 0.9, 0.4);
        let twice = mirror_inputs(&mirror_inputs(&x));
        assert_eq!(x, twice);
        assert_eq!(mirror_inputs(&x)[(0, 23)], 0.4);
    }

    #[test]
    fn result_is_aligned_with_alpha_grid() {
        let alphas: Vec<f64> = (0..37).map(|i| -5.0 + i as f64 * 0.5).collect();
        let result = predictor()
            .predict_from_kulfan(&symmetric_params(), &alphas, 1e5, ModelSize::Medium)
            .unwrap();
        assert_eq!(result.len(), alphas.len());
        assert_eq!(result.cl.len(), alphas.len());
        assert_eq!(result.cd.len(), alphas.len());
        assert!(result.cd.iter().all(|cd| *cd > 0.0));
        let confidence = result.confidence.unwrap();
        assert!(confidence.iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn symmetric_airfoil_gives_antisymmetric_lift() {
        let result = predictor()
            .predict_from_kulfan(&symmetric_params(), &[-4.0, 0.0, 4.0], 1e6, ModelSize::Medium)
            .unwrap();
        assert_abs_diff_eq!(result.cl[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.cl[0], -result.cl[2], epsilon = 1e-12);
        assert_abs_diff_eq!(result.cd[0], result.cd[2], epsilon = 1e-12);
    }

    #[test]
    fn missing_size_is_an_error() {
        let err = predictor()
            .predict_from_kulfan(&symmetric_params(), &[0.0], 1e6, ModelSize::Xxxlarge)
            .unwrap_err();
        assert!(matches!(err, PolarError::Surrogate(msg) if msg.contains("xxxlarge")));
    }

    #[test]
    fn parses_json_weights() {
        let row = vec![0.01; N_INPUTS];
        let layer0 = serde_json::json!({ "weight": vec![row; 6], "bias": vec![0.0; 6] });
        let text = serde_json::json!({ "layers": [layer0] }).to_string();
        let network = Network::from_json(&text).unwrap();
        let y = network.forward(&DMatrix::from_element(3, N_INPUTS, 1.0));
        assert_eq!(y.shape(), (3, 6));
        assert_abs_diff_eq!(y[(2, 5)], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn rejects_mismatched_layers() {
        let text = serde_json::json!({
            "layers": [
                { "weight": vec![vec![0.0; N_INPUTS]; 4], "bias": vec![0.0; 4] },
                { "weight": vec![vec![0.0; 3]; 6], "bias": vec![0.0; 6] }
            ]
        })
        .to_string();
        let err = Network::from_json(&text).unwrap_err();
        assert!(matches!(err, PolarError::Surrogate(msg) if msg.contains("Layer 1")));

        assert!(Network::from_json("{\"layers\": 3}").is_err());
    }

    #[test]
    fn predicts_from_airfoil_geometry() {
        let airfoil = kulfan::coordinates("sym", &symmetric_params(), 60);
        let result = predictor()
            .predict(&airfoil, &[0.0, 2.0], 1e5, ModelSize::Medium)
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_abs_diff_eq!(result.cl[0], 0.0, epsilon = 1e-6);
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("polarcheck-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Writes `small_network` the way NeuralFoil ships its weights
    fn write_npz(path: &Path, single_precision: bool) {
        use ndarray::{Array1, Array2};
        use ndarray_npy::NpzWriter;

        let mut npz = NpzWriter::new(File::create(path).unwrap());
        for (i, (weight, bias)) in small_network().layers.iter().enumerate() {
            let w = Array2::from_shape_fn((weight.nrows(), weight.ncols()), |(r, c)| weight[(r, c)]);
            let b = Array1::from_iter(bias.iter().copied());
            if single_precision {
                npz.add_array(format!("net.{i}.weight"), &w.mapv(|v| v as f32)).unwrap();
                npz.add_array(format!("net.{i}.bias"), &b.mapv(|v| v as f32)).unwrap();
            } else {
                npz.add_array(format!("net.{i}.weight"), &w).unwrap();
                npz.add_array(format!("net.{i}.bias"), &b).unwrap();
            }
        }
        npz.add_array("scaled_input_bounds", &Array1::from_vec(vec![0.0_f64, 1.0])).unwrap();
        npz.finish().unwrap();
    }

    #[test]
    fn parses_npz_weights() {
        let dir = scratch_dir("npz");
        let x = build_inputs(&symmetric_params(), &[-2.0, 5.0], 1e6, 9.0, 1.0, 1.0);
        let expected = small_network().forward(&x);

        let path = dir.join("nn-medium.npz");
        write_npz(&path, false);
        let network = Network::load(&path).unwrap();
        assert_eq!(network.layers.len(), 2);
        assert_abs_diff_eq!(network.forward(&x), expected, epsilon = 1e-12);

        let single = dir.join("nn-small.npz");
        write_npz(&single, true);
        let network = Network::from_npz(&single).unwrap();
        assert_abs_diff_eq!(network.forward(&x), expected, epsilon = 1e-5);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn layer_names_follow_archive_convention() {
        assert_eq!(layer_index("net.0.weight"), Some(0));
        assert_eq!(layer_index("net.12.bias.npy"), Some(12));
        assert_eq!(layer_index("net.3.running_mean"), None);
        assert_eq!(layer_index("scaled_input_bounds"), None);

        let names = vec!["net.0.weight.npy".to_owned()];
        assert_eq!(archive_entry(&names, "net.0.weight").unwrap(), "net.0.weight.npy");
        assert!(archive_entry(&names, "net.0.bias").is_err());
    }

    #[test]
    fn weight_lookup_prefers_npz() {
        let dir = scratch_dir("lookup");
        let json = serde_json::json!({ "layers": [{
            "weight": vec![vec![0.0; N_INPUTS]; 6],
            "bias": vec![0.0; 6]
        }] });
        std::fs::write(dir.join("nn-large.json"), json.to_string()).unwrap();
        write_npz(&dir.join("nn-medium.npz"), false);
        std::fs::write(dir.join("nn-medium.json"), json.to_string()).unwrap();

        assert_eq!(
            weights_path(&dir, ModelSize::Medium).unwrap(),
            dir.join("nn-medium.npz")
        );
        assert_eq!(
            weights_path(&dir, ModelSize::Large).unwrap(),
            dir.join("nn-large.json")
        );
        let missing = weights_path(&dir, ModelSize::Xlarge).unwrap_err();
        assert!(matches!(missing, PolarError::Surrogate(msg) if msg.contains("nn-xlarge.npz")));

        let neuralfoil = NeuralFoil::load(
            &dir,
            &[ModelSize::Medium, ModelSize::Large],
            &crate::logging::discard(),
        )
        .unwrap();
        assert_eq!(neuralfoil.networks[&ModelSize::Medium].layers.len(), 2);
        assert_eq!(neuralfoil.networks[&ModelSize::Large].layers.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn airfoil_is_fitted_once() {
        let neuralfoil = predictor();
        let airfoil = kulfan::coordinates("sym", &symmetric_params(), 60);
        let mut seeded = symmetric_params();
        seeded.leading_edge_weight = 0.3;
        *neuralfoil.fitted.borrow_mut() = Some((airfoil.clone(), seeded.clone()));

        let alphas = [0.0, 4.0];
        let predicted = neuralfoil
            .predict(&airfoil, &alphas, 1e6, ModelSize::Medium)
            .unwrap();
        let from_seeded = neuralfoil
            .predict_from_kulfan(&seeded, &alphas, 1e6, ModelSize::Medium)
            .unwrap();
        assert_eq!(predicted, from_seeded);

        let other = kulfan::coordinates("other", &symmetric_params(), 40);
        let params = neuralfoil.kulfan_parameters(&other).unwrap();
        assert!((params.leading_edge_weight - seeded.leading_edge_weight).abs() > 0.1);
        let cached = neuralfoil.fitted.borrow();
        assert_eq!(cached.as_ref().map(|(a, _)| a.name.as_str()), Some("other"));
    }
}
