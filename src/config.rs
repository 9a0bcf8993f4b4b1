//! Study configuration.
//!
//! `StudyConfig::default()` is the fixed validation study: the bundled
//! HALE_03 airfoil, five Reynolds numbers from 1e4 to 1e8, and angles from -5
//! to 15 degrees. A JSON study file may override any field:
//!
//! ```json
//! {
//!     "airfoil": "assets/HALE_03.dat",
//!     "reynolds": [1e4, 1e5, 1e6, 1e7, 1e8],
//!     "alpha": { "min": -5, "max": 15, "reference_points": 50, "surrogate_points": 1000 },
//!     "surrogate": { "model_dir": "models", "primary": "xxxlarge", "secondary": "medium",
//!                    "n_crit": 9, "xtr_upper": 1, "xtr_lower": 1 },
//!     "xfoil": { "executable": "xfoil", "max_iter": 100 },
//!     "plot": { "output": "neuralfoil_point_validation.svg", "y_min": -0.8, "show": true }
//! }
//! ```

use std::path::{Path, PathBuf};

use json::JsonValue;

use crate::{datatypes::ModelSize, error::PolarError};

#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    pub airfoil: PathBuf,
    pub reynolds: Vec<f64>,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub reference_points: usize,
    pub surrogate_points: usize,
    pub model_dir: PathBuf,
    /// Drawn dashed
    pub primary_model: ModelSize,
    /// Drawn dotted
    pub secondary_model: ModelSize,
    pub n_crit: f64,
    pub xtr_upper: f64,
    pub xtr_lower: f64,
    pub xfoil: PathBuf,
    pub xfoil_max_iter: u32,
    pub output: PathBuf,
    pub y_min: f64,
    pub show: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        StudyConfig {
            airfoil: PathBuf::from("assets/HALE_03.dat"),
            reynolds: vec![1e4, 1e5, 1e6, 1e7, 1e8],
            alpha_min: -5.0,
            alpha_max: 15.0,
            reference_points: 50,
            surrogate_points: 1000,
            model_dir: PathBuf::from("models"),
            primary_model: ModelSize::Xxxlarge,
            secondary_model: ModelSize::Medium,
            n_crit: 9.0,
            xtr_upper: 1.0,
            xtr_lower: 1.0,
            xfoil: PathBuf::from("xfoil"),
            xfoil_max_iter: 100,
            output: PathBuf::from("neuralfoil_point_validation.svg"),
            y_min: -0.8,
            show: true,
        }
    }
}

const SECTIONS: [(&str, &[&str]); 6] = [
    ("airfoil", &[]),
    ("reynolds", &[]),
    ("alpha", &["min", "max", "reference_points", "surrogate_points"]),
    (
        "surrogate",
        &["model_dir", "primary", "secondary", "n_crit", "xtr_upper", "xtr_lower"],
    ),
    ("xfoil", &["executable", "max_iter"]),
    ("plot", &["output", "y_min", "show"]),
];

impl StudyConfig {
    /// Loads a study file on top of the defaults
    ///
    /// # Arguments
    /// * `path` - The path to the JSON study file
    pub fn load(path: &Path) -> Result<StudyConfig, PolarError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(err) => {
                return Err(PolarError::Input(format!(
                    "Unable to open study file {}: {err}",
                    path.display()
                )))
            }
        };
        StudyConfig::from_json(&text)
    }

    /// Parses a study file. Unknown keys are rejected so typos do not pass
    /// silently.
    pub fn from_json(text: &str) -> Result<StudyConfig, PolarError> {
        let root = match json::parse(text) {
            Ok(j) => j,
            Err(err) => {
                return Err(PolarError::Input(format!(
                    "Error in study file json: {err}"
                )))
            }
        };
        if !root.is_object() {
            return Err(PolarError::Input(
                "Study file must be a JSON object".to_owned(),
            ));
        }

        for (key, value) in root.entries() {
            let fields = match SECTIONS.iter().find(|(name, _)| *name == key) {
                Some((_, fields)) => fields,
                None => {
                    return Err(PolarError::Input(format!(
                        "Unknown key '{key}' in study file"
                    )))
                }
            };
            if fields.is_empty() {
                continue;
            }
            if !value.is_object() {
                return Err(PolarError::Input(format!(
                    "Section '{key}' must be an object"
                )));
            }
            for (field, _) in value.entries() {
                if !fields.contains(&field) {
                    return Err(PolarError::Input(format!(
                        "Unknown key '{key}.{field}' in study file"
                    )));
                }
            }
        }

        let mut config = StudyConfig::default();

        if let Some(path) = opt_str(&root["airfoil"], "airfoil")? {
            config.airfoil = PathBuf::from(path);
        }
        if root.has_key("reynolds") {
            if !root["reynolds"].is_array() {
                return Err(PolarError::Input("reynolds must be an array".to_owned()));
            }
            let mut reynolds = Vec::new();
            for (i, re) in root["reynolds"].members().enumerate() {
                match re.as_f64() {
                    Some(v) => reynolds.push(v),
                    None => {
                        return Err(PolarError::Input(format!(
                            "Bad value for reynolds[{i}]"
                        )))
                    }
                }
            }
            config.reynolds = reynolds;
        }

        let alpha = &root["alpha"];
        if let Some(v) = opt_f64(&alpha["min"], "alpha.min")? {
            config.alpha_min = v;
        }
        if let Some(v) = opt_f64(&alpha["max"], "alpha.max")? {
            config.alpha_max = v;
        }
        if let Some(v) = opt_usize(&alpha["reference_points"], "alpha.reference_points")? {
            config.reference_points = v;
        }
        if let Some(v) = opt_usize(&alpha["surrogate_points"], "alpha.surrogate_points")? {
            config.surrogate_points = v;
        }

        let surrogate = &root["surrogate"];
        if let Some(v) = opt_str(&surrogate["model_dir"], "surrogate.model_dir")? {
            config.model_dir = PathBuf::from(v);
        }
        if let Some(v) = opt_str(&surrogate["primary"], "surrogate.primary")? {
            config.primary_model = v.parse()?;
        }
        if let Some(v) = opt_str(&surrogate["secondary"], "surrogate.secondary")? {
            config.secondary_model = v.parse()?;
        }
        if let Some(v) = opt_f64(&surrogate["n_crit"], "surrogate.n_crit")? {
            config.n_crit = v;
        }
        if let Some(v) = opt_f64(&surrogate["xtr_upper"], "surrogate.xtr_upper")? {
            config.xtr_upper = v;
        }
        if let Some(v) = opt_f64(&surrogate["xtr_lower"], "surrogate.xtr_lower")? {
            config.xtr_lower = v;
        }

        let xfoil = &root["xfoil"];
        if let Some(v) = opt_str(&xfoil["executable"], "xfoil.executable")? {
            config.xfoil = PathBuf::from(v);
        }
        if let Some(v) = opt_usize(&xfoil["max_iter"], "xfoil.max_iter")? {
            config.xfoil_max_iter = match u32::try_from(v) {
                Ok(n) => n,
                Err(_) => return Err(PolarError::Input("xfoil.max_iter is too large".to_owned())),
            };
        }

        let plot = &root["plot"];
        if let Some(v) = opt_str(&plot["output"], "plot.output")? {
            config.output = PathBuf::from(v);
        }
        if let Some(v) = opt_f64(&plot["y_min"], "plot.y_min")? {
            config.y_min = v;
        }
        if !plot["show"].is_null() {
            config.show = match plot["show"].as_bool() {
                Some(b) => b,
                None => return Err(PolarError::Input("Bad value for plot.show".to_owned())),
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the sweep relies on
    pub fn validate(&self) -> Result<(), PolarError> {
        if self.reynolds.is_empty() {
            return Err(PolarError::Input(
                "At least one Reynolds number is required".to_owned(),
            ));
        }
        if let Some(re) = self.reynolds.iter().find(|re| !(re.is_finite() && **re > 0.0)) {
            return Err(PolarError::Input(format!(
                "Reynolds numbers must be positive, got {re}"
            )));
        }
        if !(self.alpha_min.is_finite() && self.alpha_max.is_finite())
            || self.alpha_min >= self.alpha_max
        {
            return Err(PolarError::Input(format!(
                "Angle interval [{}, {}] is empty",
                self.alpha_min, self.alpha_max
            )));
        }
        if self.reference_points < 2 || self.surrogate_points < 2 {
            return Err(PolarError::Input(
                "Angle grids need at least 2 points".to_owned(),
            ));
        }
        if !self.y_min.is_finite() {
            return Err(PolarError::Input("plot.y_min must be finite".to_owned()));
        }
        Ok(())
    }
}

fn opt_str<'a>(value: &'a JsonValue, name: &str) -> Result<Option<&'a str>, PolarError> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_str() {
        Some(s) => Ok(Some(s)),
        None => Err(PolarError::Input(format!("Bad value for {name}"))),
    }
}

fn opt_f64(value: &JsonValue, name: &str) -> Result<Option<f64>, PolarError> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_f64() {
        Some(v) => Ok(Some(v)),
        None => Err(PolarError::Input(format!("Bad value for {name}"))),
    }
}

fn opt_usize(value: &JsonValue, name: &str) -> Result<Option<usize>, PolarError> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_usize() {
        Some(v) => Ok(Some(v)),
        None => Err(PolarError::Input(format!("Bad value for {name}"))),
    }
}
