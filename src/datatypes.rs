use std::fmt::Display;
use std::str::FromStr;

use crate::error::PolarError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

/// A closed airfoil contour in Selig order: upper surface from the trailing
/// edge to the leading edge, then lower surface back to the trailing edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Airfoil {
    pub name: String,
    pub vertices: Vec<Vertex>,
}

/// Class-shape-transformation parameters of an airfoil
#[derive(Debug, Clone, PartialEq)]
pub struct KulfanParameters {
    pub upper_weights: Vec<f64>,
    pub lower_weights: Vec<f64>,
    pub leading_edge_weight: f64,
    pub te_thickness: f64,
}

/// Network size tiers of the surrogate, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Xxsmall,
    Xsmall,
    Small,
    Medium,
    Large,
    Xlarge,
    Xxlarge,
    Xxxlarge,
}

impl ModelSize {
    pub const ALL: [ModelSize; 8] = [
        ModelSize::Xxsmall,
        ModelSize::Xsmall,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
        ModelSize::Xlarge,
        ModelSize::Xxlarge,
        ModelSize::Xxxlarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Xxsmall => "xxsmall",
            ModelSize::Xsmall => "xsmall",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::Xlarge => "xlarge",
            ModelSize::Xxlarge => "xxlarge",
            ModelSize::Xxxlarge => "xxxlarge",
        }
    }
}

impl Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = PolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        ModelSize::ALL
            .into_iter()
            .find(|size| size.as_str() == tag)
            .ok_or_else(|| PolarError::Input(format!("Unknown model size '{s}'")))
    }
}

/// The analysis that produced a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Reference,
    Surrogate(ModelSize),
}

impl Method {
    /// Legend label
    pub fn label(&self) -> String {
        match self {
            Method::Reference => "XFoil".to_owned(),
            Method::Surrogate(size) => format!("NeuralFoil \"{size}\""),
        }
    }
}

/// Aerodynamic coefficients aligned index-for-index with an angle grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AeroResult {
    pub alpha: Vec<f64>,
    pub cl: Vec<f64>,
    pub cd: Vec<f64>,
    pub cm: Vec<f64>,
    pub top_xtr: Vec<f64>,
    pub bot_xtr: Vec<f64>,
    /// Surrogate self-assessed trust in each point; absent for the solver.
    pub confidence: Option<Vec<f64>>,
}

impl AeroResult {
    pub fn len(&self) -> usize {
        self.alpha.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// (CD, CL) pairs in angle order
    pub fn polar(&self) -> Vec<(f64, f64)> {
        std::iter::zip(&self.cd, &self.cl)
            .map(|(cd, cl)| (*cd, *cl))
            .collect()
    }

    pub fn last_point(&self) -> Option<(f64, f64)> {
        Some((*self.cd.last()?, *self.cl.last()?))
    }
}
