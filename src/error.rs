use thiserror::Error;

/// Errors raised by each stage of the validation run.
///
/// Every variant is fatal. The run is a one-off comparison, so nothing
/// downstream retries or skips a failed stage.
#[derive(Debug, Error)]
pub enum PolarError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Geometry error: {0}")]
    Geometry(String),
    #[error("Surrogate error: {0}")]
    Surrogate(String),
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Renderer error: {0}")]
    Renderer(String),
}

impl PolarError {
    /// Stage name used as the `stage` key in log records.
    pub fn stage(&self) -> &'static str {
        match self {
            PolarError::Input(_) => "input",
            PolarError::Geometry(_) => "geometry",
            PolarError::Surrogate(_) => "surrogate",
            PolarError::Solver(_) => "solver",
            PolarError::Renderer(_) => "renderer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_stage() {
        let err = PolarError::Solver("xfoil exited with status 1".to_owned());
        assert_eq!(err.to_string(), "Solver error: xfoil exited with status 1");
        assert_eq!(err.stage(), "solver");
    }
}
