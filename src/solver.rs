use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use slog::{debug, trace, Logger};

use crate::{
    datatypes::{AeroResult, Airfoil},
    error::PolarError,
};

pub const POLAR_FILE: &str = "polar.txt";
pub const AIRFOIL_FILE: &str = "airfoil.dat";
pub const REPANEL_POINTS: usize = 279;
/// XFoil prints angles with three decimals
const ALPHA_MATCH_TOLERANCE: f64 = 1e-3;

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Solves the viscous flow around an airfoil for a list of angles of attack
pub trait ReferenceSolver {
    fn solve(&self, airfoil: &Airfoil, re: f64, alphas: &[f64]) -> Result<AeroResult, PolarError>;
}

/// Drives an external XFoil executable through a keystroke script
pub struct XFoil {
    pub executable: PathBuf,
    pub max_iter: u32,
    pub n_crit: f64,
    pub repanel: bool,
    logger: Logger,
}

/// Scratch directory removed when dropped
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> Result<ScratchDir, PolarError> {
        let path = std::env::temp_dir().join(format!(
            "polarcheck-xfoil-{}-{}",
            std::process::id(),
            SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(err) = std::fs::create_dir_all(&path) {
            return Err(PolarError::Solver(format!(
                "Unable to create scratch directory {}: {err}",
                path.display()
            )));
        }
        Ok(ScratchDir { path })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

impl XFoil {
    pub fn new(executable: impl Into<PathBuf>, logger: &Logger) -> XFoil {
        XFoil {
            executable: executable.into(),
            max_iter: 100,
            n_crit: 9.0,
            repanel: true,
            logger: logger.new(slog::o!("service" => "xfoil")),
        }
    }

    pub fn with_max_iter(mut self, max_iter: u32) -> XFoil {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_crit(mut self, n_crit: f64) -> XFoil {
        self.n_crit = n_crit;
        self
    }

    /// Builds the keystroke script for one polar
    ///
    /// # Arguments
    /// * `re` - Reynolds number
    /// * `alphas` - Angles of attack in degrees, any order
    ///
    /// # Returns
    /// One XFoil command per line
    pub fn keystrokes(&self, re: f64, alphas: &[f64]) -> Vec<String> {
        let mut keys: Vec<String> = vec![
            "PLOP".to_owned(),
            "G F".to_owned(),
            String::new(),
            format!("LOAD {AIRFOIL_FILE}"),
        ];

        if self.repanel {
            keys.extend([
                "PPAR".to_owned(),
                format!("N {REPANEL_POINTS}"),
                String::new(),
                String::new(),
            ]);
        }

        keys.extend([
            "OPER".to_owned(),
            format!("ITER {}", self.max_iter),
            format!("VISC {re:e}"),
            "VPAR".to_owned(),
            format!("N {}", self.n_crit),
            "XTR 1 1".to_owned(),
            String::new(),
            "PACC".to_owned(),
            POLAR_FILE.to_owned(),
            String::new(),
        ]);

        for alpha in run_order(alphas) {
            match alpha {
                Some(a) => keys.push(format!("A {a}")),
                None => keys.push("INIT".to_owned()),
            }
        }

        keys.extend([
            "PACC".to_owned(),
            String::new(),
            "QUIT".to_owned(),
        ]);

        keys
    }
}

/// Orders angles outward from zero so each solution seeds the next.
/// `None` marks a boundary-layer reset between the two branches.
pub fn run_order(alphas: &[f64]) -> Vec<Option<f64>> {
    let mut positive: Vec<f64> = alphas.iter().copied().filter(|a| *a >= 0.0).collect();
    let mut negative: Vec<f64> = alphas.iter().copied().filter(|a| *a < 0.0).collect();
    positive.sort_by(f64::total_cmp);
    negative.sort_by(|a, b| b.total_cmp(a));

    let mut order: Vec<Option<f64>> = positive.into_iter().map(Some).collect();
    if !order.is_empty() && !negative.is_empty() {
        order.push(None);
    }
    order.extend(negative.into_iter().map(Some));
    order
}

/// Writes the airfoil in Selig format
fn write_airfoil(airfoil: &Airfoil, path: &Path) -> Result<(), PolarError> {
    let mut contents = format!("{}\n", airfoil.name);
    for v in &airfoil.vertices {
        contents.push_str(&format!("{:.12} {:.12}\n", v.x, v.y));
    }
    match std::fs::write(path, contents) {
        Ok(()) => Ok(()),
        Err(err) => Err(PolarError::Solver(format!(
            "Failed to write {}: {err}",
            path.display()
        ))),
    }
}

/// Parses an XFoil accumulated polar file into rows of
/// `alpha CL CD CDp CM Top_Xtr Bot_Xtr`, sorted by alpha
pub fn parse_polar(contents: &str) -> Result<Vec<[f64; 7]>, PolarError> {
    let mut lines = contents.lines();
    if !lines.any(|l| l.trim_start().starts_with("---")) {
        return Err(PolarError::Solver(
            "XFoil polar file has no data table".to_owned(),
        ));
    }

    let mut rows: Vec<[f64; 7]> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let values: Result<Vec<f64>, _> = line.split_whitespace().map(str::parse).collect();
        match values {
            Ok(v) if v.len() >= 7 => rows.push([v[0], v[1], v[2], v[3], v[4], v[5], v[6]]),
            _ => {
                return Err(PolarError::Solver(format!(
                    "Malformed row in XFoil polar: '{}'",
                    line.trim()
                )))
            }
        }
    }

    rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
    Ok(rows)
}

/// Matches polar rows back to the requested angles. Any requested angle
/// without a converged row is an error.
pub fn align(rows: &[[f64; 7]], alphas: &[f64], re: f64) -> Result<AeroResult, PolarError> {
    let mut result = AeroResult {
        alpha: Vec::with_capacity(alphas.len()),
        ..Default::default()
    };
    let mut missing: Vec<f64> = Vec::new();

    for alpha in alphas {
        let row = rows
            .iter()
            .find(|r| (r[0] - alpha).abs() <= ALPHA_MATCH_TOLERANCE);
        match row {
            Some(r) => {
                result.alpha.push(*alpha);
                result.cl.push(r[1]);
                result.cd.push(r[2]);
                result.cm.push(r[4]);
                result.top_xtr.push(r[5]);
                result.bot_xtr.push(r[6]);
            }
            None => missing.push(*alpha),
        }
    }

    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(|a| format!("{a:.3}")).collect();
        return Err(PolarError::Solver(format!(
            "XFoil did not converge at Re = {re:e} for alpha = [{}]",
            listed.join(", ")
        )));
    }

    Ok(result)
}

impl ReferenceSolver for XFoil {
    fn solve(&self, airfoil: &Airfoil, re: f64, alphas: &[f64]) -> Result<AeroResult, PolarError> {
        let scratch = ScratchDir::create()?;
        write_airfoil(airfoil, &scratch.path.join(AIRFOIL_FILE))?;

        let keystrokes = self.keystrokes(re, alphas).join("\n") + "\n";
        debug!(self.logger, "running xfoil";
            "re" => re, "alphas" => alphas.len(), "dir" => %scratch.path.display());

        let mut child = match Command::new(&self.executable)
            .current_dir(&scratch.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(err) => {
                return Err(PolarError::Solver(format!(
                    "Unable to run {}: {err}",
                    self.executable.display()
                )))
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(keystrokes.as_bytes()) {
                return Err(PolarError::Solver(format!(
                    "Failed to send keystrokes to XFoil: {err}"
                )));
            }
        }

        let output = match child.wait_with_output() {
            Ok(o) => o,
            Err(err) => return Err(PolarError::Solver(format!("XFoil failed: {err}"))),
        };
        trace!(self.logger, "xfoil stdout"; "text" => %String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            return Err(PolarError::Solver(format!(
                "XFoil exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let polar_path = scratch.path.join(POLAR_FILE);
        let contents = match std::fs::read_to_string(&polar_path) {
            Ok(c) => c,
            Err(err) => {
                return Err(PolarError::Solver(format!(
                    "XFoil produced no polar file: {err}"
                )))
            }
        };

        align(&parse_polar(&contents)?, alphas, re)
    }
}
