//! Class-shape-transformation (Kulfan) airfoil parameterization.
//!
//! Each surface is `y = C(x) * S(x)` where `C(x) = x^N1 (1 - x)^N2` is the
//! round-nose, sharp-tail class function and `S(x)` a weighted Bernstein
//! polynomial. Two extra terms model trailing-edge thickness and Kulfan's
//! leading-edge modification.

use nalgebra::{DMatrix, DVector};

use crate::{
    datatypes::{Airfoil, KulfanParameters, Vertex},
    error::PolarError,
    geometry,
};

pub const N1: f64 = 0.5;
pub const N2: f64 = 1.0;
pub const N_WEIGHTS_PER_SIDE: usize = 8;

const SVD_EPS: f64 = 1e-14;

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn class_function(x: f64) -> f64 {
    x.powf(N1) * (1.0 - x).powf(N2)
}

/// Bernstein basis of degree `n_weights - 1` evaluated at x
fn bernstein_row(x: f64, n_weights: usize) -> Vec<f64> {
    let degree = n_weights - 1;
    (0..n_weights)
        .map(|j| binomial(degree, j) * x.powi(j as i32) * (1.0 - x).powi((degree - j) as i32))
        .collect()
}

fn leading_edge_term(x: f64, n_weights: usize) -> f64 {
    x * (1.0 - x).max(0.0).powf(n_weights as f64 + 0.5)
}

/// Fits Kulfan parameters to a normalized airfoil by linear least squares
///
/// # Arguments
/// * `airfoil` - An airfoil with its leading edge at the origin and trailing
///     edge at (1, 0)
/// * `n_weights_per_side` - Bernstein weights per surface
///
/// # Returns
/// The fitted parameters. A negative trailing-edge thickness is refitted with
/// the thickness pinned to zero.
pub fn fit(airfoil: &Airfoil, n_weights_per_side: usize) -> Result<KulfanParameters, PolarError> {
    let n = n_weights_per_side;
    if n == 0 {
        return Err(PolarError::Geometry(
            "Kulfan fit needs at least one weight per side".to_owned(),
        ));
    }

    let le_index = geometry::le_index(airfoil);
    let rows = airfoil.vertices.len();
    let cols = 2 * n + 2;

    let mut a: DMatrix<f64> = DMatrix::zeros(rows, cols);
    let b: DVector<f64> = DVector::from_iterator(rows, airfoil.vertices.iter().map(|v| v.y));

    for (i, vertex) in airfoil.vertices.iter().enumerate() {
        let x = vertex.x.clamp(0.0, 1.0);
        let is_upper = i <= le_index;
        let c = class_function(x);
        let offset = if is_upper { n } else { 0 };

        for (j, s) in bernstein_row(x, n).into_iter().enumerate() {
            a[(i, offset + j)] = c * s;
        }
        a[(i, 2 * n)] = leading_edge_term(x, n);
        a[(i, 2 * n + 1)] = if is_upper { 0.5 * x } else { -0.5 * x };
    }

    let solution = least_squares(a.clone(), &b)?;
    if solution[2 * n + 1] >= 0.0 {
        return Ok(unpack(&solution, n, solution[2 * n + 1]));
    }

    let pinned = least_squares(a.columns(0, 2 * n + 1).into_owned(), &b)?;
    Ok(unpack(&pinned, n, 0.0))
}

fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, PolarError> {
    let svd = a.svd(true, true);
    match svd.solve(b, SVD_EPS) {
        Ok(x) if x.iter().all(|v| v.is_finite()) => Ok(x),
        Ok(_) => Err(PolarError::Geometry(
            "Kulfan fit produced non-finite weights".to_owned(),
        )),
        Err(err) => Err(PolarError::Geometry(format!("Kulfan fit failed: {err}"))),
    }
}

fn unpack(solution: &DVector<f64>, n: usize, te_thickness: f64) -> KulfanParameters {
    KulfanParameters {
        lower_weights: solution.rows(0, n).iter().copied().collect(),
        upper_weights: solution.rows(n, n).iter().copied().collect(),
        leading_edge_weight: solution[2 * n],
        te_thickness,
    }
}

/// Builds Selig-ordered coordinates from Kulfan parameters with cosine
/// spacing, `2 * n_points_per_side - 1` points in total.
pub fn coordinates(
    name: &str,
    params: &KulfanParameters,
    n_points_per_side: usize,
) -> Airfoil {
    let xs = geometry::cosspace(0.0, 1.0, n_points_per_side);

    let surface = |weights: &[f64], x: f64, te_sign: f64| -> f64 {
        let shape: f64 = std::iter::zip(weights, bernstein_row(x, weights.len()))
            .map(|(w, s)| w * s)
            .sum();
        class_function(x) * shape
            + te_sign * 0.5 * x * params.te_thickness
            + params.leading_edge_weight * leading_edge_term(x, weights.len())
    };

    let mut vertices: Vec<Vertex> = xs
        .iter()
        .rev()
        .map(|&x| Vertex {
            x,
            y: surface(params.upper_weights.as_slice(), x, 1.0),
        })
        .collect();
    vertices.extend(xs.iter().skip(1).map(|&x| Vertex {
        x,
        y: surface(params.lower_weights.as_slice(), x, -1.0),
    }));

    Airfoil {
        name: name.to_owned(),
        vertices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cambered() -> KulfanParameters {
        KulfanParameters {
            upper_weights: vec![0.22, 0.29, 0.27, 0.31, 0.26, 0.30, 0.24, 0.28],
            lower_weights: vec![-0.15, -0.06, -0.02, 0.04, 0.01, 0.07, 0.03, 0.09],
            leading_edge_weight: 0.12,
            te_thickness: 0.004,
        }
    }

    #[test]
    fn binomial_coefficients() {
        assert_eq!(binomial(7, 0), 1.0);
        assert_eq!(binomial(7, 3), 35.0);
        assert_eq!(binomial(7, 7), 1.0);
    }

    #[test]
    fn bernstein_basis_is_partition_of_unity() {
        for x in [0.0, 0.13, 0.5, 0.97, 1.0] {
            let sum: f64 = bernstein_row(x, N_WEIGHTS_PER_SIDE).iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn fit_recovers_generating_parameters() {
        let params = cambered();
        let airfoil = coordinates("cst", &params, 120);
        let fitted = fit(&airfoil, N_WEIGHTS_PER_SIDE).unwrap();

        for (a, b) in std::iter::zip(&fitted.upper_weights, &params.upper_weights) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
        for (a, b) in std::iter::zip(&fitted.lower_weights, &params.lower_weights) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(fitted.leading_edge_weight, 0.12, epsilon = 1e-6);
        assert_abs_diff_eq!(fitted.te_thickness, 0.004, epsilon = 1e-8);
    }

    #[test]
    fn negative_te_thickness_is_pinned_to_zero() {
        let params = KulfanParameters {
            te_thickness: -0.01,
            ..cambered()
        };
        let airfoil = coordinates("crossed", &params, 80);
        let fitted = fit(&airfoil, N_WEIGHTS_PER_SIDE).unwrap();
        assert_eq!(fitted.te_thickness, 0.0);
        assert!(fitted.upper_weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn coordinates_close_at_trailing_edge() {
        let params = cambered();
        let airfoil = coordinates("cst", &params, 50);
        assert_eq!(airfoil.vertices.len(), 99);

        let first = airfoil.vertices[0];
        let last = airfoil.vertices[98];
        assert_abs_diff_eq!(first.y - last.y, params.te_thickness, epsilon = 1e-12);
        assert_abs_diff_eq!(airfoil.vertices[49].x, 0.0, epsilon = 1e-15);
    }
}
