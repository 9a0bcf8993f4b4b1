use std::path::Path;

use crate::{
    datatypes::{Airfoil, Vertex},
    error::PolarError,
};

/// Parses a coordinate file into an Airfoil
///
/// The file holds two whitespace-separated numeric columns, one point per
/// line. An optional first line that is not a coordinate pair is read as the
/// airfoil name (Selig header); otherwise the file stem is used.
///
/// # Arguments
/// * `path` - The path to the coordinate file
///
/// # Returns
/// The airfoil, with its points in file order
pub fn load_coordinates(path: &Path) -> Result<Airfoil, PolarError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            return Err(PolarError::Input(format!(
                "Unable to open coordinate file {}: {err}",
                path.display()
            )))
        }
    };

    let fallback_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "airfoil".to_owned());

    parse_coordinates(&contents, &fallback_name)
}

/// Parses the text of a coordinate file. See [`load_coordinates`].
pub fn parse_coordinates(contents: &str, fallback_name: &str) -> Result<Airfoil, PolarError> {
    let mut name: Option<String> = None;
    let mut vertices: Vec<Vertex> = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_pair(line) {
            Some((x, y)) => vertices.push(Vertex { x, y }),
            None if vertices.is_empty() && name.is_none() => name = Some(line.to_owned()),
            None => {
                return Err(PolarError::Input(format!(
                    "Malformed coordinate on line {}: '{line}'",
                    line_no + 1
                )))
            }
        }
    }

    if vertices.len() < 3 {
        return Err(PolarError::Input(format!(
            "Coordinate file has {} points; at least 3 are required",
            vertices.len()
        )));
    }

    Ok(Airfoil {
        name: name.unwrap_or_else(|| fallback_name.to_owned()),
        vertices,
    })
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split_whitespace();
    let x: f64 = fields.next()?.parse().ok()?;
    let y: f64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x, y))
}

/// Index of the leading edge, taken as the point of minimum x
pub fn le_index(airfoil: &Airfoil) -> usize {
    let mut idx = 0;
    for (i, v) in airfoil.vertices.iter().enumerate() {
        if v.x < airfoil.vertices[idx].x {
            idx = i;
        }
    }
    idx
}

/// Upper surface, from the trailing edge to the leading edge
pub fn upper(airfoil: &Airfoil) -> &[Vertex] {
    &airfoil.vertices[..=le_index(airfoil)]
}

/// Lower surface, from the leading edge to the trailing edge
pub fn lower(airfoil: &Airfoil) -> &[Vertex] {
    &airfoil.vertices[le_index(airfoil)..]
}

/// Translates, rotates and scales the airfoil so that the leading edge sits
/// at the origin and the trailing-edge midpoint at (1, 0).
pub fn normalize(airfoil: &Airfoil) -> Result<Airfoil, PolarError> {
    let vertices = &airfoil.vertices;
    let le = vertices[le_index(airfoil)];
    let first = vertices[0];
    let last = vertices[vertices.len() - 1];
    let te = Vertex {
        x: 0.5 * (first.x + last.x),
        y: 0.5 * (first.y + last.y),
    };

    let chord = f64::hypot(te.x - le.x, te.y - le.y);
    if chord <= f64::EPSILON {
        return Err(PolarError::Geometry(format!(
            "Airfoil {} has zero chord length",
            airfoil.name
        )));
    }

    let angle = f64::atan2(te.y - le.y, te.x - le.x);
    let (sin, cos) = angle.sin_cos();

    let vertices = vertices
        .iter()
        .map(|v| {
            let dx = v.x - le.x;
            let dy = v.y - le.y;
            Vertex {
                x: (dx * cos + dy * sin) / chord,
                y: (-dx * sin + dy * cos) / chord,
            }
        })
        .collect();

    Ok(Airfoil {
        name: airfoil.name.clone(),
        vertices,
    })
}

/// Cosine-spaced points from `start` to `stop`, clustered at both ends
pub fn cosspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let mean = 0.5 * (start + stop);
    let amp = 0.5 * (stop - start);
    (0..n)
        .map(|i| {
            let theta = std::f64::consts::PI * (1.0 - i as f64 / (n - 1) as f64);
            mean + amp * theta.cos()
        })
        .collect()
}

/// Resamples both surfaces with `n_points_per_side` cosine-spaced points by
/// normalized arc length. The leading-edge point is shared, so the result has
/// `2 * n_points_per_side - 1` points.
pub fn repanel(airfoil: &Airfoil, n_points_per_side: usize) -> Result<Airfoil, PolarError> {
    if n_points_per_side < 2 {
        return Err(PolarError::Geometry(
            "Repanelling needs at least 2 points per side".to_owned(),
        ));
    }

    let upper_le_to_te: Vec<Vertex> = upper(airfoil).iter().rev().copied().collect();
    let lower_le_to_te: Vec<Vertex> = lower(airfoil).to_vec();

    let targets = cosspace(0.0, 1.0, n_points_per_side);
    let new_upper = resample_surface(&upper_le_to_te, &targets, &airfoil.name, "upper")?;
    let new_lower = resample_surface(&lower_le_to_te, &targets, &airfoil.name, "lower")?;

    let mut vertices: Vec<Vertex> = new_upper.into_iter().rev().collect();
    vertices.extend(new_lower.into_iter().skip(1));

    Ok(Airfoil {
        name: airfoil.name.clone(),
        vertices,
    })
}

fn resample_surface(
    surface: &[Vertex],
    targets: &[f64],
    name: &str,
    side: &str,
) -> Result<Vec<Vertex>, PolarError> {
    if surface.len() < 2 {
        return Err(PolarError::Geometry(format!(
            "Airfoil {name} has no {side} surface"
        )));
    }

    let mut arc: Vec<f64> = Vec::with_capacity(surface.len());
    arc.push(0.0);
    for pair in surface.windows(2) {
        let ds = f64::hypot(pair[1].x - pair[0].x, pair[1].y - pair[0].y);
        arc.push(arc[arc.len() - 1] + ds);
    }

    let total = arc[arc.len() - 1];
    if total <= f64::EPSILON {
        return Err(PolarError::Geometry(format!(
            "Airfoil {name} has a zero-length {side} surface"
        )));
    }
    for s in arc.iter_mut() {
        *s /= total;
    }

    let xs: Vec<f64> = surface.iter().map(|v| v.x).collect();
    let ys: Vec<f64> = surface.iter().map(|v| v.y).collect();

    Ok(targets
        .iter()
        .map(|&t| Vertex {
            x: interp(&arc, &xs, t),
            y: interp(&arc, &ys, t),
        })
        .collect())
}

/// Piecewise-linear interpolation on a non-decreasing abscissa
fn interp(s: &[f64], values: &[f64], t: f64) -> f64 {
    let hi = s.partition_point(|&si| si < t).clamp(1, s.len() - 1);
    let lo = hi - 1;
    let span = s[hi] - s[lo];
    if span <= 0.0 {
        return values[hi];
    }
    let frac = ((t - s[lo]) / span).clamp(0.0, 1.0);
    values[lo] + frac * (values[hi] - values[lo])
}
