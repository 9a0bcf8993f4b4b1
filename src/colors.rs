//! Curve colors.
//!
//! Colors are `[r, g, b]` in `[0, 1]` until they are handed to the renderer.

pub const ORANGE: [f64; 3] = [1.0, 165.0 / 255.0, 0.0];
pub const DARKSEAGREEN: [f64; 3] = [143.0 / 255.0, 188.0 / 255.0, 143.0 / 255.0];
pub const DODGERBLUE: [f64; 3] = [30.0 / 255.0, 144.0 / 255.0, 1.0];

/// Lightness factor applied to the gradient stops and again to annotations
pub const DARKEN: f64 = 0.8;

/// Converts RGB to hue, lightness, saturation
pub fn rgb_to_hls(rgb: [f64; 3]) -> [f64; 3] {
    let [r, g, b] = rgb;
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let sumc = maxc + minc;
    let rangec = maxc - minc;
    let l = sumc / 2.0;

    if rangec == 0.0 {
        return [0.0, l, 0.0];
    }

    let s = if l <= 0.5 {
        rangec / sumc
    } else {
        rangec / (2.0 - maxc - minc)
    };

    let rc = (maxc - r) / rangec;
    let gc = (maxc - g) / rangec;
    let bc = (maxc - b) / rangec;
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    [(h / 6.0).rem_euclid(1.0), l, s]
}

/// Converts hue, lightness, saturation back to RGB
pub fn hls_to_rgb(hls: [f64; 3]) -> [f64; 3] {
    let [h, l, s] = hls;
    if s == 0.0 {
        return [l, l, l];
    }

    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;

    let channel = |hue: f64| -> f64 {
        let hue = hue.rem_euclid(1.0);
        if hue < 1.0 / 6.0 {
            m1 + (m2 - m1) * hue * 6.0
        } else if hue < 0.5 {
            m2
        } else if hue < 2.0 / 3.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
        } else {
            m1
        }
    };

    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// Scales the HLS lightness of a color by `amount`
pub fn adjust_lightness(rgb: [f64; 3], amount: f64) -> [f64; 3] {
    let [h, l, s] = rgb_to_hls(rgb);
    hls_to_rgb([h, (amount * l).clamp(0.0, 1.0), s])
}

pub fn to_rgb8(rgb: [f64; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Evenly spaced color stops with linear interpolation between them
#[derive(Debug, Clone)]
pub struct Gradient {
    stops: Vec<[f64; 3]>,
}

impl Gradient {
    pub fn new(stops: Vec<[f64; 3]>) -> Gradient {
        Gradient { stops }
    }

    /// The orange, sea green, blue gradient used for the Reynolds sweep
    pub fn reynolds() -> Gradient {
        Gradient::new(
            [ORANGE, DARKSEAGREEN, DODGERBLUE]
                .into_iter()
                .map(|c| adjust_lightness(c, DARKEN))
                .collect(),
        )
    }

    /// Color at position t in [0, 1]
    pub fn interpolate(&self, t: f64) -> [f64; 3] {
        let n = self.stops.len();
        if n == 0 {
            return [0.5, 0.5, 0.5];
        }
        if n == 1 {
            return self.stops[0];
        }

        let pos = t.clamp(0.0, 1.0) * (n - 1) as f64;
        let idx_low = (pos.floor() as usize).min(n - 2);
        let frac = pos - idx_low as f64;
        let low = self.stops[idx_low];
        let high = self.stops[idx_low + 1];

        [
            low[0] * (1.0 - frac) + high[0] * frac,
            low[1] * (1.0 - frac) + high[1] * frac,
            low[2] * (1.0 - frac) + high[2] * frac,
        ]
    }

    /// Samples `n` colors evenly from one end of the gradient to the other.
    /// Index i of an n-long sweep always gets the same color.
    pub fn sample(&self, n: usize) -> Vec<[f64; 3]> {
        match n {
            0 => Vec::new(),
            1 => vec![self.interpolate(0.0)],
            _ => (0..n)
                .map(|i| self.interpolate(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}
