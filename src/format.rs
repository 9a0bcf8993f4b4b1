//! Number formatting for plot labels.

/// Formats like C's `%.<precision>g`: fixed notation for exponents in
/// `[-4, precision)`, scientific otherwise, trailing zeros removed.
pub fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

const SI_PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "μ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

/// Engineering notation with SI prefixes: 1e4 -> "10k", 2.5e-3 -> "2.5m"
pub fn eng_string(value: f64) -> String {
    if value == 0.0 {
        return format_g(0.0, 3);
    }
    if !value.is_finite() {
        return format_g(value, 3);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let x = value.abs();
    let exp = x.log10().floor() as i32;
    let exp3 = exp - exp.rem_euclid(3);
    let x3 = x / 10f64.powi(exp3);

    let suffix = if (-24..=24).contains(&exp3) {
        SI_PREFIXES[((exp3 + 24) / 3) as usize].to_owned()
    } else {
        format!("e{exp3}")
    };

    format!("{sign}{}{suffix}", format_g(x3, 3))
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Label for a tick on a logarithmic axis. Only mantissas 1, 2 and 5 are
/// labelled; every other tick gets an empty string.
pub fn log_tick_label(value: f64) -> String {
    if !(value.is_finite() && value > 0.0) {
        return String::new();
    }

    let mut coefficient = value / 10f64.powf(value.log10().floor());
    if is_close(coefficient, 10.0) {
        coefficient = 1.0;
    }

    if [1.0, 2.0, 5.0].iter().any(|m| is_close(coefficient, *m)) {
        format_g(value, 2)
    } else {
        String::new()
    }
}

/// Every `m * 10^k` tick (m = 1..9) inside `[lo, hi]`
pub fn log_ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(lo > 0.0 && hi >= lo && hi.is_finite()) {
        return Vec::new();
    }

    let first = lo.log10().floor() as i32;
    let last = hi.log10().ceil() as i32;
    let (lo_tol, hi_tol) = (lo * (1.0 - 1e-9), hi * (1.0 + 1e-9));

    let mut ticks = Vec::new();
    for k in first..=last {
        let decade = 10f64.powi(k);
        for m in 1..=9 {
            let tick = m as f64 * decade;
            if tick >= lo_tol && tick <= hi_tol {
                ticks.push(tick);
            }
        }
    }
    ticks
}
