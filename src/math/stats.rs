//! Index searches and descriptive statistics over real-valued sequences.
//!
//! All index searches break ties by the first index, so results are
//! deterministic and follow the natural scan order of the sequence.

/// Index of the first maximum. `None` for an empty slice or if any value is NaN.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return None;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first sample whose value is closest to `target`.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let d = (v - target).abs();
        if d.is_nan() {
            return None;
        }
        match best {
            Some((_, b)) if d >= b => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `N - ddof` denominator.
///
/// `ddof = 1` is the sample estimator, `ddof = 0` the population one. Returns
/// `None` when `N <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    let n = values.len();
    if n <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (n - ddof) as f64).sqrt())
}
