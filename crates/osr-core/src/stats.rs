//! Small descriptive-statistics helpers shared by the analyzers.

// ── Quantile helper ───────────────────────────────────────────────────────────

/// Compute the `q`-quantile (`0.0..=1.0`) of a **sorted** slice using linear
/// interpolation between closest ranks (the NumPy / pandas default).
///
/// Returns `None` for an empty slice.
pub fn quantile(sorted_data: &[f64], q: f64) -> Option<f64> {
    if sorted_data.is_empty() {
        return None;
    }
    let len = sorted_data.len();
    if len == 1 {
        return Some(sorted_data[0]);
    }
    let q = q.clamp(0.0, 1.0);
    let rank = q * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted_data[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
}

/// Copy `values` and sort ascending. NaN is never present in sanitized data.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

// ── Moments ───────────────────────────────────────────────────────────────────

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Number of distinct values in a sorted slice.
pub fn distinct_count(sorted_data: &[f64]) -> usize {
    let mut count = 0;
    let mut last: Option<f64> = None;
    for &v in sorted_data {
        if last != Some(v) {
            count += 1;
            last = Some(v);
        }
    }
    count
}

/// Round `value` to `decimals` places. Exact ties go to the even neighbour,
/// matching the dataframe `round` the shares are reported with.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to((part / whole) * 100.0, decimal_places)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
