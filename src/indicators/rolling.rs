// =============================================================================
// Rolling-window primitives
// =============================================================================
//
// Index-aligned rolling mean / max / min over an f64 slice.  Every output
// vector has exactly the same length as the input; positions where the window
// has not yet filled (or where a non-finite value poisons the window) are
// `None`, so downstream code is forced to treat warm-up bars explicitly.

/// Rolling arithmetic mean over `window` values.
///
/// Output index `i` covers `values[i + 1 - window ..= i]` and is `None` until
/// the window fills or when any value in the window is non-finite.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    // Running sum with full recomputation whenever a non-finite value enters
    // or leaves the window would complicate the loop; windows here are small
    // (20/50/200) so a direct per-window sum is fine.
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            out[i] = Some(slice.iter().sum::<f64>() / window as f64);
        }
    }
    out
}

/// Rolling maximum with a `min_periods` floor: output index `i` is the max of
/// the last `window` values (fewer during warm-up, as long as at least
/// `min_periods` are available).
pub fn rolling_max(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_extreme(values, window, min_periods, f64::max)
}

/// Rolling minimum, same window semantics as [`rolling_max`].
pub fn rolling_min(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_extreme(values, window, min_periods, f64::min)
}

fn rolling_extreme(
    values: &[f64],
    window: usize,
    min_periods: usize,
    pick: fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    let min_periods = min_periods.max(1);

    for i in 0..values.len() {
        let start = i.saturating_sub(window - 1);
        let slice = &values[start..=i];
        if slice.len() < min_periods || slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        out[i] = slice.iter().copied().reduce(pick);
    }
    out
}
