//! Feature extractor for the SVM classifier (spec §4.F).
//!
//! Builds a fixed 35-value feature vector for one AS from its prefix series,
//! conflict series, and their element-wise correlation: 13 features computed
//! once on the prefix side and once on the conflict side (bilateral), plus
//! 9 computed once on the correlation (unilateral). The extractor list and
//! its exact ordering are static, matching the canonical layout the
//! classifier's training data was produced with.

/// Number of values produced by [`extract_features`].
pub const FEATURE_LEN: usize = 35;

/// Derived per-side view (prefixes or conflicts) of one AS's data, plus the
/// other side's raw series used to pick among tied maxima.
struct SeriesData {
    raw: Vec<f64>,
    var: Vec<f64>,
    norm_var: Vec<f64>,
    max_indexes: Vec<usize>,
    max_index: usize,
}

fn differences(raw: &[f64]) -> Vec<f64> {
    raw.windows(2).map(|w| w[1] - w[0]).collect()
}

fn normalize(var: &[f64]) -> Vec<f64> {
    let max_abs = var.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    if max_abs == 0.0 {
        vec![0.0; var.len()]
    } else {
        var.iter().map(|v| v / max_abs).collect()
    }
}

/// Indexes of the maximum value in `raw`, excluding the first and last
/// element (a route leak never starts or ends the observation window).
fn exact_max_indexes(raw: &[f64]) -> Vec<usize> {
    let interior = &raw[1..raw.len() - 1];
    let max_val = interior.iter().cloned().fold(f64::MIN, f64::max);
    (1..raw.len() - 1).filter(|&i| raw[i] == max_val).collect()
}

fn build_series_data(raw: &[f64], correlated_raw: &[f64]) -> SeriesData {
    let var = differences(raw);
    let norm_var = normalize(&var);
    let max_indexes = exact_max_indexes(raw);

    let best_correlated = max_indexes.iter().map(|&i| correlated_raw[i]).fold(f64::MIN, f64::max);
    let selected: Vec<usize> = max_indexes.iter().copied().filter(|&i| correlated_raw[i] == best_correlated).collect();
    let max_index = selected[0];

    SeriesData { raw: raw.to_vec(), var, norm_var, max_indexes, max_index }
}

struct CorrData {
    norm_corr: Vec<f64>,
    value_corr: Vec<f64>,
    max_indexes: Vec<usize>,
    max_index: usize,
}

fn elementwise_product(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).collect()
}

fn build_corr_data(pfx: &SeriesData, cfl: &SeriesData) -> CorrData {
    let norm_corr = elementwise_product(&pfx.norm_var, &cfl.norm_var);
    let value_corr = elementwise_product(&pfx.var, &cfl.var);

    let max_val = norm_corr.iter().cloned().fold(f64::MIN, f64::max);
    let max_indexes: Vec<usize> = (0..norm_corr.len()).filter(|&i| norm_corr[i] == max_val).collect();

    let max_next = max_indexes
        .iter()
        .filter(|&&i| i + 1 < norm_corr.len())
        .map(|&i| norm_corr[i + 1])
        .fold(f64::MIN, f64::max);
    let max_next = if max_next == f64::MIN { 0.0 } else { max_next };

    let selected: Vec<usize> = max_indexes
        .iter()
        .copied()
        .filter(|&i| i + 1 < norm_corr.len() && norm_corr[i + 1] == max_next)
        .collect();
    let max_index = selected.first().copied().unwrap_or(max_indexes[0]);

    CorrData { norm_corr, value_corr, max_indexes, max_index }
}

fn get_nb_approx_maxes(data: &[f64], max_index: usize) -> usize {
    data.iter().filter(|&&v| v >= 0.9 * data[max_index]).count()
}

/// Ratio of the standard deviation of `data` with `max_index` removed to the
/// standard deviation of the whole of `data` (1.0 if `data`'s std is zero).
fn max_impact_on_std(data: &[f64], max_index: usize) -> f64 {
    let std = crate::peaks::population_std(data);
    if std == 0.0 {
        return 1.0;
    }
    let smoothed: Vec<f64> = data.iter().enumerate().filter(|(i, _)| *i != max_index).map(|(_, &v)| v).collect();
    crate::peaks::population_std(&smoothed) / std
}

fn calc_spread(indexes: &[usize], data_len: usize) -> f64 {
    let max_i = *indexes.iter().max().expect("non-empty") as f64;
    let min_i = *indexes.iter().min().expect("non-empty") as f64;
    (max_i - min_i + 1.0) / data_len as f64
}

/// numpy-compatible linear-interpolation percentile (`p` in `[0, 100]`).
fn percentile(data: &[f64], p: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

/// `(last-decile value, last-decile spread)` for `data`.
fn last_decile_attributes(data: &[f64]) -> (f64, f64) {
    let last_decile = percentile(data, 90.0);
    let indexes: Vec<usize> = data.iter().enumerate().filter(|(_, &v)| v - last_decile > -1e-10).map(|(i, _)| i).collect();
    (last_decile, calc_spread(&indexes, data.len()))
}

/// `(last-quartile value, last-quartile spread)` for `data`.
fn last_quartile_attributes(data: &[f64]) -> (f64, f64) {
    let last_quartile = percentile(data, 75.0);
    let indexes: Vec<usize> = data.iter().enumerate().filter(|(_, &v)| v - last_quartile > -1e-10).map(|(i, _)| i).collect();
    (last_quartile, calc_spread(&indexes, data.len()))
}

fn percent_above_average(data: &[f64]) -> f64 {
    let avg = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().filter(|&&v| v >= avg).count() as f64 / data.len() as f64
}

fn bilat_features(own: &SeriesData, other: &SeriesData) -> [f64; 13] {
    let max_var = own.norm_var[own.max_index - 1];
    let next_var = own.norm_var[own.max_index];
    let max_other_var = other.norm_var[own.max_index - 1];
    let next_other_var = other.norm_var[own.max_index];
    let nb_maxes = get_nb_approx_maxes(&own.raw, own.max_indexes[0]) as f64 / own.raw.len() as f64;
    let std_ratio = max_impact_on_std(&own.norm_var, own.max_index);
    let other_std_ratio = max_impact_on_std(&other.norm_var, own.max_index);
    let (last_decile, last_decile_spread) = last_decile_attributes(&own.norm_var);
    let (last_quartile, last_quartile_spread) = last_quartile_attributes(&own.norm_var);
    let above_avg = percent_above_average(&own.norm_var);
    let var_of_max = if own.var[own.max_index - 1] > 0.0 { own.var[own.max_index - 1].ln() } else { 0.0 };

    [
        max_var,
        next_var,
        max_other_var,
        next_other_var,
        nb_maxes,
        std_ratio,
        other_std_ratio,
        last_decile,
        last_decile_spread,
        last_quartile,
        last_quartile_spread,
        above_avg,
        var_of_max,
    ]
}

fn unilat_features(pfx: &SeriesData, corr: &CorrData) -> [f64; 9] {
    let next_maxes: Vec<f64> = corr.max_indexes.iter().filter(|&&i| i + 1 < corr.norm_corr.len()).map(|&i| corr.norm_corr[i + 1]).collect();
    let corr_max_next = next_maxes.iter().cloned().fold(f64::MIN, f64::max);
    let corr_max_next = if next_maxes.is_empty() { 0.0 } else { corr_max_next };

    let corr_nb_maxes = corr.max_indexes.len() as f64 / pfx.norm_var.len() as f64;

    let max_value_corr = corr.value_corr.iter().cloned().fold(f64::MIN, f64::max);
    let corr_max_value = if max_value_corr > 0.0 { max_value_corr.ln() } else { 0.0 };

    let std_ratio = max_impact_on_std(&pfx.norm_var, corr.max_index);
    let (last_decile, last_decile_spread) = last_decile_attributes(&corr.norm_corr);
    let (last_quartile, last_quartile_spread) = last_quartile_attributes(&corr.norm_corr);
    let above_avg = percent_above_average(&corr.norm_corr);

    [
        corr_max_next,
        corr_nb_maxes,
        corr_max_value,
        std_ratio,
        last_decile,
        last_decile_spread,
        last_quartile,
        last_quartile_spread,
        above_avg,
    ]
}

/// Build the 35-value feature vector for one AS from its prefix and
/// conflict daily series.
///
/// `pfx_raw`/`cfl_raw` should already have gone through
/// [`crate::smoother::speculate_missing_values`] with
/// [`crate::smoother::CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE`].
pub fn extract_features(pfx_raw: &[f64], cfl_raw: &[f64]) -> Vec<f64> {
    let pfx = build_series_data(pfx_raw, cfl_raw);
    let cfl = build_series_data(cfl_raw, pfx_raw);
    let corr = build_corr_data(&pfx, &cfl);

    let mut out = Vec::with_capacity(FEATURE_LEN);
    out.extend_from_slice(&bilat_features(&pfx, &cfl));
    out.extend_from_slice(&bilat_features(&cfl, &pfx));
    out.extend_from_slice(&unilat_features(&pfx, &corr));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(len: usize, spike_at: usize, spike_val: f64) -> Vec<f64> {
        let mut v = vec![1.0; len];
        v[spike_at] = spike_val;
        v
    }

    #[test]
    fn feature_vector_has_fixed_length() {
        let pfx = series(40, 20, 200.0);
        let cfl = series(40, 20, 150.0);
        assert_eq!(extract_features(&pfx, &cfl).len(), FEATURE_LEN);
    }

    #[test]
    fn percentile_matches_numpy_linear_interpolation() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_relative_eq!(percentile(&data, 90.0), 9.1);
        assert_relative_eq!(percentile(&data, 75.0), 7.75);
    }

    #[test]
    fn std_ratio_is_one_for_constant_data() {
        assert_relative_eq!(max_impact_on_std(&[3.0, 3.0, 3.0], 1), 1.0);
    }

    #[test]
    fn spread_covers_full_width_of_indexes() {
        assert_relative_eq!(calc_spread(&[2, 5], 10), 0.4);
    }
}
