//! Heuristic peak detection on a single daily time series (spec §4.B).
//!
//! A candidate peak is a strict local maximum that clears four successive
//! gates: magnitude of both adjacent variations, closeness to the series'
//! absolute maximum, not being crowded by too many similarly-sized peaks,
//! and — taken over the whole accepted set — a significant impact on the
//! series' standard deviation once removed. Any gate failing the last test
//! discards the entire set, not just the offending point.

use crate::types::{Params, RejectionCause};

/// Population standard deviation (ddof = 0), matching `numpy.std`'s default.
pub(crate) fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

fn is_big_enough(up: f64, down: f64, peak_min_value: f64) -> bool {
    up > peak_min_value && -down > peak_min_value
}

fn is_close_to_abs_max(value: f64, max_value: f64, percent_similarity: f64) -> bool {
    value >= percent_similarity * max_value
}

fn has_few_enough_peaks(index: usize, candidates: &[usize], data: &[f64], max_nb_peaks: usize) -> bool {
    let similar = candidates.iter().filter(|&&i| data[i] >= data[index]).count();
    similar <= max_nb_peaks
}

/// `true` when removing `indexes` from `data` drops the standard deviation
/// by at least `percent_std`, i.e. the candidate peaks are confirmed as
/// genuinely significant outliers rather than noise.
fn check_std_variation(data: &[f64], indexes: &[usize], percent_std: f64) -> bool {
    let std = population_std(data);
    let smoothed: Vec<f64> = data
        .iter()
        .enumerate()
        .filter(|(i, _)| !indexes.contains(i))
        .map(|(_, &v)| v)
        .collect();
    let smooth_std = population_std(&smoothed);
    smooth_std < std * percent_std
}

fn candidate_maxes(data: &[f64], peak_min_value: f64, percent_similarity: f64) -> Vec<usize> {
    let max_value = data.iter().cloned().fold(f64::MIN, f64::max);
    let mut maxes = Vec::new();
    let mut prev_variation = data[1] - data[0];

    for i in 1..data.len() - 1 {
        let prev_val = data[i - 1];
        let cur_val = data[i];
        let next_val = data[i + 1];
        let cur_variation = next_val - cur_val;

        if cur_val > prev_val
            && cur_val > next_val
            && is_big_enough(prev_variation, cur_variation, peak_min_value)
            && is_close_to_abs_max(cur_val, max_value, percent_similarity)
        {
            maxes.push(i);
        }
        prev_variation = cur_variation;
    }
    maxes
}

/// Run the full peak-acceptance pipeline on `data` and return the accepted
/// peak indexes, or an empty vector if no candidate survived (including the
/// case where the whole accepted set was discarded by the standard-deviation
/// test).
pub fn find_big_maxes(data: &[f64], peak_min_value: f64, max_nb_peaks: usize, percent_similarity: f64, percent_std: f64) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }

    let candidates = candidate_maxes(data, peak_min_value, percent_similarity);
    let big_maxes: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| has_few_enough_peaks(i, &candidates, data, max_nb_peaks))
        .collect();

    if big_maxes.is_empty() || check_std_variation(data, &big_maxes, percent_std) {
        big_maxes
    } else {
        Vec::new()
    }
}

/// Convenience wrapper taking a [`Params`] bundle and selecting the
/// prefix-side or conflict-side `peak_min_value`.
pub fn find_big_maxes_with_params(data: &[f64], params: &Params, peak_min_value: f64) -> Vec<usize> {
    find_big_maxes(
        data,
        peak_min_value,
        params.max_nb_peaks,
        params.percent_similarity,
        params.percent_std,
    )
}

/// Explain why `idx` was or was not accepted as a peak in `data`, for
/// diagnostic/debugging surfaces.
pub fn rejection_cause(data: &[f64], idx: usize, peak_min_value: f64, max_nb_peaks: usize, percent_similarity: f64, percent_std: f64) -> RejectionCause {
    if idx == 0 || idx >= data.len() - 1 {
        return RejectionCause::NotLocalMax;
    }
    let prev_val = data[idx - 1];
    let cur_val = data[idx];
    let next_val = data[idx + 1];

    if !(cur_val > prev_val && cur_val > next_val) {
        return RejectionCause::NotLocalMax;
    }
    if !is_big_enough(cur_val - prev_val, next_val - cur_val, peak_min_value) {
        return RejectionCause::TooSmall;
    }
    let max_value = data.iter().cloned().fold(f64::MIN, f64::max);
    if !is_close_to_abs_max(cur_val, max_value, percent_similarity) {
        return RejectionCause::NotCloseToAbsMax;
    }

    let candidates = candidate_maxes(data, peak_min_value, percent_similarity);
    if !has_few_enough_peaks(idx, &candidates, data, max_nb_peaks) {
        return RejectionCause::TooManyPeaks;
    }

    let big_maxes: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| has_few_enough_peaks(i, &candidates, data, max_nb_peaks))
        .collect();
    if !check_std_variation(data, &big_maxes, percent_std) {
        return RejectionCause::StdVariationTooLow;
    }

    RejectionCause::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn population_std_matches_numpy_formula() {
        assert_relative_eq!(population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    }

    #[test]
    fn rejects_series_shorter_than_three() {
        assert!(find_big_maxes(&[1.0, 2.0], 10.0, 2, 0.9, 0.9).is_empty());
    }

    #[test]
    fn accepts_an_isolated_significant_spike() {
        let mut data = vec![1.0; 30];
        data[15] = 200.0;
        let peaks = find_big_maxes(&data, 10.0, 2, 0.9, 0.9);
        assert_eq!(peaks, vec![15]);
    }

    #[test]
    fn flat_series_has_no_peaks() {
        let data = vec![5.0; 20];
        assert!(find_big_maxes(&data, 10.0, 2, 0.9, 0.9).is_empty());
    }

    #[test]
    fn too_many_similar_peaks_discards_all() {
        let mut data = vec![1.0; 20];
        for i in [3, 8, 13, 17] {
            data[i] = 200.0;
        }
        // max_nb_peaks=2 but there are 4 equally-sized spikes
        assert!(find_big_maxes(&data, 10.0, 2, 0.9, 0.9).is_empty());
    }
}
