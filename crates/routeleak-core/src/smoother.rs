//! Series smoothing: replace isolated missing-data zeros with an interpolated
//! estimate before peak detection runs on a series.

/// Max number of zero entries in a series still treated as "missing data"
/// rather than genuine zero-traffic days. Series with more zeros than this
/// are left untouched: that much silence is itself informative.
pub const MAX_NB_ZERO_TO_RM: usize = 5;

/// `peak_min_value` used by the classification feature pipeline's own
/// smoothing pass, independent of whatever peak-detection parameters are in
/// effect for the run (see spec §4.A).
pub const CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE: f64 = 10.0;

/// Replace isolated zero entries in `data` with an estimate derived from
/// their neighbours, guarding against using a neighbouring peak as the
/// estimate's basis.
///
/// A value is smoothed only when the series has more than zero and fewer
/// than [`MAX_NB_ZERO_TO_RM`] zero entries; otherwise `data` is returned
/// unchanged. Replacement happens left to right, in place: once a zero is
/// replaced, its new value is what the next zero (if adjacent) sees as its
/// "previous" neighbour.
pub fn speculate_missing_values(data: &[f64], peak_min_value: f64) -> Vec<f64> {
    let n_zeros = data.iter().filter(|&&v| v == 0.0).count();
    if !(0 < n_zeros && n_zeros < MAX_NB_ZERO_TO_RM) {
        return data.to_vec();
    }

    let non_zero: Vec<f64> = data.iter().copied().filter(|&v| v != 0.0).collect();
    let avg = non_zero.iter().sum::<f64>() / non_zero.len() as f64;

    let mut out = data.to_vec();
    for i in 0..data.len() {
        if out[i] != 0.0 {
            continue;
        }
        if i == 0 {
            out[i] = find_mock_value(data[i + 1], avg, peak_min_value);
        } else if i == data.len() - 1 {
            out[i] = find_mock_value(out[i - 1], avg, peak_min_value);
        } else {
            let next_v = find_mock_value(data[i + 1], avg, peak_min_value);
            let prev_v = find_mock_value(out[i - 1], avg, peak_min_value);
            out[i] = (prev_v + next_v) / 2.0;
        }
    }
    out
}

/// Pick `hint` as the replacement value unless it looks like a peak itself
/// (farther than `peak_min_value / 2` from the zero-excluded average), in
/// which case fall back to the average.
fn find_mock_value(hint: f64, avg: f64, peak_min_value: f64) -> f64 {
    if (hint - avg).abs() < peak_min_value / 2.0 {
        hint
    } else {
        avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn leaves_data_untouched_when_no_zeros() {
        let data = vec![1.0, 2.0, 3.0];
        assert_eq!(speculate_missing_values(&data, 10.0), data);
    }

    #[test]
    fn leaves_data_untouched_when_too_many_zeros() {
        let data = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(speculate_missing_values(&data, 10.0), data);
    }

    #[test]
    fn fills_interior_zero_with_neighbour_average() {
        let data = vec![4.0, 0.0, 6.0, 5.0, 7.0];
        let out = speculate_missing_values(&data, 10.0);
        assert_relative_eq!(out[1], 5.0);
    }

    #[test]
    fn guards_against_peak_contaminated_neighbour() {
        // avg of non-zero values: (4 + 100 + 5 + 7) / 4 = 29
        let data = vec![4.0, 0.0, 100.0, 5.0, 7.0];
        let out = speculate_missing_values(&data, 10.0);
        // neighbour 100 is > 5 away from avg 29, so the average is used for that side
        assert_relative_eq!(out[1], (29.0 + 4.0) / 2.0);
    }

    #[test]
    fn fills_first_and_last_from_single_neighbour() {
        let data = vec![0.0, 4.0, 6.0, 0.0];
        let out = speculate_missing_values(&data, 10.0);
        assert_relative_eq!(out[0], 4.0);
        assert_relative_eq!(out[3], 6.0);
    }
}
