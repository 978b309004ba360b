//! Leak detector (spec §4.C): synchronized significant peaks across the
//! prefix-announcement series and the conflict series for the same AS.

use std::collections::BTreeMap;

use chrono::Duration;
use rayon::prelude::*;

use crate::coalesce::{coalesce, put_duplicates_back};
use crate::error::{Result, RouteLeakError};
use crate::peaks::find_big_maxes;
use crate::types::{LeakDay, LeakRecord, Params, Store};

/// Series shorter than this are considered too sparse to run detection on
/// at all; the result is an empty map, not an error.
pub const MIN_NB_DAYS: usize = 31;

/// Find route leaks: ASes whose prefix series and conflict series both
/// exhibit a significant peak on the same day.
pub fn detect_route_leaks(pfx: &Store, cfl: &Store, params: &Params) -> Result<BTreeMap<String, LeakRecord>> {
    if pfx.start_date != cfl.start_date {
        return Err(RouteLeakError::StartDateMismatch {
            pfx: format_start_date(pfx.start_date),
            cfl: format_start_date(cfl.start_date),
        });
    }
    let pfx_len = pfx.series_len();
    let cfl_len = cfl.series_len();
    if pfx_len != cfl_len {
        return Err(RouteLeakError::LengthMismatch { pfx: pfx_len, cfl: cfl_len });
    }
    if pfx_len < MIN_NB_DAYS {
        return Ok(BTreeMap::new());
    }

    let pfx_peaks = ases_with_peak(&pfx.series, params.pfx_peak_min_value, params);
    let cfl_peaks = ases_with_peak(&cfl.series, params.cfl_peak_min_value, params);

    let mut route_leaks = BTreeMap::new();
    for (asn, cfl_idx) in &cfl_peaks {
        if let Some(pfx_idx) = pfx_peaks.get(asn) {
            let mut leaks: Vec<usize> = pfx_idx.iter().filter(|i| cfl_idx.contains(i)).copied().collect();
            leaks.sort_unstable();
            if leaks.is_empty() {
                continue;
            }
            let days = leaks
                .iter()
                .map(|&i| match pfx.start_date {
                    Some(start) => LeakDay::Date(start + Duration::days(i as i64)),
                    None => LeakDay::Index(i),
                })
                .collect();
            route_leaks.insert(
                asn.clone(),
                LeakRecord {
                    leaks: days,
                    prefixes: pfx.series[asn].clone(),
                    conflicts: cfl.series[asn].clone(),
                },
            );
        }
    }

    Ok(route_leaks)
}

fn format_start_date(start_date: Option<chrono::NaiveDate>) -> String {
    start_date.map_or_else(|| "none".to_string(), |d| d.to_string())
}

fn ases_with_peak(data: &crate::types::Series, peak_min_value: f64, params: &Params) -> BTreeMap<String, Vec<usize>> {
    let coalesced = coalesce(data);

    let mut peaks: BTreeMap<String, Vec<usize>> = coalesced
        .unique
        .par_iter()
        .filter_map(|(asn, series)| {
            let max_value = series.iter().cloned().fold(f64::MIN, f64::max);
            if max_value < peak_min_value {
                return None;
            }
            let found = find_big_maxes(series, peak_min_value, params.max_nb_peaks, params.percent_similarity, params.percent_std);
            if found.is_empty() {
                None
            } else {
                Some((asn.clone(), found))
            }
        })
        .collect();

    put_duplicates_back(&mut peaks, &coalesced.duplicates);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn flat_series_of(len: usize, value: f64) -> Vec<f64> {
        vec![value; len]
    }

    #[test]
    fn rejects_mismatched_start_dates() {
        let pfx = Store {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            series: BTreeMap::new(),
        };
        let cfl = Store {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            series: BTreeMap::new(),
        };
        assert!(matches!(
            detect_route_leaks(&pfx, &cfl, &Params::default()),
            Err(RouteLeakError::StartDateMismatch { .. })
        ));
    }

    #[test]
    fn returns_empty_map_for_too_short_series() {
        let mut pfx_series = BTreeMap::new();
        pfx_series.insert("1".to_string(), flat_series_of(10, 1.0));
        let mut cfl_series = BTreeMap::new();
        cfl_series.insert("1".to_string(), flat_series_of(10, 1.0));

        let start = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let pfx = Store { start_date: start, series: pfx_series };
        let cfl = Store { start_date: start, series: cfl_series };

        let result = detect_route_leaks(&pfx, &cfl, &Params::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn detects_synchronized_spike() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut pfx_data = flat_series_of(40, 1.0);
        let mut cfl_data = flat_series_of(40, 1.0);
        pfx_data[20] = 200.0;
        cfl_data[20] = 200.0;

        let mut pfx_series = BTreeMap::new();
        pfx_series.insert("1".to_string(), pfx_data);
        let mut cfl_series = BTreeMap::new();
        cfl_series.insert("1".to_string(), cfl_data);

        let pfx = Store { start_date: Some(start), series: pfx_series };
        let cfl = Store { start_date: Some(start), series: cfl_series };

        let result = detect_route_leaks(&pfx, &cfl, &Params::default()).unwrap();
        assert_eq!(result["1"].leaks, vec![LeakDay::Date(start + Duration::days(20))]);
    }

    #[test]
    fn reports_raw_indexes_when_start_date_unknown() {
        let mut pfx_data = flat_series_of(40, 1.0);
        let mut cfl_data = flat_series_of(40, 1.0);
        pfx_data[20] = 200.0;
        cfl_data[20] = 200.0;

        let mut pfx_series = BTreeMap::new();
        pfx_series.insert("1".to_string(), pfx_data);
        let mut cfl_series = BTreeMap::new();
        cfl_series.insert("1".to_string(), cfl_data);

        let pfx = Store { start_date: None, series: pfx_series };
        let cfl = Store { start_date: None, series: cfl_series };

        let result = detect_route_leaks(&pfx, &cfl, &Params::default()).unwrap();
        assert_eq!(result["1"].leaks, vec![LeakDay::Index(20)]);
    }
}
