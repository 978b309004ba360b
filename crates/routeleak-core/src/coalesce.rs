//! Duplicate-series coalescing (spec §4.D).
//!
//! ASes that announce exactly identical daily series are collapsed to a
//! single representative before peak detection runs, then the detection
//! result is fanned back out to every AS in the group. This is done
//! independently for the prefix series and the conflict series: two ASes
//! can be duplicates of each other on one side while being unique on the
//! other.

use std::collections::{BTreeMap, HashMap};

use crate::types::Series;

/// Coalesced view of a series map: one representative per distinct series,
/// plus the group of AS names each representative stands in for.
pub struct Coalesced {
    pub unique: Series,
    pub duplicates: HashMap<String, Vec<String>>,
}

/// Collapse `data` down to one entry per distinct series value. The first
/// AS encountered (in key order) becomes the representative for its group.
pub fn coalesce(data: &Series) -> Coalesced {
    let mut unique: Series = BTreeMap::new();
    let mut duplicates: HashMap<String, Vec<String>> = HashMap::new();
    let mut seen: HashMap<Vec<u64>, String> = HashMap::new();

    for (asn, series) in data {
        let key: Vec<u64> = series.iter().map(|v| v.to_bits()).collect();
        match seen.get(&key) {
            Some(base_asn) => {
                duplicates.entry(base_asn.clone()).or_default().push(asn.clone());
            }
            None => {
                seen.insert(key, asn.clone());
                unique.insert(asn.clone(), series.clone());
            }
        }
    }

    Coalesced { unique, duplicates }
}

/// Re-expand a per-representative peak map back out to every AS in its
/// duplicate group.
pub fn put_duplicates_back<V: Clone>(peaks: &mut BTreeMap<String, V>, duplicates: &HashMap<String, Vec<String>>) {
    for (asn, group) in duplicates {
        if let Some(value) = peaks.get(asn).cloned() {
            for dupl_asn in group {
                peaks.insert(dupl_asn.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_identical_series_independently_per_side() {
        let mut pfx: Series = BTreeMap::new();
        pfx.insert("1".into(), vec![1.0, 2.0, 3.0]);
        pfx.insert("2".into(), vec![1.0, 2.0, 3.0]);
        pfx.insert("3".into(), vec![9.0, 9.0, 9.0]);

        let coalesced = coalesce(&pfx);
        assert_eq!(coalesced.unique.len(), 2);
        assert_eq!(coalesced.duplicates.get("1"), Some(&vec!["2".to_string()]));
    }

    #[test]
    fn put_duplicates_back_fans_out_to_whole_group() {
        let mut peaks: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        peaks.insert("1".into(), vec![5]);
        let mut duplicates: HashMap<String, Vec<String>> = HashMap::new();
        duplicates.insert("1".into(), vec!["2".into(), "4".into()]);

        put_duplicates_back(&mut peaks, &duplicates);
        assert_eq!(peaks.get("2"), Some(&vec![5]));
        assert_eq!(peaks.get("4"), Some(&vec![5]));
    }
}
