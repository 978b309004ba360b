//! Loading of the processed input stores and model training artefacts
//! (spec §6).

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{Result, RouteLeakError};
use crate::types::{Series, Store};

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| RouteLeakError::InputFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Load a processed series store: one JSON object per line, with an
/// optional leading `{"start_date": "YYYY-MM-DD"}` line. Absent a
/// `start_date` line, leak days are later reported as raw indexes rather
/// than calendar dates.
pub fn load_store(path: &Path) -> Result<Store> {
    let reader = open(path)?;
    let mut start_date: Option<NaiveDate> = None;
    let mut series: Series = BTreeMap::new();

    for line in reader.lines() {
        let line = line.map_err(|source| RouteLeakError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| RouteLeakError::MalformedStoreLine(path.display().to_string(), e))?;

        if let Some(obj) = value.as_object() {
            if let Some(date_str) = obj.get("start_date").and_then(Value::as_str) {
                start_date = Some(NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
                    RouteLeakError::InvalidParameter {
                        param: "start_date".to_string(),
                        value: date_str.to_string(),
                        reason: "expected YYYY-MM-DD".to_string(),
                    }
                })?);
                continue;
            }
            for (asn, values) in obj {
                let parsed: Vec<f64> = values
                    .as_array()
                    .ok_or_else(|| RouteLeakError::InvalidParameter {
                        param: asn.clone(),
                        value: values.to_string(),
                        reason: "expected an array of numbers".to_string(),
                    })?
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0))
                    .collect();
                series.insert(asn.clone(), parsed);
            }
        }
    }

    Ok(Store { start_date, series })
}

/// Load `asn,LABEL` rows (no header), as used for the model's training
/// labels.
pub fn load_labels_csv(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).map_err(RouteLeakError::Csv)?;
    let mut labels = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(RouteLeakError::Csv)?;
        if record.len() < 2 {
            continue;
        }
        labels.insert(record[0].to_string(), record[1].to_string());
    }
    Ok(labels)
}

/// Load a precomputed `{asn: [attribute, ...]}` feature map, one JSON
/// object on a single line.
pub fn load_feature_json(path: &Path) -> Result<HashMap<String, Vec<f64>>> {
    let mut reader = open(path)?;
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|source| RouteLeakError::InputFile {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: HashMap<String, Vec<f64>> =
        serde_json::from_str(&line).map_err(|e| RouteLeakError::MalformedStoreLine(path.display().to_string(), e))?;
    Ok(parsed)
}
