//! SVM model runner (spec §4.G): load a trained classifier from whichever
//! of three persisted forms is available, and apply it to fresh prefix /
//! conflict stores to label each AS `PEAK` or `NORMAL`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};

use crate::error::{Result, RouteLeakError};
use crate::features::extract_features;
use crate::io;
use crate::smoother::{speculate_missing_values, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE};
use crate::types::Store;

const C_GRID: [f64; 7] = [0.01, 0.1, 1.0, 10.0, 100.0, 1000.0, 10000.0];
const GAMMA_GRID: [f64; 2] = [0.001, 0.0001];
const CV_FOLDS: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Kernel {
    Linear,
    Rbf(f64),
}

#[derive(Debug, Clone, Copy)]
struct HyperParams {
    c: f64,
    kernel: Kernel,
}

fn param_grid() -> Vec<HyperParams> {
    let mut grid: Vec<HyperParams> = C_GRID.iter().map(|&c| HyperParams { c, kernel: Kernel::Linear }).collect();
    for &c in &C_GRID {
        for &gamma in &GAMMA_GRID {
            grid.push(HyperParams { c, kernel: Kernel::Rbf(gamma) });
        }
    }
    grid
}

fn fit_svm(features: &Array2<f64>, labels: &Array1<bool>, params: HyperParams) -> Result<Svm<f64, bool>> {
    let dataset = Dataset::new(features.clone(), labels.clone());
    let builder = Svm::<f64, bool>::params().pos_neg_weights(params.c, params.c);
    let fitted = match params.kernel {
        Kernel::Linear => builder.linear_kernel(),
        Kernel::Rbf(gamma) => builder.gaussian_kernel(gamma),
    }
    .fit(&dataset)
    .map_err(|e| RouteLeakError::ModelFit(e.to_string()))?;
    Ok(fitted)
}

fn accuracy(model: &Svm<f64, bool>, features: &Array2<f64>, labels: &Array1<bool>) -> f64 {
    let predictions = model.predict(features.clone());
    let correct = predictions.iter().zip(labels.iter()).filter(|(p, l)| *p == *l).count();
    correct as f64 / labels.len().max(1) as f64
}

/// Mean k-fold cross-validated accuracy for one hyper-parameter setting.
fn cross_val_accuracy(features: &Array2<f64>, labels: &Array1<bool>, params: HyperParams) -> f64 {
    let n = labels.len();
    if n < CV_FOLDS {
        return 0.0;
    }
    let fold_size = n / CV_FOLDS;
    let mut scores = Vec::with_capacity(CV_FOLDS);

    for fold in 0..CV_FOLDS {
        let test_start = fold * fold_size;
        let test_end = if fold == CV_FOLDS - 1 { n } else { test_start + fold_size };

        let train_idx: Vec<usize> = (0..n).filter(|i| !(test_start..test_end).contains(i)).collect();
        let test_idx: Vec<usize> = (test_start..test_end).collect();
        if train_idx.is_empty() || test_idx.is_empty() {
            continue;
        }

        let train_x = features.select(ndarray::Axis(0), &train_idx);
        let train_y = Array1::from_iter(train_idx.iter().map(|&i| labels[i]));
        let test_x = features.select(ndarray::Axis(0), &test_idx);
        let test_y = Array1::from_iter(test_idx.iter().map(|&i| labels[i]));

        if let Ok(model) = fit_svm(&train_x, &train_y, params) {
            scores.push(accuracy(&model, &test_x, &test_y));
        }
    }

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Sweep the fixed hyper-parameter grid, score each by mean cross-validated
/// accuracy, and refit the winner on the full training set.
fn grid_search_and_refit(features: &Array2<f64>, labels: &Array1<bool>) -> Result<Svm<f64, bool>> {
    let best = param_grid()
        .into_iter()
        .map(|params| (params, cross_val_accuracy(features, labels, params)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(params, _)| params)
        .ok_or_else(|| RouteLeakError::ModelFit("empty hyper-parameter grid".to_string()))?;

    fit_svm(features, labels, best)
}

fn build_training_set(input_data: &HashMap<String, Vec<f64>>, labels: &HashMap<String, String>) -> Result<(Array2<f64>, Array1<bool>)> {
    let mut rows = Vec::with_capacity(input_data.len());
    let mut targets = Vec::with_capacity(input_data.len());

    for (asn, feats) in input_data {
        let label = labels.get(asn).ok_or_else(|| RouteLeakError::ModelFit(format!("no training label for AS {asn}")))?;
        rows.push(feats.clone());
        targets.push(label == "ABNORMAL");
    }

    let n = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let features = Array2::from_shape_vec((n, width), flat).map_err(|e| RouteLeakError::ModelFit(e.to_string()))?;
    Ok((features, Array1::from(targets)))
}

fn fit_model_to_data(input_data: &HashMap<String, Vec<f64>>, labels: &HashMap<String, String>) -> Result<Svm<f64, bool>> {
    let (features, targets) = build_training_set(input_data, labels)?;
    grid_search_and_refit(&features, &targets)
}

/// Eligible AS feature map keyed by ASN, built from the canonical
/// training stores the way the classifier's own input pipeline does.
fn build_svm_input(pfx: &Store, cfl: &Store) -> HashMap<String, Vec<f64>> {
    let mut input = HashMap::new();
    for (asn, pfx_raw) in &pfx.series {
        let Some(cfl_raw) = cfl.series.get(asn) else { continue };

        let pfx_smoothed = speculate_missing_values(pfx_raw, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE);
        let cfl_smoothed = speculate_missing_values(cfl_raw, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE);

        if is_to_skip(&pfx_smoothed, &cfl_smoothed) {
            continue;
        }
        input.insert(asn.clone(), extract_features(&pfx_smoothed, &cfl_smoothed));
    }
    input
}

fn population_std(data: &[f64]) -> f64 {
    crate::peaks::population_std(data)
}

fn normalized_variation(raw: &[f64]) -> Vec<f64> {
    let var: Vec<f64> = raw.windows(2).map(|w| w[1] - w[0]).collect();
    let max_abs = var.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    if max_abs == 0.0 {
        vec![0.0; var.len()]
    } else {
        var.iter().map(|v| v / max_abs).collect()
    }
}

/// An AS is not worth classifying if either side's normalized variation is
/// constant (zero standard deviation) — there is no signal to classify on.
fn is_to_skip(pfx_smoothed: &[f64], cfl_smoothed: &[f64]) -> bool {
    population_std(&normalized_variation(pfx_smoothed)) == 0.0 || population_std(&normalized_variation(cfl_smoothed)) == 0.0
}

/// Paths to the three possible forms of a persisted model artefact under
/// `model_dir`.
struct ArtefactPaths {
    fitted_model: PathBuf,
    svm_input: PathBuf,
    labels: PathBuf,
    pfx_csv: PathBuf,
    cfl_csv: PathBuf,
}

impl ArtefactPaths {
    fn under(model_dir: &Path) -> Self {
        Self {
            fitted_model: model_dir.join("svm_model.bin"),
            svm_input: model_dir.join("model_svm_input.json"),
            labels: model_dir.join("ases_init_labels.csv"),
            pfx_csv: model_dir.join("model_pfx_data.csv"),
            cfl_csv: model_dir.join("model_cfl_data.csv"),
        }
    }
}

/// Load the classifier from whichever of the three persisted forms is
/// available, preferring the fastest: a ready-fitted model, then
/// precomputed features, then canonical training data (re-fitting each
/// time that level is needed).
pub fn load_classifier(model_dir: &Path) -> Result<Svm<f64, bool>> {
    let paths = ArtefactPaths::under(model_dir);

    if paths.fitted_model.is_file() {
        let bytes = std::fs::read(&paths.fitted_model).map_err(|source| RouteLeakError::InputFile {
            path: paths.fitted_model.display().to_string(),
            source,
        })?;
        return bincode::deserialize(&bytes).map_err(RouteLeakError::Artefact);
    }

    if paths.svm_input.is_file() {
        let input_data = io::load_feature_json(&paths.svm_input)?;
        let labels = io::load_labels_csv(&paths.labels)?;
        return fit_model_to_data(&input_data, &labels);
    }

    if paths.pfx_csv.is_file() && paths.cfl_csv.is_file() {
        let pfx = io::load_store(&paths.pfx_csv)?;
        let cfl = io::load_store(&paths.cfl_csv)?;
        let labels = io::load_labels_csv(&paths.labels)?;
        let input_data = build_svm_input(&pfx, &cfl);
        return fit_model_to_data(&input_data, &labels);
    }

    Err(RouteLeakError::ModelArtefactAbsent { dir: model_dir.display().to_string() })
}

/// Persist a fitted classifier so that the fast path ([`load_classifier`]'s
/// first branch) picks it up on the next run.
pub fn save_classifier(model: &Svm<f64, bool>, output_file: &Path) -> Result<()> {
    let bytes = bincode::serialize(model).map_err(RouteLeakError::Artefact)?;
    std::fs::write(output_file, bytes).map_err(|source| RouteLeakError::InputFile {
        path: output_file.display().to_string(),
        source,
    })
}

/// The (smoothed) raw series an AS was classified from.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassifiedSeries {
    pub prefixes: Vec<f64>,
    pub conflicts: Vec<f64>,
}

/// Classification result for a whole run: ASes labelled `PEAK`, and those
/// labelled `NORMAL`, each keyed by ASN. Mirrors `get_classification_result`'s
/// `{"PEAK": {...}, "NORMAL": {...}}` return value — there is no separate
/// "leaks" key, despite what that method's docstring claims; its body never
/// sets one.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResults {
    pub peak: BTreeMap<String, ClassifiedSeries>,
    pub normal: BTreeMap<String, ClassifiedSeries>,
}

/// Classify every eligible AS in `pfx`/`cfl` with `model`.
pub fn classify(model: &Svm<f64, bool>, pfx: &Store, cfl: &Store) -> ClassificationResults {
    let mut results = ClassificationResults::default();

    for (asn, pfx_raw) in &pfx.series {
        let Some(cfl_raw) = cfl.series.get(asn) else { continue };

        let pfx_smoothed = speculate_missing_values(pfx_raw, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE);
        let cfl_smoothed = speculate_missing_values(cfl_raw, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE);
        if is_to_skip(&pfx_smoothed, &cfl_smoothed) {
            continue;
        }

        let feats = extract_features(&pfx_smoothed, &cfl_smoothed);
        let row = Array2::from_shape_vec((1, feats.len()), feats).expect("feature vector is non-empty");
        let prediction = model.predict(row);
        let series = ClassifiedSeries { prefixes: pfx_smoothed, conflicts: cfl_smoothed };

        let bucket = if prediction[0] { &mut results.peak } else { &mut results.normal };
        bucket.insert(asn.clone(), series);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_grid_covers_linear_and_rbf_combinations() {
        let grid = param_grid();
        assert_eq!(grid.len(), C_GRID.len() + C_GRID.len() * GAMMA_GRID.len());
    }

    #[test]
    fn is_to_skip_flags_constant_series() {
        let flat = vec![1.0; 10];
        let spiky = {
            let mut v = vec![1.0; 10];
            v[5] = 50.0;
            v
        };
        assert!(is_to_skip(&flat, &spiky));
        assert!(!is_to_skip(&spiky, &spiky));
    }
}
