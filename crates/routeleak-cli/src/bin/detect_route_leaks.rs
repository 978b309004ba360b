//! Command-line entry point for heuristic full-view route-leak detection.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use routeleak_core::{detect_route_leaks, fit_params, io, Params};

/// Detect synchronized prefix/conflict peaks across AS time series.
#[derive(Parser, Debug)]
#[command(name = "detect_route_leaks")]
struct Args {
    /// Processed prefix-count store (JSON-lines).
    pfx_file: PathBuf,
    /// Processed conflict-count store (JSON-lines).
    cfl_file: PathBuf,

    /// Write the full leak-record map here instead of printing one line per AS.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    pfx_peak_min_value: Option<f64>,
    #[arg(long)]
    cfl_peak_min_value: Option<f64>,
    #[arg(long)]
    max_nb_peaks: Option<f64>,
    #[arg(long)]
    percent_similarity: Option<f64>,
    #[arg(long)]
    percent_std: Option<f64>,

    /// Fit every parameter not explicitly overridden instead of using the defaults.
    #[arg(long)]
    fit_params: bool,
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = Args::parse();
    let code = match run(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("detect_route_leaks: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> routeleak_core::Result<()> {
    let pfx = io::load_store(&args.pfx_file)?;
    let cfl = io::load_store(&args.cfl_file)?;

    let mut overrides = HashMap::new();
    if let Some(v) = args.pfx_peak_min_value {
        overrides.insert("pfx_peak_min_value".to_string(), v);
    }
    if let Some(v) = args.cfl_peak_min_value {
        overrides.insert("cfl_peak_min_value".to_string(), v);
    }
    if let Some(v) = args.max_nb_peaks {
        overrides.insert("max_nb_peaks".to_string(), v);
    }
    if let Some(v) = args.percent_similarity {
        overrides.insert("percent_similarity".to_string(), v);
    }
    if let Some(v) = args.percent_std {
        overrides.insert("percent_std".to_string(), v);
    }

    let params = if args.fit_params {
        fit_params(&pfx, &cfl, &overrides)?
    } else {
        let mut params = Params::default();
        for (name, value) in &overrides {
            params.set(name, *value)?;
        }
        params
    };

    let leaks = detect_route_leaks(&pfx, &cfl, &params)?;

    if let Some(out_path) = args.out {
        let json = serde_json::to_string_pretty(&leaks).map_err(|e| {
            routeleak_core::RouteLeakError::MalformedStoreLine(out_path.display().to_string(), e)
        })?;
        std::fs::write(&out_path, json).map_err(|source| routeleak_core::RouteLeakError::InputFile {
            path: out_path.display().to_string(),
            source,
        })?;
    } else {
        for (asn, record) in &leaks {
            let days: Vec<String> = record.leaks.iter().map(|d| d.to_string()).collect();
            println!("{{\"{asn}\": [{}]}}", days.iter().map(|d| format!("\"{d}\"")).collect::<Vec<_>>().join(", "));
        }
    }

    Ok(())
}
