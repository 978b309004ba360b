//! Command-line entry point for SVM-based AS peak classification.

use std::path::PathBuf;

use clap::Parser;
use routeleak_core::{classify, io, load_classifier};

/// Classify ASes as PEAK or NORMAL from their prefix/conflict series.
#[derive(Parser, Debug)]
#[command(name = "classification")]
struct Args {
    /// Processed prefix-count store (JSON-lines).
    pfx_file: PathBuf,
    /// Processed conflict-count store (JSON-lines).
    cfl_file: PathBuf,

    /// Write the PEAK AS map (`{asn: {prefixes, conflicts}}`) here instead of
    /// printing PEAK ASes one per line.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory holding the persisted model artefact (one of its three forms).
    #[arg(long = "model-dir", default_value = "model")]
    model_dir: PathBuf,
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
            eprintln!("classification: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> routeleak_core::Result<()> {
    let pfx = io::load_store(&args.pfx_file)?;
    let cfl = io::load_store(&args.cfl_file)?;
    let model = load_classifier(&args.model_dir)?;

    let results = classify(&model, &pfx, &cfl);

    if let Some(out_path) = args.out {
        let json = serde_json::to_string_pretty(&results.peak).map_err(|e| {
            routeleak_core::RouteLeakError::MalformedStoreLine(out_path.display().to_string(), e)
        })?;
        std::fs::write(&out_path, json).map_err(|source| routeleak_core::RouteLeakError::InputFile {
            path: out_path.display().to_string(),
            source,
        })?;
    } else {
        for asn in results.peak.keys() {
            println!("{asn}");
        }
    }

    Ok(())
}
