// src/bin/predict.rs
use compute_jobs::classifier::{self, MODEL_PATH};
use env_logger::{Builder, Env};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <input_path> <output_path>", args[0]);
        return ExitCode::from(2);
    }
    let input_path = PathBuf::from(&args[1]);
    let output_path = PathBuf::from(&args[2]);

    info!("Classifying {}...", input_path.display());
    match classifier::run(&input_path, &output_path, Path::new(MODEL_PATH)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to classify image: {}", e);
            ExitCode::FAILURE
        }
    }
}
