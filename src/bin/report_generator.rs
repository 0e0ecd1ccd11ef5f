// src/bin/report_generator.rs
use compute_jobs::api::CoinMarketCapClient;
use compute_jobs::config::ValuatorConfig;
use compute_jobs::valuator;
use env_logger::{Builder, Env};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
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

    info!("Starting the portfolio report generator...");
    let client = CoinMarketCapClient::new(ValuatorConfig::from_env());
    match valuator::run(&input_path, &output_path, &client).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to value portfolio: {}", e);
            ExitCode::FAILURE
        }
    }
}
