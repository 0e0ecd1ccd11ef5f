// src/valuator.rs
use crate::api::QuoteSource;
use crate::error::{JobError, Result};
use crate::models::{Portfolio, PriceQuotes};
use log::info;
use std::fs;
use std::path::Path;

pub fn report_line(total: f64) -> String {
    format!("The current value of your portfolio is ${}.\n", total)
}

pub async fn value_portfolio(portfolio: &Portfolio, source: &dyn QuoteSource) -> Result<f64> {
    if portfolio.is_empty() {
        info!("Portfolio is empty, skipping price lookup.");
        return Ok(0.0);
    }
    let quotes: PriceQuotes = source.latest_quotes(&portfolio.tickers()).await?;
    portfolio.value(&quotes)
}

/// Loads holdings, prices them and writes the report. Nothing is written on failure.
pub async fn run(input_path: &Path, output_path: &Path, source: &dyn QuoteSource) -> Result<f64> {
    let portfolio = Portfolio::load(input_path)?;
    info!(
        "Loaded {} holdings from {}",
        portfolio.holdings.len(),
        input_path.display()
    );

    let total = value_portfolio(&portfolio, source).await?;

    fs::write(output_path, report_line(total))
        .map_err(|e| JobError::output(format!("{}: {}", output_path.display(), e)))?;
    info!("Portfolio value {} written to {}", total, output_path.display());
    Ok(total)
}
