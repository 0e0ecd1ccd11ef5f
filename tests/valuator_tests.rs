use async_trait::async_trait;
use compute_jobs::api::QuoteSource;
use compute_jobs::models::{Portfolio, PriceQuotes};
use compute_jobs::valuator;
use compute_jobs::{JobError, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

struct CannedQuotes {
    prices: PriceQuotes,
    requested: Mutex<Vec<Vec<String>>>,
}

impl CannedQuotes {
    fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            prices: pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

#[async_trait]
impl QuoteSource for CannedQuotes {
    async fn latest_quotes(&self, tickers: &[String]) -> Result<PriceQuotes> {
        self.requested.lock().unwrap().push(tickers.to_vec());
        Ok(self
            .prices
            .prices
            .iter()
            .filter(|(t, _)| tickers.contains(*t))
            .map(|(t, p)| (t.clone(), *p))
            .collect())
    }
}

struct FailingSource;

#[async_trait]
impl QuoteSource for FailingSource {
    async fn latest_quotes(&self, _tickers: &[String]) -> Result<PriceQuotes> {
        Err(JobError::http("HTTP 401 Unauthorized: This API Key is invalid."))
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("compute_jobs_valuator_{}_{}", std::process::id(), name));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn writes_report_for_known_portfolio() {
    let dir = scratch("known");
    let input = dir.join("portfolio.json");
    let output = dir.join("report.txt");
    fs::write(&input, r#"{"BTC": 2, "ETH": 5}"#).unwrap();
    fs::write(&output, "stale content that must be replaced\n").unwrap();

    let source = CannedQuotes::new(&[("BTC", 10000.0), ("ETH", 2000.0)]);
    let total = valuator::run(&input, &output, &source).await.unwrap();

    assert_eq!(total, 30000.0);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "The current value of your portfolio is $30000.\n"
    );
    let requested = source.requested.lock().unwrap();
    assert_eq!(requested.as_slice(), &[vec!["BTC".to_string(), "ETH".to_string()]]);
}

#[tokio::test]
async fn missing_quote_writes_nothing() {
    let dir = scratch("missing_quote");
    let input = dir.join("portfolio.json");
    let output = dir.join("report.txt");
    fs::write(&input, r#"{"BTC": 1, "NOTACOIN": 3}"#).unwrap();
    let _ = fs::remove_file(&output);

    let source = CannedQuotes::new(&[("BTC", 10000.0)]);
    let err = valuator::run(&input, &output, &source).await.unwrap_err();

    assert!(matches!(err, JobError::MissingQuote(ref t) if t == "NOTACOIN"));
    assert!(!output.exists());
}

#[tokio::test]
async fn missing_holdings_file_is_input_error() {
    let dir = scratch("no_input");
    let output = dir.join("report.txt");
    let _ = fs::remove_file(&output);

    let source = CannedQuotes::new(&[]);
    let err = valuator::run(&dir.join("absent.json"), &output, &source)
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Input(_)));
    assert_eq!(source.calls(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn malformed_holdings_file_is_input_error() {
    let dir = scratch("malformed");
    let input = dir.join("portfolio.json");
    fs::write(&input, "BTC: 2").unwrap();

    let err = valuator::run(&input, &dir.join("report.txt"), &CannedQuotes::new(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Input(_)));
}

#[tokio::test]
async fn pricing_failure_is_fatal() {
    let dir = scratch("http_failure");
    let input = dir.join("portfolio.json");
    let output = dir.join("report.txt");
    fs::write(&input, r#"{"BTC": 1}"#).unwrap();
    let _ = fs::remove_file(&output);

    let err = valuator::run(&input, &output, &FailingSource).await.unwrap_err();
    assert!(matches!(err, JobError::Http(_)));
    assert!(!output.exists());
}

#[tokio::test]
async fn empty_portfolio_skips_pricing() {
    let portfolio = Portfolio::from_json("{}").unwrap();
    let source = CannedQuotes::new(&[]);
    let total = valuator::value_portfolio(&portfolio, &source).await.unwrap();
    assert_eq!(total, 0.0);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn fractional_and_zero_quantities_are_summed() {
    let portfolio = Portfolio::from_json(r#"{"BTC": 0.5, "ETH": 0, "SOL": 10}"#).unwrap();
    let source = CannedQuotes::new(&[("BTC", 60000.0), ("ETH", 3000.0), ("SOL", 150.0)]);
    let total = valuator::value_portfolio(&portfolio, &source).await.unwrap();
    assert_eq!(total, 31500.0);
}
