// src/api.rs
use crate::config::{ValuatorConfig, API_HOST};
use crate::error::{JobError, Result};
use crate::models::PriceQuotes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
struct UsdQuote {
    price: f64,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Deserialize)]
struct CurrencyData {
    quote: Quote,
}

#[derive(Deserialize, Default)]
struct Status {
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    error_code: i64,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    status: Status,
    data: HashMap<String, CurrencyData>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    status: Status,
}

/// Anything that can price a set of tickers in USD.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn latest_quotes(&self, tickers: &[String]) -> Result<PriceQuotes>;
}

pub struct CoinMarketCapClient {
    client: Client,
    config: ValuatorConfig,
}

impl CoinMarketCapClient {
    pub fn new(config: ValuatorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl QuoteSource for CoinMarketCapClient {
    async fn latest_quotes(&self, tickers: &[String]) -> Result<PriceQuotes> {
        let url = self.config.quotes_url();
        let symbols = tickers.join(",");
        debug!("Requesting quotes for {} from {}", symbols, url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbols.as_str())])
            .header("Host", API_HOST)
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|r| r.status.error_message)
                .unwrap_or_else(|| body.clone());
            error!("Failed to fetch quotes: HTTP {}", status);
            return Err(JobError::http(format!("HTTP {}: {}", status, detail)));
        }

        parse_quotes(&body)
    }
}

/// Decodes a quotes body into a ticker to USD price map.
pub fn parse_quotes(body: &str) -> Result<PriceQuotes> {
    let response: QuotesResponse = serde_json::from_str(body)
        .map_err(|e| JobError::http(format!("malformed quotes response: {}", e)))?;

    if response.status.error_code != 0 {
        return Err(JobError::http(format!(
            "API error {}: {}",
            response.status.error_code,
            response.status.error_message.unwrap_or_default()
        )));
    }
    if let Some(ts) = response.status.timestamp {
        info!("Received {} quotes as of {}", response.data.len(), ts);
    }

    Ok(response
        .data
        .into_iter()
        .map(|(ticker, data)| (ticker, data.quote.usd.price))
        .collect())
}
