// src/models.rs
use crate::error::{JobError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Holdings keyed by ticker. Ordered so the weighted sum is reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Portfolio {
    pub holdings: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| JobError::input(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
            .map_err(|e| JobError::input(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn tickers(&self) -> Vec<String> {
        self.holdings.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Sum of quantity times USD price. Fails on the first ticker without a quote.
    pub fn value(&self, quotes: &PriceQuotes) -> Result<f64> {
        self.holdings
            .iter()
            .map(|(ticker, quantity)| {
                quotes
                    .price(ticker)
                    .map(|price| quantity * price)
                    .ok_or_else(|| JobError::MissingQuote(ticker.clone()))
            })
            .sum()
    }
}

impl FromIterator<(String, f64)> for Portfolio {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Portfolio {
            holdings: iter.into_iter().collect(),
        }
    }
}

/// USD price per ticker as returned by the pricing API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuotes {
    pub prices: BTreeMap<String, f64>,
}

impl PriceQuotes {
    pub fn price(&self, ticker: &str) -> Option<f64> {
        self.prices.get(ticker).copied()
    }
}

impl FromIterator<(String, f64)> for PriceQuotes {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        PriceQuotes {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Scores for one image and the position of the best one.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub scores: Vec<f32>,
    pub index: usize,
}

impl Classification {
    /// Picks the highest score; ties go to the lowest index.
    pub fn from_scores(scores: Vec<f32>) -> Result<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                return Err(JobError::model(format!("score {} is NaN", i)));
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        let (index, _) = best.ok_or_else(|| JobError::model("model produced no scores"))?;
        Ok(Classification { scores, index })
    }

    pub fn label<'a>(&self, labels: &[&'a str]) -> Result<&'a str> {
        labels
            .get(self.index)
            .copied()
            .ok_or_else(|| JobError::label_mismatch(labels.len(), self.scores.len()))
    }
}
