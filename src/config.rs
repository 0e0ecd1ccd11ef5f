// src/config.rs
use std::env;

pub const API_KEY_VAR: &str = "CMC_API_KEY";
pub const API_URL_VAR: &str = "CMC_API_URL";

pub const DEFAULT_API_URL: &str = "https://pro-api.coinmarketcap.com";
pub const API_HOST: &str = "pro-api.coinmarketcap.com";
pub const QUOTES_PATH: &str = "/v1/cryptocurrency/quotes/latest";

// Placeholder only. Real deployments set CMC_API_KEY.
pub const DEFAULT_API_KEY: &str = "cmc-demo-key";

#[derive(Debug, Clone, PartialEq)]
pub struct ValuatorConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ValuatorConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup(API_KEY_VAR).unwrap_or_else(|| DEFAULT_API_KEY.to_string());
        let base_url = lookup(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(api_key, base_url)
    }

    pub fn quotes_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), QUOTES_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn falls_back_to_defaults() {
        let cfg = ValuatorConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.api_key, DEFAULT_API_KEY);
        assert_eq!(
            cfg.quotes_url(),
            "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest"
        );
    }

    #[test]
    fn environment_overrides_key_and_url() {
        let cfg = ValuatorConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "secret"),
            (API_URL_VAR, "http://104.17.137.178/"),
        ]));
        assert_eq!(cfg.api_key, "secret");
        assert_eq!(
            cfg.quotes_url(),
            "http://104.17.137.178/v1/cryptocurrency/quotes/latest"
        );
    }
}
