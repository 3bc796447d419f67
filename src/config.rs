//! Environment configuration.

use anyhow::Context;
use rust_decimal::Decimal;

use crate::domain::aggregates::vat_profile::DEFAULT_VAT_RATE;
use crate::pricing::vat::DEFAULT_CURRENCY;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub max_connections: u32,
    pub pricing: PricingConfig,
}

/// Settings the request handlers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    pub default_vat_rate: Decimal,
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { default_vat_rate: Decimal::new(DEFAULT_VAT_RATE, 0), currency: DEFAULT_CURRENCY.to_string() }
    }
}

impl Config {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = match lookup("PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid PORT: {v}"))?,
            None => 8083,
        };
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("invalid DB_MAX_CONNECTIONS: {v}"))?,
            None => 10,
        };
        let mut pricing = PricingConfig::default();
        if let Some(v) = lookup("DEFAULT_VAT_RATE") {
            pricing.default_vat_rate = v.parse().with_context(|| format!("invalid DEFAULT_VAT_RATE: {v}"))?;
        }
        if let Some(v) = lookup("CURRENCY").filter(|v| !v.is_empty()) {
            pricing.currency = v;
        }
        Ok(Self {
            database_url,
            port,
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            max_connections,
            pricing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/olfong")])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.nats_url, None);
        assert_eq!(cfg.pricing, PricingConfig::default());
    }

    #[test]
    fn test_overrides_and_errors() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/olfong"),
            ("PORT", "9000"),
            ("DEFAULT_VAT_RATE", "11"),
            ("NATS_URL", "nats://bus:4222"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.pricing.default_vat_rate, Decimal::new(11, 0));
        assert_eq!(cfg.nats_url.as_deref(), Some("nats://bus:4222"));

        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("PORT", "eighty")])).is_err());
    }
}
