use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::input::FinancingDefaults;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings of the quote service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub defaults: FinancingDefaults,
}

impl ServiceConfig {
    /// Reads `BIND_ADDR` and the `FINANCING_DEFAULT_*` overrides from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("invalid BIND_ADDR")?;

        let mut defaults = FinancingDefaults::default();
        if let Some(term) = parse_var::<u32>(&lookup, "FINANCING_DEFAULT_TERM_MONTHS")? {
            defaults.term_months = term;
        }
        if let Some(apr) = parse_var::<Decimal>(&lookup, "FINANCING_DEFAULT_APR")? {
            defaults.annual_rate_percent = apr;
        }
        if let Some(down) = parse_var::<Decimal>(&lookup, "FINANCING_DEFAULT_DOWN_PERCENT")? {
            defaults.down_payment_percent = down;
        }
        if let Some(insurance) = parse_var::<Decimal>(&lookup, "FINANCING_DEFAULT_INSURANCE")? {
            defaults.monthly_insurance = insurance;
        }

        // Overrides must themselves be a valid request for a sample price.
        defaults
            .input_for(dec!(1_000_000))
            .validate()
            .context("invalid FINANCING_DEFAULT_* override")?;

        Ok(Self { bind_addr, defaults })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid {key}: {raw:?}"))
        })
        .transpose()
}
