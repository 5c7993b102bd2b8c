//! Configuration management for the BallStreet core.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Cash a user's account opens with.
    pub starting_balance: Decimal,
    /// Reject buys the account cannot pay for.
    pub enforce_cash: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(10_000, 0),
            enforce_cash: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// `scale` in `tanh(mean_return_pct / scale)`.
    pub sentiment_scale: f64,
    /// Allowed deviation of a feature-importance sum from 1.0.
    pub weight_tolerance: f64,
    pub default_trending_window: usize,
    pub default_volatility_window: usize,
    pub default_top_n: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sentiment_scale: 10.0,
            weight_tolerance: 0.01,
            default_trending_window: 2,
            default_volatility_window: 30,
            default_top_n: 5,
        }
    }
}

/// Bounds of the linear box-score to price mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub score_floor: f64,
    pub score_ceiling: f64,
    pub price_floor: Decimal,
    pub price_ceiling: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            score_floor: -50.0,
            score_ceiling: 100.0,
            price_floor: Decimal::new(10, 0),
            price_ceiling: Decimal::new(1000, 0),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, on top of the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(v) = parse_env("BALLSTREET_STARTING_BALANCE")? {
            config.trading.starting_balance = v;
        }
        if let Some(v) = parse_env("BALLSTREET_ENFORCE_CASH")? {
            config.trading.enforce_cash = v;
        }
        if let Some(v) = parse_env("BALLSTREET_SENTIMENT_SCALE")? {
            config.analytics.sentiment_scale = v;
        }
        if let Some(v) = parse_env("BALLSTREET_WEIGHT_TOLERANCE")? {
            config.analytics.weight_tolerance = v;
        }
        if let Some(v) = parse_env("BALLSTREET_TRENDING_WINDOW")? {
            config.analytics.default_trending_window = v;
        }
        if let Some(v) = parse_env("BALLSTREET_VOLATILITY_WINDOW")? {
            config.analytics.default_volatility_window = v;
        }
        if let Some(v) = parse_env("BALLSTREET_TOP_N")? {
            config.analytics.default_top_n = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from `dir/default.toml` (optional) with `BALLSTREET__SECTION__KEY`
    /// environment overrides.
    pub fn load_from<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        let config: Self = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(::config::File::from(dir.join("default.toml")).required(false))
            .add_source(
                ::config::Environment::with_prefix("BALLSTREET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.trading.starting_balance < Decimal::ZERO {
            return Err(config_error("trading.starting_balance must not be negative"));
        }
        if !(self.analytics.sentiment_scale.is_finite() && self.analytics.sentiment_scale > 0.0) {
            return Err(config_error("analytics.sentiment_scale must be a positive number"));
        }
        let tolerance = self.analytics.weight_tolerance;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(config_error("analytics.weight_tolerance must not be negative"));
        }
        if self.pricing.score_ceiling <= self.pricing.score_floor {
            return Err(config_error("pricing.score_ceiling must exceed pricing.score_floor"));
        }
        if self.pricing.price_floor <= Decimal::ZERO
            || self.pricing.price_ceiling <= self.pricing.price_floor
        {
            return Err(config_error(
                "pricing.price_floor must be positive and below pricing.price_ceiling",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> Error {
    Error::Config {
        message: message.to_string(),
    }
}

/// Read and parse an optional variable; a present but unparsable value is an error.
fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| Error::Config {
            message: format!("{} has an invalid value: '{}'", name, raw),
        }),
        Err(_) => Ok(None),
    }
}
