// Application configuration
// Later layers win: defaults, then intraday.toml (or --config), then
// INTRADAY__* environment variables such as INTRADAY__CALCULATOR__CAPITAL=8000

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{TradeError, TradeResult};
use crate::indicators::Ema;
use crate::risk::{CalculatorConfig, PositionCalculator};

pub const DEFAULT_CONFIG_FILE: &str = "intraday";
pub const ENV_PREFIX: &str = "INTRADAY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub ema: EmaConfig,
    pub calculator: CalculatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub frequency_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frequency_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaConfig {
    /// Bars the average represents
    pub period: f64,
    /// Starting value; when unset the first observed price seeds the average
    pub seed: Option<f64>,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            period: 9.0,
            seed: None,
        }
    }
}

/// `INTRADAY__<SECTION>__<KEY>` maps to `<section>.<key>`
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load from the default file (optional) or `path` (required), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Self::from_builder(config::Config::builder().add_source(file).add_source(environment()))
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_builder(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AppConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;

        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Check every section once, before anything starts
    pub fn validate(&self) -> TradeResult<()> {
        if self.scheduler.frequency_minutes == 0 {
            return Err(TradeError::InvalidConfig(
                "scheduler.frequency_minutes must be positive".to_string(),
            ));
        }
        self.ema(self.ema.seed.unwrap_or(0.0))?;
        self.calculator()?;
        Ok(())
    }

    pub fn calculator(&self) -> TradeResult<PositionCalculator> {
        self.calculator.build()
    }

    /// EMA with the configured period, seeded from config or `fallback_seed`
    pub fn ema(&self, fallback_seed: f64) -> TradeResult<Ema> {
        Ema::new(self.ema.period, self.ema.seed.unwrap_or(fallback_seed))
    }
}
