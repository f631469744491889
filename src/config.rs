use config::{Config, ConfigError, Environment, File};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::pricing::{PriceCalculator, PricingEngine, UnitConverter};
use crate::reconciliation::{Currency, RateBook};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://freight.db?mode=rwc";
const DEFAULT_TONNE_TO_M3: f64 = 1.0;
const DEFAULT_MIN_CONTAINER_VOLUME: f64 = 0.001;
const DEFAULT_AED_RATE: f64 = 4.0;
const DEFAULT_KMF_RATE: f64 = 491.96775;

/// Tonne to cubic metre factors and the container volume floor.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    #[serde(default = "default_tonne_to_m3")]
    pub tonne_to_m3_default: f64,

    /// Used when the container type mentions "20". Zero or unset falls back to the default.
    #[serde(default)]
    pub tonne_to_m3_20ft: Option<f64>,

    /// Used when the container type mentions "40". Zero or unset falls back to the default.
    #[serde(default)]
    pub tonne_to_m3_40ft: Option<f64>,

    /// Substituted for smaller container volumes when computing a client's share
    #[serde(default = "default_min_container_volume")]
    pub min_container_volume: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tonne_to_m3_default: DEFAULT_TONNE_TO_M3,
            tonne_to_m3_20ft: None,
            tonne_to_m3_40ft: None,
            min_container_volume: DEFAULT_MIN_CONTAINER_VOLUME,
        }
    }
}

impl PricingConfig {
    /// Builds the engine every pricing path shares.
    pub fn engine(&self) -> PricingEngine {
        let calculator = Decimal::from_f64(self.min_container_volume)
            .map(PriceCalculator::new)
            .unwrap_or_default();
        PricingEngine::new(calculator, UnitConverter::from(self))
    }

    fn collect_errors(&self, errors: &mut ValidationErrors) {
        if !self.tonne_to_m3_default.is_finite() || self.tonne_to_m3_default <= 0.0 {
            errors.add(
                "pricing.tonne_to_m3_default",
                validation_error("tonne_to_m3_default", "must be a finite value greater than 0"),
            );
        }
        for (field, value) in [
            ("pricing.tonne_to_m3_20ft", self.tonne_to_m3_20ft),
            ("pricing.tonne_to_m3_40ft", self.tonne_to_m3_40ft),
        ] {
            if matches!(value, Some(v) if !v.is_finite() || v < 0.0) {
                errors.add(field, validation_error("tonne_to_m3", "must not be negative"));
            }
        }
        if !self.min_container_volume.is_finite() || self.min_container_volume <= 0.0 {
            errors.add(
                "pricing.min_container_volume",
                validation_error("min_container_volume", "must be greater than 0"),
            );
        }
    }
}

/// Cash count settings.
///
/// Currencies are kept as codes here. Codes are case-insensitive, and the
/// environment layer lowercases them while files keep them as written.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BilletageConfig {
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,

    /// Foreign units per reporting unit, used when a count omits a rate.
    /// Entries override the built-in AED and KMF rates.
    #[serde(default)]
    pub default_rates: BTreeMap<String, f64>,

    /// Differences within this amount are reported as balanced
    #[serde(default)]
    pub balance_tolerance: f64,
}

impl Default for BilletageConfig {
    fn default() -> Self {
        Self {
            reporting_currency: default_reporting_currency(),
            default_rates: BTreeMap::new(),
            balance_tolerance: 0.0,
        }
    }
}

impl BilletageConfig {
    /// Falls back to EUR for an unrecognised code; loading rejects those.
    pub fn reporting_currency(&self) -> Currency {
        Currency::from_str(self.reporting_currency.trim()).unwrap_or(Currency::Eur)
    }

    /// Built-in rates overlaid with the configured ones. Unrecognised codes
    /// are dropped; loading rejects those and conflicting spellings.
    pub fn rates(&self) -> BTreeMap<Currency, Decimal> {
        let mut rates = builtin_rates();
        rates.extend(self.default_rates.iter().filter_map(|(code, rate)| {
            let currency = Currency::from_str(code.trim()).ok()?;
            Some((currency, Decimal::from_f64(*rate)?))
        }));
        rates
    }

    pub fn rate_book(&self) -> RateBook {
        RateBook::from(self)
    }

    pub fn tolerance(&self) -> Decimal {
        Decimal::from_f64(self.balance_tolerance).unwrap_or_default()
    }

    fn collect_errors(&self, errors: &mut ValidationErrors) {
        if Currency::from_str(self.reporting_currency.trim()).is_err() {
            errors.add(
                "billetage.reporting_currency",
                validation_error("reporting_currency", "Must be one of: EUR, AED, KMF"),
            );
        }
        if self
            .default_rates
            .keys()
            .any(|code| Currency::from_str(code.trim()).is_err())
        {
            errors.add(
                "billetage.default_rates",
                validation_error("default_rates", "unknown currency code"),
            );
        }
        let mut seen: BTreeMap<Currency, f64> = BTreeMap::new();
        for (code, rate) in &self.default_rates {
            let Ok(currency) = Currency::from_str(code.trim()) else {
                continue;
            };
            if seen.insert(currency, *rate).is_some_and(|other| other != *rate) {
                errors.add(
                    "billetage.default_rates",
                    validation_error(
                        "default_rates",
                        "a currency is given two different rates under different spellings",
                    ),
                );
                break;
            }
        }
        if self
            .default_rates
            .values()
            .any(|rate| !rate.is_finite() || *rate <= 0.0)
        {
            errors.add(
                "billetage.default_rates",
                validation_error("default_rates", "exchange rates must be greater than 0"),
            );
        }
        if !self.balance_tolerance.is_finite() || self.balance_tolerance < 0.0 {
            errors.add(
                "billetage.balance_tolerance",
                validation_error("balance_tolerance", "must not be negative"),
            );
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub billetage: BilletageConfig,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            pricing: PricingConfig::default(),
            billetage: BilletageConfig::default(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                validation_error(
                    "db_min_connections",
                    "db_min_connections must not exceed db_max_connections",
                ),
            );
        }
        self.pricing.collect_errors(&mut errors);
        self.billetage.collect_errors(&mut errors);

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    8
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_tonne_to_m3() -> f64 {
    DEFAULT_TONNE_TO_M3
}

fn default_min_container_volume() -> f64 {
    DEFAULT_MIN_CONTAINER_VOLUME
}

fn default_reporting_currency() -> String {
    Currency::Eur.to_string()
}

fn builtin_rates() -> BTreeMap<Currency, Decimal> {
    [
        (Currency::Aed, DEFAULT_AED_RATE),
        (Currency::Kmf, DEFAULT_KMF_RATE),
    ]
    .into_iter()
    .filter_map(|(currency, rate)| Some((currency, Decimal::from_f64(rate)?)))
    .collect()
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(validation_error(
            "log_level",
            "Must be one of: trace, debug, info, warn, error",
        ))
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("freight_office={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("pricing.tonne_to_m3_default", DEFAULT_TONNE_TO_M3)?
        .set_default("pricing.min_container_volume", DEFAULT_MIN_CONTAINER_VOLUME)?
        .set_default("billetage.reporting_currency", "EUR")?
        .set_default("billetage.balance_tolerance", 0.0)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::TempDir;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    fn write_config(name: &str, content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(format!("{name}.toml")), content).unwrap();
        dir
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_eq!(cfg.billetage.reporting_currency(), Currency::Eur);
        assert_eq!(cfg.billetage.rates()[&Currency::Aed], dec!(4));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_factors() {
        let mut cfg = base_config();
        cfg.pricing.tonne_to_m3_default = 0.0;
        cfg.pricing.tonne_to_m3_40ft = Some(-1.0);
        let errors = cfg.validate_additional_constraints().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("pricing.tonne_to_m3_default"));
        assert!(fields.contains_key("pricing.tonne_to_m3_40ft"));
    }

    #[test]
    fn rejects_zero_exchange_rate() {
        let mut cfg = base_config();
        cfg.billetage.default_rates.insert("aed".into(), 0.0);
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn configured_rates_override_builtins_in_any_case() {
        let mut cfg = base_config();
        cfg.billetage.default_rates.insert("Aed".into(), 3.9);
        let rates = cfg.billetage.rates();
        assert_eq!(rates[&Currency::Aed], dec!(3.9));
        assert_eq!(rates[&Currency::Kmf], dec!(491.96775));
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn rejects_conflicting_rate_spellings() {
        let mut cfg = base_config();
        cfg.billetage.default_rates.insert("AED".into(), 3.9);
        cfg.billetage.default_rates.insert("aed".into(), 4.0);
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.errors().contains_key("billetage.default_rates"));

        cfg.billetage.default_rates.insert("aed".into(), 3.9);
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn rejects_unknown_currency_codes() {
        let mut cfg = base_config();
        cfg.billetage.reporting_currency = "USD".into();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.errors().contains_key("billetage.reporting_currency"));
    }

    #[test]
    fn pricing_engine_uses_configured_factors() {
        let mut cfg = base_config();
        cfg.pricing.tonne_to_m3_40ft = Some(1.5);
        let engine = cfg.pricing.engine();
        assert_eq!(
            engine.converter().tonne_to_m3_factor(Some("40ft HC")),
            dec!(1.5)
        );
        assert_eq!(engine.converter().tonne_to_m3_factor(Some("20ft")), dec!(1));
        assert_eq!(engine.calculator().min_container_volume(), dec!(0.001));
    }

    #[test]
    fn loads_layered_files() {
        let dir = write_config(
            "default",
            r#"
                database_url = "sqlite::memory:"
                port = 9000

                [pricing]
                tonne_to_m3_20ft = 1.2

                [billetage.default_rates]
                AED = 3.9
            "#,
        );
        fs::write(
            dir.path().join("staging.toml"),
            "log_level = \"debug\"\n[pricing]\nmin_container_volume = 0.5\n",
        )
        .unwrap();

        let cfg = load_config_from(dir.path(), "staging").unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.environment, "staging");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.pricing.tonne_to_m3_20ft, Some(1.2));
        assert_eq!(cfg.pricing.tonne_to_m3_default, 1.0);
        assert_eq!(cfg.pricing.min_container_volume, 0.5);
        let rates = cfg.billetage.rates();
        assert_eq!(rates[&Currency::Aed], dec!(3.9));
        assert_eq!(rates[&Currency::Kmf], dec!(491.96775));
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let dir = write_config(
            "default",
            "database_url = \"sqlite::memory:\"\n[billetage]\nbalance_tolerance = -1.0\n",
        );
        assert_matches!(
            load_config_from(dir.path(), "default"),
            Err(AppConfigError::Validation(_))
        );
    }
}
