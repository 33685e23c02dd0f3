use std::env;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Price oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub update_interval_secs: u64,
    pub band_min: f64,
    pub band_max: f64,
    pub seed_symbols: Vec<String>,
}

/// Fee policy configuration (INR)
#[derive(Debug, Clone)]
pub struct FeeConfig {
    pub min_inr: f64,
    pub max_inr: f64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub oracle: OracleConfig,
    pub fee: FeeConfig,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub environment: String,
}

/// Parse an optional environment variable, falling back to `default` when unset.
/// A value that is set but unparseable is an error rather than a silent default.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// Validate a half-open `[min, max)` band.
fn validate_band(name: &str, min: f64, max: f64) -> Result<(), String> {
    if !min.is_finite() || !max.is_finite() {
        return Err(format!("{} bounds must be finite", name));
    }
    if min < 0.0 {
        return Err(format!("{} lower bound must not be negative", name));
    }
    if min >= max {
        return Err(format!(
            "{} lower bound ({}) must be below upper bound ({})",
            name, min, max
        ));
    }
    Ok(())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10u32)?;
        let acquire_timeout_secs = parse_env("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = parse_env("DATABASE_IDLE_TIMEOUT_SECS", 600u64)?; // 10 minutes
        let max_lifetime_secs = parse_env("DATABASE_MAX_LIFETIME_SECS", 1800u64)?; // 30 minutes
        let test_before_acquire = parse_env("DATABASE_TEST_BEFORE_ACQUIRE", true)?;

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/stocky".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl OracleConfig {
    /// Create oracle config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let update_interval_secs = parse_env("PRICE_UPDATE_INTERVAL_SECS", 10u64)?;
        let band_min = parse_env("PRICE_BAND_MIN", 1500.0f64)?;
        let band_max = parse_env("PRICE_BAND_MAX", 2000.0f64)?;

        let seed_symbols = env::var("SEED_STOCK_SYMBOLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if update_interval_secs == 0 {
            return Err("PRICE_UPDATE_INTERVAL_SECS must be greater than 0".to_string());
        }
        validate_band("PRICE_BAND", band_min, band_max)?;
        if band_min == 0.0 {
            return Err("PRICE_BAND_MIN must be greater than 0".to_string());
        }

        Ok(Self {
            update_interval_secs,
            band_min,
            band_max,
            seed_symbols,
        })
    }

    /// Interval between price updater ticks, which is also the staleness bound
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn band(&self) -> Range<f64> {
        self.band_min..self.band_max
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 10,
            band_min: 1500.0,
            band_max: 2000.0,
            seed_symbols: Vec::new(),
        }
    }
}

impl FeeConfig {
    /// Create fee config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let min_inr = parse_env("FEE_MIN_INR", 10.0f64)?;
        let max_inr = parse_env("FEE_MAX_INR", 100.0f64)?;
        validate_band("FEE", min_inr, max_inr)?;

        Ok(Self { min_inr, max_inr })
    }

    pub fn band(&self) -> Range<f64> {
        self.min_inr..self.max_inr
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            min_inr: 10.0,
            max_inr: 100.0,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let oracle = OracleConfig::from_env()?;
        let fee = FeeConfig::from_env()?;

        let request_timeout_ms = parse_env("REQUEST_TIMEOUT_MS", 5000u64)?;
        if request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than 0".to_string());
        }

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            oracle,
            fee,
            request_timeout_ms,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    /// Default deadline applied to ledger writes and aggregation reads
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            oracle: OracleConfig::default(),
            fee: FeeConfig::default(),
            request_timeout_ms: 5000,
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
