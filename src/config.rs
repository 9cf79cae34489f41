use crate::edge::comparator::EdgeThresholds;
use crate::errors::{EngineError, EngineResult};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub deribit_base_url: String,
    pub gamma_base_url: String,
    pub underlying: String,
    pub risk_free_rate: f64,
    pub thresholds: EdgeThresholds,
    pub max_replicated_probability: f64,
    pub gamma_page_limit: u32,
    pub gamma_max_markets: usize,
    pub http_timeout_secs: u64,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let thresholds = EdgeThresholds {
            overpriced: parse_env("OVERPRICED_THRESHOLD", "0.10")?,
            underpriced: parse_env("UNDERPRICED_THRESHOLD", "0.10")?,
        };

        let config = Self {
            deribit_base_url: env_var_or("DERIBIT_BASE_URL", "https://www.deribit.com/api/v2"),
            gamma_base_url: env_var_or("GAMMA_BASE_URL", "https://gamma-api.polymarket.com"),
            underlying: env_var_or("UNDERLYING", "BTC").to_uppercase(),
            risk_free_rate: parse_env("RISK_FREE_RATE", "0.04")?,
            thresholds,
            max_replicated_probability: parse_env("MAX_REPLICATED_PROBABILITY", "1.05")?,
            gamma_page_limit: parse_env("GAMMA_PAGE_LIMIT", "500")?,
            gamma_max_markets: parse_env("GAMMA_MAX_MARKETS", "3000")?,
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", "10")?,
            server_port: parse_env("SERVER_PORT", "3001")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::Config("RISK_FREE_RATE must be finite".into()));
        }
        if !(self.thresholds.overpriced >= 0.0 && self.thresholds.underpriced >= 0.0) {
            return Err(EngineError::Config("edge thresholds must be non-negative".into()));
        }
        if !(self.max_replicated_probability > 0.0) {
            return Err(EngineError::Config(
                "MAX_REPLICATED_PROBABILITY must be positive".into(),
            ));
        }
        if self.gamma_page_limit == 0 {
            return Err(EngineError::Config("GAMMA_PAGE_LIMIT must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, default: &str) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var_or(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            deribit_base_url: "http://localhost".into(),
            gamma_base_url: "http://localhost".into(),
            underlying: "BTC".into(),
            risk_free_rate: 0.04,
            thresholds: EdgeThresholds::default(),
            max_replicated_probability: 1.05,
            gamma_page_limit: 500,
            gamma_max_markets: 3000,
            http_timeout_secs: 10,
            server_port: 3001,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut cfg = base();
        cfg.thresholds.underpriced = -0.1;
        assert!(matches!(cfg.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let mut cfg = base();
        cfg.gamma_page_limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_env_default_used() {
        let v: f64 = parse_env("TOUCH_EDGE_TEST_UNSET_KEY", "0.25").unwrap();
        assert_eq!(v, 0.25);
    }

    #[test]
    fn test_parse_env_bad_value_is_config_error() {
        let r: EngineResult<u16> = parse_env("TOUCH_EDGE_TEST_UNSET_KEY_2", "not-a-port");
        assert!(matches!(r, Err(EngineError::Config(_))));
    }
}
