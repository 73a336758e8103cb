//! Runtime configuration read from `PRODUCTPILOT_*` environment variables.
//!
//! Every setting has a default so a bare `productpilot routine` runs
//! against local endpoints with the log notifier and the rule-based
//! strategy advisor.

use crate::application::daily_routine::RoutineSettings;
use crate::domain::error::DomainError;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "./productpilot.db";
pub const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PilotConfig {
    pub db_path: String,
    /// Notifications only reach the log when unset.
    pub webhook_url: Option<String>,
    pub market_url: String,
    pub social_url: String,
    pub social_username: Option<String>,
    pub social_password: Option<String>,
    pub research_url: String,
    /// `noop` or `ollama`.
    pub strategy_provider: String,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub unit_timeout: Duration,
    pub routine: RoutineSettings,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            webhook_url: None,
            market_url: "http://localhost:8081".to_string(),
            social_url: "http://localhost:8082".to_string(),
            social_username: None,
            social_password: None,
            research_url: "http://localhost:8083".to_string(),
            strategy_provider: "noop".to_string(),
            ollama_url: None,
            ollama_model: None,
            unit_timeout: Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS),
            routine: RoutineSettings::default(),
        }
    }
}

impl PilotConfig {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let unit_timeout = match get("PRODUCTPILOT_UNIT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    DomainError::InvalidInput(format!(
                        "PRODUCTPILOT_UNIT_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                if secs == 0 {
                    return Err("PRODUCTPILOT_UNIT_TIMEOUT_SECS must be greater than zero".into());
                }
                Duration::from_secs(secs)
            }
            None => defaults.unit_timeout,
        };

        let mut routine = defaults.routine.clone();
        if let Some(niche) = get("PRODUCTPILOT_NICHE") {
            routine.niche = niche;
        }
        if let Some(topics) = get("PRODUCTPILOT_RESEARCH_TOPICS") {
            routine.research_topics = split_list(&topics);
        }
        if let Some(ids) = get("PRODUCTPILOT_PRIORITY_PRODUCTS") {
            routine.priority_products = split_list(&ids);
        }
        if let Some(flag) = get("PRODUCTPILOT_KEEP_SESSIONS") {
            routine.release_sessions = !parse_bool(&flag)?;
        }

        Ok(Self {
            db_path: get("PRODUCTPILOT_DB").unwrap_or(defaults.db_path),
            webhook_url: get("PRODUCTPILOT_WEBHOOK_URL"),
            market_url: get("PRODUCTPILOT_MARKET_URL").unwrap_or(defaults.market_url),
            social_url: get("PRODUCTPILOT_SOCIAL_URL").unwrap_or(defaults.social_url),
            social_username: get("PRODUCTPILOT_SOCIAL_USERNAME"),
            social_password: get("PRODUCTPILOT_SOCIAL_PASSWORD"),
            research_url: get("PRODUCTPILOT_RESEARCH_URL").unwrap_or(defaults.research_url),
            strategy_provider: get("PRODUCTPILOT_STRATEGY_PROVIDER")
                .map(|p| p.to_lowercase())
                .unwrap_or(defaults.strategy_provider),
            ollama_url: get("PRODUCTPILOT_OLLAMA_URL"),
            ollama_model: get("PRODUCTPILOT_OLLAMA_MODEL"),
            unit_timeout,
            routine,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool, DomainError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DomainError::InvalidInput(format!("expected a boolean, got '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<PilotConfig, DomainError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PilotConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, DEFAULT_DB_PATH);
        assert_eq!(config.strategy_provider, "noop");
        assert!(config.webhook_url.is_none());
        assert_eq!(config.unit_timeout, Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS));
        assert!(config.routine.release_sessions);
    }

    #[test]
    fn test_lists_and_overrides() {
        let config = config_from(&[
            ("PRODUCTPILOT_RESEARCH_TOPICS", "rust, async ,,tokio"),
            ("PRODUCTPILOT_PRIORITY_PRODUCTS", "101,202"),
            ("PRODUCTPILOT_NICHE", "programming"),
            ("PRODUCTPILOT_UNIT_TIMEOUT_SECS", "15"),
            ("PRODUCTPILOT_WEBHOOK_URL", "  "),
            ("PRODUCTPILOT_STRATEGY_PROVIDER", "Ollama"),
            ("PRODUCTPILOT_KEEP_SESSIONS", "yes"),
        ])
        .unwrap();
        assert_eq!(config.routine.research_topics, vec!["rust", "async", "tokio"]);
        assert_eq!(config.routine.priority_products, vec!["101", "202"]);
        assert_eq!(config.routine.niche, "programming");
        assert_eq!(config.unit_timeout, Duration::from_secs(15));
        assert!(config.webhook_url.is_none());
        assert_eq!(config.strategy_provider, "ollama");
        assert!(!config.routine.release_sessions);
    }

    #[test]
    fn test_rejects_bad_timeout() {
        assert!(config_from(&[("PRODUCTPILOT_UNIT_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config_from(&[("PRODUCTPILOT_UNIT_TIMEOUT_SECS", "0")]).is_err());
    }
}
