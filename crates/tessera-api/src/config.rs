//! Server configuration read from the environment.

use axum::http::HeaderValue;
use tessera_core::defaults;

/// Origins allowed when `ALLOWED_ORIGINS` is unset or blank.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Runtime configuration of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Whether `parent_id` scoping of the group listing is honored.
    pub nested_groups_enabled: bool,
    /// Page size used when a request carries no `per_page`.
    pub groups_per_page: u32,
    pub allowed_origins: String,
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u64,
    pub rate_limit_period_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/tessera".to_string(),
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            nested_groups_enabled: defaults::NESTED_GROUPS_ENABLED,
            groups_per_page: defaults::PER_PAGE,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            rate_limit_enabled: true,
            rate_limit_requests: defaults::RATE_LIMIT_REQUESTS,
            rate_limit_period_secs: defaults::RATE_LIMIT_PERIOD_SECS,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            host: lookup("HOST").unwrap_or(base.host),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(base.port),
            nested_groups_enabled: lookup("NESTED_GROUPS_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(base.nested_groups_enabled),
            groups_per_page: parsed("GROUPS_PER_PAGE")
                .map(|n| n.clamp(1, u64::from(defaults::PER_PAGE_MAX)) as u32)
                .unwrap_or(base.groups_per_page),
            allowed_origins: lookup("ALLOWED_ORIGINS").unwrap_or(base.allowed_origins),
            rate_limit_enabled: lookup("RATE_LIMIT_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(base.rate_limit_enabled),
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS").unwrap_or(base.rate_limit_requests),
            rate_limit_period_secs: parsed("RATE_LIMIT_PERIOD_SECS")
                .unwrap_or(base.rate_limit_period_secs),
        }
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the comma-separated CORS origin whitelist.
    ///
    /// ```text
    /// ALLOWED_ORIGINS=https://tessera.example.com,http://localhost:3000
    /// ```
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        let source = if self.allowed_origins.trim().is_empty() {
            DEFAULT_ALLOWED_ORIGINS
        } else {
            self.allowed_origins.as_str()
        };

        source
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3000);
        assert!(config.nested_groups_enabled);
        assert_eq!(config.groups_per_page, 20);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("NESTED_GROUPS_ENABLED", "false"),
            ("GROUPS_PER_PAGE", "500"),
            ("RATE_LIMIT_REQUESTS", "not-a-number"),
            ("RATE_LIMIT_ENABLED", "1"),
        ]));
        assert_eq!(config.port, 8080);
        assert!(!config.nested_groups_enabled);
        assert_eq!(config.groups_per_page, 100);
        assert_eq!(config.rate_limit_requests, 100);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_cors_origins_skip_blank_entries() {
        let config = AppConfig::from_lookup(lookup(&[(
            "ALLOWED_ORIGINS",
            "https://a.example.com, ,http://localhost:3000",
        )]));
        let origins = config.cors_origins();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://a.example.com");
    }

    #[test]
    fn test_cors_origins_blank_uses_default() {
        let config = AppConfig::from_lookup(lookup(&[("ALLOWED_ORIGINS", "  ")]));
        assert_eq!(config.cors_origins(), vec![HeaderValue::from_static("http://localhost:3000")]);
    }
}
