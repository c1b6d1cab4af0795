// Server configuration from environment

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for every API route, e.g. "/api" (empty = none)
    pub api_prefix: String,
    /// Allowed CORS origins; empty means permissive CORS for local development
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            api_prefix: String::new(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from HOST, PORT, API_PREFIX and CORS_ALLOWED_ORIGINS
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_prefix = non_empty("API_PREFIX")
            .map(|prefix| format!("/{}", prefix.trim_matches('/')))
            .filter(|prefix| prefix != "/")
            .unwrap_or_default();

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            api_prefix,
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
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
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("API_PREFIX", "api/"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, https://ui.example.com,"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "https://ui.example.com"]
        );
    }

    #[test]
    fn test_invalid_port_and_root_prefix_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "http"), ("API_PREFIX", "/")]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.api_prefix, "");
    }
}
