//! Service configuration — environment variables, CLI args, defaults.

/// Runtime configuration for the seisqual server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection URL (e.g. `sqlite://seisqual.db?mode=rwc`)
    pub database_url: String,
    /// Bind address (e.g. "0.0.0.0:8080")
    pub bind_address: String,
    /// Maximum request payload size in bytes (default: 1 MB)
    pub max_payload_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://seisqual.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            max_payload_size: 1_048_576, // 1 MB
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with CLI overrides.
    pub fn from_env(
        database_url: Option<String>,
        bind_address: Option<String>,
        port: Option<u16>,
    ) -> Self {
        let mut config = Self::default();

        // Database URL: CLI arg > env var > default
        if let Some(url) = database_url.or_else(|| std::env::var("DATABASE_URL").ok()) {
            config.database_url = url;
        }

        // Bind address: CLI --bind-address or --port, then env
        if let Some(addr) = bind_address {
            config.bind_address = addr;
        } else if let Some(p) = port {
            config.bind_address = format!("0.0.0.0:{p}");
        } else if let Ok(addr) = std::env::var("SEISQUAL_BIND") {
            config.bind_address = addr;
        }

        if let Ok(v) = std::env::var("SEISQUAL_MAX_PAYLOAD_SIZE") {
            if let Ok(n) = v.parse() {
                config.max_payload_size = n;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let config = AppConfig::from_env(
            Some("sqlite://custom.db".to_string()),
            None,
            Some(9090),
        );
        assert_eq!(config.database_url, "sqlite://custom.db");
        assert_eq!(config.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.max_payload_size, 1_048_576);
    }
}
