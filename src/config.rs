use std::net::{IpAddr, SocketAddr};

/// Request bodies carry base64 media, so the ceiling is well above axum's default.
pub const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
    pub log_filter: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Server configuration loaded from environment variables.
///
/// | Env Var               | Default                                            |
/// |-----------------------|----------------------------------------------------|
/// | `HOST`                | `0.0.0.0`                                          |
/// | `PORT`                | `3000`                                             |
/// | `STORE_BACKEND`       | `mongo`                                            |
/// | `MONGO_URL`           | `mongodb://localhost:27017`                        |
/// | `MONGO_DB`            | database named in `MONGO_URL`, else `roadwatch`    |
/// | `GOOGLE_API_KEY`      | required                                           |
/// | `GEMINI_MODEL`        | `gemini-2.5-flash`                                 |
/// | `GEMINI_BASE_URL`     | `https://generativelanguage.googleapis.com/v1beta` |
/// | `GEMINI_TIMEOUT_SECS` | `120`                                              |
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongo_url: String,
    pub mongo_db: Option<String>,
    pub gemini: GeminiConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source so tests don't touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = match var("HOST") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "HOST", value: v })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let port = match var("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => 3000,
        };

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("mongo") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let timeout_secs = match var("GEMINI_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "GEMINI_TIMEOUT_SECS",
                value: v,
            })?,
            None => 120,
        };

        let gemini = GeminiConfig {
            api_key: var("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?,
            model: var("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            timeout_secs,
        };

        let log_format = match var("RUST_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let telemetry = TelemetryConfig {
            log_format,
            // Keep the driver quiet unless asked for.
            log_filter: var("RUST_LOG")
                .unwrap_or_else(|| "info,roadwatch_server=info,mongodb=warn".to_string()),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        };

        Ok(Self {
            host,
            port,
            store_backend,
            mongo_url: var("MONGO_URL").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            mongo_db: var("MONGO_DB"),
            gemini,
            telemetry,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
