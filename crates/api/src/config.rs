/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Applies up to the
    /// point the response starts; the NDJSON body streams beyond it.
    pub request_timeout_secs: u64,
    /// Predictions gateway (inference providers).
    pub predictions: PredictionsConfig,
    /// Credit ledger service.
    pub ledger: LedgerConfig,
    /// Object storage gateway and catalog.
    pub storage: StorageConfig,
    /// Notification service.
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone)]
pub struct PredictionsConfig {
    pub api_url: String,
    pub api_key: String,
    /// Model slug for the default (English) music provider.
    pub minimax_model: String,
    /// Model slug for the multilingual music provider.
    pub acestep_model: String,
    /// Model slug for the cover-art image provider.
    pub cover_model: String,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub gateway_url: String,
    pub public_base_url: String,
    pub catalog_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub api_url: String,
    pub api_key: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                         |
    /// |--------------------------|---------------------------------|
    /// | `HOST`                   | `0.0.0.0`                       |
    /// | `PORT`                   | `3000`                          |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`         |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                            |
    /// | `PREDICTIONS_API_URL`    | `https://api.replicate.com`     |
    /// | `PREDICTIONS_API_KEY`    | *(empty)*                       |
    /// | `MINIMAX_MODEL`          | `minimax/music-1.5`             |
    /// | `ACESTEP_MODEL`          | `ace-step/ace-step-v1-3.5b`     |
    /// | `COVER_MODEL`            | `black-forest-labs/flux-schnell`|
    /// | `LEDGER_API_URL`         | `http://localhost:4000`         |
    /// | `LEDGER_API_KEY`         | *(empty)*                       |
    /// | `STORAGE_GATEWAY_URL`    | `http://localhost:4100`         |
    /// | `STORAGE_PUBLIC_URL`     | `http://localhost:4100/public`  |
    /// | `CATALOG_API_URL`        | `http://localhost:4200`         |
    /// | `STORAGE_API_KEY`        | *(empty)*                       |
    /// | `NOTIFIER_API_URL`       | `http://localhost:4300`         |
    /// | `NOTIFIER_API_KEY`       | *(empty)*                       |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            predictions: PredictionsConfig {
                api_url: env_or("PREDICTIONS_API_URL", "https://api.replicate.com"),
                api_key: env_or("PREDICTIONS_API_KEY", ""),
                minimax_model: env_or("MINIMAX_MODEL", "minimax/music-1.5"),
                acestep_model: env_or("ACESTEP_MODEL", "ace-step/ace-step-v1-3.5b"),
                cover_model: env_or("COVER_MODEL", "black-forest-labs/flux-schnell"),
            },
            ledger: LedgerConfig {
                api_url: env_or("LEDGER_API_URL", "http://localhost:4000"),
                api_key: env_or("LEDGER_API_KEY", ""),
            },
            storage: StorageConfig {
                gateway_url: env_or("STORAGE_GATEWAY_URL", "http://localhost:4100"),
                public_base_url: env_or("STORAGE_PUBLIC_URL", "http://localhost:4100/public"),
                catalog_url: env_or("CATALOG_API_URL", "http://localhost:4200"),
                api_key: env_or("STORAGE_API_KEY", ""),
            },
            notifier: NotifierConfig {
                api_url: env_or("NOTIFIER_API_URL", "http://localhost:4300"),
                api_key: env_or("NOTIFIER_API_KEY", ""),
            },
        }
    }
}
