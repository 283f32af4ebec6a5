/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`). Chunk execution can
    /// outlive ordinary requests, so this is deliberately generous compared
    /// to a CRUD-only service.
    pub request_timeout_secs: u64,
    /// Base URL of the text-generation endpoint.
    pub prompt_base_url: String,
    /// Worker polling interval in seconds (default: `2`).
    pub worker_poll_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `HOST`                      | `0.0.0.0`                |
    /// | `PORT`                      | `3000`                   |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`      | `300`                    |
    /// | `PROMPT_BASE_URL`           | `http://localhost:8188`  |
    /// | `WORKER_POLL_INTERVAL_SECS` | `2`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let prompt_base_url =
            std::env::var("PROMPT_BASE_URL").unwrap_or_else(|_| "http://localhost:8188".into());

        let worker_poll_interval_secs: u64 = std::env::var("WORKER_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("WORKER_POLL_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            prompt_base_url,
            worker_poll_interval_secs,
        }
    }
}
