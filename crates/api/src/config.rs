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
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Document classification endpoint. `None` disables classification.
    pub classifier_url: Option<String>,
    /// Upper bound on one classification call in seconds (default: `30`).
    pub classifier_timeout_secs: u64,
    /// Preload every form template into the template cache at startup.
    pub template_cache_warm_on_start: bool,
    /// Largest accepted request body in bytes, bounding document uploads
    /// (default: 25 MiB).
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `CLASSIFIER_URL`               | unset (disabled)           |
    /// | `CLASSIFIER_TIMEOUT_SECS`      | `30`                       |
    /// | `TEMPLATE_CACHE_WARM_ON_START` | `false`                    |
    /// | `MAX_UPLOAD_BYTES`             | `26214400`                 |
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
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let classifier_url = std::env::var("CLASSIFIER_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let classifier_timeout_secs: u64 = std::env::var("CLASSIFIER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CLASSIFIER_TIMEOUT_SECS must be a valid u64");

        let template_cache_warm_on_start: bool = std::env::var("TEMPLATE_CACHE_WARM_ON_START")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("TEMPLATE_CACHE_WARM_ON_START must be true or false");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "26214400".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            classifier_url,
            classifier_timeout_secs,
            template_cache_warm_on_start,
            max_upload_bytes,
        }
    }
}
