use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// API key for the LLM upstream. Required — startup fails without it.
    pub llm_api_key: String,
    pub llm_model: String,
    /// Origins allowed by CORS. Empty = allow any (dev mode).
    pub allowed_origins: Vec<String>,
    /// Window in seconds shared by all per-endpoint rate limits.
    /// Set via BUGRELAY_RATE_WINDOW. Default: 60.
    pub rate_window_secs: u64,
    /// Max generation requests per caller per window. Default: 10.
    pub generate_rate_limit: u32,
    /// Max tracker requests per caller per window. Default: 20.
    pub tracker_rate_limit: u32,
    /// Hostname suffix the tracker URL must live under.
    pub tracker_domain_suffix: String,
    /// Attachments larger than this are rejected before upload. Default: 10 MiB.
    pub max_attachment_bytes: usize,
    /// Explicit base-path override; wins over platform detection.
    pub base_path_override: Option<String>,
    /// Hostname the service is deployed under, used for platform detection.
    pub public_hostname: Option<String>,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let llm_api_key = std::env::var("BUGRELAY_LLM_API_KEY").map_err(|_| {
        anyhow::anyhow!(
            "BUGRELAY_LLM_API_KEY is not set. The service cannot generate tickets \
             without an LLM API key — refusing to start."
        )
    })?;

    Ok(Config {
        port: std::env::var("BUGRELAY_PORT")
            .unwrap_or_else(|_| "8090".into())
            .parse()
            .unwrap_or(8090),
        llm_api_key,
        llm_model: std::env::var("BUGRELAY_LLM_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),
        allowed_origins: std::env::var("BUGRELAY_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        rate_window_secs: std::env::var("BUGRELAY_RATE_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
        generate_rate_limit: std::env::var("BUGRELAY_GENERATE_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        tracker_rate_limit: std::env::var("BUGRELAY_TRACKER_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
        tracker_domain_suffix: std::env::var("BUGRELAY_TRACKER_DOMAIN")
            .unwrap_or_else(|_| "atlassian.net".into()),
        max_attachment_bytes: std::env::var("BUGRELAY_MAX_ATTACHMENT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10 * 1024 * 1024),
        base_path_override: std::env::var("BUGRELAY_BASE_PATH").ok(),
        public_hostname: std::env::var("BUGRELAY_PUBLIC_HOSTNAME").ok(),
    })
}
