use thiserror::Error;
use url::Url;

use crate::errors::AppError;

/// Why a candidate tracker URL was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("tracker URL could not be parsed")]
    Unparseable,

    #[error("tracker URL must use https")]
    InsecureScheme,

    #[error("tracker host '{0}' is not under the trusted domain")]
    UntrustedHost(String),
}

impl From<UrlRejection> for AppError {
    fn from(r: UrlRejection) -> Self {
        AppError::Validation(r.to_string())
    }
}

/// SSRF guard for the proxy: the client supplies the tracker base URL, so we
/// only ever connect to https hosts under the configured trusted suffix.
/// `evilatlassian.net` does not match `atlassian.net` — the suffix must be
/// the whole host or sit behind a dot.
pub fn validate_tracker_url(raw: &str, trusted_suffix: &str) -> Result<Url, UrlRejection> {
    let url = Url::parse(raw.trim()).map_err(|_| UrlRejection::Unparseable)?;

    if url.scheme() != "https" {
        return Err(UrlRejection::InsecureScheme);
    }

    let host = match url.host_str() {
        Some(h) => h.to_ascii_lowercase(),
        None => return Err(UrlRejection::Unparseable),
    };

    let suffix = trusted_suffix.trim_start_matches('.').to_ascii_lowercase();
    if host == suffix || host.ends_with(&format!(".{}", suffix)) {
        Ok(url)
    } else {
        Err(UrlRejection::UntrustedHost(host))
    }
}
