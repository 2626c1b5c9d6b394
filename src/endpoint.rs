//! Base-path resolution for the API router.
//!
//! Serverless platforms mount functions under different prefixes, so the same
//! frontend build talks to `/.netlify/functions/...` on one host and `/api/...`
//! elsewhere. Resolution order: explicit override, then hosting-provider
//! detection from the deployed hostname, then the hard-coded fallback.

pub const FALLBACK_BASE_PATH: &str = "/api";
const NETLIFY_SUFFIX: &str = ".netlify.app";
const NETLIFY_BASE_PATH: &str = "/.netlify/functions";

pub fn resolve_base_path(override_path: Option<&str>, hostname: Option<&str>) -> String {
    if let Some(path) = override_path {
        let path = path.trim().trim_end_matches('/');
        if !path.is_empty() {
            if path.starts_with('/') {
                return path.to_string();
            }
            return format!("/{}", path);
        }
    }

    if let Some(host) = hostname {
        if host.trim().to_ascii_lowercase().ends_with(NETLIFY_SUFFIX) {
            return NETLIFY_BASE_PATH.to_string();
        }
    }

    FALLBACK_BASE_PATH.to_string()
}
