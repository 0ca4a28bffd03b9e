use std::path::PathBuf;

pub const API_BASE: &str = "https://www.googleapis.com/webmasters/v3";
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Out-of-band redirect: the consent page shows the code for manual entry.
pub const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

pub const OAUTH_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/webmasters.readonly",
    "https://www.googleapis.com/auth/webmasters",
];

/// Maximum `rowLimit` accepted by `searchAnalytics.query`.
pub const PAGE_SIZE: usize = 25_000;

pub const SEARCH_TYPE: &str = "web";

pub const DEFAULT_DATASET: &str = "main";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn default_token_cache() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("gsc-etl").join("token.json")
    } else {
        PathBuf::from(".gsc-etl-cache").join("token.json")
    }
}

pub fn default_warehouse_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("gsc-etl").join("warehouse")
    } else {
        PathBuf::from(".gsc-etl-warehouse")
    }
}
