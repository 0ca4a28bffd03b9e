//! Reusable authorization token with a local file cache.
//!
//! The first run reads the OAuth client secrets file, walks the user through
//! the installed-app consent flow and writes the resulting token to the cache
//! path as JSON. Later runs read the cached token and skip authorization
//! entirely. Expiry is not checked; a stale token surfaces as an API error.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config;
use crate::error::{EtlError, Result};

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

/// Opaque bearer credential as persisted in the token cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl AuthToken {
    /// Value for the `Authorization` request header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

// ---------------------------------------------------------------------------
// ClientSecrets
// ---------------------------------------------------------------------------

/// OAuth client identity loaded from a `client_secret.json` download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    config::AUTH_ENDPOINT.to_string()
}

fn default_token_uri() -> String {
    config::TOKEN_ENDPOINT.to_string()
}

impl ClientSecrets {
    /// Load client secrets from disk.
    ///
    /// Accepts the `{"installed": {...}}` and `{"web": {...}}` layouts
    /// produced by the Cloud Console, or a bare object.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EtlError::Credential(format!(
                "cannot read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
            .map_err(|e| EtlError::Credential(format!("{} ({})", e, path.display())))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)
            .map_err(|e| EtlError::Credential(format!("invalid client secrets JSON: {}", e)))?;
        let section = value
            .get("installed")
            .or_else(|| value.get("web"))
            .cloned()
            .unwrap_or(value);
        serde_json::from_value(section)
            .map_err(|e| EtlError::Credential(format!("invalid client secrets: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Authorizer
// ---------------------------------------------------------------------------

/// Obtains a fresh token when nothing is cached.
pub trait Authorizer {
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<AuthToken>;
}

/// Installed-app flow driven from the terminal.
///
/// Prints the consent URL, reads the authorization code from stdin and
/// exchanges it at the token endpoint. An empty line aborts.
pub struct ConsoleAuthorizer {
    timeout: Duration,
}

impl ConsoleAuthorizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn read_code(&self, url: &str) -> Result<String> {
        let mut stderr = io::stderr();
        writeln!(stderr, "Open this URL in a browser and grant access:\n\n{}\n", url)?;
        write!(stderr, "Enter the authorization code: ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let code = line.trim().to_string();
        if code.is_empty() {
            return Err(EtlError::Credential("authorization aborted".into()));
        }
        Ok(code)
    }

    fn exchange_code(&self, secrets: &ClientSecrets, code: &str) -> Result<AuthToken> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(EtlError::credential)?;

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", config::REDIRECT_URI),
        ];

        let resp = client
            .post(&secrets.token_uri)
            .form(&params)
            .send()
            .map_err(EtlError::credential)?;
        let status = resp.status();
        let body = resp.text().map_err(EtlError::credential)?;
        if !status.is_success() {
            return Err(EtlError::Credential(format!(
                "token exchange failed with HTTP {}: {}",
                status, body
            )));
        }
        parse_token_response(&body)
    }
}

impl Authorizer for ConsoleAuthorizer {
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<AuthToken> {
        let state = random_state();
        let url = authorization_url(secrets, scopes, &state);
        info!("Interactive authorization required");
        let code = self.read_code(&url)?;
        let mut token = self.exchange_code(secrets, &code)?;
        if token.scopes.is_empty() {
            token.scopes = scopes.iter().map(|s| s.to_string()).collect();
        }
        Ok(token)
    }
}

/// Build the consent page URL for the out-of-band installed-app flow.
pub fn authorization_url(secrets: &ClientSecrets, scopes: &[&str], state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline",
        secrets.auth_uri,
        urlencoding::encode(&secrets.client_id),
        urlencoding::encode(config::REDIRECT_URI),
        urlencoding::encode(&scopes.join(" ")),
        urlencoding::encode(state),
    )
}

/// Parse a token endpoint response body.
pub fn parse_token_response(body: &str) -> Result<AuthToken> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| EtlError::Credential(format!("invalid token response: {}", e)))?;

    if let Some(err) = parsed.get("error") {
        let msg = parsed
            .get("error_description")
            .and_then(|v| v.as_str())
            .or_else(|| err.as_str())
            .unwrap_or("authorization denied");
        return Err(EtlError::Credential(msg.to_string()));
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EtlError::Credential("token response has no access_token".into()))?
        .to_string();

    let expires_at = parsed
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default();

    Ok(AuthToken {
        access_token,
        refresh_token: parsed
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from),
        token_type: parsed
            .get("token_type")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(default_token_type),
        expires_at,
        scopes,
    })
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// CredentialCache
// ---------------------------------------------------------------------------

/// Token file on local disk. Not safe for concurrent processes.
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    /// If `path` is `None`, uses the platform cache directory.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(config::default_token_cache),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached token, or authorize against `source` and cache the
    /// result.
    pub fn obtain(&self, source: &Path, authorizer: &dyn Authorizer) -> Result<AuthToken> {
        if let Some(token) = self.load()? {
            debug!("Using cached token from {}", self.path.display());
            return Ok(token);
        }

        let secrets = ClientSecrets::from_file(source)?;
        let token = authorizer.authorize(&secrets, &config::OAUTH_SCOPES)?;
        self.store(&token)?;
        info!("Cached new token at {}", self.path.display());
        Ok(token)
    }

    /// Read the cached token, if any.
    ///
    /// A corrupt cache file is deleted so the next run re-authorizes.
    pub fn load(&self) -> Result<Option<AuthToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(EtlError::credential)?;
        match serde_json::from_str::<AuthToken>(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!("Corrupt token cache {}: {} -- removing", self.path.display(), e);
                let _ = fs::remove_file(&self.path);
                Err(EtlError::Credential(format!(
                    "token cache '{}' was corrupt and has been removed; \
                     rerun to re-authorize. Original error: {}",
                    self.path.display(),
                    e
                )))
            }
        }
    }

    /// Write the token through a temp file so a crash never leaves a
    /// truncated cache behind.
    pub fn store(&self, token: &AuthToken) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, token)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove the cached token.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
