//! Shared test fixtures for the ETL integration tests.
//!
//! Provides a scripted reporting API that records every request, a sink that
//! records every write, and helpers for building rows and credential files.

#![allow(dead_code)]

use chrono::NaiveDate;
use gsc_etl::credentials::{AuthToken, Authorizer, ClientSecrets};
use gsc_etl::models::{ApiRow, SearchAnalyticsRequest, SearchAnalyticsResponse};
use gsc_etl::warehouse::{Destination, Table, WarehouseSink, WriteMode};
use gsc_etl::{EtlError, Result, SearchAnalytics};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

pub fn d(s: &str) -> NaiveDate {
    gsc_etl::dates::parse_date(s).unwrap()
}

pub fn api_row(keys: &[&str], clicks: f64, impressions: f64, position: f64) -> ApiRow {
    ApiRow {
        keys: keys.iter().map(|k| k.to_string()).collect(),
        clicks,
        impressions,
        ctr: if impressions > 0.0 {
            Some(clicks / impressions)
        } else {
            Some(0.0)
        },
        position,
    }
}

/// `n` distinct page rows, used to fill a page.
pub fn page_of(n: usize, prefix: &str) -> Vec<ApiRow> {
    (0..n)
        .map(|i| api_row(&[format!("https://example.com/{}/{}", prefix, i).as_str()], 1.0, 10.0, 3.0))
        .collect()
}

// ---------------------------------------------------------------------------
// ScriptedApi
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&SearchAnalyticsRequest) -> Result<Option<SearchAnalyticsResponse>>>;

/// Reporting API fake driven by a closure over the request.
pub struct ScriptedApi {
    responder: Responder,
    pub requests: RefCell<Vec<(String, SearchAnalyticsRequest)>>,
}

impl ScriptedApi {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SearchAnalyticsRequest) -> Result<Option<SearchAnalyticsResponse>> + 'static,
    {
        Self {
            responder: Box::new(f),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// API that answers every first page with `rows_for(request)` and every
    /// later page with an empty response.
    pub fn single_page<F>(rows_for: F) -> Self
    where
        F: Fn(&SearchAnalyticsRequest) -> Vec<ApiRow> + 'static,
    {
        Self::new(move |req| {
            if req.start_row == 0 {
                Ok(Some(SearchAnalyticsResponse::with_rows(rows_for(req))))
            } else {
                Ok(Some(SearchAnalyticsResponse::default()))
            }
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests_for(&self, date: &str) -> Vec<SearchAnalyticsRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|(_, r)| r.start_date == date)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

impl SearchAnalytics for ScriptedApi {
    fn query(
        &self,
        site: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<Option<SearchAnalyticsResponse>> {
        self.requests
            .borrow_mut()
            .push((site.to_string(), request.clone()));
        (self.responder)(request)
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

pub struct RecordingSink {
    pub writes: RefCell<Vec<(Destination, Table, WriteMode)>>,
    /// Reject writes to this table name.
    pub fail_on: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            writes: RefCell::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(table: &str) -> Self {
        Self {
            writes: RefCell::new(Vec::new()),
            fail_on: Some(table.to_string()),
        }
    }
}

impl WarehouseSink for RecordingSink {
    fn write(&self, destination: &Destination, table: &Table, mode: WriteMode) -> Result<usize> {
        if self.fail_on.as_deref() == Some(destination.table.as_str()) {
            return Err(EtlError::Load(format!("permission denied on {}", destination)));
        }
        self.writes
            .borrow_mut()
            .push((destination.clone(), table.clone(), mode));
        Ok(table.len())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

pub fn sample_token(access: &str) -> AuthToken {
    AuthToken {
        access_token: access.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        token_type: "Bearer".to_string(),
        expires_at: None,
        scopes: vec!["https://www.googleapis.com/auth/webmasters.readonly".to_string()],
    }
}

/// Authorizer that hands out a fixed token and counts calls.
pub struct StaticAuthorizer {
    pub token: Option<AuthToken>,
    pub calls: Cell<usize>,
}

impl StaticAuthorizer {
    pub fn granting(token: AuthToken) -> Self {
        Self {
            token: Some(token),
            calls: Cell::new(0),
        }
    }

    pub fn denying() -> Self {
        Self {
            token: None,
            calls: Cell::new(0),
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn authorize(&self, _secrets: &ClientSecrets, _scopes: &[&str]) -> Result<AuthToken> {
        self.calls.set(self.calls.get() + 1);
        self.token
            .clone()
            .ok_or_else(|| EtlError::Credential("access_denied".into()))
    }
}

pub fn write_client_secrets(dir: &Path) -> PathBuf {
    let path = dir.join("client_secret.json");
    let body = serde_json::json!({
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
        }
    });
    std::fs::write(&path, body.to_string()).unwrap();
    path
}
