//! Search Console to warehouse ETL.
//!
//! Pulls per-URL and per-URL-per-keyword search performance (clicks,
//! impressions, position, CTR) from the Search Console reporting API one day
//! and one page at a time, aggregates it over the requested period and
//! appends it to DuckDB warehouse tables.
//!
//! # Quick start
//!
//! ```no_run
//! use gsc_etl::{dates::parse_date, EtlJob, GscEtl};
//!
//! let etl = GscEtl::builder()
//!     .credentials("client_secret.json")
//!     .token_cache("token.json")
//!     .warehouse_dir("warehouse")
//!     .build()
//!     .unwrap();
//!
//! let job = EtlJob::new(
//!     "https://example.com/",
//!     parse_date("2024-01-01").unwrap(),
//!     parse_date("2024-01-31").unwrap(),
//!     "seo",
//!     "gsc.url_data",
//!     "gsc.keyword_data",
//! )
//! .unwrap();
//! let summary = etl.run(&job).unwrap();
//! ```

pub mod aggregator;
#[cfg(feature = "async")]
pub mod async_client;
pub mod client;
pub mod config;
pub mod credentials;
pub mod dates;
pub mod error;
pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod warehouse;

#[cfg(feature = "async")]
pub use async_client::AsyncGscEtl;
pub use client::{SearchAnalytics, SearchConsoleClient};
pub use credentials::{AuthToken, Authorizer, ConsoleAuthorizer, CredentialCache};
pub use error::{EtlError, Result};
pub use extractor::Extractor;
pub use pipeline::{EtlJob, PassSummary, Pipeline, RunSummary};
pub use warehouse::{Destination, DuckDbWarehouse, Table, WarehouseSink, WriteMode};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// GscEtlBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`GscEtl`] instance.
pub struct GscEtlBuilder {
    credentials: PathBuf,
    token_cache: Option<PathBuf>,
    warehouse_dir: Option<PathBuf>,
    timeout: Duration,
    page_size: usize,
    search_type: String,
    api_base: Option<String>,
}

impl Default for GscEtlBuilder {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from("client_secret.json"),
            token_cache: None,
            warehouse_dir: None,
            timeout: Duration::from_secs(120),
            page_size: config::PAGE_SIZE,
            search_type: config::SEARCH_TYPE.to_string(),
            api_base: None,
        }
    }
}

impl GscEtlBuilder {
    /// Path of the OAuth client secrets file. Only read when no token is
    /// cached. Defaults to `client_secret.json` in the working directory.
    pub fn credentials<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.credentials = path.as_ref().to_path_buf();
        self
    }

    /// Where the authorization token is cached.
    ///
    /// Defaults to `gsc-etl/token.json` under the platform cache directory.
    pub fn token_cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.token_cache = Some(path.as_ref().to_path_buf());
        self
    }

    /// Directory holding one DuckDB file per warehouse project.
    ///
    /// Defaults to `gsc-etl/warehouse` under the platform data directory.
    pub fn warehouse_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.warehouse_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// HTTP request timeout for API and token calls. Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rows requested per page. Defaults to the API maximum of 25,000.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Search type filter. Defaults to `web`.
    pub fn search_type(mut self, search_type: &str) -> Self {
        self.search_type = search_type.to_string();
        self
    }

    /// Override the reporting API root URL.
    pub fn api_base(mut self, url: &str) -> Self {
        self.api_base = Some(url.to_string());
        self
    }

    /// Build the ETL, creating the warehouse directory.
    ///
    /// Does not touch the network or the token cache; authorization happens
    /// on the first [`run()`](GscEtl::run).
    pub fn build(self) -> Result<GscEtl> {
        let dir = self
            .warehouse_dir
            .unwrap_or_else(config::default_warehouse_dir);
        let warehouse = DuckDbWarehouse::open(&dir)?;
        Ok(GscEtl {
            credentials: self.credentials,
            cache: CredentialCache::new(self.token_cache),
            warehouse,
            warehouse_dir: dir,
            timeout: self.timeout,
            page_size: self.page_size,
            search_type: self.search_type,
            api_base: self.api_base,
        })
    }
}

// ---------------------------------------------------------------------------
// GscEtl
// ---------------------------------------------------------------------------

/// Wires the credential cache, the Search Console client and the DuckDB
/// warehouse into a [`Pipeline`].
///
/// Created via [`GscEtl::builder()`].
pub struct GscEtl {
    credentials: PathBuf,
    cache: CredentialCache,
    warehouse: DuckDbWarehouse,
    warehouse_dir: PathBuf,
    timeout: Duration,
    page_size: usize,
    search_type: String,
    api_base: Option<String>,
}

impl GscEtl {
    pub fn builder() -> GscEtlBuilder {
        GscEtlBuilder::default()
    }

    /// Run both passes, authorizing interactively on the terminal if no
    /// token is cached.
    pub fn run(&self, job: &EtlJob) -> Result<RunSummary> {
        self.run_with(job, &ConsoleAuthorizer::new(self.timeout))
    }

    /// Run both passes using `authorizer` when no token is cached.
    pub fn run_with(&self, job: &EtlJob, authorizer: &dyn Authorizer) -> Result<RunSummary> {
        let token = self.cache.obtain(&self.credentials, authorizer)?;
        let mut client = SearchConsoleClient::new(token, self.timeout)?;
        if let Some(base) = &self.api_base {
            client = client.with_base_url(base);
        }
        Pipeline::new(&client, &self.warehouse)
            .with_page_size(self.page_size)
            .with_search_type(&self.search_type)
            .run(job)
    }

    pub fn token_cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub fn warehouse(&self) -> &DuckDbWarehouse {
        &self.warehouse
    }
}

impl fmt::Display for GscEtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GscEtl(token_cache={}, warehouse_dir={}, search_type={})",
            self.cache.path().display(),
            self.warehouse_dir.display(),
            self.search_type
        )
    }
}
