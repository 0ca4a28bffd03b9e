//! Async wrapper around [`GscEtl`] for use inside Tokio runtimes.
//!
//! The pipeline itself stays sequential and blocking; runs are dispatched to
//! the blocking thread pool via [`tokio::task::spawn_blocking`] so the event
//! loop is never stalled by a slow page request.
//!
//! # Example
//!
//! ```no_run
//! use gsc_etl::{dates::parse_date, AsyncGscEtl, EtlJob, GscEtl};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let etl = GscEtl::builder().warehouse_dir("warehouse").build().unwrap();
//!     let etl = AsyncGscEtl::new(etl);
//!     let job = EtlJob::new(
//!         "sc-domain:example.com",
//!         parse_date("2024-01-01").unwrap(),
//!         parse_date("2024-01-07").unwrap(),
//!         "seo",
//!         "url_data",
//!         "keyword_data",
//!     )
//!     .unwrap();
//!     let summary = etl.run(job).await.unwrap();
//! }
//! ```

use std::sync::{Arc, Mutex};

use crate::error::{EtlError, Result};
use crate::{EtlJob, GscEtl, RunSummary};

/// Async handle to a [`GscEtl`].
///
/// The inner ETL is behind a [`Mutex`] because the warehouse keeps its
/// connections in a `RefCell`; concurrent calls are serialized.
#[derive(Clone)]
pub struct AsyncGscEtl {
    inner: Arc<Mutex<GscEtl>>,
}

impl AsyncGscEtl {
    pub fn new(etl: GscEtl) -> Self {
        Self {
            inner: Arc::new(Mutex::new(etl)),
        }
    }

    /// Run any sync operation against the ETL on the blocking thread pool.
    pub async fn with<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&GscEtl) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let etl = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = etl
                .lock()
                .map_err(|_| EtlError::InvalidArgument("ETL lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| EtlError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Run both passes for `job`.
    pub async fn run(&self, job: EtlJob) -> Result<RunSummary> {
        self.with(move |etl| etl.run(&job)).await
    }
}
