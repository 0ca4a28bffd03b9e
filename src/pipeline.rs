//! Extract → aggregate → load for both report kinds.

use chrono::NaiveDate;
use tracing::info;

use crate::aggregator::aggregate;
use crate::client::SearchAnalytics;
use crate::config;
use crate::error::{EtlError, Result};
use crate::extractor::Extractor;
use crate::models::{AggregatedRow, ReportKind};
use crate::warehouse::{Destination, Table, WarehouseSink, WriteMode};

// ---------------------------------------------------------------------------
// EtlJob
// ---------------------------------------------------------------------------

/// Parameters of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct EtlJob {
    pub site: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub url_table: Destination,
    pub keyword_table: Destination,
}

impl EtlJob {
    /// Validate the inputs and resolve both destination tables in `project`.
    pub fn new(
        site: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        project: &str,
        url_table: &str,
        keyword_table: &str,
    ) -> Result<Self> {
        if site.trim().is_empty() {
            return Err(EtlError::InvalidArgument("site must not be empty".into()));
        }
        if start_date > end_date {
            return Err(EtlError::InvalidArgument(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }
        Ok(Self {
            site: site.to_string(),
            start_date,
            end_date,
            url_table: Destination::parse(project, url_table)?,
            keyword_table: Destination::parse(project, keyword_table)?,
        })
    }

    pub fn destination(&self, kind: ReportKind) -> &Destination {
        match kind {
            ReportKind::Url => &self.url_table,
            ReportKind::Keyword => &self.keyword_table,
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub kind: ReportKind,
    pub extracted: usize,
    pub loaded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub keyword: PassSummary,
    pub url: PassSummary,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs both passes sequentially against an API client and a sink.
///
/// The keyword pass is loaded before the URL pass starts. Loads always
/// append, so rerunning a range duplicates its rows in the destination.
/// A failure in the URL pass leaves the keyword load in place.
pub struct Pipeline<'a> {
    api: &'a dyn SearchAnalytics,
    sink: &'a dyn WarehouseSink,
    page_size: usize,
    search_type: String,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn SearchAnalytics, sink: &'a dyn WarehouseSink) -> Self {
        Self {
            api,
            sink,
            page_size: config::PAGE_SIZE,
            search_type: config::SEARCH_TYPE.to_string(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_search_type(mut self, search_type: &str) -> Self {
        self.search_type = search_type.to_string();
        self
    }

    pub fn run(&self, job: &EtlJob) -> Result<RunSummary> {
        info!(
            "Run for {} from {} to {}",
            job.site, job.start_date, job.end_date
        );
        let keyword = self.run_pass(ReportKind::Keyword, job)?;
        let url = self.run_pass(ReportKind::Url, job)?;
        info!(
            "Run complete: {} keyword rows, {} url rows loaded",
            keyword.loaded, url.loaded
        );
        Ok(RunSummary { keyword, url })
    }

    /// Extract, aggregate and append one report kind.
    pub fn run_pass(&self, kind: ReportKind, job: &EtlJob) -> Result<PassSummary> {
        let (extracted, rows) = self.report(kind, &job.site, job.start_date, job.end_date)?;
        let table = Table::from_aggregated(kind, &rows)?;
        let destination = job.destination(kind);
        let loaded = self
            .sink
            .write(destination, &table, WriteMode::Append)
            .map_err(|e| match e {
                EtlError::Load(_) => e,
                other => EtlError::load(other),
            })?;
        info!("{} data loaded into {}", kind, destination);
        Ok(PassSummary {
            kind,
            extracted,
            loaded,
        })
    }

    /// Extract and aggregate one report kind without loading it.
    ///
    /// Returns the raw row count alongside the aggregated rows.
    pub fn report(
        &self,
        kind: ReportKind,
        site: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(usize, Vec<AggregatedRow>)> {
        let extractor = Extractor::new(self.api)
            .with_page_size(self.page_size)
            .with_search_type(&self.search_type);
        let raw = extractor.extract(site, start, end, kind.dimensions())?;
        let rows = aggregate(&raw, start, end)?;
        Ok((raw.len(), rows))
    }
}
