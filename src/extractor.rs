//! Day-by-day, page-by-page extraction from the reporting API.
//!
//! One request covers a single calendar day. Each day is paged with
//! `startRow = page * page_size` until the API returns an absent, empty or
//! short page. Rows are accumulated in request order with no dedup or cap.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::client::SearchAnalytics;
use crate::config;
use crate::dates::{format_date, DateRange};
use crate::error::{EtlError, Result};
use crate::models::{ApiRow, Dimension, ReportRow, SearchAnalyticsRequest};

/// Paginated extractor bound to a reporting API client.
pub struct Extractor<'a> {
    api: &'a dyn SearchAnalytics,
    page_size: usize,
    search_type: String,
}

impl<'a> Extractor<'a> {
    pub fn new(api: &'a dyn SearchAnalytics) -> Self {
        Self {
            api,
            page_size: config::PAGE_SIZE,
            search_type: config::SEARCH_TYPE.to_string(),
        }
    }

    /// Override the `rowLimit` per request. Values below 1 are raised to 1.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the `searchType` filter (`web`, `image`, `video`, `news`, ...).
    pub fn with_search_type(mut self, search_type: &str) -> Self {
        self.search_type = search_type.to_string();
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch every row for `dimensions` over `[start, end]` as [`ReportRow`]s.
    ///
    /// `ctr` is kept only when more than one dimension was requested; URL-level
    /// CTR is recomputed downstream.
    pub fn extract(
        &self,
        site: &str,
        start: NaiveDate,
        end: NaiveDate,
        dimensions: &[Dimension],
    ) -> Result<Vec<ReportRow>> {
        let keep_ctr = dimensions.len() > 1;
        self.extract_with(site, start, end, dimensions, |date, row| {
            to_report_row(date, dimensions.len(), keep_ctr, row)
        })
    }

    /// Fetch every row over `[start, end]`, converting each with `map_row`.
    ///
    /// Any API or mapping failure aborts the whole extraction.
    pub fn extract_with<T, F>(
        &self,
        site: &str,
        start: NaiveDate,
        end: NaiveDate,
        dimensions: &[Dimension],
        mut map_row: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(NaiveDate, ApiRow) -> Result<T>,
    {
        validate_dimensions(dimensions)?;
        if start > end {
            return Err(EtlError::InvalidArgument(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let dims = dimensions
            .iter()
            .map(Dimension::as_str)
            .collect::<Vec<_>>()
            .join(",");
        info!("Extracting [{}] for {} from {} to {}", dims, site, start, end);

        let mut out = Vec::new();
        for day in DateRange::new(start, end) {
            let day_str = format_date(day);
            let mut page = 0usize;
            let mut day_rows = 0usize;

            loop {
                let request = SearchAnalyticsRequest {
                    start_date: day_str.clone(),
                    end_date: day_str.clone(),
                    dimensions: dimensions.to_vec(),
                    search_type: self.search_type.clone(),
                    row_limit: self.page_size,
                    start_row: page * self.page_size,
                };

                let response = self.api.query(site, &request).map_err(|e| match e {
                    EtlError::Extraction(_) => e,
                    other => EtlError::extraction(other),
                })?;

                let rows = match response.and_then(|r| r.rows) {
                    Some(rows) if !rows.is_empty() => rows,
                    _ => break,
                };

                let count = rows.len();
                for row in rows {
                    out.push(map_row(day, row)?);
                }
                day_rows += count;
                page += 1;

                if count < self.page_size {
                    break;
                }
            }

            debug!("{}: {} rows in {} page(s)", day_str, day_rows, page);
        }

        info!("Extracted {} rows for [{}]", out.len(), dims);
        Ok(out)
    }
}

/// `page` must come first; `query` is optional; no repeats.
fn validate_dimensions(dimensions: &[Dimension]) -> Result<()> {
    match dimensions {
        [Dimension::Page] | [Dimension::Page, Dimension::Query] => Ok(()),
        [] => Err(EtlError::InvalidArgument(
            "at least one dimension is required".into(),
        )),
        other => Err(EtlError::InvalidArgument(format!(
            "unsupported dimension list {:?}; expected [page] or [page, query]",
            other
        ))),
    }
}

fn to_report_row(
    date: NaiveDate,
    dimension_count: usize,
    keep_ctr: bool,
    row: ApiRow,
) -> Result<ReportRow> {
    if row.keys.len() != dimension_count {
        return Err(EtlError::Extraction(format!(
            "malformed row on {}: expected {} key(s), got {:?}",
            date, dimension_count, row.keys
        )));
    }
    if !row.position.is_finite() {
        return Err(EtlError::Extraction(format!(
            "malformed row on {}: position {} for {:?}",
            date, row.position, row.keys
        )));
    }

    Ok(ReportRow {
        date,
        clicks: to_count("clicks", row.clicks, date)?,
        impressions: to_count("impressions", row.impressions, date)?,
        ctr: if keep_ctr { row.ctr } else { None },
        position: row.position,
        keys: row.keys,
    })
}

fn to_count(field: &str, value: f64, date: NaiveDate) -> Result<u64> {
    if !value.is_finite() || value < 0.0 {
        return Err(EtlError::Extraction(format!(
            "malformed row on {}: {} = {}",
            date, field, value
        )));
    }
    Ok(value.round() as u64)
}
