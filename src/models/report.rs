use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ReportRow — one API result row for a single day
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    /// Dimension values in request order: `[page]` or `[page, query]`.
    pub keys: Vec<String>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: Option<f64>,
    pub position: f64,
}

impl ReportRow {
    pub fn address(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or("")
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keys.get(1).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// AggregatedRow — per-key totals over the whole queried period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub keys: Vec<String>,
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub average_position: f64,
    /// `None` when `total_impressions` is zero.
    pub ctr: Option<f64>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl AggregatedRow {
    pub fn address(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or("")
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keys.get(1).map(String::as_str)
    }
}
