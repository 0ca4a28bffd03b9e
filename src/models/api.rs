use serde::{Deserialize, Serialize};

use super::Dimension;

// ---------------------------------------------------------------------------
// SearchAnalyticsRequest — body of a searchAnalytics.query call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<Dimension>,
    pub search_type: String,
    pub row_limit: usize,
    pub start_row: usize,
}

// ---------------------------------------------------------------------------
// SearchAnalyticsResponse — one page of results
// ---------------------------------------------------------------------------

/// `rows` is omitted by the API once a day has no more data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Option<Vec<ApiRow>>,
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
}

impl SearchAnalyticsResponse {
    pub fn with_rows(rows: Vec<ApiRow>) -> Self {
        Self {
            rows: Some(rows),
            response_aggregation_type: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ApiRow — a single result row as returned on the wire
// ---------------------------------------------------------------------------

/// Metrics arrive as JSON doubles even when they are counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRow {
    #[serde(default)]
    pub keys: Vec<String>,
    pub clicks: f64,
    pub impressions: f64,
    #[serde(default)]
    pub ctr: Option<f64>,
    pub position: f64,
}
