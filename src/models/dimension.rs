use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Page,
    Query,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Page => "page",
            Dimension::Query => "query",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReportKind — the two granularities loaded into the warehouse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// One row per page address.
    Url,
    /// One row per (page address, search keyword).
    Keyword,
}

impl ReportKind {
    pub fn dimensions(&self) -> &'static [Dimension] {
        match self {
            ReportKind::Url => &[Dimension::Page],
            ReportKind::Keyword => &[Dimension::Page, Dimension::Query],
        }
    }

    /// Prefix used for the metric columns of the destination table.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            ReportKind::Url => "URL",
            ReportKind::Keyword => "KW",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Url => f.write_str("url"),
            ReportKind::Keyword => f.write_str("keyword"),
        }
    }
}
