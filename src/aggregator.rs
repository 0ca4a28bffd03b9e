//! Collapse daily rows into one summary per dimension key.
//!
//! Clicks and impressions are summed, position is the unweighted mean of the
//! daily values and CTR is recomputed from the sums rather than averaged.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::models::{AggregatedRow, ReportRow};

#[derive(Default)]
struct Totals {
    clicks: u64,
    impressions: u64,
    position_sum: f64,
    rows: usize,
}

/// Group `rows` by their full key and summarize each group.
///
/// Every input row must carry the same number of keys. The output is ordered
/// by key, but callers should not depend on that.
pub fn aggregate(
    rows: &[ReportRow],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<AggregatedRow>> {
    let arity = match rows.first() {
        Some(r) => r.keys.len(),
        None => return Ok(Vec::new()),
    };

    let mut groups: BTreeMap<&[String], Totals> = BTreeMap::new();
    for row in rows {
        if row.keys.len() != arity {
            return Err(EtlError::Aggregation(format!(
                "row for {} has {} key(s), expected {}: {:?}",
                row.date,
                row.keys.len(),
                arity,
                row.keys
            )));
        }
        let totals = groups.entry(row.keys.as_slice()).or_default();
        totals.clicks += row.clicks;
        totals.impressions += row.impressions;
        totals.position_sum += row.position;
        totals.rows += 1;
    }

    debug!("Aggregated {} rows into {} groups", rows.len(), groups.len());

    Ok(groups
        .into_iter()
        .map(|(keys, t)| AggregatedRow {
            keys: keys.to_vec(),
            total_clicks: t.clicks,
            total_impressions: t.impressions,
            average_position: t.position_sum / t.rows as f64,
            ctr: ctr(t.clicks, t.impressions),
            period_start,
            period_end,
        })
        .collect())
}

/// `clicks / impressions`, or `None` when there were no impressions.
pub fn ctr(clicks: u64, impressions: u64) -> Option<f64> {
    if impressions == 0 {
        None
    } else {
        Some(clicks as f64 / impressions as f64)
    }
}
