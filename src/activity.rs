// src/activity.rs
use crate::columns;
use crate::data_types::{Activity, Row, SourceSpec, TableData};
use crate::dates::DateParser;
use crate::rows::valid_rows;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;
pub const UNNAMED: &str = "Sin nombre";

/// Rows of one configured tab, as fetched for a request.
#[derive(Debug, Clone, Copy)]
pub struct SourceBatch<'a> {
    pub source: &'a SourceSpec,
    pub table: &'a TableData,
}

pub fn to_activity(row: &Row, source: &SourceSpec, dates: &DateParser) -> Option<Activity> {
    let date = dates.parse(row.find(columns::DATE)?)?;

    let name = row
        .find_filled(columns::NAME)
        .or_else(|| row.find_filled(columns::EMAIL))
        .unwrap_or(UNNAMED)
        .to_string();

    let status = row
        .find_filled(columns::STATUS)
        .unwrap_or(source.default_status.as_str())
        .to_string();

    Some(Activity {
        kind: source.kind.clone(),
        source: source.tab.clone(),
        name,
        date,
        status,
    })
}

/// Newest `limit` activities across all batches.
///
/// Rows that are not valid or whose date cannot be parsed are skipped.
/// Equal dates keep the order of `batches` and of rows within a tab.
pub fn collect_activity(batches: &[SourceBatch<'_>], dates: &DateParser, limit: usize) -> Vec<Activity> {
    let mut activities: Vec<Activity> = batches
        .iter()
        .flat_map(|batch| {
            valid_rows(batch.table)
                .into_iter()
                .filter_map(|row| to_activity(&row, batch.source, dates))
                .collect::<Vec<_>>()
        })
        .collect();

    // stable sort
    activities.sort_by(|a, b| b.date.cmp(&a.date));
    activities.truncate(limit);
    activities
}
