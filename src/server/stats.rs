// src/server/stats.rs
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::activity::{collect_activity, SourceBatch};
use crate::calendar::TimeWindow;
use crate::columns;
use crate::data_types::Activity;
use crate::dates::DateParser;
use crate::rows::valid_rows;
use crate::server::{ApiResponse, AppState};

const UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub total: usize,
    pub this_month: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub sources: Vec<SourceStats>,
    pub total_records: usize,
    pub records_this_month: usize,
    pub upcoming_appointments: usize,
    pub recent_activity: Vec<Activity>,
}

pub fn build_stats(
    batches: &[SourceBatch<'_>],
    dates: &DateParser,
    now: DateTime<Tz>,
    upcoming_appointments: usize,
    limit: usize,
) -> DashboardStats {
    let sources: Vec<SourceStats> = batches
        .iter()
        .map(|batch| {
            let rows = valid_rows(batch.table);
            let this_month = rows
                .iter()
                .filter_map(|row| dates.parse(row.find(columns::DATE)?))
                .map(|date| date.with_timezone(&now.timezone()))
                .filter(|date| date.year() == now.year() && date.month() == now.month())
                .count();

            SourceStats {
                kind: batch.source.kind.clone(),
                source: batch.source.tab.clone(),
                total: rows.len(),
                this_month,
            }
        })
        .collect();

    DashboardStats {
        total_records: sources.iter().map(|s| s.total).sum(),
        records_this_month: sources.iter().map(|s| s.this_month).sum(),
        sources,
        upcoming_appointments,
        recent_activity: collect_activity(batches, dates, limit),
    }
}

async fn upcoming_appointments(state: &AppState) -> usize {
    let Some(calendar) = &state.calendar else {
        return 0;
    };

    let now = Utc::now().fixed_offset();
    let window = TimeWindow {
        min: Some(now),
        max: Some(now + Duration::days(UPCOMING_DAYS)),
    };
    match calendar.list(window).await {
        Ok(events) => events.len(),
        Err(err) => {
            tracing::warn!(error = %err, "could not count upcoming appointments");
            0
        }
    }
}

/// Dashboard summary. Backend failures degrade to empty numbers.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<DashboardStats>> {
    let (tables, upcoming) = tokio::join!(state.fetch_sources(), upcoming_appointments(&state));

    let now = Utc::now().with_timezone(&state.dates.timezone());
    let batches = state.batches(&tables);
    ApiResponse::ok(build_stats(&batches, &state.dates, now, upcoming, state.activity_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{AppointmentInput, CalendarService};
    use crate::data_types::{SourceSpec, TableData};
    use crate::server::test_support::{state, write_tab, FakeCalendar};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn grid(rows: &[&[&str]]) -> TableData {
        TableData::from_grid(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn counts_valid_rows_and_current_month() {
        let dates = DateParser::default();
        let now = chrono_tz::Europe::Madrid
            .with_ymd_and_hms(2026, 2, 15, 12, 0, 0)
            .unwrap();

        let leads_source = SourceSpec::new("lead", "Leads", "nuevo");
        let leads = grid(&[
            &["id", "Nombre", "Fecha", "Estado"],
            &["1", "Ana", "03/02/2026", "nuevo"],
            &["2", "Luis", "2026-02-20T10:00:00", ""],
            &["3", "Eva", "28/01/2026", "contactado"],
            &["4", "", "", ""],
            &["5", "Sin fecha", "", ""],
        ]);
        let clients_source = SourceSpec::new("cliente", "Clientes", "activo");
        let clients = TableData::empty();

        let batches = [
            SourceBatch {
                source: &leads_source,
                table: &leads,
            },
            SourceBatch {
                source: &clients_source,
                table: &clients,
            },
        ];
        let stats = build_stats(&batches, &dates, now, 3, 2);

        assert_eq!(
            stats.sources[0],
            SourceStats {
                kind: "lead".into(),
                source: "Leads".into(),
                total: 4,
                this_month: 2,
            }
        );
        assert_eq!(stats.sources[1].total, 0);
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.records_this_month, 2);
        assert_eq!(stats.upcoming_appointments, 3);
        assert_eq!(stats.recent_activity.len(), 2);
        assert_eq!(stats.recent_activity[0].name, "Luis");
    }

    #[test]
    fn month_boundary_uses_local_time() {
        let dates = DateParser::default();
        let now = chrono_tz::Europe::Madrid
            .with_ymd_and_hms(2026, 3, 1, 0, 30, 0)
            .unwrap();
        let source = SourceSpec::new("lead", "Leads", "nuevo");
        // 23:30 UTC on Feb 28 is already March 1st in Madrid
        let table = grid(&[&["Nombre", "Fecha"], &["Ana", "2026-02-28T23:30:00Z"]]);

        let stats = build_stats(&[SourceBatch { source: &source, table: &table }], &dates, now, 0, 20);
        assert_eq!(stats.sources[0].this_month, 1);
    }

    #[test]
    fn json_field_names() {
        let stats = DashboardStats {
            sources: vec![SourceStats {
                kind: "lead".into(),
                source: "Leads".into(),
                total: 1,
                this_month: 0,
            }],
            total_records: 1,
            records_this_month: 0,
            upcoming_appointments: 0,
            recent_activity: Vec::new(),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["sources"][0]["type"], "lead");
        assert_eq!(json["sources"][0]["thisMonth"], 0);
        assert_eq!(json["totalRecords"], 1);
        assert!(json["recentActivity"].as_array().unwrap().is_empty());
        assert_eq!(json["upcomingAppointments"], 0);
    }

    #[tokio::test]
    async fn handler_degrades_when_backends_fail() {
        let dir = tempdir().unwrap();
        let state = state(dir.path(), Some(Arc::new(FakeCalendar::failing())));

        let Json(response) = get_stats(State(state)).await;
        assert!(response.success);
        assert_eq!(response.data.total_records, 0);
        assert_eq!(response.data.upcoming_appointments, 0);
        assert_eq!(response.data.sources.len(), 2);
    }

    #[tokio::test]
    async fn handler_counts_upcoming_appointments() {
        let dir = tempdir().unwrap();
        write_tab(dir.path(), "Leads", "Nombre,Fecha\nAna,01/01/2026\n");

        let calendar = Arc::new(FakeCalendar::default());
        let start = Utc::now().fixed_offset() + Duration::days(1);
        let input = AppointmentInput {
            summary: "Consulta".into(),
            description: String::new(),
            location: String::new(),
            start,
            end: start + Duration::hours(1),
        };
        calendar.create(&input).await.unwrap();
        let later = AppointmentInput {
            start: start + Duration::days(30),
            end: start + Duration::days(30) + Duration::hours(1),
            ..input.clone()
        };
        calendar.create(&later).await.unwrap();

        let state = state(dir.path(), Some(calendar as Arc<dyn CalendarService>));
        let Json(response) = get_stats(State(state)).await;
        assert_eq!(response.data.upcoming_appointments, 1);
        assert_eq!(response.data.total_records, 1);
        assert_eq!(response.data.recent_activity[0].name, "Ana");
    }
}
