// src/server/calendar.rs
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::calendar::{Appointment, AppointmentInput, CalendarService, TimeWindow};
use crate::dates::DateParser;
use crate::server::error::ApiError;
use crate::server::{ApiResponse, AppState};
use crate::webhook::AppointmentEvent;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub time_min: Option<String>,
    pub time_max: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
}

fn calendar(state: &AppState) -> Result<&Arc<dyn CalendarService>, ApiError> {
    state
        .calendar
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Calendar is not configured"))
}

fn bound(dates: &DateParser, name: &str, value: Option<&str>) -> Result<Option<DateTime<FixedOffset>>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => dates
            .parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("{name} is not a valid date: {raw}"))),
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    let calendar = calendar(&state)?;
    let window = TimeWindow {
        min: bound(&state.dates, "timeMin", query.time_min.as_deref())?,
        max: bound(&state.dates, "timeMax", query.time_max.as_deref())?,
    };

    let events = calendar
        .list(window)
        .await
        .map_err(|err| ApiError::failed("Failed to list events", err))?;
    Ok(ApiResponse::ok(events))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AppointmentInput>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let calendar = calendar(&state)?;
    input
        .validate()
        .map_err(|err| ApiError::failed("Invalid event", err))?;

    let appointment = calendar
        .create(&input)
        .await
        .map_err(|err| ApiError::failed("Failed to create event", err))?;

    state.notifier.notify(AppointmentEvent::Created, &appointment);
    Ok(ApiResponse::ok(appointment))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<AppointmentInput>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let calendar = calendar(&state)?;
    input
        .validate()
        .map_err(|err| ApiError::failed("Invalid event", err))?;

    let appointment = calendar
        .update(&id, &input)
        .await
        .map_err(|err| ApiError::failed("Failed to update event", err))?;

    state.notifier.notify(AppointmentEvent::Updated, &appointment);
    Ok(ApiResponse::ok(appointment))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    calendar(&state)?
        .delete(&id)
        .await
        .map_err(|err| ApiError::failed("Failed to delete event", err))?;
    Ok(ApiResponse::ok(Deleted { id }))
}
