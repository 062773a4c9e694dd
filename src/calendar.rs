// src/calendar.rs
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::cloud_handler::GoogleAuth;
use crate::dates::DateParser;
use crate::error::{BackofficeError, BackofficeResult};

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];
const PAGE_SIZE: &str = "250";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl AppointmentInput {
    pub fn validate(&self) -> BackofficeResult<()> {
        if self.summary.trim().is_empty() {
            return Err(BackofficeError::InvalidInput("summary is required".into()));
        }
        if self.end <= self.start {
            return Err(BackofficeError::InvalidInput("end must be after start".into()));
        }
        Ok(())
    }
}

/// Bounds for listing. A missing lower bound means "from now".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeWindow {
    pub min: Option<DateTime<FixedOffset>>,
    pub max: Option<DateTime<FixedOffset>>,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list(&self, window: TimeWindow) -> BackofficeResult<Vec<Appointment>>;

    async fn create(&self, input: &AppointmentInput) -> BackofficeResult<Appointment>;

    async fn update(&self, id: &str, input: &AppointmentInput) -> BackofficeResult<Appointment>;

    async fn delete(&self, id: &str) -> BackofficeResult<()>;
}

// ============================================================================
// Google Calendar wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<GoogleEventRaw>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventRaw {
    #[serde(default)]
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl EventDateTime {
    fn value(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    location: &'a str,
    start: EventDateTime,
    end: EventDateTime,
}

/// Events without a readable start or end are dropped; all-day events
/// start at local midnight.
fn to_appointment(raw: GoogleEventRaw, dates: &DateParser) -> Option<Appointment> {
    let start = raw.start.as_ref().and_then(EventDateTime::value).and_then(|s| dates.parse(s))?;
    let end = raw.end.as_ref().and_then(EventDateTime::value).and_then(|s| dates.parse(s))?;

    Some(Appointment {
        id: raw.id,
        summary: raw.summary.unwrap_or_else(|| "(Sin título)".to_string()),
        description: raw.description.unwrap_or_default(),
        location: raw.location.unwrap_or_default(),
        start,
        end,
    })
}

fn is_cancelled(raw: &GoogleEventRaw) -> bool {
    raw.status.as_deref() == Some("cancelled")
}

// ============================================================================
// Client
// ============================================================================

pub struct GoogleCalendar {
    http: reqwest::Client,
    auth: GoogleAuth,
    calendar_id: String,
    dates: DateParser,
}

impl GoogleCalendar {
    pub fn new(auth: GoogleAuth, calendar_id: &str, dates: DateParser) -> Self {
        GoogleCalendar {
            http: reqwest::Client::new(),
            auth,
            calendar_id: calendar_id.to_string(),
            dates,
        }
    }

    async fn access_token(&self) -> BackofficeResult<String> {
        let token = self.auth.token(CALENDAR_SCOPES).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or(BackofficeError::MissingToken)
    }

    fn events_url(&self, event_id: Option<&str>) -> BackofficeResult<Url> {
        events_url(&self.calendar_id, event_id)
    }

    fn body<'a>(&self, input: &'a AppointmentInput) -> EventBody<'a> {
        let time_zone = Some(self.dates.timezone().name().to_string());
        EventBody {
            summary: &input.summary,
            description: &input.description,
            location: &input.location,
            start: EventDateTime {
                date_time: Some(input.start.to_rfc3339()),
                time_zone: time_zone.clone(),
                ..Default::default()
            },
            end: EventDateTime {
                date_time: Some(input.end.to_rfc3339()),
                time_zone,
                ..Default::default()
            },
        }
    }

    fn read_appointment(&self, raw: GoogleEventRaw) -> BackofficeResult<Appointment> {
        let id = raw.id.clone();
        to_appointment(raw, &self.dates).ok_or_else(|| BackofficeError::CalendarApi {
            status: StatusCode::OK.as_u16(),
            message: format!("event {id} has no readable start/end"),
        })
    }
}

// Ids are percent-encoded as path segments
fn events_url(calendar_id: &str, event_id: Option<&str>) -> BackofficeResult<Url> {
    let mut url = Url::parse(CALENDAR_API)
        .map_err(|e| BackofficeError::InvalidInput(format!("calendar url: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| BackofficeError::InvalidInput("calendar url cannot be a base".into()))?;
        segments.extend(["calendars", calendar_id, "events"]);
        if let Some(id) = event_id {
            segments.push(id);
        }
    }
    Ok(url)
}

async fn check(response: reqwest::Response, event_id: Option<&str>) -> BackofficeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if let Some(id) = event_id {
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(BackofficeError::EventNotFound(id.to_string()));
        }
    }

    let message = response.text().await.unwrap_or_default();
    Err(BackofficeError::CalendarApi {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list(&self, window: TimeWindow) -> BackofficeResult<Vec<Appointment>> {
        let token = self.access_token().await?;
        let url = self.events_url(None)?;
        let time_min = window
            .min
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let time_max = window.max.map(|dt| dt.to_rfc3339());

        let mut appointments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .bearer_auth(&token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", PAGE_SIZE),
                ]);
            if let Some(ref max) = time_max {
                request = request.query(&[("timeMax", max.as_str())]);
            }
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let body: EventListResponse = check(request.send().await?, None).await?.json().await?;

            appointments.extend(
                body.items
                    .into_iter()
                    .filter(|raw| !is_cancelled(raw))
                    .filter_map(|raw| to_appointment(raw, &self.dates)),
            );

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        tracing::debug!(count = appointments.len(), "listed calendar events");
        Ok(appointments)
    }

    async fn create(&self, input: &AppointmentInput) -> BackofficeResult<Appointment> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.events_url(None)?)
            .bearer_auth(&token)
            .json(&self.body(input))
            .send()
            .await?;

        let raw: GoogleEventRaw = check(response, None).await?.json().await?;
        tracing::info!(id = %raw.id, "calendar event created");
        self.read_appointment(raw)
    }

    async fn update(&self, id: &str, input: &AppointmentInput) -> BackofficeResult<Appointment> {
        let token = self.access_token().await?;
        let response = self
            .http
            .put(self.events_url(Some(id))?)
            .bearer_auth(&token)
            .json(&self.body(input))
            .send()
            .await?;

        let raw: GoogleEventRaw = check(response, Some(id)).await?.json().await?;
        tracing::info!(id, "calendar event updated");
        self.read_appointment(raw)
    }

    async fn delete(&self, id: &str) -> BackofficeResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(self.events_url(Some(id))?)
            .bearer_auth(&token)
            .send()
            .await?;

        check(response, Some(id)).await?;
        tracing::info!(id, "calendar event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn event_urls_point_at_the_calendar_api() {
        let list = events_url("team@group.calendar.google.com", None).unwrap();
        assert_eq!(
            list.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events"
        );

        let single = events_url("primary", Some("a/b#c")).unwrap();
        assert_eq!(
            single.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events/a%2Fb%23c"
        );
    }

    #[test]
    fn event_list_deserialization() {
        let json = r#"{
            "items": [
                {
                    "id": "evt1",
                    "summary": "Consulta inicial",
                    "location": "Oficina",
                    "start": {"dateTime": "2026-02-08T09:00:00+01:00"},
                    "end": {"dateTime": "2026-02-08T09:30:00+01:00"}
                },
                {
                    "id": "evt2",
                    "status": "cancelled",
                    "start": {"dateTime": "2026-02-09T09:00:00+01:00"},
                    "end": {"dateTime": "2026-02-09T10:00:00+01:00"}
                }
            ],
            "nextPageToken": "abc"
        }"#;

        let resp: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 2);
        assert_eq!(resp.next_page_token.as_deref(), Some("abc"));
        assert!(!is_cancelled(&resp.items[0]));
        assert!(is_cancelled(&resp.items[1]));
    }

    #[test]
    fn raw_event_to_appointment() {
        let raw: GoogleEventRaw = serde_json::from_str(
            r#"{
                "id": "evt1",
                "summary": "Consulta",
                "start": {"dateTime": "2026-02-08T09:00:00+01:00"},
                "end": {"dateTime": "2026-02-08T09:30:00+01:00"}
            }"#,
        )
        .unwrap();

        let appointment = to_appointment(raw, &DateParser::default()).unwrap();
        assert_eq!(appointment.id, "evt1");
        assert_eq!(appointment.description, "");
        assert_eq!(appointment.start.hour(), 9);
        assert_eq!((appointment.end - appointment.start).num_minutes(), 30);
    }

    #[test]
    fn all_day_event_starts_at_local_midnight() {
        let raw: GoogleEventRaw = serde_json::from_str(
            r#"{"id": "holiday", "start": {"date": "2026-02-08"}, "end": {"date": "2026-02-09"}}"#,
        )
        .unwrap();

        let appointment = to_appointment(raw, &DateParser::default()).unwrap();
        assert_eq!(appointment.summary, "(Sin título)");
        assert_eq!(appointment.start.hour(), 0);
        assert_eq!(appointment.start.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn event_without_start_is_dropped() {
        let raw: GoogleEventRaw = serde_json::from_str(r#"{"id": "x", "summary": "?"}"#).unwrap();
        assert!(to_appointment(raw, &DateParser::default()).is_none());
    }

    #[test]
    fn input_validation() {
        let start = DateTime::parse_from_rfc3339("2026-02-08T09:00:00+01:00").unwrap();
        let mut input = AppointmentInput {
            summary: "Consulta".into(),
            description: String::new(),
            location: String::new(),
            start,
            end: start + chrono::Duration::minutes(30),
        };
        assert!(input.validate().is_ok());

        input.end = start;
        assert!(matches!(input.validate(), Err(BackofficeError::InvalidInput(_))));

        input.end = start + chrono::Duration::minutes(30);
        input.summary = "  ".into();
        assert!(matches!(input.validate(), Err(BackofficeError::InvalidInput(_))));
    }

    #[test]
    fn input_deserializes_with_optional_fields() {
        let input: AppointmentInput = serde_json::from_str(
            r#"{"summary": "Cita", "start": "2026-02-08T09:00:00+01:00", "end": "2026-02-08T10:00:00+01:00"}"#,
        )
        .unwrap();
        assert_eq!(input.location, "");
        assert!(input.validate().is_ok());
    }
}
