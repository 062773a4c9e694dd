// src/webhook.rs
use serde::Serialize;

use crate::calendar::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEvent {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: AppointmentEvent,
    appointment: &'a Appointment,
}

/// Posts appointment changes to an optional webhook. Delivery happens in
/// the background and never affects the request that triggered it.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    http: reqwest::Client,
    url: Option<String>,
}

impl Notifier {
    pub fn new(url: Option<String>) -> Self {
        Notifier {
            http: reqwest::Client::new(),
            url,
        }
    }

    pub fn disabled() -> Self {
        Notifier::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub fn notify(&self, event: AppointmentEvent, appointment: &Appointment) {
        let Some(url) = self.url.clone() else {
            return;
        };

        let http = self.http.clone();
        let appointment = appointment.clone();
        tokio::spawn(async move {
            deliver(&http, &url, event, &appointment).await;
        });
    }
}

async fn deliver(http: &reqwest::Client, url: &str, event: AppointmentEvent, appointment: &Appointment) -> bool {
    let payload = WebhookPayload { event, appointment };
    let result = http
        .post(url)
        .json(&payload)
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match result {
        Ok(_) => {
            tracing::debug!(url, id = %appointment.id, ?event, "appointment webhook delivered");
            true
        }
        Err(err) => {
            tracing::warn!(url, id = %appointment.id, ?event, error = %err, "appointment webhook failed");
            false
        }
    }
}
