// src/server.rs
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::activity::SourceBatch;
use crate::calendar::{CalendarService, GoogleCalendar};
use crate::cloud_handler::{self, CloudHandler};
use crate::config::Config;
use crate::csv_handler::CSVHandler;
use crate::data_types::{DataSource, SourceSpec, TableData};
use crate::dates::DateParser;
use crate::error::BackofficeResult;
use crate::sheet_source::{fetch_tabs_or_empty, SheetSource};
use crate::webhook::Notifier;

pub mod calendar;
pub mod error;
pub mod notifications;
pub mod sheets;
pub mod stats;

pub struct AppState {
    pub sheets: Arc<dyn SheetSource>,
    pub calendar: Option<Arc<dyn CalendarService>>,
    pub notifier: Notifier,
    pub dates: DateParser,
    pub sources: Vec<SourceSpec>,
    pub activity_limit: usize,
}

impl AppState {
    /// Connect the configured backends. In local mode the calendar is
    /// optional and only enabled when service-account credentials exist.
    pub async fn from_config(config: &Config) -> BackofficeResult<Self> {
        let dates = DateParser::new(config.timezone);

        let (sheets, auth) = match &config.data_source {
            DataSource::Local(dir) => {
                tracing::info!(dir = %dir.display(), "using local CSV tabs");
                let auth = if config.credentials_path.exists() {
                    Some(cloud_handler::authenticate(&config.credentials_path).await?)
                } else {
                    tracing::warn!(
                        path = %config.credentials_path.display(),
                        "no Google credentials, calendar disabled"
                    );
                    None
                };
                (Arc::new(CSVHandler::new(dir.clone())) as Arc<dyn SheetSource>, auth)
            }
            DataSource::Cloud(spreadsheet) => {
                let auth = cloud_handler::authenticate(&config.credentials_path).await?;
                let handler = CloudHandler::new(auth.clone(), spreadsheet)?;
                tracing::info!(spreadsheet_id = handler.spreadsheet_id(), "using Google Sheets");
                (Arc::new(handler) as Arc<dyn SheetSource>, Some(auth))
            }
        };

        let calendar = auth.map(|auth| {
            Arc::new(GoogleCalendar::new(auth, &config.calendar_id, dates)) as Arc<dyn CalendarService>
        });

        Ok(AppState {
            sheets,
            calendar,
            notifier: Notifier::new(config.webhook_url.clone()),
            dates,
            sources: config.sources.clone(),
            activity_limit: config.activity_limit,
        })
    }

    pub(crate) async fn fetch_sources(&self) -> Vec<TableData> {
        let tabs: Vec<&str> = self.sources.iter().map(|s| s.tab.as_str()).collect();
        fetch_tabs_or_empty(self.sheets.as_ref(), &tabs).await
    }

    pub(crate) fn batches<'a>(&'a self, tables: &'a [TableData]) -> Vec<SourceBatch<'a>> {
        self.sources
            .iter()
            .zip(tables)
            .map(|(source, table)| SourceBatch { source, table })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(ApiResponse { success: true, data })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats::get_stats))
        .route("/api/notifications", get(notifications::get_notifications))
        .route("/api/sheets", get(sheets::list_tabs))
        .route("/api/sheets/:tab", get(sheets::get_tab))
        .route("/api/sheets/:tab/rows", post(sheets::append_row))
        .route("/api/sheets/:tab/rows/:row_index", put(sheets::update_row))
        .route(
            "/api/calendar/events",
            get(calendar::list_events).post(calendar::create_event),
        )
        .route(
            "/api/calendar/events/:id",
            put(calendar::update_event).delete(calendar::delete_event),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}

async fn health() -> &'static str {
    "ok"
}
