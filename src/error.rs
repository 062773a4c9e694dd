// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackofficeError {
    #[error("Google Sheets: {0}")]
    Sheets(#[from] google_sheets4::Error),
    #[error("OAuth: {0}")]
    Auth(#[from] yup_oauth2::Error),
    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),
    #[error("Access token missing from OAuth response")]
    MissingToken,
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Calendar API error {status}: {message}")]
    CalendarApi { status: u16, message: String },
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Tab not found: {0}")]
    TabNotFound(String),
    #[error("Row {row} not found in {tab}")]
    RowNotFound { tab: String, row: usize },
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type BackofficeResult<T> = Result<T, BackofficeError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("set BACKOFFICE_DATA_DIR or BACKOFFICE_SPREADSHEET")]
    NoDataSource,
}
