// src/config.rs
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::activity::DEFAULT_ACTIVITY_LIMIT;
use crate::data_types::{DataSource, SourceSpec};
use crate::dates::DEFAULT_TIMEZONE;
use crate::error::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_CREDENTIALS: &str = "credentials.json";
pub const DEFAULT_CALENDAR: &str = "primary";
pub const DEFAULT_SOURCES: &str = "lead:Leads,cliente:Clientes,email:Emails,formulario:Formularios";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub data_source: DataSource,
    pub credentials_path: PathBuf,
    pub calendar_id: String,
    pub timezone: Tz,
    pub activity_limit: usize,
    pub sources: Vec<SourceSpec>,
    pub webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_raw = get("BACKOFFICE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BACKOFFICE_BIND",
            value: bind_raw.clone(),
        })?;

        let data_source = match (get("BACKOFFICE_DATA_DIR"), get("BACKOFFICE_SPREADSHEET")) {
            (Some(dir), _) => DataSource::Local(PathBuf::from(dir)),
            (None, Some(spreadsheet)) => DataSource::Cloud(spreadsheet),
            (None, None) => return Err(ConfigError::NoDataSource),
        };

        let timezone = match get("BACKOFFICE_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                key: "BACKOFFICE_TIMEZONE",
                value: name.clone(),
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let activity_limit = match get("BACKOFFICE_ACTIVITY_LIMIT") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::Invalid {
                    key: "BACKOFFICE_ACTIVITY_LIMIT",
                    value: raw.clone(),
                })?,
            None => DEFAULT_ACTIVITY_LIMIT,
        };

        let sources = parse_sources(&get("BACKOFFICE_SOURCES").unwrap_or_else(|| DEFAULT_SOURCES.to_string()))?;

        Ok(Config {
            bind,
            data_source,
            credentials_path: PathBuf::from(
                get("GOOGLE_CREDENTIALS_PATH").unwrap_or_else(|| DEFAULT_CREDENTIALS.to_string()),
            ),
            calendar_id: get("BACKOFFICE_CALENDAR_ID").unwrap_or_else(|| DEFAULT_CALENDAR.to_string()),
            timezone,
            activity_limit,
            sources,
            webhook_url: get("BACKOFFICE_WEBHOOK_URL"),
        })
    }
}

/// Parse `kind:Tab[:default status]` entries separated by commas.
pub fn parse_sources(value: &str) -> Result<Vec<SourceSpec>, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "BACKOFFICE_SOURCES",
        value: value.to_string(),
    };

    let mut sources = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':').map(str::trim);
        let kind = parts.next().filter(|k| !k.is_empty()).ok_or_else(invalid)?;
        let tab = parts.next().filter(|t| !t.is_empty()).ok_or_else(invalid)?;
        let status = parts
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_status(kind));
        sources.push(SourceSpec::new(kind, tab, status));
    }

    if sources.is_empty() {
        return Err(invalid());
    }
    Ok(sources)
}

fn default_status(kind: &str) -> &'static str {
    match kind {
        "cliente" => "activo",
        "email" => "enviado",
        "formulario" => "recibido",
        _ => "nuevo",
    }
}
