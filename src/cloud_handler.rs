// src/cloud_handler.rs
use std::path::Path;

use async_trait::async_trait;
use google_sheets4::api::ValueRange;
use google_sheets4::hyper::client::HttpConnector;
use google_sheets4::hyper_rustls::HttpsConnector;
use google_sheets4::{hyper, hyper_rustls, Sheets};
use yup_oauth2::authenticator::Authenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::data_types::{cell_text, TableData, FIRST_DATA_ROW};
use crate::error::{BackofficeError, BackofficeResult};
use crate::sheet_source::SheetSource;

pub type GoogleAuth = Authenticator<HttpsConnector<HttpConnector>>;

const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

// Shared by the Sheets and Calendar clients
pub async fn authenticate(credentials_path: &Path) -> BackofficeResult<GoogleAuth> {
    if !credentials_path.exists() {
        return Err(BackofficeError::CredentialsNotFound(credentials_path.to_path_buf()));
    }

    let json = tokio::fs::read_to_string(credentials_path).await?;
    let service_account_key: ServiceAccountKey = serde_json::from_str(&json)?;

    let auth = ServiceAccountAuthenticator::builder(service_account_key)
        .build()
        .await?;

    Ok(auth)
}

pub struct CloudHandler {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    spreadsheet_id: String,
}

impl CloudHandler {
    pub fn new(auth: GoogleAuth, spreadsheet: &str) -> BackofficeResult<Self> {
        let spreadsheet_id = extract_spreadsheet_id(spreadsheet)?.to_string();

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let hub = Sheets::new(hyper::Client::builder().build(connector), auth);

        Ok(CloudHandler { hub, spreadsheet_id })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }
}

#[async_trait]
impl SheetSource for CloudHandler {
    async fn list_tabs(&self) -> BackofficeResult<Vec<String>> {
        let (_, spreadsheet) = self.hub.spreadsheets().get(&self.spreadsheet_id).doit().await?;

        Ok(spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|p| p.title))
            .collect())
    }

    async fn read_tab(&self, tab: &str) -> BackofficeResult<TableData> {
        let range = tab_range(tab);
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, &range)
            .doit()
            .await?;

        tracing::debug!(tab, rows = response.values.as_ref().map_or(0, Vec::len), "read tab");
        Ok(process_data(response))
    }

    async fn update_row(&self, tab: &str, row_index: usize, cells: Vec<String>) -> BackofficeResult<()> {
        if row_index < FIRST_DATA_ROW {
            return Err(BackofficeError::InvalidInput(format!("row {row_index} is not a data row")));
        }

        let range = format!("{}!A{}", tab_range(tab), row_index);
        self.hub
            .spreadsheets()
            .values_update(value_range(cells), &self.spreadsheet_id, &range)
            .value_input_option(VALUE_INPUT_OPTION)
            .doit()
            .await?;

        tracing::info!(tab, row_index, "row updated");
        Ok(())
    }

    async fn append_row(&self, tab: &str, cells: Vec<String>) -> BackofficeResult<()> {
        let range = tab_range(tab);
        self.hub
            .spreadsheets()
            .values_append(value_range(cells), &self.spreadsheet_id, &range)
            .value_input_option(VALUE_INPUT_OPTION)
            .insert_data_option("INSERT_ROWS")
            .doit()
            .await?;

        tracing::info!(tab, "row appended");
        Ok(())
    }
}

// Bare id or https://docs.google.com/spreadsheets/d/<ID>/edit
pub fn extract_spreadsheet_id(value: &str) -> BackofficeResult<&str> {
    let value = value.trim();
    let parts: Vec<&str> = value.split('/').collect();

    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() && !parts[i + 1].is_empty() {
            return Ok(parts[i + 1]);
        }
    }

    if !value.is_empty() && parts.len() == 1 {
        return Ok(value);
    }

    Err(BackofficeError::InvalidInput(format!("invalid spreadsheet reference: {value}")))
}

// A1 reference to a whole tab, quotes doubled inside the name
fn tab_range(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

fn value_range(cells: Vec<String>) -> ValueRange {
    ValueRange {
        values: Some(vec![cells.into_iter().map(serde_json::Value::String).collect()]),
        ..Default::default()
    }
}

fn process_data(response: ValueRange) -> TableData {
    let grid = response
        .values
        .unwrap_or_default()
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    TableData::from_grid(grid)
}
