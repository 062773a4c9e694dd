// src/server/sheets.rs
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::columns;
use crate::data_types::{Row, FIRST_DATA_ROW};
use crate::rows::valid_rows;
use crate::server::error::ApiError;
use crate::server::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabListing {
    pub tab: String,
    pub headers: Vec<String>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub columns: DetectedColumns,
    pub rows: Vec<Row>,
}

/// Headers picked by keyword for the well-known fields, if present.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct DetectedColumns {
    pub date: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub phone: Option<String>,
}

impl DetectedColumns {
    pub fn detect(headers: &[String]) -> Self {
        let find = |keywords| columns::find_column(headers, keywords).map(str::to_string);
        DetectedColumns {
            date: find(columns::DATE),
            name: find(columns::NAME),
            email: find(columns::EMAIL),
            status: find(columns::STATUS),
            phone: find(columns::PHONE),
        }
    }
}

/// `{ "values": { "<header>": <value>, ... } }`
#[derive(Debug, Deserialize)]
pub struct RowPayload {
    pub values: HashMap<String, serde_json::Value>,
}

pub async fn list_tabs(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let tabs = state
        .sheets
        .list_tabs()
        .await
        .map_err(|err| ApiError::failed("Failed to list sheets", err))?;
    Ok(ApiResponse::ok(tabs))
}

pub async fn get_tab(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
) -> Result<Json<ApiResponse<TabListing>>, ApiError> {
    let table = state
        .sheets
        .read_tab(&tab)
        .await
        .map_err(|err| ApiError::failed("Failed to read sheet", err))?;

    let rows = valid_rows(&table);
    Ok(ApiResponse::ok(TabListing {
        tab,
        total_rows: table.rows.len(),
        valid_rows: rows.len(),
        columns: DetectedColumns::detect(&table.headers),
        headers: table.headers,
        rows,
    }))
}

pub async fn append_row(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
    Json(payload): Json<RowPayload>,
) -> Result<Json<ApiResponse<Row>>, ApiError> {
    let table = state
        .sheets
        .read_tab(&tab)
        .await
        .map_err(|err| ApiError::failed("Failed to append row", err))?;

    let mut cells = vec![String::new(); table.headers.len()];
    if table.fill_cells(&mut cells, &payload.values) == 0 {
        return Err(ApiError::bad_request("No values match the sheet columns"));
    }

    state
        .sheets
        .append_row(&tab, cells.clone())
        .await
        .map_err(|err| ApiError::failed("Failed to append row", err))?;

    let row_index = table.rows.len() + FIRST_DATA_ROW;
    tracing::info!(tab = %tab, row_index, "appended row");
    Ok(ApiResponse::ok(Row::new(&table.headers, &cells, row_index)))
}

/// Merge the given values into an existing row and write it back whole.
pub async fn update_row(
    State(state): State<Arc<AppState>>,
    Path((tab, row_index)): Path<(String, usize)>,
    Json(payload): Json<RowPayload>,
) -> Result<Json<ApiResponse<Row>>, ApiError> {
    if row_index < FIRST_DATA_ROW {
        return Err(ApiError::bad_request(format!(
            "rowIndex must be at least {FIRST_DATA_ROW}"
        )));
    }

    let table = state
        .sheets
        .read_tab(&tab)
        .await
        .map_err(|err| ApiError::failed("Failed to update row", err))?;

    let Some(mut cells) = table.rows.get(row_index - FIRST_DATA_ROW).cloned() else {
        return Err(ApiError::not_found(format!("row {row_index} not found in {tab}")));
    };
    if table.fill_cells(&mut cells, &payload.values) == 0 {
        return Err(ApiError::bad_request("No values match the sheet columns"));
    }

    state
        .sheets
        .update_row(&tab, row_index, cells.clone())
        .await
        .map_err(|err| ApiError::failed("Failed to update row", err))?;

    Ok(ApiResponse::ok(Row::new(&table.headers, &cells, row_index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::{state, write_tab};
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::tempdir;

    fn payload(values: serde_json::Value) -> Json<RowPayload> {
        Json(serde_json::from_value(json!({ "values": values })).unwrap())
    }

    #[tokio::test]
    async fn lists_csv_tabs() {
        let dir = tempdir().unwrap();
        write_tab(dir.path(), "Leads", "Nombre\n");
        write_tab(dir.path(), "Clientes", "Nombre\n");

        let Json(response) = list_tabs(State(state(dir.path(), None))).await.unwrap();
        assert_eq!(response.data, vec!["Clientes", "Leads"]);
    }

    #[tokio::test]
    async fn tab_listing_keeps_only_valid_rows() {
        let dir = tempdir().unwrap();
        write_tab(dir.path(), "Leads", "id,Nombre,Email\n1,Ana,\n2,,\n3,,luis@example.com\n");

        let Json(response) = get_tab(State(state(dir.path(), None)), Path("Leads".into()))
            .await
            .unwrap();
        let listing = response.data;
        assert_eq!(listing.total_rows, 3);
        assert_eq!(listing.valid_rows, 2);
        assert_eq!(listing.rows[1].row_index, 4);
        assert_eq!(
            listing.columns,
            DetectedColumns {
                name: Some("Nombre".into()),
                email: Some("Email".into()),
                ..Default::default()
            }
        );

        let json = serde_json::to_value(&listing.rows[0]).unwrap();
        assert_eq!(json, json!({ "rowIndex": 2, "id": "1", "Nombre": "Ana", "Email": "" }));
    }

    #[tokio::test]
    async fn unknown_tab_is_not_found() {
        let dir = tempdir().unwrap();
        let err = get_tab(State(state(dir.path(), None)), Path("Nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn append_then_update() {
        let dir = tempdir().unwrap();
        write_tab(dir.path(), "Leads", "Nombre,Fecha,Estado\nAna,01/02/2026,nuevo\n");
        let state = state(dir.path(), None);

        let Json(created) = append_row(
            State(state.clone()),
            Path("Leads".into()),
            payload(json!({ "Nombre": "Luis", "Estado": "nuevo", "Desconocida": 1 })),
        )
        .await
        .unwrap();
        assert_eq!(created.data.row_index, 3);
        assert_eq!(created.data.get("Fecha"), Some(""));

        let Json(updated) = update_row(
            State(state.clone()),
            Path(("Leads".into(), 3)),
            payload(json!({ "Estado": "contactado", "Fecha": "02/02/2026" })),
        )
        .await
        .unwrap();
        assert_eq!(updated.data.get("Nombre"), Some("Luis"));
        assert_eq!(updated.data.get("Estado"), Some("contactado"));

        let table = state.sheets.read_tab("Leads").await.unwrap();
        assert_eq!(table.rows[1], vec!["Luis", "02/02/2026", "contactado"]);
        assert_eq!(table.rows[0][0], "Ana");
    }

    #[tokio::test]
    async fn rejects_bad_updates() {
        let dir = tempdir().unwrap();
        write_tab(dir.path(), "Leads", "Nombre,Estado\nAna,nuevo\n");
        let state = state(dir.path(), None);

        let header_row = update_row(
            State(state.clone()),
            Path(("Leads".into(), 1)),
            payload(json!({ "Estado": "x" })),
        )
        .await
        .unwrap_err();
        assert_eq!(header_row.status(), StatusCode::BAD_REQUEST);

        let missing = update_row(
            State(state.clone()),
            Path(("Leads".into(), 9)),
            payload(json!({ "Estado": "x" })),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let unmatched = append_row(
            State(state.clone()),
            Path("Leads".into()),
            payload(json!({ "Otra": "x" })),
        )
        .await
        .unwrap_err();
        assert_eq!(unmatched.status(), StatusCode::BAD_REQUEST);
    }
}
