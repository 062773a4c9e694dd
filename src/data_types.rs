// src/data_types.rs
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::columns;

// Sheet row number of the first data row, row 1 holds the headers
pub const FIRST_DATA_ROW: usize = 2;

const ROW_INDEX_KEY: &str = "rowIndex";

#[derive(Debug, Clone)]
pub enum DataSource {
    Local(PathBuf),
    Cloud(String), // spreadsheet url or id
}

// Rows are never dropped, so rows[i] always lives at sheet row i + FIRST_DATA_ROW
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    pub fn empty() -> Self {
        TableData {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return TableData::empty();
        }

        let headers: Vec<String> = grid.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = grid
            .into_iter()
            .map(|mut row| {
                // pad only, cells past the last header are kept
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        TableData { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<Row> {
        self.rows.get(position).map(|cells| Row::new(&self.headers, cells, position + FIRST_DATA_ROW))
    }

    pub fn records(&self) -> Vec<Row> {
        (0..self.rows.len()).filter_map(|i| self.row(i)).collect()
    }

    // Copies values into cells by exact header name, returns how many matched
    pub fn fill_cells(&self, cells: &mut [String], values: &HashMap<String, serde_json::Value>) -> usize {
        let mut matched = 0;
        for (i, header) in self.headers.iter().enumerate() {
            if let (Some(value), Some(cell)) = (values.get(header), cells.get_mut(i)) {
                *cell = cell_text(value);
                matched += 1;
            }
        }
        matched
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_index: usize,
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new(headers: &[String], values: &[String], row_index: usize) -> Self {
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), values.get(i).cloned().unwrap_or_default()))
            .collect();
        Row { row_index, cells }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn find(&self, keywords: &[&str]) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| columns::header_matches(h, keywords))
            .map(|(_, v)| v.as_str())
    }

    // blank cells count as missing
    pub fn find_filled(&self, keywords: &[&str]) -> Option<&str> {
        self.find(keywords)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(ROW_INDEX_KEY, &self.row_index)?;
        // a sheet column named rowIndex would duplicate the key
        for (header, value) in self.cells.iter().filter(|(h, _)| h != ROW_INDEX_KEY) {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

// A configured tab and the informal category its rows belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub kind: String,
    pub tab: String,
    pub default_status: String,
}

impl SourceSpec {
    pub fn new(kind: &str, tab: &str, default_status: &str) -> Self {
        SourceSpec {
            kind: kind.to_string(),
            tab: tab.to_string(),
            default_status: default_status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub name: String,
    pub date: DateTime<FixedOffset>,
    pub status: String,
}

pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
