// src/csv_handler.rs
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;
use tokio::task;

use crate::data_types::{TableData, FIRST_DATA_ROW};
use crate::error::{BackofficeError, BackofficeResult};
use crate::sheet_source::SheetSource;

// A directory of `<tab>.csv` files standing in for a spreadsheet
pub struct CSVHandler {
    root: PathBuf,
    // held for every read-modify-write of a tab file
    write_lock: Arc<Mutex<()>>,
}

impl CSVHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CSVHandler {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn tab_path(&self, tab: &str) -> BackofficeResult<PathBuf> {
        if tab.is_empty() || tab.contains(&['/', '\\'][..]) || tab.starts_with('.') {
            return Err(BackofficeError::InvalidInput(format!("invalid tab name: {tab}")));
        }
        Ok(self.root.join(format!("{tab}.csv")))
    }

    fn existing_tab_path(&self, tab: &str) -> BackofficeResult<PathBuf> {
        let path = self.tab_path(tab)?;
        if !path.is_file() {
            return Err(BackofficeError::TabNotFound(tab.to_string()));
        }
        Ok(path)
    }

    // Semicolon when the first line has one, comma otherwise
    fn detect_delimiter(path: &Path) -> u8 {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => return b',',
        };

        let mut reader = BufReader::new(file);
        let mut first_line = String::new();

        if reader.read_line(&mut first_line).is_ok() && first_line.contains(';') {
            return b';';
        }

        b','
    }

    fn read_grid(path: &Path) -> BackofficeResult<(Vec<Vec<String>>, u8)> {
        let delimiter = Self::detect_delimiter(path);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut grid = Vec::new();
        for record in reader.records() {
            grid.push(record?.iter().map(String::from).collect());
        }

        Ok((grid, delimiter))
    }

    fn write_grid(path: &Path, delimiter: u8, grid: &[Vec<String>]) -> BackofficeResult<()> {
        // Write next to the tab, then rename over it so readers never see a partial file
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = WriterBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_writer(&mut temp);

            for row in grid {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        temp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    // Runs `change` on the tab's grid and writes it back while holding the write lock
    async fn modify_tab<F>(&self, tab: &str, change: F) -> BackofficeResult<()>
    where
        F: FnOnce(&mut Vec<Vec<String>>) -> BackofficeResult<()> + Send + 'static,
    {
        let path = self.existing_tab_path(tab)?;
        let lock = Arc::clone(&self.write_lock);
        task::spawn_blocking(move || -> BackofficeResult<()> {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let (mut grid, delimiter) = Self::read_grid(&path)?;
            change(&mut grid)?;
            Self::write_grid(&path, delimiter, &grid)
        })
        .await?
    }
}

#[async_trait]
impl SheetSource for CSVHandler {
    async fn list_tabs(&self) -> BackofficeResult<Vec<String>> {
        let root = self.root.clone();
        task::spawn_blocking(move || -> BackofficeResult<Vec<String>> {
            let mut tabs = Vec::new();
            for entry in fs::read_dir(&root)? {
                let path = entry?.path();
                let is_csv = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
                if let (true, Some(stem)) = (is_csv, path.file_stem().and_then(|s| s.to_str())) {
                    tabs.push(stem.to_string());
                }
            }
            tabs.sort();
            Ok(tabs)
        })
        .await?
    }

    async fn read_tab(&self, tab: &str) -> BackofficeResult<TableData> {
        let path = self.existing_tab_path(tab)?;
        let (grid, _) = task::spawn_blocking(move || Self::read_grid(&path)).await??;
        Ok(TableData::from_grid(grid))
    }

    async fn update_row(&self, tab: &str, row_index: usize, cells: Vec<String>) -> BackofficeResult<()> {
        if row_index < FIRST_DATA_ROW {
            return Err(BackofficeError::InvalidInput(format!("row {row_index} is not a data row")));
        }

        let name = tab.to_string();
        self.modify_tab(tab, move |grid| {
            let row = grid
                .get_mut(row_index - 1)
                .ok_or(BackofficeError::RowNotFound { tab: name, row: row_index })?;
            // cells past the new values stay as they were
            let replaced = cells.len().min(row.len());
            row.splice(..replaced, cells);
            Ok(())
        })
        .await?;

        tracing::info!(tab, row_index, "row updated");
        Ok(())
    }

    async fn append_row(&self, tab: &str, cells: Vec<String>) -> BackofficeResult<()> {
        self.modify_tab(tab, move |grid| {
            grid.push(cells);
            Ok(())
        })
        .await?;

        tracing::info!(tab, "row appended");
        Ok(())
    }
}
