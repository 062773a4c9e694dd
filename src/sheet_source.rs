// src/sheet_source.rs
use async_trait::async_trait;
use futures_util::future::join_all;

use crate::data_types::TableData;
use crate::error::BackofficeResult;

// row_index is the 1-based sheet row number, the first data row is 2
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn list_tabs(&self) -> BackofficeResult<Vec<String>>;

    async fn read_tab(&self, tab: &str) -> BackofficeResult<TableData>;

    async fn update_row(&self, tab: &str, row_index: usize, cells: Vec<String>) -> BackofficeResult<()>;

    async fn append_row(&self, tab: &str, cells: Vec<String>) -> BackofficeResult<()>;
}

// A tab that fails to load is logged and replaced by an empty table
pub async fn fetch_tabs_or_empty(source: &dyn SheetSource, tabs: &[&str]) -> Vec<TableData> {
    join_all(tabs.iter().map(|tab| async move {
        source.read_tab(tab).await.unwrap_or_else(|err| {
            tracing::warn!(tab, error = %err, "tab fetch failed, using empty table");
            TableData::empty()
        })
    }))
    .await
}
