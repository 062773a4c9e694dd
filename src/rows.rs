// src/rows.rs
use once_cell::sync::Lazy;
use regex::Regex;

use crate::data_types::{Row, TableData};

const KEY_COLUMNS: usize = 3;

static ID_LIKE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(_?id|#|n[º°o]\.?|idx|index|row|row[ _]?(index|number|num)|fila|n[uú]mero)\s*$")
        .expect("id header pattern is valid")
});

pub fn is_id_like(header: &str) -> bool {
    ID_LIKE_HEADER.is_match(header)
}

// whitespace and zero-width characters only
pub fn is_blank(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}'))
}

// Key columns: the first three non-id columns with any content in the tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    key_columns: Vec<usize>,
}

impl RowFilter {
    pub fn for_table(table: &TableData) -> Self {
        let key_columns = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !is_id_like(header))
            .filter(|(i, _)| {
                table
                    .rows
                    .iter()
                    .any(|row| row.get(*i).is_some_and(|cell| !is_blank(cell)))
            })
            .map(|(i, _)| i)
            .take(KEY_COLUMNS)
            .collect();

        RowFilter { key_columns }
    }

    pub fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    pub fn is_valid(&self, cells: &[String]) -> bool {
        self.key_columns
            .iter()
            .any(|&i| cells.get(i).is_some_and(|cell| !is_blank(cell)))
    }
}

pub fn valid_rows(table: &TableData) -> Vec<Row> {
    let filter = RowFilter::for_table(table);
    table
        .records()
        .into_iter()
        .zip(&table.rows)
        .filter(|(_, cells)| filter.is_valid(cells))
        .map(|(row, _)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> TableData {
        TableData::from_grid(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn id_like_headers() {
        for header in ["id", "ID", "_id", "#", "Nº", "rowIndex", "row_number", "Fila", "Número"] {
            assert!(is_id_like(header), "{header} should be id-like");
        }
        for header in ["Nombre", "Identificación", "Email", "Fecha"] {
            assert!(!is_id_like(header), "{header} should not be id-like");
        }
    }

    #[test]
    fn blank_includes_zero_width_characters() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\u{00A0}"));
        assert!(is_blank("\u{200B}\u{FEFF} "));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn row_with_only_id_columns_is_invalid() {
        let t = table(&[
            &["id", "rowIndex", "Nombre", "Email", "Fecha"],
            &["1", "2", "Ana", "", ""],
            &["2", "3", "", "", ""],
            &["3", "4", "\u{200B}", " ", ""],
        ]);
        let filter = RowFilter::for_table(&t);
        assert!(filter.is_valid(&t.rows[0]));
        assert!(!filter.is_valid(&t.rows[1]));
        assert!(!filter.is_valid(&t.rows[2]));
        assert_eq!(valid_rows(&t).len(), 1);
    }

    #[test]
    fn only_first_three_populated_columns_count() {
        let t = table(&[
            &["ID", "Vacía", "Nombre", "Email", "Fecha", "Notas"],
            &["1", "", "Ana", "", "", ""],
            &["2", "", "", "", "01/02/2026", ""],
            &["3", "", "", "", "", "solo notas"],
            &["4", "", "", "eva@example.com", "", ""],
        ]);
        let filter = RowFilter::for_table(&t);

        // "Vacía" never has content, "Notas" is the fourth populated column
        assert_eq!(filter.key_columns(), &[2, 3, 4]);
        assert!(filter.is_valid(&t.rows[0]));
        assert!(filter.is_valid(&t.rows[1]));
        assert!(!filter.is_valid(&t.rows[2]));
        assert!(filter.is_valid(&t.rows[3]));
    }

    #[test]
    fn valid_rows_keep_sheet_row_numbers() {
        let t = table(&[
            &["id", "Nombre", "Email"],
            &["1", "Ana", ""],
            &["2", "", ""],
            &["3", "", "luis@example.com"],
        ]);
        let rows = valid_rows(&t);
        assert_eq!(
            rows.iter().map(|r| r.row_index).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn table_without_content_has_no_valid_rows() {
        let t = table(&[&["id", "Nombre"], &["1", ""], &["2", " "]]);
        assert!(RowFilter::for_table(&t).key_columns().is_empty());
        assert!(valid_rows(&t).is_empty());
        assert!(valid_rows(&TableData::empty()).is_empty());
    }
}
