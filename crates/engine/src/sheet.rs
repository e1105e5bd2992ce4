use serde::{Deserialize, Serialize};

use super::cell::CellValue;

/// One worksheet as a dense grid of typed cells.
///
/// Row 0 is the header row. Rows may be ragged; reads past the end of a row
/// return `Empty`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
}

static EMPTY: CellValue = CellValue::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Rows after the header, with their absolute row index.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, r)| (i, r.as_slice()))
    }

    /// Header labels, trimmed, cut at the last non-blank cell.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self.row(0).iter().map(CellValue::display).collect();
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }
        headers
    }
}
