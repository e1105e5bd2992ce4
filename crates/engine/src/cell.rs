use serde::{Deserialize, Serialize};

/// A typed cell value as read from a workbook.
///
/// Readers collapse every source type into one of three shapes. Error cells
/// and anything else that can't be represented become `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Build a text cell, collapsing empty strings to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// True for `Empty` and for text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Trimmed display string. Integral numbers render without a fraction,
    /// so a `COD` of `1.0` becomes `"1"`.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
        }
    }

    /// The purchase-flag rule: text `"1"` (after trimming) or exactly `1.0`.
    pub fn is_purchase_mark(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim() == "1",
            CellValue::Number(n) => *n == 1.0,
            CellValue::Empty => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
