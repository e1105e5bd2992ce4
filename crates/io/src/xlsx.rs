// Excel workbook loading (xlsx, xls, xlsb, ods) via calamine

use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};

use launchboard_engine::{CellValue, Sheet, Workbook};
use launchboard_recon::{ImportError, ImportSummary, Importer, Store};

/// Failure to open or read a workbook.
#[derive(Debug)]
pub enum WorkbookError {
    Open { source: String, message: String },
    Sheet { sheet: String, message: String },
    NoSheets,
}

impl fmt::Display for WorkbookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { source, message } => write!(f, "failed to open {}: {}", source, message),
            Self::Sheet { sheet, message } => write!(f, "failed to read sheet '{}': {}", sheet, message),
            Self::NoSheets => write!(f, "workbook contains no sheets"),
        }
    }
}

impl std::error::Error for WorkbookError {}

impl From<WorkbookError> for ImportError {
    fn from(e: WorkbookError) -> Self {
        ImportError::Workbook(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every sheet of the workbook at `path`.
pub fn load(path: &Path) -> Result<Workbook, WorkbookError> {
    let sheets = open_workbook_auto(path).map_err(|e| WorkbookError::Open {
        source: path.display().to_string(),
        message: e.to_string(),
    })?;
    read_sheets(sheets)
}

/// Load a workbook from an in-memory byte stream. The format is sniffed.
pub fn load_bytes(bytes: Vec<u8>) -> Result<Workbook, WorkbookError> {
    let sheets = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| WorkbookError::Open {
        source: "byte stream".to_string(),
        message: e.to_string(),
    })?;
    read_sheets(sheets)
}

fn read_sheets<RS: Read + Seek>(mut sheets: Sheets<RS>) -> Result<Workbook, WorkbookError> {
    let names: Vec<String> = sheets.sheet_names().to_vec();
    if names.is_empty() {
        return Err(WorkbookError::NoSheets);
    }

    let mut workbook = Workbook::new();
    for name in names {
        let range = sheets.worksheet_range(&name).map_err(|e| WorkbookError::Sheet {
            sheet: name.clone(),
            message: e.to_string(),
        })?;
        let sheet = sheet_from_range(&name, &range);
        log::debug!("loaded sheet '{}' ({} rows)", name, sheet.row_count());
        workbook.add_sheet(sheet);
    }
    Ok(workbook)
}

/// Rows start at the first used row. Columns keep their absolute position.
fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);
    let (_, start_col) = range.start().unwrap_or((0, 0));

    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_value));
        while matches!(cells.last(), Some(CellValue::Empty)) {
            cells.pop();
        }
        sheet.push_row(cells);
    }
    sheet
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        // Date serials stay numeric
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        // Error cells read as blank
        Data::Error(_) => CellValue::Empty,
    }
}

// ---------------------------------------------------------------------------
// Import helpers
// ---------------------------------------------------------------------------

/// Load `path` and run it through `importer`, recording the file name.
pub fn import_file<S: Store>(importer: &Importer<S>, path: &Path) -> Result<ImportSummary, ImportError> {
    let workbook = load(path)?;
    importer.import(&workbook, &display_name(path))
}

/// Import a workbook held in memory under the given file name.
pub fn import_bytes<S: Store>(
    importer: &Importer<S>,
    bytes: Vec<u8>,
    filename: &str,
) -> Result<ImportSummary, ImportError> {
    let workbook = load_bytes(bytes)?;
    importer.import(&workbook, filename)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
