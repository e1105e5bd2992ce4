//! `launchboard-engine`: workbook model, sheet classification and extraction.
//!
//! Pure crate: no file or database access. Readers build a [`Workbook`],
//! [`extract_workbook`] turns it into an [`Extraction`].

pub mod cell;
pub mod classify;
pub mod extract;
pub mod facts;
pub mod header;
pub mod sheet;
pub mod workbook;

pub use cell::CellValue;
pub use classify::{classify, classify_sheet, RoleKind, SheetRole};
pub use extract::{extract_sheet, Client, Product, SheetFacts};
pub use facts::{extract_workbook, extract_workbook_parallel, Extraction, SheetOutcome};
pub use sheet::Sheet;
pub use workbook::Workbook;
