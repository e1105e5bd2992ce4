//! Serialized import entry point.
//!
//! One import at a time per store: the store mutex is held for the whole
//! reconciliation. Extraction runs before the lock is taken and never
//! touches the store.

use std::fmt;

use chrono::{DateTime, Utc};
use launchboard_engine::{extract_workbook, extract_workbook_parallel, Workbook};
use parking_lot::{Mutex, MutexGuard};

use crate::engine::{run, ImportContext};
use crate::error::ImportError;
use crate::model::ImportSummary;
use crate::store::Store;

pub struct Importer<S> {
    store: Mutex<S>,
    parallel: bool,
}

impl<S: Store> Importer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
            parallel: false,
        }
    }

    /// Extract sheets on worker threads.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn import(&self, workbook: &Workbook, filename: &str) -> Result<ImportSummary, ImportError> {
        self.import_at(workbook, filename, Utc::now())
    }

    /// Import with an explicit start time. The time stamps state rows and the
    /// batch, and selects the weekly snapshot key.
    pub fn import_at(
        &self,
        workbook: &Workbook,
        filename: &str,
        started_at: DateTime<Utc>,
    ) -> Result<ImportSummary, ImportError> {
        let extraction = if self.parallel {
            extract_workbook_parallel(workbook)
        } else {
            extract_workbook(workbook)
        };
        for sheet in &extraction.sheets {
            log::debug!("sheet '{}': {} ({} client rows)", sheet.name, sheet.role, sheet.client_rows);
        }
        log::info!(
            "extracted {} sheets: {} sellers, {} products, {} clients, {} purchase facts",
            extraction.sheet_count,
            extraction.sellers.len(),
            extraction.products.len(),
            extraction.touched_clients().len(),
            extraction.purchase_count()
        );

        let ctx = ImportContext::new(filename, started_at);
        let mut store = self.store.lock();
        run(&mut *store, &extraction, &ctx)
    }

    /// Lock the store for reads between imports.
    pub fn store(&self) -> MutexGuard<'_, S> {
        self.store.lock()
    }
}

/// User-facing status of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    InProgress,
    Success,
    Error(String),
}

impl ImportStatus {
    pub fn from_result<T>(result: &Result<T, ImportError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "importing..."),
            Self::Success => write!(f, "import complete"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}
