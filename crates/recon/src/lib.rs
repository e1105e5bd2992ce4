//! `launchboard-recon`: reconciliation of extracted workbook facts into the
//! client × product incorporation matrix.
//!
//! Pure engine crate: talks to persistence only through the [`Store`] and
//! [`ReportSource`] traits. No CLI or file IO dependencies.

pub mod engine;
pub mod error;
pub mod importer;
pub mod kpi;
pub mod memory;
pub mod model;
pub mod store;

pub use engine::{build_matrix, run, ImportContext};
pub use error::{ImportError, StoreError};
pub use importer::{ImportStatus, Importer};
pub use kpi::{build_dashboard, Dashboard, Kpi, KpiBand, KpiBands};
pub use memory::MemoryStore;
pub use model::{ImportBatch, ImportSummary, Incorporation, StateRow, YearWeek};
pub use store::{with_transaction, ReportSource, Store};
