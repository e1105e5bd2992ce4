// File I/O: workbook loading, persistent store, exports

pub mod export;
pub mod report;
pub mod store;
pub mod xlsx;

pub use export::{export_sellers, write_manifest, ExportError, SellerExport};
pub use report::write_dashboard;
pub use store::SqliteStore;
pub use xlsx::{import_bytes, import_file, load, load_bytes, WorkbookError};
