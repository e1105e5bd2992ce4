//! Store interfaces consumed by the reconciliation engine and by reports.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use launchboard_engine::Client;

use crate::error::StoreError;
use crate::model::{ImportBatch, NewBatch, ProductTally, SellerTally, StateRow, YearWeek};

/// Write and identity-read operations an import needs.
///
/// Implementations must make `begin`/`commit`/`rollback` bracket every
/// other call into one atomic unit.
pub trait Store {
    fn begin(&mut self) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Returns the seller id (the trimmed name).
    fn upsert_seller(&mut self, name: &str) -> Result<String, StoreError>;
    fn upsert_product(&mut self, code: &str, name: &str) -> Result<String, StoreError>;
    /// Insert or overwrite a client with full attributes.
    fn upsert_client(&mut self, client: &Client) -> Result<String, StoreError>;
    /// Register a client id without attributes. Existing rows are untouched.
    fn ensure_client(&mut self, id: &str) -> Result<(), StoreError>;
    fn ensure_assignment(&mut self, client_id: &str, seller_id: &str) -> Result<(), StoreError>;

    /// Bulk upsert of current state, keyed by (client, product).
    fn upsert_states(&mut self, rows: &[StateRow], updated_at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Bulk upsert of the weekly snapshot, keyed by (client, product, week).
    fn upsert_weekly_states(&mut self, rows: &[StateRow], year_week: YearWeek) -> Result<(), StoreError>;

    fn known_client_ids(&self) -> Result<BTreeSet<String>, StoreError>;
    fn known_product_codes(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Returns the generated batch id.
    fn insert_import_batch(&mut self, batch: &NewBatch) -> Result<String, StoreError>;
}

/// Read-side queries behind the dashboard.
pub trait ReportSource {
    fn total_pairs(&self) -> Result<usize, StoreError>;
    fn total_incorporated(&self) -> Result<usize, StoreError>;
    /// Ordered by incorporated count, descending.
    fn per_seller(&self) -> Result<Vec<SellerTally>, StoreError>;
    /// Ordered by incorporated count, descending.
    fn per_product(&self) -> Result<Vec<ProductTally>, StoreError>;
    fn last_batch(&self) -> Result<Option<ImportBatch>, StoreError>;
    /// Most recent first.
    fn batches(&self, limit: usize) -> Result<Vec<ImportBatch>, StoreError>;
}

/// Run `f` inside a store transaction. Commits on Ok, rolls back on Err.
pub fn with_transaction<S, T, F>(store: &mut S, f: F) -> Result<T, StoreError>
where
    S: Store + ?Sized,
    F: FnOnce(&mut S) -> Result<T, StoreError>,
{
    store.begin()?;
    match f(store) {
        Ok(val) => match store.commit() {
            Ok(()) => Ok(val),
            Err(e) => {
                if let Err(rb) = store.rollback() {
                    log::warn!("rollback failed after commit error '{e}': {rb}");
                }
                Err(e)
            }
        },
        Err(e) => {
            if let Err(rb) = store.rollback() {
                log::warn!("rollback failed after '{e}': {rb}");
            }
            Err(e)
        }
    }
}
