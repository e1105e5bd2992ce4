//! In-memory [`Store`] used by tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use launchboard_engine::Client;

use crate::error::StoreError;
use crate::model::{
    ImportBatch, Incorporation, NewBatch, ProductTally, SellerTally, StateRow, YearWeek,
};
use crate::store::{ReportSource, Store};

/// Client row as stored. Attributes are absent for clients known only from
/// single-product sheets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredClient {
    pub name: Option<String>,
    pub locality: Option<String>,
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    sellers: BTreeSet<String>,
    products: BTreeMap<String, String>,
    clients: BTreeMap<String, StoredClient>,
    assignments: BTreeSet<(String, String)>,
    states: BTreeMap<(String, String), (Incorporation, DateTime<Utc>)>,
    weekly: BTreeMap<(String, String, YearWeek), Incorporation>,
    batches: Vec<ImportBatch>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshot: Option<Tables>,
    fail_batch_insert: bool,
    fail_commit: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next batch insert fail, to exercise rollback.
    pub fn inject_batch_failure(&mut self, fail: bool) {
        self.fail_batch_insert = fail;
    }

    /// Make commits fail while leaving the transaction open.
    pub fn inject_commit_failure(&mut self, fail: bool) {
        self.fail_commit = fail;
    }

    pub fn sellers(&self) -> &BTreeSet<String> {
        &self.tables.sellers
    }

    pub fn product_name(&self, code: &str) -> Option<&str> {
        self.tables.products.get(code).map(String::as_str)
    }

    pub fn client(&self, id: &str) -> Option<&StoredClient> {
        self.tables.clients.get(id)
    }

    pub fn assignments(&self) -> &BTreeSet<(String, String)> {
        &self.tables.assignments
    }

    pub fn state(&self, client: &str, product: &str) -> Option<Incorporation> {
        self.tables
            .states
            .get(&(client.to_string(), product.to_string()))
            .map(|(s, _)| *s)
    }

    /// Current state rows, sorted by (client, product).
    pub fn states(&self) -> Vec<StateRow> {
        self.tables
            .states
            .iter()
            .map(|((c, p), (s, _))| StateRow {
                client_id: c.clone(),
                product_code: p.clone(),
                state: *s,
            })
            .collect()
    }

    /// Weekly rows for one week, sorted by (client, product).
    pub fn weekly(&self, week: YearWeek) -> Vec<StateRow> {
        self.tables
            .weekly
            .iter()
            .filter(|((_, _, w), _)| *w == week)
            .map(|((c, p, _), s)| StateRow {
                client_id: c.clone(),
                product_code: p.clone(),
                state: *s,
            })
            .collect()
    }

    pub fn weekly_row_count(&self) -> usize {
        self.tables.weekly.len()
    }

    pub fn batch_count(&self) -> usize {
        self.tables.batches.len()
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::new("transaction already open"));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::new("commit failed"));
        }
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::new("commit without transaction"))
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::new("rollback without transaction"))?;
        self.tables = snapshot;
        Ok(())
    }

    fn upsert_seller(&mut self, name: &str) -> Result<String, StoreError> {
        let id = name.trim().to_string();
        self.tables.sellers.insert(id.clone());
        Ok(id)
    }

    fn upsert_product(&mut self, code: &str, name: &str) -> Result<String, StoreError> {
        self.tables.products.insert(code.to_string(), name.to_string());
        Ok(code.to_string())
    }

    fn upsert_client(&mut self, client: &Client) -> Result<String, StoreError> {
        self.tables.clients.insert(
            client.id.clone(),
            StoredClient {
                name: Some(client.name.clone()),
                locality: Some(client.locality.clone()),
                zone: client.zone.clone(),
            },
        );
        Ok(client.id.clone())
    }

    fn ensure_client(&mut self, id: &str) -> Result<(), StoreError> {
        self.tables.clients.entry(id.to_string()).or_default();
        Ok(())
    }

    fn ensure_assignment(&mut self, client_id: &str, seller_id: &str) -> Result<(), StoreError> {
        self.tables
            .assignments
            .insert((client_id.to_string(), seller_id.to_string()));
        Ok(())
    }

    fn upsert_states(&mut self, rows: &[StateRow], updated_at: DateTime<Utc>) -> Result<(), StoreError> {
        for r in rows {
            self.tables.states.insert(
                (r.client_id.clone(), r.product_code.clone()),
                (r.state, updated_at),
            );
        }
        Ok(())
    }

    fn upsert_weekly_states(&mut self, rows: &[StateRow], year_week: YearWeek) -> Result<(), StoreError> {
        for r in rows {
            self.tables.weekly.insert(
                (r.client_id.clone(), r.product_code.clone(), year_week),
                r.state,
            );
        }
        Ok(())
    }

    fn known_client_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.tables.clients.keys().cloned().collect())
    }

    fn known_product_codes(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.tables.products.keys().cloned().collect())
    }

    fn insert_import_batch(&mut self, batch: &NewBatch) -> Result<String, StoreError> {
        if self.fail_batch_insert {
            return Err(StoreError::new("batch insert failed"));
        }
        let id = format!("batch-{}", self.tables.batches.len() + 1);
        self.tables.batches.push(ImportBatch::from_new(id.clone(), batch));
        Ok(id)
    }
}

impl ReportSource for MemoryStore {
    fn total_pairs(&self) -> Result<usize, StoreError> {
        Ok(self.tables.states.len())
    }

    fn total_incorporated(&self) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .states
            .values()
            .filter(|(s, _)| *s == Incorporation::Incorporated)
            .count())
    }

    fn per_seller(&self) -> Result<Vec<SellerTally>, StoreError> {
        let mut out: Vec<SellerTally> = self
            .tables
            .sellers
            .iter()
            .map(|seller| {
                let mut tally = SellerTally {
                    seller: seller.clone(),
                    incorporated: 0,
                    pending: 0,
                };
                let clients = self
                    .tables
                    .assignments
                    .iter()
                    .filter(|(_, s)| s == seller)
                    .map(|(c, _)| c);
                for client in clients {
                    for ((c, _), (state, _)) in &self.tables.states {
                        if c != client {
                            continue;
                        }
                        match state {
                            Incorporation::Incorporated => tally.incorporated += 1,
                            Incorporation::Pending => tally.pending += 1,
                        }
                    }
                }
                tally
            })
            .collect();
        out.sort_by(|a, b| b.incorporated.cmp(&a.incorporated).then_with(|| a.seller.cmp(&b.seller)));
        Ok(out)
    }

    fn per_product(&self) -> Result<Vec<ProductTally>, StoreError> {
        let mut out: Vec<ProductTally> = self
            .tables
            .products
            .iter()
            .map(|(code, name)| {
                let mut tally = ProductTally {
                    code: code.clone(),
                    name: name.clone(),
                    incorporated: 0,
                    pending: 0,
                };
                for ((_, p), (state, _)) in &self.tables.states {
                    if p != code {
                        continue;
                    }
                    match state {
                        Incorporation::Incorporated => tally.incorporated += 1,
                        Incorporation::Pending => tally.pending += 1,
                    }
                }
                tally
            })
            .collect();
        out.sort_by(|a, b| b.incorporated.cmp(&a.incorporated).then_with(|| a.code.cmp(&b.code)));
        Ok(out)
    }

    fn last_batch(&self) -> Result<Option<ImportBatch>, StoreError> {
        Ok(self.batches(1)?.into_iter().next())
    }

    fn batches(&self, limit: usize) -> Result<Vec<ImportBatch>, StoreError> {
        // Latest first; equal timestamps resolve to the later insert.
        let mut all = self.tables.batches.clone();
        all.sort_by(|a, b| a.imported_at.cmp(&b.imported_at));
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }
}
