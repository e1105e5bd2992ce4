use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use launchboard_engine::{Extraction, RoleKind};

use crate::error::ImportError;
use crate::model::{ImportSummary, Incorporation, NewBatch, StateRow, YearWeek};
use crate::store::{with_transaction, Store};

/// Provenance of one import run.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub filename: String,
    pub started_at: DateTime<Utc>,
    pub year_week: YearWeek,
}

impl ImportContext {
    pub fn new(filename: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            filename: filename.into(),
            started_at,
            year_week: YearWeek::at(started_at),
        }
    }
}

/// Compute the full client × product matrix.
///
/// Every pair gets a row; a pair is incorporated only if the extraction holds
/// a purchase fact for it.
pub fn build_matrix(
    clients: &BTreeSet<String>,
    products: &BTreeSet<String>,
    extraction: &Extraction,
) -> Vec<StateRow> {
    let mut rows = Vec::with_capacity(clients.len() * products.len());
    for client in clients {
        for product in products {
            let state = if extraction.is_purchased(client, product) {
                Incorporation::Incorporated
            } else {
                Incorporation::Pending
            };
            rows.push(StateRow {
                client_id: client.clone(),
                product_code: product.clone(),
                state,
            });
        }
    }
    rows
}

/// Reconcile an extraction into the store as one atomic unit.
///
/// Entities are registered, the matrix over known ∪ touched identities is
/// recomputed and written to both current and weekly state, and a batch row
/// is recorded. Any failure rolls the whole run back.
pub fn run<S: Store + ?Sized>(
    store: &mut S,
    extraction: &Extraction,
    ctx: &ImportContext,
) -> Result<ImportSummary, ImportError> {
    let result = with_transaction(store, |store| {
        let known_clients = store.known_client_ids()?;
        let known_products = store.known_product_codes()?;

        register_entities(store, extraction)?;

        let touched_clients = extraction.touched_clients();
        let touched_products = extraction.touched_products();
        let new_clients = touched_clients.difference(&known_clients).count();
        let new_products = touched_products.difference(&known_products).count();

        let all_clients: BTreeSet<String> = known_clients.union(&touched_clients).cloned().collect();
        let all_products: BTreeSet<String> =
            known_products.union(&touched_products).cloned().collect();

        let matrix = build_matrix(&all_clients, &all_products, extraction);
        let incorporated = matrix
            .iter()
            .filter(|r| r.state == Incorporation::Incorporated)
            .count();
        log::info!(
            "reconciling {} clients x {} products ({} pairs, {} incorporated)",
            all_clients.len(),
            all_products.len(),
            matrix.len(),
            incorporated
        );

        store.upsert_states(&matrix, ctx.started_at)?;
        store.upsert_weekly_states(&matrix, ctx.year_week)?;

        let batch_id = store.insert_import_batch(&NewBatch {
            imported_at: ctx.started_at,
            filename: ctx.filename.clone(),
            sheet_count: extraction.sheet_count,
            product_count: all_products.len(),
            client_count: all_clients.len(),
        })?;

        Ok(ImportSummary {
            batch_id,
            filename: ctx.filename.clone(),
            imported_at: ctx.started_at,
            year_week: ctx.year_week,
            sheet_count: extraction.sheet_count,
            vendor_sheets: extraction.count_role(RoleKind::Vendor),
            single_product_sheets: extraction.count_role(RoleKind::SingleProduct),
            skipped_sheets: extraction.count_role(RoleKind::Skipped),
            client_count: all_clients.len(),
            product_count: all_products.len(),
            new_clients,
            new_products,
            pair_count: matrix.len(),
            incorporated,
            pending: matrix.len() - incorporated,
        })
    });

    match result {
        Ok(summary) => {
            log::info!("import batch {} committed ({})", summary.batch_id, summary.year_week);
            Ok(summary)
        }
        Err(e) => {
            log::warn!("import of '{}' rolled back: {e}", ctx.filename);
            Err(ImportError::Store(e))
        }
    }
}

fn register_entities<S: Store + ?Sized>(
    store: &mut S,
    extraction: &Extraction,
) -> Result<(), crate::error::StoreError> {
    for seller in &extraction.sellers {
        store.upsert_seller(seller)?;
    }
    for (code, name) in &extraction.products {
        store.upsert_product(code, name)?;
    }
    for client in extraction.clients.values() {
        store.upsert_client(client)?;
    }
    for id in &extraction.bare_clients {
        store.ensure_client(id)?;
    }
    for (client_id, seller_id) in &extraction.assignments {
        store.ensure_assignment(client_id, seller_id)?;
    }
    Ok(())
}
