//! Workbook-wide accumulation of extracted facts.
//!
//! Sheets are extracted independently and folded, in sheet order, into one
//! [`Extraction`]. The parallel path produces the same result as the
//! sequential one because the merge order is fixed.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::classify::RoleKind;
use crate::extract::{extract_sheet, Client, SheetFacts};
use crate::workbook::Workbook;

/// Per-sheet outcome, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetOutcome {
    pub name: String,
    pub role: RoleKind,
    pub client_rows: usize,
}

/// Everything an import learned from one workbook.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub sheet_count: usize,
    pub sheets: Vec<SheetOutcome>,
    pub sellers: BTreeSet<String>,
    /// code -> display name; last sheet wins.
    pub products: BTreeMap<String, String>,
    /// Clients with attributes from a vendor sheet; last row wins.
    pub clients: BTreeMap<String, Client>,
    /// Clients seen only through single-product sheets.
    pub bare_clients: BTreeSet<String>,
    /// (client id, seller id)
    pub assignments: BTreeSet<(String, String)>,
    purchases: FxHashMap<String, FxHashSet<String>>,
    purchase_count: usize,
}

impl Extraction {
    /// Fold one sheet's facts into the accumulator.
    pub fn absorb(&mut self, name: &str, facts: SheetFacts) {
        self.sheet_count += 1;
        self.sheets.push(SheetOutcome {
            name: name.to_string(),
            role: facts.kind(),
            client_rows: facts.client_rows(),
        });

        match facts {
            SheetFacts::Vendor(v) => {
                self.sellers.insert(v.seller.clone());
                for p in v.products {
                    self.products.insert(p.code, p.name);
                }
                for row in v.rows {
                    let id = row.client.id.clone();
                    self.bare_clients.remove(&id);
                    self.assignments.insert((id.clone(), v.seller.clone()));
                    for code in row.purchased {
                        self.record_purchase(&id, code);
                    }
                    self.clients.insert(id, row.client);
                }
            }
            SheetFacts::SingleProduct(s) => {
                let code = s.product.code;
                self.products.insert(code.clone(), s.product.name);
                for id in s.clients {
                    if !self.clients.contains_key(&id) {
                        self.bare_clients.insert(id.clone());
                    }
                    self.record_purchase(&id, code.clone());
                }
            }
            SheetFacts::Skipped => {}
        }
    }

    fn record_purchase(&mut self, client: &str, product: String) {
        let set = self.purchases.entry(client.to_string()).or_default();
        if set.insert(product) {
            self.purchase_count += 1;
        }
    }

    pub fn is_purchased(&self, client: &str, product: &str) -> bool {
        self.purchases
            .get(client)
            .is_some_and(|set| set.contains(product))
    }

    /// Number of distinct (client, product) purchase facts.
    pub fn purchase_count(&self) -> usize {
        self.purchase_count
    }

    /// All purchase facts, sorted.
    pub fn purchases(&self) -> BTreeSet<(String, String)> {
        self.purchases
            .iter()
            .flat_map(|(c, set)| set.iter().map(move |p| (c.clone(), p.clone())))
            .collect()
    }

    /// Every client id touched by this import.
    pub fn touched_clients(&self) -> BTreeSet<String> {
        self.clients
            .keys()
            .chain(self.bare_clients.iter())
            .cloned()
            .collect()
    }

    pub fn touched_products(&self) -> BTreeSet<String> {
        self.products.keys().cloned().collect()
    }

    pub fn count_role(&self, role: RoleKind) -> usize {
        self.sheets.iter().filter(|s| s.role == role).count()
    }
}

/// Extract every sheet in order on the calling thread.
pub fn extract_workbook(workbook: &Workbook) -> Extraction {
    workbook
        .sheets()
        .iter()
        .fold(Extraction::default(), |mut acc, sheet| {
            acc.absorb(&sheet.name, extract_sheet(sheet));
            acc
        })
}

/// Extract sheets on scoped worker threads, then merge in sheet order.
pub fn extract_workbook_parallel(workbook: &Workbook) -> Extraction {
    let sheets = workbook.sheets();
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(sheets.len());
    if workers <= 1 {
        return extract_workbook(workbook);
    }

    let chunk = sheets.len().div_ceil(workers);
    let partitions: Vec<Vec<SheetFacts>> = std::thread::scope(|s| {
        let handles: Vec<_> = sheets
            .chunks(chunk)
            .map(|part| s.spawn(move || part.iter().map(extract_sheet).collect::<Vec<_>>()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let mut acc = Extraction::default();
    for (sheet, facts) in sheets.iter().zip(partitions.into_iter().flatten()) {
        acc.absorb(&sheet.name, facts);
    }
    acc
}
