//! Per-role extraction of typed facts from a classified sheet.

use serde::Serialize;

use crate::cell::CellValue;
use crate::classify::{classify_sheet, RoleKind, SheetRole, SingleProductLayout, VendorLayout};
use crate::sheet::Sheet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub code: String,
    pub name: String,
}

/// A client with the attributes a vendor sheet provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub locality: String,
    pub zone: Option<String>,
}

/// One data row of a vendor sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorRow {
    pub client: Client,
    /// Product codes marked as purchased, in column order.
    pub purchased: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFacts {
    pub seller: String,
    pub explicit_cod: bool,
    pub products: Vec<Product>,
    pub rows: Vec<VendorRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleProductFacts {
    pub product: Product,
    /// Ids of clients whose flag cell had content.
    pub clients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetFacts {
    Vendor(VendorFacts),
    SingleProduct(SingleProductFacts),
    Skipped,
}

impl SheetFacts {
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Vendor(_) => RoleKind::Vendor,
            Self::SingleProduct(_) => RoleKind::SingleProduct,
            Self::Skipped => RoleKind::Skipped,
        }
    }

    /// Number of data rows that produced a client.
    pub fn client_rows(&self) -> usize {
        match self {
            Self::Vendor(v) => v.rows.len(),
            Self::SingleProduct(s) => s.clients.len(),
            Self::Skipped => 0,
        }
    }
}

/// Classify and extract in one step.
pub fn extract_sheet(sheet: &Sheet) -> SheetFacts {
    let role = classify_sheet(sheet);
    extract(sheet, &role)
}

pub fn extract(sheet: &Sheet, role: &SheetRole) -> SheetFacts {
    match role {
        SheetRole::Vendor(layout) => SheetFacts::Vendor(extract_vendor(sheet, layout)),
        SheetRole::SingleProduct(layout) => {
            SheetFacts::SingleProduct(extract_single_product(sheet, layout))
        }
        SheetRole::Unrecognized => SheetFacts::Skipped,
    }
}

pub fn extract_vendor(sheet: &Sheet, layout: &VendorLayout) -> VendorFacts {
    let products = layout
        .products
        .iter()
        .map(|p| Product {
            code: p.code.clone(),
            name: p.name.clone(),
        })
        .collect();

    let mut rows = Vec::new();
    for (_, cells) in sheet.data_rows() {
        let id = cell(cells, layout.cod).display();
        if id.is_empty() {
            continue;
        }

        let name = cell(cells, layout.client).display();
        let locality = cell(cells, layout.locality).display();
        let zone = layout
            .zone
            .map(|z| cell(cells, z).display())
            .filter(|z| !z.is_empty());

        let purchased = layout
            .products
            .iter()
            .filter(|p| cell(cells, p.index).is_purchase_mark())
            .map(|p| p.code.clone())
            .collect();

        rows.push(VendorRow {
            client: Client {
                name: if name.is_empty() { id.clone() } else { name },
                id,
                locality,
                zone,
            },
            purchased,
        });
    }

    VendorFacts {
        seller: layout.seller.clone(),
        explicit_cod: layout.explicit_cod,
        products,
        rows,
    }
}

pub fn extract_single_product(sheet: &Sheet, layout: &SingleProductLayout) -> SingleProductFacts {
    let clients = sheet
        .data_rows()
        .filter_map(|(_, cells)| {
            let id = cell(cells, layout.cod).display();
            if id.is_empty() || cell(cells, layout.flag).is_blank() {
                None
            } else {
                Some(id)
            }
        })
        .collect();

    SingleProductFacts {
        product: Product {
            code: layout.product.clone(),
            name: layout.product.clone(),
        },
        clients,
    }
}

fn cell(cells: &[CellValue], col: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    cells.get(col).unwrap_or(&EMPTY)
}
