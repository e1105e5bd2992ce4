//! Sheet role classification by header shape.
//!
//! Pure functions over a sheet name and its header labels. No cell data is
//! read here; extraction uses the column layout returned by [`classify`].

use serde::Serialize;

use crate::header::{find_column, has_column, parse_product_header};
use crate::sheet::Sheet;

pub const COD: &[&str] = &["COD"];
pub const CLIENT: &[&str] = &["Cliente", "Cliente2"];
pub const LOCALITY: &[&str] = &["Localidad"];
pub const ZONE: &[&str] = &["Zona"];

/// A product column in a vendor sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductColumn {
    pub index: usize,
    pub code: String,
    pub name: String,
}

/// Column layout of a seller's client/product matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorLayout {
    pub seller: String,
    pub cod: usize,
    /// Whether `cod` came from an explicit `COD` header rather than the default.
    pub explicit_cod: bool,
    pub client: usize,
    pub locality: usize,
    pub zone: Option<usize>,
    pub products: Vec<ProductColumn>,
}

/// Column layout of a single product's client list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleProductLayout {
    pub product: String,
    pub cod: usize,
    pub flag: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRole {
    Vendor(VendorLayout),
    SingleProduct(SingleProductLayout),
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Vendor,
    SingleProduct,
    Skipped,
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::SingleProduct => write!(f, "single_product"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl SheetRole {
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Vendor(_) => RoleKind::Vendor,
            Self::SingleProduct(_) => RoleKind::SingleProduct,
            Self::Unrecognized => RoleKind::Skipped,
        }
    }
}

pub fn classify_sheet(sheet: &Sheet) -> SheetRole {
    classify(&sheet.name, &sheet.headers())
}

/// Decide a sheet's role. Vendor takes priority over single-product.
pub fn classify(sheet_name: &str, headers: &[String]) -> SheetRole {
    if has_column(headers, CLIENT) && has_column(headers, LOCALITY) {
        return SheetRole::Vendor(vendor_layout(sheet_name, headers));
    }

    let first_is_cod = headers
        .first()
        .is_some_and(|h| COD.iter().any(|c| h.eq_ignore_ascii_case(c)));
    if first_is_cod && sheet_name.chars().any(|c| c.is_ascii_digit()) {
        let cod = find_column(headers, COD).unwrap_or(0);
        let flag = (0..headers.len()).find(|&i| i != cod).unwrap_or(1);
        return SheetRole::SingleProduct(SingleProductLayout {
            product: sheet_name.trim().to_string(),
            cod,
            flag,
        });
    }

    SheetRole::Unrecognized
}

fn vendor_layout(sheet_name: &str, headers: &[String]) -> VendorLayout {
    let explicit_cod = find_column(headers, COD);
    let cod = explicit_cod.unwrap_or(0);
    let client = find_column(headers, CLIENT).unwrap_or(1);
    let locality = find_column(headers, LOCALITY).unwrap_or(2);
    let zone = find_column(headers, ZONE);

    // Identity columns are excluded by position, defaults included.
    let reserved = [Some(cod), Some(client), Some(locality), zone];
    let products = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| !h.is_empty() && !reserved.contains(&Some(*i)))
        .map(|(index, h)| {
            let parsed = parse_product_header(h);
            ProductColumn {
                index,
                code: parsed.code,
                name: parsed.name,
            }
        })
        .collect();

    VendorLayout {
        seller: sheet_name.trim().to_string(),
        cod,
        explicit_cod: explicit_cod.is_some(),
        client,
        locality,
        zone,
        products,
    }
}
