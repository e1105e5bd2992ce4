//! Header-row helpers: column lookup and product header parsing.

/// Separator between product code and product name in a header label.
pub const PRODUCT_SEPARATOR: &str = " - ";

/// Code and display name parsed from a product column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductHeader {
    pub code: String,
    pub name: String,
}

/// Parse a product header label.
///
/// `"ABC - Widget"` gives code `ABC` and name `Widget`. The code token has all
/// whitespace removed. Without a separator (or with an empty side) the whole
/// label stands in for the missing part.
pub fn parse_product_header(header: &str) -> ProductHeader {
    let header = header.trim();
    match header.split_once(PRODUCT_SEPARATOR) {
        Some((before, after)) => {
            let code: String = before.chars().filter(|c| !c.is_whitespace()).collect();
            let name = after.trim();
            ProductHeader {
                code: if code.is_empty() { header.to_string() } else { code },
                name: if name.is_empty() { header.to_string() } else { name.to_string() },
            }
        }
        None => ProductHeader {
            code: header.to_string(),
            name: header.to_string(),
        },
    }
}

/// Index of the first header equal to any of `names`, ignoring case.
pub fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

pub fn has_column(headers: &[String], names: &[&str]) -> bool {
    find_column(headers, names).is_some()
}
