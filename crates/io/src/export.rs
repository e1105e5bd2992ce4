// Per-seller JSON/CSV exports with a weekly manifest

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use launchboard_engine::classify::{classify_sheet, SheetRole};
use launchboard_engine::extract::{extract_vendor, VendorRow};
use launchboard_engine::Workbook;

#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: std::io::Error },
    Csv { path: PathBuf, source: csv::Error },
    Json(serde_json::Error),
    Xlsx(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot write {}: {}", path.display(), source),
            Self::Csv { path, source } => write!(f, "cannot write {}: {}", path.display(), source),
            Self::Json(e) => write!(f, "cannot encode JSON: {}", e),
            Self::Xlsx(msg) => write!(f, "cannot write workbook: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json(e) => Some(e),
            Self::Xlsx(_) => None,
        }
    }
}

/// Files written for one seller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerExport {
    pub seller: String,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    pub client_count: usize,
    /// Total purchased cells across the seller's clients.
    pub product_count: usize,
}

#[derive(Serialize)]
struct SellerPayload<'a> {
    seller: &'a str,
    version: &'a str,
    generated_at: String,
    clients: Vec<ClientPayload<'a>>,
}

#[derive(Serialize)]
struct ClientPayload<'a> {
    code: &'a str,
    name: &'a str,
    locality: &'a str,
    products: &'a [String],
}

#[derive(Serialize)]
struct Manifest<'a> {
    version: &'a str,
    generated_at: String,
    sellers: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestEntry {
    seller: String,
    json: String,
    csv: String,
    client_count: usize,
    product_count: usize,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Directory and file stem for a seller sheet.
pub fn seller_slug(sheet_name: &str) -> String {
    sheet_name.trim().replace(' ', "_")
}

/// Write `<seller>/<seller>_<version>.{json,csv}` for every vendor sheet with
/// an explicit `COD` column and at least one client row.
pub fn export_sellers(
    workbook: &Workbook,
    output_dir: &Path,
    version: &str,
    generated_at: DateTime<Utc>,
) -> Result<Vec<SellerExport>, ExportError> {
    let mut exports = Vec::new();

    for sheet in workbook.sheets() {
        let layout = match classify_sheet(sheet) {
            SheetRole::Vendor(layout) if layout.explicit_cod => layout,
            SheetRole::Vendor(_) => {
                log::debug!("sheet '{}' has no COD column, not exported", sheet.name);
                continue;
            }
            _ => continue,
        };
        let facts = extract_vendor(sheet, &layout);
        if facts.rows.is_empty() {
            log::debug!("sheet '{}' has no client rows, not exported", sheet.name);
            continue;
        }

        let seller = seller_slug(&sheet.name);
        let seller_dir = output_dir.join(&seller);
        std::fs::create_dir_all(&seller_dir).map_err(|source| ExportError::Io {
            path: seller_dir.clone(),
            source,
        })?;

        let json_path = seller_dir.join(format!("{}_{}.json", seller, version));
        let csv_path = seller_dir.join(format!("{}_{}.csv", seller, version));
        write_seller_json(&json_path, &seller, version, generated_at, &facts.rows)?;
        write_seller_csv(&csv_path, &seller, version, &facts.rows)?;

        let export = SellerExport {
            seller,
            json_path,
            csv_path,
            client_count: facts.rows.len(),
            product_count: facts.rows.iter().map(|r| r.purchased.len()).sum(),
        };
        log::info!(
            "exported {}: {} clients, {} products",
            export.seller,
            export.client_count,
            export.product_count
        );
        exports.push(export);
    }

    Ok(exports)
}

fn write_seller_json(
    path: &Path,
    seller: &str,
    version: &str,
    generated_at: DateTime<Utc>,
    rows: &[VendorRow],
) -> Result<(), ExportError> {
    let payload = SellerPayload {
        seller,
        version,
        generated_at: timestamp(generated_at),
        clients: rows
            .iter()
            .map(|r| ClientPayload {
                code: &r.client.id,
                name: &r.client.name,
                locality: &r.client.locality,
                products: &r.purchased,
            })
            .collect(),
    };
    write_json(path, &payload)
}

fn write_seller_csv(path: &Path, seller: &str, version: &str, rows: &[VendorRow]) -> Result<(), ExportError> {
    let csv_err = |source: csv::Error| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["version", "seller", "client_code", "client_name", "locality", "product_code"])
        .map_err(csv_err)?;

    for row in rows {
        let c = &row.client;
        if row.purchased.is_empty() {
            writer
                .write_record([version, seller, c.id.as_str(), c.name.as_str(), c.locality.as_str(), ""])
                .map_err(csv_err)?;
        }
        for code in &row.purchased {
            writer
                .write_record([version, seller, c.id.as_str(), c.name.as_str(), c.locality.as_str(), code.as_str()])
                .map_err(csv_err)?;
        }
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `manifest_<version>.json` listing every export with paths relative
/// to `output_dir`.
pub fn write_manifest(
    output_dir: &Path,
    version: &str,
    generated_at: DateTime<Utc>,
    exports: &[SellerExport],
) -> Result<PathBuf, ExportError> {
    let manifest = Manifest {
        version,
        generated_at: timestamp(generated_at),
        sellers: exports
            .iter()
            .map(|e| ManifestEntry {
                seller: e.seller.clone(),
                json: relative(output_dir, &e.json_path),
                csv: relative(output_dir, &e.csv_path),
                client_count: e.client_count,
                product_count: e.product_count,
            })
            .collect(),
    };
    let path = output_dir.join(format!("manifest_{}.json", version));
    write_json(&path, &manifest)?;
    Ok(path)
}

/// Forward-slash path of `path` under `base`.
fn relative(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let text = serde_json::to_string_pretty(value).map_err(ExportError::Json)?;
    std::fs::write(path, text).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use launchboard_engine::{CellValue, Sheet};

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 12, 9, 30, 0).unwrap()
    }

    fn workbook() -> Workbook {
        Workbook::from_sheets(vec![
            Sheet::from_rows(
                "Juan Perez",
                vec![
                    vec![t("COD"), t("Cliente"), t("Localidad"), t("ABC - Widget"), t("XYZ")],
                    vec![CellValue::Number(1.0), t("Acme"), t("Springfield"), t("1"), CellValue::Number(1.0)],
                    vec![t("2"), CellValue::Empty, t("Shelbyville"), CellValue::Empty, t("0")],
                    vec![CellValue::Empty, t("No code"), t("Nowhere"), t("1"), t("1")],
                ],
            ),
            // Vendor shape without an explicit COD header
            Sheet::from_rows(
                "Maria",
                vec![
                    vec![t("Id"), t("Cliente"), t("Localidad"), t("ABC")],
                    vec![t("5"), t("Five"), t("L"), t("1")],
                ],
            ),
            // No data rows
            Sheet::from_rows("Luis", vec![vec![t("COD"), t("Cliente"), t("Localidad")]]),
            Sheet::from_rows("PROD7", vec![vec![t("COD"), t("F")], vec![t("9"), t("x")]]),
        ])
    }

    #[test]
    fn test_seller_slug() {
        assert_eq!(seller_slug("  Juan Perez "), "Juan_Perez");
        assert_eq!(seller_slug("Ana"), "Ana");
    }

    #[test]
    fn test_export_only_vendor_sheets_with_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exports = export_sellers(&workbook(), dir.path(), "2025-W07", generated()).unwrap();

        assert_eq!(exports.len(), 1);
        let e = &exports[0];
        assert_eq!(e.seller, "Juan_Perez");
        assert_eq!(e.client_count, 2);
        assert_eq!(e.product_count, 2);
        assert_eq!(e.json_path, dir.path().join("Juan_Perez").join("Juan_Perez_2025-W07.json"));
        assert!(e.csv_path.exists());
    }

    #[test]
    fn test_json_payload() {
        let dir = tempfile::tempdir().unwrap();
        let exports = export_sellers(&workbook(), dir.path(), "2025-W07", generated()).unwrap();

        let text = std::fs::read_to_string(&exports[0].json_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["seller"], "Juan_Perez");
        assert_eq!(json["version"], "2025-W07");
        assert_eq!(json["generated_at"], "2025-02-12T09:30:00Z");
        assert_eq!(json["clients"][0]["code"], "1");
        assert_eq!(json["clients"][0]["products"], serde_json::json!(["ABC", "XYZ"]));
        // Name falls back to the code
        assert_eq!(json["clients"][1]["name"], "2");
        assert_eq!(json["clients"][1]["products"], serde_json::json!([]));
    }

    #[test]
    fn test_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exports = export_sellers(&workbook(), dir.path(), "2025-W07", generated()).unwrap();

        let text = std::fs::read_to_string(&exports[0].csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "version,seller,client_code,client_name,locality,product_code",
                "2025-W07,Juan_Perez,1,Acme,Springfield,ABC",
                "2025-W07,Juan_Perez,1,Acme,Springfield,XYZ",
                "2025-W07,Juan_Perez,2,2,Shelbyville,",
            ]
        );
    }

    #[test]
    fn test_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let exports = export_sellers(&workbook(), dir.path(), "2025-W07", generated()).unwrap();
        let path = write_manifest(dir.path(), "2025-W07", generated(), &exports).unwrap();
        assert_eq!(path, dir.path().join("manifest_2025-W07.json"));

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["version"], "2025-W07");
        let entry = &json["sellers"][0];
        assert_eq!(entry["seller"], "Juan_Perez");
        assert_eq!(entry["json"], "Juan_Perez/Juan_Perez_2025-W07.json");
        assert_eq!(entry["csv"], "Juan_Perez/Juan_Perez_2025-W07.csv");
        assert_eq!(entry["client_count"], 2);
        assert_eq!(entry["product_count"], 2);
    }

    #[test]
    fn test_no_vendor_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let wb = Workbook::from_sheets(vec![Sheet::from_rows("Notes", vec![vec![t("hello")]])]);
        assert!(export_sellers(&wb, dir.path(), "2025-W07", generated()).unwrap().is_empty());
    }
}
