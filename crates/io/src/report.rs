// Dashboard export to XLSX (Total, Sellers, Products sheets)

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use launchboard_recon::{Dashboard, Kpi, KpiBand};

use crate::export::ExportError;

const HEADERS: [&str; 6] = ["Name", "Incorporated", "Pending", "Total", "Percent", "Band"];

fn band_color(band: KpiBand) -> Color {
    match band {
        KpiBand::Green => Color::RGB(0xC6EFCE),
        KpiBand::Yellow => Color::RGB(0xFFEB9C),
        KpiBand::Red => Color::RGB(0xFFC7CE),
    }
}

fn xlsx_err(e: XlsxError) -> ExportError {
    ExportError::Xlsx(e.to_string())
}

/// Write the dashboard as a three-sheet workbook.
pub fn write_dashboard(dashboard: &Dashboard, path: &Path) -> Result<(), ExportError> {
    let mut workbook = XlsxWorkbook::new();

    let total = workbook.add_worksheet().set_name("Total").map_err(xlsx_err)?;
    write_kpis(total, std::slice::from_ref(&dashboard.total))?;
    if let Some(line) = dashboard.last_update_line() {
        total.write_string(3, 0, line).map_err(xlsx_err)?;
    }

    let sellers = workbook.add_worksheet().set_name("Sellers").map_err(xlsx_err)?;
    write_kpis(sellers, &dashboard.sellers)?;

    let products = workbook.add_worksheet().set_name("Products").map_err(xlsx_err)?;
    write_kpis(products, &dashboard.products)?;

    workbook.save(path).map_err(xlsx_err)?;
    log::info!("wrote dashboard to {}", path.display());
    Ok(())
}

fn write_kpis(sheet: &mut Worksheet, kpis: &[Kpi]) -> Result<(), ExportError> {
    let header = Format::new().set_bold();
    for (col, title) in HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &header)
            .map_err(xlsx_err)?;
    }

    let percent = Format::new().set_num_format("0.0");
    for (i, kpi) in kpis.iter().enumerate() {
        let row = i as u32 + 1;
        let band = Format::new().set_background_color(band_color(kpi.band));
        sheet.write_string(row, 0, &kpi.label).map_err(xlsx_err)?;
        sheet.write_number(row, 1, kpi.incorporated as f64).map_err(xlsx_err)?;
        sheet
            .write_number(row, 2, (kpi.total - kpi.incorporated) as f64)
            .map_err(xlsx_err)?;
        sheet.write_number(row, 3, kpi.total as f64).map_err(xlsx_err)?;
        sheet
            .write_number_with_format(row, 4, kpi.percent, &percent)
            .map_err(xlsx_err)?;
        sheet
            .write_string_with_format(row, 5, kpi.band.to_string(), &band)
            .map_err(xlsx_err)?;
    }
    sheet.set_column_width(0, 30).map_err(xlsx_err)?;
    Ok(())
}
