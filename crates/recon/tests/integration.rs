use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use launchboard_engine::{CellValue, Sheet, Workbook};
use launchboard_recon::{
    build_dashboard, ImportError, Importer, Incorporation, KpiBands, MemoryStore, ReportSource, Store,
    YearWeek,
};

fn t(s: &str) -> CellValue {
    CellValue::Text(s.into())
}

fn n(v: f64) -> CellValue {
    CellValue::Number(v)
}

/// Noon UTC in October 2025; days 1, 8, 15 and 22 are Wednesdays.
fn wednesday(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, 12, 0, 0).unwrap()
}

fn juan_workbook() -> Workbook {
    Workbook::from_sheets(vec![Sheet::from_rows(
        "Juan",
        vec![
            vec![t("COD"), t("Cliente"), t("Localidad"), t("ABC - Widget")],
            vec![n(1.0), t("Acme"), t("Springfield"), n(1.0)],
        ],
    )])
}

fn vendor(name: &str, products: &[&str], rows: &[(&str, &str, &[CellValue])]) -> Sheet {
    let mut header = vec![t("COD"), t("Cliente"), t("Localidad")];
    header.extend(products.iter().map(|p| t(p)));
    let mut all = vec![header];
    for (cod, client, flags) in rows {
        let mut row = vec![t(cod), t(client), t("Town")];
        row.extend(flags.iter().cloned());
        all.push(row);
    }
    Sheet::from_rows(name, all)
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn vendor_sheet_scenario() {
    let importer = Importer::new(MemoryStore::new());
    let summary = importer.import_at(&juan_workbook(), "juan.xlsx", wednesday(15)).unwrap();

    assert_eq!(summary.vendor_sheets, 1);
    assert_eq!(summary.pair_count, 1);
    assert_eq!(summary.incorporated, 1);

    let store = importer.store();
    assert!(store.sellers().contains("Juan"));
    let acme = store.client("1").unwrap();
    assert_eq!(acme.name.as_deref(), Some("Acme"));
    assert_eq!(acme.locality.as_deref(), Some("Springfield"));
    assert_eq!(store.product_name("ABC"), Some("Widget"));
    assert_eq!(store.state("1", "ABC"), Some(Incorporation::Incorporated));
    assert_eq!(store.states().len(), 1);
    assert!(store.assignments().contains(&("1".to_string(), "Juan".to_string())));
}

#[test]
fn single_product_sheet_scenario() {
    let wb = Workbook::from_sheets(vec![Sheet::from_rows(
        "PROD7",
        vec![vec![t("COD"), t("Flag")], vec![n(9.0), t("x")]],
    )]);
    let importer = Importer::new(MemoryStore::new());
    importer.import_at(&wb, "p7.xlsx", wednesday(15)).unwrap();

    let store = importer.store();
    assert_eq!(store.product_name("PROD7"), Some("PROD7"));
    assert_eq!(store.client("9").unwrap().name, None);
    assert_eq!(store.state("9", "PROD7"), Some(Incorporation::Incorporated));
    assert!(store.sellers().is_empty());
}

#[test]
fn single_product_sheet_leaves_known_client_attributes() {
    let importer = Importer::new(MemoryStore::new());
    importer.import_at(&juan_workbook(), "a.xlsx", wednesday(15)).unwrap();

    let wb = Workbook::from_sheets(vec![Sheet::from_rows(
        "P1",
        vec![vec![t("COD"), t("F")], vec![t("1"), t("si")]],
    )]);
    importer.import_at(&wb, "b.xlsx", wednesday(15)).unwrap();

    let store = importer.store();
    assert_eq!(store.client("1").unwrap().name.as_deref(), Some("Acme"));
}

// -------------------------------------------------------------------------
// Matrix properties
// -------------------------------------------------------------------------

#[test]
fn full_matrix_after_every_import() {
    let importer = Importer::new(MemoryStore::new());
    let wb = Workbook::from_sheets(vec![
        vendor(
            "Ana",
            &["A - Alfa", "B - Beta"],
            &[("1", "Uno", &[n(1.0), n(0.0)]), ("2", "Dos", &[t("1"), t("1.0")])],
        ),
        Sheet::from_rows("C3", vec![vec![t("COD"), t("F")], vec![t("3"), t("x")]]),
        Sheet::from_rows("Notas", vec![vec![t("libre")]]),
    ]);
    let at = wednesday(15);
    let summary = importer.import_at(&wb, "w.xlsx", at).unwrap();

    assert_eq!(summary.sheet_count, 3);
    assert_eq!(summary.skipped_sheets, 1);
    assert_eq!(summary.client_count, 3);
    assert_eq!(summary.product_count, 3);
    assert_eq!(summary.pair_count, 9);
    assert_eq!(summary.incorporated, 3);
    assert_eq!(summary.pending, 6);

    let store = importer.store();
    let week = YearWeek::at(at);
    assert_eq!(store.states().len(), 9);
    assert_eq!(store.weekly(week).len(), 9);
    assert_eq!(store.state("2", "B"), Some(Incorporation::Pending), "text 1.0 is not a mark");
    assert_eq!(store.state("3", "A"), Some(Incorporation::Pending));
    assert_eq!(store.state("3", "C3"), Some(Incorporation::Incorporated));
}

#[test]
fn absent_entities_are_kept_and_recomputed_pending() {
    let importer = Importer::new(MemoryStore::new());
    importer.import_at(&juan_workbook(), "a.xlsx", wednesday(15)).unwrap();

    let second = Workbook::from_sheets(vec![vendor("Luis", &["Z - Zeta"], &[("2", "Beta", &[n(1.0)])])]);
    let summary = importer.import_at(&second, "b.xlsx", wednesday(22)).unwrap();
    assert_eq!(summary.new_clients, 1);
    assert_eq!(summary.new_products, 1);
    assert_eq!(summary.client_count, 2);
    assert_eq!(summary.product_count, 2);

    let store = importer.store();
    assert_eq!(store.states().len(), 4);
    // Client 1 no longer appears in any sheet: its pairs flip to pending.
    assert_eq!(store.state("1", "ABC"), Some(Incorporation::Pending));
    assert_eq!(store.state("1", "Z"), Some(Incorporation::Pending));
    assert_eq!(store.state("2", "Z"), Some(Incorporation::Incorporated));

    // The earlier week keeps its snapshot.
    assert_eq!(store.weekly(YearWeek::at(wednesday(15))).len(), 1);
    assert_eq!(store.weekly(YearWeek::at(wednesday(22))).len(), 4);
}

#[test]
fn reimport_same_week_is_idempotent() {
    let importer = Importer::new(MemoryStore::new());
    let wb = Workbook::from_sheets(vec![vendor(
        "Ana",
        &["A - Alfa", "B - Beta"],
        &[("1", "Uno", &[n(1.0), n(0.0)]), ("2", "Dos", &[t("x"), t("1")])],
    )]);

    importer.import_at(&wb, "w.xlsx", wednesday(15)).unwrap();
    let (states, weekly) = {
        let s = importer.store();
        (s.states(), s.weekly_row_count())
    };

    importer.import_at(&wb, "w.xlsx", wednesday(16)).unwrap();
    let s = importer.store();
    assert_eq!(s.states(), states);
    assert_eq!(s.weekly_row_count(), weekly);
    assert_eq!(s.batch_count(), 2);
}

#[test]
fn failed_import_rolls_back_everything() {
    let mut store = MemoryStore::new();
    store.inject_batch_failure(true);
    let importer = Importer::new(store);

    let err = importer.import_at(&juan_workbook(), "a.xlsx", wednesday(15)).unwrap_err();
    assert!(matches!(err, ImportError::Store(_)));

    let store = importer.store();
    assert!(store.sellers().is_empty());
    assert!(store.known_client_ids().unwrap().is_empty());
    assert!(store.known_product_codes().unwrap().is_empty());
    assert!(store.states().is_empty());
    assert_eq!(store.weekly_row_count(), 0);
}

#[test]
fn parallel_and_sequential_imports_agree() {
    let mut sheets = Vec::new();
    for i in 0..10 {
        let product = format!("P{i} - Item");
        let cod = i.to_string();
        let flags = [n(1.0), n((i % 2) as f64)];
        sheets.push(vendor(
            &format!("Vend{i}"),
            &[product.as_str(), "COMMON - Shared"],
            &[(cod.as_str(), "C", &flags[..])],
        ));
    }
    let wb = Workbook::from_sheets(sheets);

    let seq = Importer::new(MemoryStore::new());
    let par = Importer::new(MemoryStore::new()).parallel(true);
    seq.import_at(&wb, "w.xlsx", wednesday(15)).unwrap();
    par.import_at(&wb, "w.xlsx", wednesday(15)).unwrap();

    assert_eq!(seq.store().states(), par.store().states());
}

#[test]
fn concurrent_imports_are_serialized() {
    let books: Vec<Workbook> = (0..4)
        .map(|i| {
            let product = format!("P{i} - Item");
            let cod = format!("{}", 100 + i);
            Workbook::from_sheets(vec![vendor(
                &format!("Vend{i}"),
                &[product.as_str()],
                &[(cod.as_str(), "Client", &[n(1.0)][..])],
            )])
        })
        .collect();
    let importer = Importer::new(MemoryStore::new()).parallel(true);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = books
            .iter()
            .enumerate()
            .map(|(i, wb)| {
                let importer = &importer;
                s.spawn(move || importer.import_at(wb, &format!("w{i}.xlsx"), wednesday(15)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results {
        assert!(result.is_ok(), "{result:?}");
    }
    let store = importer.store();
    assert_eq!(store.batch_count(), books.len());
    let clients = store.known_client_ids().unwrap().len();
    let products = store.known_product_codes().unwrap().len();
    assert_eq!((clients, products), (4, 4));
    assert_eq!(store.states().len(), clients * products);
    assert_eq!(store.weekly(YearWeek::at(wednesday(15))).len(), clients * products);
}

#[test]
fn failed_commit_rolls_back_and_store_stays_usable() {
    let importer = Importer::new(MemoryStore::new());
    importer.store().inject_commit_failure(true);

    let err = importer.import_at(&juan_workbook(), "a.xlsx", wednesday(15)).unwrap_err();
    assert!(matches!(err, ImportError::Store(_)));
    {
        let store = importer.store();
        assert_eq!(store.batch_count(), 0);
        assert!(store.states().is_empty());
        assert!(store.known_client_ids().unwrap().is_empty());
    }

    // The transaction was closed, so the next begin succeeds
    importer.store().inject_commit_failure(false);
    let summary = importer.import_at(&juan_workbook(), "a.xlsx", wednesday(15)).unwrap();
    assert_eq!(summary.pair_count, 1);
    assert_eq!(importer.store().batch_count(), 1);
}

// -------------------------------------------------------------------------
// Reporting
// -------------------------------------------------------------------------

#[test]
fn dashboard_aggregates_by_seller_and_product() {
    let importer = Importer::new(MemoryStore::new());
    let wb = Workbook::from_sheets(vec![
        vendor("Ana", &["A - Alfa", "B - Beta"], &[("1", "Uno", &[n(1.0), n(1.0)])]),
        vendor("Luis", &["A - Alfa"], &[("2", "Dos", &[n(0.0)])]),
        Sheet::from_rows("Vacío", vec![vec![t("COD"), t("Cliente"), t("Localidad")]]),
    ]);
    importer.import_at(&wb, "dash.xlsx", wednesday(15)).unwrap();

    let store = importer.store();
    assert_eq!(store.total_pairs().unwrap(), 4);
    assert_eq!(store.total_incorporated().unwrap(), 2);

    let dash = build_dashboard(&*store, &KpiBands::default()).unwrap();
    assert_eq!(dash.total.percent_label(), "50.0%");

    let sellers: Vec<(&str, usize, usize)> = dash
        .sellers
        .iter()
        .map(|k| (k.label.as_str(), k.incorporated, k.total))
        .collect();
    // Seller with no clients still reports, with zero pairs.
    assert_eq!(sellers, vec![("Ana", 2, 2), ("Luis", 0, 2), ("Vacío", 0, 0)]);

    let products: Vec<&str> = dash.products.iter().map(|k| k.label.as_str()).collect();
    assert_eq!(products, vec!["A - Alfa", "B - Beta"]);

    let batch = dash.last_batch.as_ref().unwrap();
    assert_eq!(batch.filename, "dash.xlsx");
    assert_eq!(batch.sheet_count, 3);
    assert!(dash.last_update_line().unwrap().starts_with("last update: dash.xlsx · "));
}

#[test]
fn batches_are_listed_latest_first() {
    let importer = Importer::new(MemoryStore::new());
    importer.import_at(&juan_workbook(), "first.xlsx", wednesday(1)).unwrap();
    importer.import_at(&juan_workbook(), "second.xlsx", wednesday(8)).unwrap();

    let store = importer.store();
    let names: Vec<String> = store.batches(10).unwrap().into_iter().map(|b| b.filename).collect();
    assert_eq!(names, vec!["second.xlsx", "first.xlsx"]);
    assert_eq!(store.last_batch().unwrap().unwrap().filename, "second.xlsx");
}

// -------------------------------------------------------------------------
// Monotonic identity growth
// -------------------------------------------------------------------------

fn workbook_from(rows: &[(u8, u8, bool)]) -> Workbook {
    let products: Vec<String> = (0..4).map(|p| format!("P{p} - Item {p}")).collect();
    let mut header = vec![t("COD"), t("Cliente"), t("Localidad")];
    header.extend(products.iter().map(|p| t(p)));
    let mut all = vec![header];
    for (client, product, mark) in rows {
        let mut row = vec![n(*client as f64), t("C"), t("L")];
        for p in 0..4u8 {
            row.push(if p == *product && *mark { n(1.0) } else { CellValue::Empty });
        }
        all.push(row);
    }
    Workbook::from_sheets(vec![Sheet::from_rows("Vend1", all)])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn identities_never_shrink(
        a in prop::collection::vec((0u8..20, 0u8..4, any::<bool>()), 0..12),
        b in prop::collection::vec((0u8..20, 0u8..4, any::<bool>()), 0..12),
    ) {
        let importer = Importer::new(MemoryStore::new());
        importer.import_at(&workbook_from(&a), "a.xlsx", wednesday(15)).unwrap();
        let (clients_a, products_a) = {
            let s = importer.store();
            (s.known_client_ids().unwrap(), s.known_product_codes().unwrap())
        };

        importer.import_at(&workbook_from(&b), "b.xlsx", wednesday(22)).unwrap();
        let s = importer.store();
        let clients_b = s.known_client_ids().unwrap();
        let products_b = s.known_product_codes().unwrap();

        prop_assert!(clients_a.is_subset(&clients_b));
        prop_assert!(products_a.is_subset(&products_b));
        prop_assert_eq!(s.states().len(), clients_b.len() * products_b.len());
    }
}
