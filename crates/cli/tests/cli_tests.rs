// End-to-end tests for the `lboard` binary.
// Run with: cargo test -p launchboard-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn lboard(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lboard"));
        cmd.current_dir(self.dir.path())
            .env("LAUNCHBOARD_DB", self.path("board.db"))
            .env("LAUNCHBOARD_CONFIG", self.path("settings.toml"))
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.lboard().args(args).output().expect("run lboard")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Vendor sheet "Juan" plus single-product sheet "PROD7".
fn write_weekly_workbook(path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("Juan").unwrap();
    for (col, h) in ["COD", "Cliente", "Localidad", "ABC - Widget", "XYZ - Gadget"].iter().enumerate() {
        ws.write_string(0, col as u16, *h).unwrap();
    }
    ws.write_number(1, 0, 1.0).unwrap();
    ws.write_string(1, 1, "Acme").unwrap();
    ws.write_string(1, 2, "Springfield").unwrap();
    ws.write_number(1, 3, 1.0).unwrap();
    ws.write_number(2, 0, 2.0).unwrap();
    ws.write_string(2, 1, "Globex").unwrap();
    ws.write_string(2, 2, "Shelbyville").unwrap();
    ws.write_string(2, 4, "1").unwrap();

    let ws = wb.add_worksheet().set_name("PROD7").unwrap();
    ws.write_string(0, 0, "COD").unwrap();
    ws.write_string(0, 1, "Flag").unwrap();
    ws.write_number(1, 0, 9.0).unwrap();
    ws.write_string(1, 1, "x").unwrap();

    let ws = wb.add_worksheet().set_name("Notas").unwrap();
    ws.write_string(0, 0, "free text").unwrap();
    wb.save(path).unwrap();
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

#[test]
fn import_reports_summary_json() {
    let env = Env::new();
    let book = env.path("ventas.xlsx");
    write_weekly_workbook(&book);

    let out = env.run(&["import", book.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("import complete"));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(summary["filename"], "ventas.xlsx");
    assert_eq!(summary["sheet_count"], 3);
    assert_eq!(summary["vendor_sheets"], 1);
    assert_eq!(summary["single_product_sheets"], 1);
    assert_eq!(summary["skipped_sheets"], 1);
    assert_eq!(summary["client_count"], 3);
    assert_eq!(summary["product_count"], 3);
    assert_eq!(summary["pair_count"], 9);
    assert_eq!(summary["incorporated"], 3);
    assert!(summary["year_week"].as_str().unwrap().contains("-W"));
}

#[test]
fn import_missing_file_is_usage_error() {
    let env = Env::new();
    let out = env.run(&["import", "nope.xlsx"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("file not found"));
}

#[test]
fn import_corrupt_workbook_is_workbook_error() {
    let env = Env::new();
    let bad = env.path("bad.xlsx");
    std::fs::write(&bad, b"definitely not a zip").unwrap();

    let out = env.run(&["import", bad.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("error: "));

    // Nothing was recorded
    let out = env.run(&["batches", "--json"]);
    assert!(out.status.success());
    let batches: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(batches.as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// report / batches
// ---------------------------------------------------------------------------

#[test]
fn report_after_import() {
    let env = Env::new();
    let book = env.path("ventas.xlsx");
    write_weekly_workbook(&book);
    assert!(env.run(&["import", book.to_str().unwrap()]).status.success());

    let out = env.run(&["report", "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let dash: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(dash["total"]["incorporated"], 3);
    assert_eq!(dash["total"]["total"], 9);
    assert_eq!(dash["sellers"][0]["label"], "Juan");
    assert_eq!(dash["sellers"][0]["incorporated"], 2);
    assert_eq!(dash["sellers"][0]["total"], 6);
    assert_eq!(dash["last_batch"]["filename"], "ventas.xlsx");

    let out = env.run(&["report"]);
    let text = stdout(&out);
    assert!(text.contains("33.3%"));
    assert!(text.contains("3 of 9 incorporated"));
    assert!(text.contains("last update: ventas.xlsx · "));
}

#[test]
fn report_writes_xlsx() {
    let env = Env::new();
    let book = env.path("ventas.xlsx");
    write_weekly_workbook(&book);
    assert!(env.run(&["import", book.to_str().unwrap()]).status.success());

    let dash = env.path("dashboard.xlsx");
    let out = env.run(&["report", "--xlsx", dash.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(dash.exists());
}

#[test]
fn report_on_empty_store() {
    let env = Env::new();
    let out = env.run(&["report"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("no imports yet"));
}

#[test]
fn batches_latest_first() {
    let env = Env::new();
    let book = env.path("ventas.xlsx");
    write_weekly_workbook(&book);
    assert!(env.run(&["import", book.to_str().unwrap()]).status.success());
    assert!(env.run(&["import", book.to_str().unwrap(), "--sequential"]).status.success());

    let out = env.run(&["batches", "--json", "--limit", "1"]);
    let batches: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(batches.as_array().unwrap().len(), 1);
    assert_eq!(batches[0]["sheet_count"], 3);
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[test]
fn export_writes_seller_files_and_manifest() {
    let env = Env::new();
    let book = env.path("ventas.xlsx");
    write_weekly_workbook(&book);

    let out = env.run(&["export", book.to_str().unwrap(), "--output", "out", "--version", "2025-W07"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("Juan: 2 clients, 2 products"));

    let root = env.path("out");
    assert!(root.join("Juan").join("Juan_2025-W07.json").exists());
    assert!(root.join("Juan").join("Juan_2025-W07.csv").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(root.join("manifest_2025-W07.json")).unwrap()).unwrap();
    assert_eq!(manifest["sellers"].as_array().unwrap().len(), 1);
    assert_eq!(manifest["sellers"][0]["json"], "Juan/Juan_2025-W07.json");
}

#[test]
fn export_without_vendor_sheets() {
    let env = Env::new();
    let book = env.path("products.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("PROD7").unwrap();
    ws.write_string(0, 0, "COD").unwrap();
    ws.write_string(0, 1, "Flag").unwrap();
    wb.save(&book).unwrap();

    let out = env.run(&["export", book.to_str().unwrap(), "--output", "out"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("no vendor sheets were detected"));
    assert!(!env.path("out").join("PROD7").exists());
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_path_and_show() {
    let env = Env::new();
    let out = env.run(&["config", "path"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), env.path("settings.toml").display().to_string());

    std::fs::write(env.path("settings.toml"), "parallel_sheets = false\n[kpi]\ngreen_at = 95.0\n").unwrap();
    let out = env.run(&["config", "show"]);
    let text = stdout(&out);
    assert!(text.contains("parallel_sheets = false"));
    assert!(text.contains("green_at = 95.0"));
    // --db overrides the file
    assert!(text.contains("board.db"));
}

#[test]
fn verbose_logs_resolved_paths() {
    let env = Env::new();
    let out = env.run(&["-v", "batches"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains(&format!("settings: {}", env.path("settings.toml").display())));
    assert!(err.contains(&format!("store: {}", env.path("board.db").display())));

    let quiet = env.run(&["batches"]);
    assert!(!stderr(&quiet).contains("store: "));
}

#[test]
fn config_init_writes_defaults_once() {
    let env = Env::new();
    let out = env.run(&["config", "init"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = std::fs::read_to_string(env.path("settings.toml")).unwrap();
    assert!(text.contains("parallel_sheets = true"));
    assert!(text.contains("green_at = 80.0"));

    let out = env.run(&["config", "init"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("already exists"));

    assert!(env.run(&["config", "init", "--force"]).status.success());
}

#[test]
fn malformed_settings_is_config_error() {
    let env = Env::new();
    std::fs::write(env.path("settings.toml"), "kpi = [oops").unwrap();
    let out = env.run(&["report"]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("invalid settings"));
}
