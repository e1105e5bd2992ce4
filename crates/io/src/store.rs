// Persistent incorporation store using SQLite

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use launchboard_engine::Client;
use launchboard_recon::memory::StoredClient;
use launchboard_recon::model::{NewBatch, ProductTally, SellerTally};
use launchboard_recon::{ImportBatch, Incorporation, ReportSource, StateRow, Store, StoreError, YearWeek};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS seller (
    id TEXT PRIMARY KEY,            -- trimmed sheet name
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS client (
    id TEXT PRIMARY KEY,
    name TEXT,                      -- NULL for clients seen only on product sheets
    locality TEXT,
    zone TEXT
);

CREATE TABLE IF NOT EXISTS assignment (
    client_id TEXT NOT NULL REFERENCES client(id),
    seller_id TEXT NOT NULL REFERENCES seller(id),
    PRIMARY KEY (client_id, seller_id)
);

CREATE TABLE IF NOT EXISTS client_product_state (
    client_id TEXT NOT NULL REFERENCES client(id),
    product_code TEXT NOT NULL REFERENCES product(code),
    state TEXT NOT NULL CHECK (state IN ('INCORPORATED', 'PENDING')),
    updated_at TEXT NOT NULL,       -- RFC 3339, UTC
    PRIMARY KEY (client_id, product_code)
);

CREATE TABLE IF NOT EXISTS client_product_weekly (
    client_id TEXT NOT NULL REFERENCES client(id),
    product_code TEXT NOT NULL REFERENCES product(code),
    year_week TEXT NOT NULL,        -- YYYY-Www
    state TEXT NOT NULL CHECK (state IN ('INCORPORATED', 'PENDING')),
    PRIMARY KEY (client_id, product_code, year_week)
);

CREATE TABLE IF NOT EXISTS import_batch (
    id TEXT PRIMARY KEY,
    imported_at TEXT NOT NULL,
    filename TEXT NOT NULL,
    sheet_count INTEGER NOT NULL,
    product_count INTEGER NOT NULL,
    client_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_import_batch_imported_at ON import_batch(imported_at);
"#;

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::new(e.to_string())
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::new(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_state(s: &str) -> Result<Incorporation, StoreError> {
    s.parse().map_err(StoreError::new)
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::new(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(db_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        Ok(Self { conn })
    }

    // -------------------------------------------------------------------------
    // Point reads
    // -------------------------------------------------------------------------

    pub fn client(&self, id: &str) -> Result<Option<StoredClient>, StoreError> {
        self.conn
            .query_row(
                "SELECT name, locality, zone FROM client WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StoredClient {
                        name: row.get(0)?,
                        locality: row.get(1)?,
                        zone: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)
    }

    pub fn product_name(&self, code: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT name FROM product WHERE code = ?1", params![code], |row| row.get(0))
            .optional()
            .map_err(db_err)
    }

    pub fn sellers(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM seller ORDER BY id").map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(db_err)
    }

    pub fn state(&self, client_id: &str, product_code: &str) -> Result<Option<Incorporation>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM client_product_state WHERE client_id = ?1 AND product_code = ?2",
                params![client_id, product_code],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        raw.as_deref().map(parse_state).transpose()
    }

    pub fn weekly_count(&self, year_week: YearWeek) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM client_product_weekly WHERE year_week = ?1",
                params![year_week.to_string()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(n as usize)
    }

    fn count(&self, sql: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0)).map_err(db_err)?;
        Ok(n as usize)
    }

    fn string_set(&self, sql: &str) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<Result<BTreeSet<String>, _>>().map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

impl Store for SqliteStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StoreError::new(format!("failed to begin transaction: {e}")))
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| StoreError::new(format!("failed to commit transaction: {e}")))
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK").map_err(db_err)
    }

    fn upsert_seller(&mut self, name: &str) -> Result<String, StoreError> {
        let id = name.trim();
        self.conn
            .execute(
                "INSERT INTO seller (id, name) VALUES (?1, ?1)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![id],
            )
            .map_err(db_err)?;
        Ok(id.to_string())
    }

    fn upsert_product(&mut self, code: &str, name: &str) -> Result<String, StoreError> {
        self.conn
            .execute(
                "INSERT INTO product (code, name) VALUES (?1, ?2)
                 ON CONFLICT(code) DO UPDATE SET name = excluded.name",
                params![code, name],
            )
            .map_err(db_err)?;
        Ok(code.to_string())
    }

    fn upsert_client(&mut self, client: &Client) -> Result<String, StoreError> {
        self.conn
            .execute(
                "INSERT INTO client (id, name, locality, zone) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name, locality = excluded.locality, zone = excluded.zone",
                params![client.id, client.name, client.locality, client.zone],
            )
            .map_err(db_err)?;
        Ok(client.id.clone())
    }

    fn ensure_client(&mut self, id: &str) -> Result<(), StoreError> {
        self.conn
            .execute("INSERT OR IGNORE INTO client (id) VALUES (?1)", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn ensure_assignment(&mut self, client_id: &str, seller_id: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO assignment (client_id, seller_id) VALUES (?1, ?2)",
                params![client_id, seller_id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn upsert_states(&mut self, rows: &[StateRow], updated_at: DateTime<Utc>) -> Result<(), StoreError> {
        let ts = updated_at.to_rfc3339();
        let mut stmt = self
            .conn
            .prepare_cached(
                "INSERT INTO client_product_state (client_id, product_code, state, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(client_id, product_code) DO UPDATE SET
                     state = excluded.state, updated_at = excluded.updated_at",
            )
            .map_err(db_err)?;
        for r in rows {
            stmt.execute(params![r.client_id, r.product_code, r.state.as_str(), ts])
                .map_err(db_err)?;
        }
        Ok(())
    }

    fn upsert_weekly_states(&mut self, rows: &[StateRow], year_week: YearWeek) -> Result<(), StoreError> {
        let week = year_week.to_string();
        let mut stmt = self
            .conn
            .prepare_cached(
                "INSERT INTO client_product_weekly (client_id, product_code, year_week, state)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(client_id, product_code, year_week) DO UPDATE SET state = excluded.state",
            )
            .map_err(db_err)?;
        for r in rows {
            stmt.execute(params![r.client_id, r.product_code, week, r.state.as_str()])
                .map_err(db_err)?;
        }
        Ok(())
    }

    fn known_client_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        self.string_set("SELECT id FROM client")
    }

    fn known_product_codes(&self) -> Result<BTreeSet<String>, StoreError> {
        self.string_set("SELECT code FROM product")
    }

    fn insert_import_batch(&mut self, batch: &NewBatch) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO import_batch (id, imported_at, filename, sheet_count, product_count, client_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    batch.imported_at.to_rfc3339(),
                    batch.filename,
                    batch.sheet_count as i64,
                    batch.product_count as i64,
                    batch.client_count as i64,
                ],
            )
            .map_err(db_err)?;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

impl ReportSource for SqliteStore {
    fn total_pairs(&self) -> Result<usize, StoreError> {
        self.count("SELECT COUNT(*) FROM client_product_state")
    }

    fn total_incorporated(&self) -> Result<usize, StoreError> {
        self.count("SELECT COUNT(*) FROM client_product_state WHERE state = 'INCORPORATED'")
    }

    fn per_seller(&self) -> Result<Vec<SellerTally>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id,
                        COALESCE(SUM(CASE WHEN st.state = 'INCORPORATED' THEN 1 ELSE 0 END), 0) AS inc,
                        COALESCE(SUM(CASE WHEN st.state = 'PENDING' THEN 1 ELSE 0 END), 0) AS pend
                 FROM seller s
                 LEFT JOIN assignment a ON a.seller_id = s.id
                 LEFT JOIN client_product_state st ON st.client_id = a.client_id
                 GROUP BY s.id
                 ORDER BY inc DESC, s.id ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SellerTally {
                    seller: row.get(0)?,
                    incorporated: row.get::<_, i64>(1)? as usize,
                    pending: row.get::<_, i64>(2)? as usize,
                })
            })
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn per_product(&self) -> Result<Vec<ProductTally>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.code, p.name,
                        COALESCE(SUM(CASE WHEN st.state = 'INCORPORATED' THEN 1 ELSE 0 END), 0) AS inc,
                        COALESCE(SUM(CASE WHEN st.state = 'PENDING' THEN 1 ELSE 0 END), 0) AS pend
                 FROM product p
                 LEFT JOIN client_product_state st ON st.product_code = p.code
                 GROUP BY p.code
                 ORDER BY inc DESC, p.code ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProductTally {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    incorporated: row.get::<_, i64>(2)? as usize,
                    pending: row.get::<_, i64>(3)? as usize,
                })
            })
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn last_batch(&self) -> Result<Option<ImportBatch>, StoreError> {
        Ok(self.batches(1)?.into_iter().next())
    }

    fn batches(&self, limit: usize) -> Result<Vec<ImportBatch>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, imported_at, filename, sheet_count, product_count, client_count
                 FROM import_batch
                 ORDER BY imported_at DESC, rowid DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;
        let raw = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(id, at, filename, sheets, products, clients)| {
                Ok(ImportBatch {
                    id,
                    imported_at: parse_time(&at)?,
                    filename,
                    sheet_count: sheets as usize,
                    product_count: products as usize,
                    client_count: clients as usize,
                })
            })
            .collect()
    }
}
