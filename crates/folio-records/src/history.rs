// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan history — SQLite log of recognised text and rectified documents.
//
// Schema:
//   scan_records(
//     id           INTEGER PRIMARY KEY AUTOINCREMENT,
//     kind         TEXT    NOT NULL,   -- "ocr", "document", "scan code"
//     content      TEXT    NOT NULL,   -- recognised text or a short summary
//     image_path   TEXT,               -- where the source/result image lives
//     image_sha256 TEXT,               -- SHA-256 hex of the image bytes
//     created_at   TEXT    NOT NULL,   -- RFC 3339, UTC
//     updated_at   TEXT    NOT NULL    -- RFC 3339, UTC
//   )

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use folio_core::ScanKind;
use folio_core::error::{FolioError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scan_records (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    kind         TEXT    NOT NULL,
    content      TEXT    NOT NULL,
    image_path   TEXT,
    image_sha256 TEXT,
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL
);";

const SELECT_COLUMNS: &str =
    "SELECT id, kind, content, image_path, image_sha256, created_at, updated_at FROM scan_records";

fn db_err(e: rusqlite::Error) -> FolioError {
    FolioError::Database(e.to_string())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One stored scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub kind: ScanKind,
    pub content: String,
    pub image_path: Option<String>,
    pub image_sha256: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ScanRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(1)?;
        let kind = ScanKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown scan kind {kind:?}").into(),
            )
        })?;
        Ok(Self {
            id: row.get(0)?,
            kind,
            content: row.get(2)?,
            image_path: row.get(3)?,
            image_sha256: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

/// History of completed scans backed by a SQLite database.
pub struct ScanHistory {
    conn: Connection,
}

impl ScanHistory {
    /// Open (or create) the history database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("scan history opened");
        Ok(Self { conn })
    }

    /// In-memory history, gone when dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("in-memory scan history opened");
        Ok(Self { conn })
    }

    /// Store a new record and return its id. When `image_bytes` is given its
    /// SHA-256 is stored alongside the path.
    #[instrument(skip(self, content, image_bytes), fields(kind = kind.as_str()))]
    pub fn add(
        &self,
        kind: ScanKind,
        content: &str,
        image_path: Option<&str>,
        image_bytes: Option<&[u8]>,
    ) -> Result<i64> {
        let timestamp = now();
        let digest = image_bytes.map(hash_bytes);

        self.conn
            .execute(
                "INSERT INTO scan_records (kind, content, image_path, image_sha256, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![kind.as_str(), content, image_path, digest, timestamp],
            )
            .map_err(db_err)?;

        let id = self.conn.last_insert_rowid();
        info!(id, "scan record stored");
        Ok(id)
    }

    /// Replace the text of a record and bump its update time. Returns false
    /// when no record has that id.
    pub fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE scan_records SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, now(), id],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<ScanRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))
            .map_err(db_err)?;

        let rows = stmt.query_map([], ScanRecord::from_row).map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_err)?);
        }
        Ok(records)
    }

    pub fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                ScanRecord::from_row,
            )
            .optional()
            .map_err(db_err)
    }

    /// Remove one record. Returns false when no record has that id.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM scan_records WHERE id = ?1", params![id])
            .map_err(db_err)?;
        debug!(id, removed, "scan record delete");
        Ok(removed > 0)
    }

    /// Remove every record, returning how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM scan_records", [])
            .map_err(db_err)?;
        info!(removed, "scan history cleared");
        Ok(removed)
    }

    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM scan_records", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// Whether `data` still matches the image hash stored for record `id`.
    /// Records without a stored hash never match.
    pub fn image_matches(&self, id: i64, data: &[u8]) -> Result<bool> {
        Ok(self
            .get(id)?
            .and_then(|record| record.image_sha256)
            .is_some_and(|expected| expected == hash_bytes(data)))
    }
}
