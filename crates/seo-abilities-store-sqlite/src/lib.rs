#![forbid(unsafe_code)]

//! `SQLite` implementation of the [`HostStore`] seam: a local model of the
//! host system's content, meta, and options tables, plus the two optional
//! external plugin tables the log readers depend on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use seo_abilities_core::{
    ContentKind, ContentPage, ContentQuery, ContentRecord, ContentStatus, HostStore,
    PLUGIN_VERSION_OPTION,
};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const HOST_SCHEMA_VERSION: i64 = 1;

const HOST_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  post_type TEXT NOT NULL CHECK (post_type IN ('post','page')),
  post_status TEXT NOT NULL CHECK (post_status IN ('publish','draft')),
  post_title TEXT NOT NULL,
  permalink TEXT NOT NULL,
  author_id INTEGER NOT NULL,
  modified_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS postmeta (
  post_id INTEGER NOT NULL,
  meta_key TEXT NOT NULL,
  meta_value TEXT NOT NULL,
  PRIMARY KEY (post_id, meta_key),
  FOREIGN KEY (post_id) REFERENCES posts(id)
);

CREATE TABLE IF NOT EXISTS options (
  option_name TEXT PRIMARY KEY,
  option_value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_listing
  ON posts(post_status, post_type, modified_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
";

/// Tables owned by the external SEO plugin. Their existence is never
/// guaranteed; the log readers probe before querying.
const PLUGIN_TABLES_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS rank_math_404_logs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uri TEXT NOT NULL,
  accessed TEXT NOT NULL,
  times_accessed INTEGER NOT NULL DEFAULT 1,
  referer TEXT NOT NULL DEFAULT '',
  user_agent TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS rank_math_redirections (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  sources TEXT NOT NULL,
  url_to TEXT NOT NULL,
  header_code INTEGER NOT NULL DEFAULT 301,
  hits INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL DEFAULT 'active',
  created TEXT NOT NULL,
  updated TEXT NOT NULL
);
";

/// Input for inserting a content record. The host system owns record
/// lifecycle; this exists for migration tooling and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub kind: ContentKind,
    pub status: ContentStatus,
    pub title: String,
    pub permalink: String,
    pub author_id: i64,
    pub modified_at: OffsetDateTime,
}

/// Host store backed by a local `SQLite` database.
///
/// The table-existence probe cache lives as long as this value, i.e. one
/// serving process. It is never persisted and is recomputed on the next
/// open; [`create_plugin_tables`](Self::create_plugin_tables) drops the
/// affected entries so a table created mid-process is seen.
pub struct SqliteHostStore {
    conn: Connection,
    probe_cache: RefCell<BTreeMap<String, bool>>,
}

fn rfc3339(ts: OffsetDateTime) -> Result<String> {
    ts.format(&Rfc3339).context("failed to format timestamp as RFC 3339")
}

fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .with_context(|| format!("invalid RFC 3339 timestamp in store: {raw}"))
}

fn escape_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn valid_table_name(table: &str) -> bool {
    !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn sql_to_json(value: rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null | rusqlite::types::Value::Blob(_) => Value::Null,
        rusqlite::types::Value::Integer(n) => Value::from(n),
        rusqlite::types::Value::Real(f) => {
            serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
        }
        rusqlite::types::Value::Text(s) => Value::String(s),
    }
}

impl SqliteHostStore {
    /// Open or create a host database and configure local pragmas.
    ///
    /// # Errors
    /// Returns an error if opening the database or applying pragmas fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and throwaway invocations.
    ///
    /// # Errors
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;
        Ok(Self { conn, probe_cache: RefCell::new(BTreeMap::new()) })
    }

    /// Apply the host schema and record the migration.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(HOST_SCHEMA).context("failed to apply host schema")?;
        let now = rfc3339(OffsetDateTime::now_utc())?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![HOST_SCHEMA_VERSION, now],
            )
            .context("failed to record host migration")?;
        Ok(())
    }

    /// Create the external plugin's log tables. In production those belong
    /// to the plugin; tooling and tests use this to simulate an install
    /// that has them.
    ///
    /// # Errors
    /// Returns an error if the tables cannot be created.
    pub fn create_plugin_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(PLUGIN_TABLES_SCHEMA)
            .context("failed to create plugin tables")?;
        let mut cache = self.probe_cache.borrow_mut();
        cache.remove("rank_math_404_logs");
        cache.remove("rank_math_redirections");
        Ok(())
    }

    /// Set the plugin version marker option, flipping the feature-active
    /// probe to true.
    ///
    /// # Errors
    /// Returns an error if the option write fails.
    pub fn activate_seo_plugin(&self, version: &str) -> Result<()> {
        self.set_option(PLUGIN_VERSION_OPTION, &Value::String(version.to_string()))
    }

    /// Insert a content record, returning its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_post(&self, post: &NewPost) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO posts(post_type, post_status, post_title, permalink, author_id, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    post.kind.as_str(),
                    post.status.as_str(),
                    post.title,
                    post.permalink,
                    post.author_id,
                    rfc3339(post.modified_at)?,
                ],
            )
            .context("failed to insert post")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a 404 log row, returning its id.
    ///
    /// # Errors
    /// Returns an error if the table is missing or the insert fails.
    pub fn insert_404_log(&self, uri: &str, user_agent: &str) -> Result<i64> {
        let now = rfc3339(OffsetDateTime::now_utc())?;
        self.conn
            .execute(
                "INSERT INTO rank_math_404_logs(uri, accessed, user_agent) VALUES (?1, ?2, ?3)",
                params![uri, now, user_agent],
            )
            .context("failed to insert 404 log row")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a redirection rule, returning its id.
    ///
    /// # Errors
    /// Returns an error if the table is missing or the insert fails.
    pub fn insert_redirection(&self, sources: &str, url_to: &str, header_code: u16) -> Result<i64> {
        let now = rfc3339(OffsetDateTime::now_utc())?;
        self.conn
            .execute(
                "INSERT INTO rank_math_redirections(sources, url_to, header_code, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![sources, url_to, header_code, now],
            )
            .context("failed to insert redirection row")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, String, i64, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn record_from_parts(
        parts: (i64, String, String, String, String, i64, String),
    ) -> Result<ContentRecord> {
        let (id, kind, status, title, permalink, author_id, modified_at) = parts;
        let Some(kind) = ContentKind::parse(&kind) else {
            bail!("unknown post_type in store: {kind}");
        };
        let Some(status) = ContentStatus::parse(&status) else {
            bail!("unknown post_status in store: {status}");
        };
        Ok(ContentRecord {
            id,
            kind,
            status,
            title,
            permalink,
            author_id,
            modified_at: parse_rfc3339(&modified_at)?,
        })
    }
}

impl HostStore for SqliteHostStore {
    fn get_post(&self, id: i64) -> Result<Option<ContentRecord>> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, post_type, post_status, post_title, permalink, author_id, modified_at
                 FROM posts WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()
            .context("failed to look up post")?;
        parts.map(Self::record_from_parts).transpose()
    }

    fn get_post_meta(&self, post_id: i64, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT meta_value FROM postmeta WHERE post_id = ?1 AND meta_key = ?2",
                params![post_id, key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read post meta")
    }

    fn set_post_meta(&self, post_id: i64, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO postmeta(post_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(post_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
                params![post_id, key, value],
            )
            .context("failed to write post meta")?;
        Ok(())
    }

    fn delete_post_meta(&self, post_id: i64, key: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM postmeta WHERE post_id = ?1 AND meta_key = ?2",
                params![post_id, key],
            )
            .context("failed to delete post meta")?;
        Ok(())
    }

    fn query_posts(&self, query: &ContentQuery) -> Result<ContentPage> {
        let mut clauses = vec!["post_status = 'publish'".to_string()];
        let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if !query.kinds.is_empty() {
            let placeholders = vec!["?"; query.kinds.len()].join(", ");
            clauses.push(format!("post_type IN ({placeholders})"));
            for kind in &query.kinds {
                args.push(Box::new(kind.as_str().to_string()));
            }
        }
        if let Some(author_id) = query.author_id {
            clauses.push("author_id = ?".to_string());
            args.push(Box::new(author_id));
        }
        if let Some(search) = &query.search {
            clauses.push(r"post_title LIKE ? ESCAPE '\'".to_string());
            args.push(Box::new(format!("%{}%", escape_like(search))));
        }
        let where_sql = clauses.join(" AND ");

        let total: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM posts WHERE {where_sql}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .context("failed to count posts")?;

        args.push(Box::new(i64::from(query.limit)));
        args.push(Box::new(i64::from(query.offset)));
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, post_type, post_status, post_title, permalink, author_id, modified_at
                 FROM posts WHERE {where_sql}
                 ORDER BY modified_at DESC, id DESC LIMIT ? OFFSET ?"
            ))
            .context("failed to prepare post query")?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_record)
            .context("failed to query posts")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::record_from_parts(row.context("failed to read post row")?)?);
        }
        Ok(ContentPage { records, total: u64::try_from(total).unwrap_or(0) })
    }

    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT option_value FROM options WHERE option_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read option")?;
        raw.map(|raw| {
            serde_json::from_str(&raw).with_context(|| format!("invalid option value for {name}"))
        })
        .transpose()
    }

    fn set_option(&self, name: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value).context("failed to encode option value")?;
        self.conn
            .execute(
                "INSERT INTO options(option_name, option_value) VALUES (?1, ?2)
                 ON CONFLICT(option_name) DO UPDATE SET option_value = excluded.option_value",
                params![name, raw],
            )
            .context("failed to write option")?;
        Ok(())
    }

    fn list_option_names(&self, prefix: &str, limit: u32, offset: u32) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                r"SELECT option_name FROM options WHERE option_name LIKE ? ESCAPE '\'
                  ORDER BY option_name ASC LIMIT ? OFFSET ?",
            )
            .context("failed to prepare option listing")?;
        let rows = stmt
            .query_map(
                params![format!("{}%", escape_like(prefix)), i64::from(limit), i64::from(offset)],
                |row| row.get::<_, String>(0),
            )
            .context("failed to list option names")?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row.context("failed to read option name")?);
        }
        Ok(names)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        if let Some(cached) = self.probe_cache.borrow().get(table) {
            return Ok(*cached);
        }
        let exists = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("failed to probe table existence")?
            .is_some();
        self.probe_cache.borrow_mut().insert(table.to_string(), exists);
        Ok(exists)
    }

    fn read_table_rows(
        &self,
        table: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Map<String, Value>>> {
        if !valid_table_name(table) {
            bail!("invalid table name: {table}");
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {table} ORDER BY id DESC LIMIT ?1 OFFSET ?2"))
            .with_context(|| format!("failed to prepare read of {table}"))?;
        let column_names: Vec<String> =
            stmt.column_names().into_iter().map(ToString::to_string).collect();
        let rows = stmt
            .query_map(params![i64::from(limit), i64::from(offset)], |row| {
                let mut object = Map::new();
                for (index, name) in column_names.iter().enumerate() {
                    let value: rusqlite::types::Value = row.get(index)?;
                    object.insert(name.clone(), sql_to_json(value));
                }
                Ok(object)
            })
            .with_context(|| format!("failed to read rows from {table}"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("failed to read row from {table}"))?);
        }
        Ok(out)
    }

    fn seo_plugin_active(&self) -> Result<bool> {
        Ok(self.get_option(PLUGIN_VERSION_OPTION)?.is_some())
    }
}
