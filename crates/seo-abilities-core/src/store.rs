use anyhow::Result;
use serde_json::{Map, Value};

use crate::{ContentKind, ContentRecord};

/// Window into the host system's content table. Only published records are
/// considered; ordering is by modification time, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub kinds: Vec<ContentKind>,
    /// Narrows the query to records authored by this user. Applied at the
    /// query level, not as a post-hoc filter.
    pub author_id: Option<i64>,
    /// Substring match against record titles.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentPage {
    pub records: Vec<ContentRecord>,
    /// Count of all records matching the query, ignoring limit/offset.
    pub total: u64,
}

/// Seam to the host content-management system's stores. All reads and
/// writes the catalog performs go through this trait; the sqlite
/// implementation lives in `seo-abilities-store-sqlite`.
pub trait HostStore {
    #[allow(clippy::missing_errors_doc)]
    fn get_post(&self, id: i64) -> Result<Option<ContentRecord>>;

    #[allow(clippy::missing_errors_doc)]
    fn get_post_meta(&self, post_id: i64, key: &str) -> Result<Option<String>>;

    #[allow(clippy::missing_errors_doc)]
    fn set_post_meta(&self, post_id: i64, key: &str, value: &str) -> Result<()>;

    #[allow(clippy::missing_errors_doc)]
    fn delete_post_meta(&self, post_id: i64, key: &str) -> Result<()>;

    #[allow(clippy::missing_errors_doc)]
    fn query_posts(&self, query: &ContentQuery) -> Result<ContentPage>;

    #[allow(clippy::missing_errors_doc)]
    fn get_option(&self, name: &str) -> Result<Option<Value>>;

    #[allow(clippy::missing_errors_doc)]
    fn set_option(&self, name: &str, value: &Value) -> Result<()>;

    /// Option names starting with `prefix`, ordered lexicographically.
    #[allow(clippy::missing_errors_doc)]
    fn list_option_names(&self, prefix: &str, limit: u32, offset: u32) -> Result<Vec<String>>;

    /// Whether `table` exists in the backing database. Implementations may
    /// cache the probe for the life of the process.
    #[allow(clippy::missing_errors_doc)]
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Raw rows from an external plugin table, ordered by descending id.
    #[allow(clippy::missing_errors_doc)]
    fn read_table_rows(&self, table: &str, limit: u32, offset: u32)
        -> Result<Vec<Map<String, Value>>>;

    /// Whether the external SEO plugin signals itself active.
    #[allow(clippy::missing_errors_doc)]
    fn seo_plugin_active(&self) -> Result<bool>;
}
