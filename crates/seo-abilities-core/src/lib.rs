#![forbid(unsafe_code)]

//! Domain contract for the SEO abilities catalog: capability model, content
//! record views, SEO attribute names and encodings, the option allow-list
//! policy, the error taxonomy, and the [`HostStore`] seam to the host
//! content-management system.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod sanitize;
mod store;

pub use store::{ContentPage, ContentQuery, HostStore};

/// Marker value the external SEO plugin stores for boolean flags.
///
/// Pillar and cornerstone flags are persisted as presence of this literal,
/// never as `"off"`: clearing a flag deletes the meta key.
pub const FLAG_MARKER: &str = "on";

/// Option name holding the external SEO plugin's version. Its presence in
/// the host options store is the feature-active signal.
pub const PLUGIN_VERSION_OPTION: &str = "rank_math_version";

/// Meta keys the catalog reads and writes, using the external plugin's
/// storage names so the data stays bit-compatible with it.
pub mod meta_keys {
    pub const TITLE: &str = "rank_math_title";
    pub const DESCRIPTION: &str = "rank_math_description";
    pub const FOCUS_KEYWORD: &str = "rank_math_focus_keyword";
    pub const ROBOTS: &str = "rank_math_robots";
    pub const CANONICAL_URL: &str = "rank_math_canonical_url";
    pub const PILLAR_CONTENT: &str = "rank_math_pillar_content";
    pub const CORNERSTONE_CONTENT: &str = "rank_math_cornerstone_content";

    pub const SUPPORTED: [&str; 7] = [
        TITLE,
        DESCRIPTION,
        FOCUS_KEYWORD,
        ROBOTS,
        CANONICAL_URL,
        PILLAR_CONTENT,
        CORNERSTONE_CONTENT,
    ];
}

/// Terminal failures an ability invocation can surface. Every variant is
/// returned to the caller as a `success:false` envelope, never propagated
/// as a fault.
#[derive(Debug, thiserror::Error)]
pub enum AbilityError {
    #[error("Unknown ability: {0}")]
    UnknownAbility(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Rank Math SEO plugin is not active.")]
    FeatureInactive,
    #[error("Post or page not found with ID: {0}")]
    NotFound(i64),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("No fields provided to update.")]
    NoFieldsProvided,
    #[error("{0}")]
    NoInputProvided(&'static str),
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Capability tiers the host system grants to calling identities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    EditPosts,
    EditOthersPosts,
    ManageOptions,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditPosts => "edit_posts",
            Self::EditOthersPosts => "edit_others_posts",
            Self::ManageOptions => "manage_options",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "edit_posts" => Some(Self::EditPosts),
            "edit_others_posts" => Some(Self::EditOthersPosts),
            "manage_options" => Some(Self::ManageOptions),
            _ => None,
        }
    }
}

/// The calling identity an invocation runs as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub capabilities: BTreeSet<Capability>,
}

impl Caller {
    #[must_use]
    pub fn new(user_id: i64, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self { user_id, capabilities: capabilities.into_iter().collect() }
    }

    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Per-record edit authorization: the caller must hold `edit_posts` and
    /// either author the record or hold `edit_others_posts`.
    #[must_use]
    pub fn can_edit_record(&self, record: &ContentRecord) -> bool {
        self.can(Capability::EditPosts)
            && (record.author_id == self.user_id || self.can(Capability::EditOthersPosts))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Page,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            "page" => Some(Self::Page),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Publish,
    Draft,
}

impl ContentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publish" => Some(Self::Publish),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

/// Content-type filter accepted by the bulk listing. `Any` searches posts
/// and pages together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    Post,
    Page,
    #[default]
    Any,
}

impl TypeFilter {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            "page" => Some(Self::Page),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    #[must_use]
    pub fn kinds(self) -> Vec<ContentKind> {
        match self {
            Self::Post => vec![ContentKind::Post],
            Self::Page => vec![ContentKind::Page],
            Self::Any => vec![ContentKind::Post, ContentKind::Page],
        }
    }
}

/// A read-only view of a host content record. Lifecycle is owned by the
/// host system; this catalog only attaches metadata to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    pub kind: ContentKind,
    pub status: ContentStatus,
    pub title: String,
    pub permalink: String,
    pub author_id: i64,
    pub modified_at: OffsetDateTime,
}

/// The fixed robots directive vocabulary. Values outside this set are
/// silently dropped on write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RobotsDirective {
    Index,
    Noindex,
    Follow,
    Nofollow,
    Noarchive,
    Nosnippet,
    Noimageindex,
}

impl RobotsDirective {
    pub const ALL: [Self; 7] = [
        Self::Index,
        Self::Noindex,
        Self::Follow,
        Self::Nofollow,
        Self::Noarchive,
        Self::Nosnippet,
        Self::Noimageindex,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Noindex => "noindex",
            Self::Follow => "follow",
            Self::Nofollow => "nofollow",
            Self::Noarchive => "noarchive",
            Self::Nosnippet => "nosnippet",
            Self::Noimageindex => "noimageindex",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "index" => Some(Self::Index),
            "noindex" => Some(Self::Noindex),
            "follow" => Some(Self::Follow),
            "nofollow" => Some(Self::Nofollow),
            "noarchive" => Some(Self::Noarchive),
            "nosnippet" => Some(Self::Nosnippet),
            "noimageindex" => Some(Self::Noimageindex),
            _ => None,
        }
    }

    /// Keeps only recognized directives, preserving input order and
    /// duplicates. An all-invalid input yields an empty list, which is
    /// still a storable value.
    #[must_use]
    pub fn filter(values: &[String]) -> Vec<String> {
        values
            .iter()
            .filter(|value| Self::parse(value).is_some())
            .cloned()
            .collect()
    }
}

/// Decodes the stored robots meta value. The plugin stores a list; anything
/// that does not decode as an array of strings reads as the empty set.
#[must_use]
pub fn robots_from_meta(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(value) => Some(value),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Allow-list governing which option names are visible and writable through
/// the settings operations. Held as configuration data so the predicate is
/// testable in isolation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionPolicy {
    pub allowed_prefixes: Vec<String>,
}

impl Default for OptionPolicy {
    fn default() -> Self {
        Self { allowed_prefixes: vec!["rank_math_".to_string()] }
    }
}

impl OptionPolicy {
    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed_prefixes.iter().any(|prefix| name.starts_with(prefix))
    }
}
