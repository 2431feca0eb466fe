//! Handler functions for the eight catalog operations. Handlers are plain
//! function pointers taking the invocation context and the already
//! schema-validated input; allow-lists and the robots vocabulary arrive as
//! explicit configuration, never as captured state.

use anyhow::Context;
use seo_abilities_core::sanitize::{sanitize_text_field, sanitize_textarea_field, sanitize_url};
use seo_abilities_core::{
    meta_keys, robots_from_meta, AbilityError, Capability, ContentQuery, HostStore,
    RobotsDirective, TypeFilter, FLAG_MARKER,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AbilityContext;

const FORBIDDEN_ACCESS_POST: &str = "You do not have permission to access this post.";
const FORBIDDEN_EDIT_POST: &str = "You do not have permission to edit this post.";
const NO_OPTION_NAMES: &str = "No option names provided.";
const NO_OPTIONS_TO_UPDATE: &str = "No options provided to update.";

fn decode<T: DeserializeOwned>(input: Value) -> Result<T, AbilityError> {
    serde_json::from_value(input).map_err(|err| AbilityError::InvalidInput(err.to_string()))
}

fn encode<T: Serialize>(response: &T) -> Result<Value, AbilityError> {
    Ok(serde_json::to_value(response).context("failed to encode ability response")?)
}

fn meta_or_empty(store: &dyn HostStore, post_id: i64, key: &str) -> Result<String, AbilityError> {
    Ok(store.get_post_meta(post_id, key)?.unwrap_or_default())
}

fn flag_is_set(store: &dyn HostStore, post_id: i64, key: &str) -> Result<bool, AbilityError> {
    Ok(store.get_post_meta(post_id, key)?.as_deref() == Some(FLAG_MARKER))
}

/// Clamps an optional page-size value into `[1, max]`, falling back to
/// `default` when absent. Dispatch already rejects out-of-range input via
/// the published schema; handlers clamp anyway.
fn clamp_window(value: Option<i64>, default: u32, max: u32) -> u32 {
    let value = value.unwrap_or(i64::from(default));
    u32::try_from(value.clamp(1, i64::from(max))).unwrap_or(default)
}

fn clamp_page(value: Option<i64>) -> u32 {
    u32::try_from(value.unwrap_or(1).max(1)).unwrap_or(u32::MAX)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetMetaInput {
    id: i64,
    // accepted for interface compatibility, never constrains the lookup
    #[serde(rename = "type", default)]
    _type_filter: Option<TypeFilter>,
}

#[derive(Debug, Serialize)]
struct GetMetaResponse {
    success: bool,
    id: i64,
    title: String,
    url: String,
    post_type: &'static str,
    seo_title: String,
    seo_description: String,
    focus_keyword: String,
    robots: Vec<String>,
    canonical_url: String,
    is_pillar: bool,
    is_cornerstone: bool,
}

pub(crate) fn get_meta(ctx: &AbilityContext<'_>, input: Value) -> Result<Value, AbilityError> {
    let input: GetMetaInput = decode(input)?;
    let record = ctx.store.get_post(input.id)?.ok_or(AbilityError::NotFound(input.id))?;
    if !ctx.caller.can_edit_record(&record) {
        return Err(AbilityError::Forbidden(FORBIDDEN_ACCESS_POST));
    }

    let robots =
        robots_from_meta(ctx.store.get_post_meta(input.id, meta_keys::ROBOTS)?.as_deref());
    encode(&GetMetaResponse {
        success: true,
        id: record.id,
        title: record.title,
        url: record.permalink,
        post_type: record.kind.as_str(),
        seo_title: meta_or_empty(ctx.store, input.id, meta_keys::TITLE)?,
        seo_description: meta_or_empty(ctx.store, input.id, meta_keys::DESCRIPTION)?,
        focus_keyword: meta_or_empty(ctx.store, input.id, meta_keys::FOCUS_KEYWORD)?,
        robots,
        canonical_url: meta_or_empty(ctx.store, input.id, meta_keys::CANONICAL_URL)?,
        is_pillar: flag_is_set(ctx.store, input.id, meta_keys::PILLAR_CONTENT)?,
        is_cornerstone: flag_is_set(ctx.store, input.id, meta_keys::CORNERSTONE_CONTENT)?,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateMetaInput {
    id: i64,
    seo_title: Option<String>,
    seo_description: Option<String>,
    focus_keyword: Option<String>,
    robots: Option<Vec<String>>,
    canonical_url: Option<String>,
    is_pillar: Option<bool>,
    is_cornerstone: Option<bool>,
}

#[derive(Debug, Serialize)]
struct UpdateMetaResponse {
    success: bool,
    id: i64,
    updated: Vec<&'static str>,
    url: String,
    message: String,
}

pub(crate) fn update_meta(ctx: &AbilityContext<'_>, input: Value) -> Result<Value, AbilityError> {
    let input: UpdateMetaInput = decode(input)?;
    let record = ctx.store.get_post(input.id)?.ok_or(AbilityError::NotFound(input.id))?;
    if !ctx.caller.can_edit_record(&record) {
        return Err(AbilityError::Forbidden(FORBIDDEN_EDIT_POST));
    }

    // Presence, not truthiness, decides whether a field is touched.
    let mut updated: Vec<&'static str> = Vec::new();

    if let Some(seo_title) = &input.seo_title {
        ctx.store.set_post_meta(input.id, meta_keys::TITLE, &sanitize_text_field(seo_title))?;
        updated.push("seo_title");
    }

    if let Some(seo_description) = &input.seo_description {
        ctx.store.set_post_meta(
            input.id,
            meta_keys::DESCRIPTION,
            &sanitize_textarea_field(seo_description),
        )?;
        updated.push("seo_description");
    }

    if let Some(focus_keyword) = &input.focus_keyword {
        ctx.store.set_post_meta(
            input.id,
            meta_keys::FOCUS_KEYWORD,
            &sanitize_text_field(focus_keyword),
        )?;
        updated.push("focus_keyword");
    }

    if let Some(robots) = &input.robots {
        // an empty filtered list is still a storable value
        let filtered = RobotsDirective::filter(robots);
        let raw = serde_json::to_string(&filtered).context("failed to encode robots list")?;
        ctx.store.set_post_meta(input.id, meta_keys::ROBOTS, &raw)?;
        updated.push("robots");
    }

    if let Some(canonical_url) = &input.canonical_url {
        if canonical_url.is_empty() {
            ctx.store.delete_post_meta(input.id, meta_keys::CANONICAL_URL)?;
        } else {
            ctx.store.set_post_meta(
                input.id,
                meta_keys::CANONICAL_URL,
                &sanitize_url(canonical_url),
            )?;
        }
        updated.push("canonical_url");
    }

    if let Some(is_pillar) = input.is_pillar {
        if is_pillar {
            ctx.store.set_post_meta(input.id, meta_keys::PILLAR_CONTENT, FLAG_MARKER)?;
        } else {
            ctx.store.delete_post_meta(input.id, meta_keys::PILLAR_CONTENT)?;
        }
        updated.push("is_pillar");
    }

    if let Some(is_cornerstone) = input.is_cornerstone {
        if is_cornerstone {
            ctx.store.set_post_meta(input.id, meta_keys::CORNERSTONE_CONTENT, FLAG_MARKER)?;
        } else {
            ctx.store.delete_post_meta(input.id, meta_keys::CORNERSTONE_CONTENT)?;
        }
        updated.push("is_cornerstone");
    }

    if updated.is_empty() {
        return Err(AbilityError::NoFieldsProvided);
    }

    let message = format!("Updated {} field(s): {}", updated.len(), updated.join(", "));
    encode(&UpdateMetaResponse {
        success: true,
        id: record.id,
        updated,
        url: record.permalink,
        message,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BulkGetMetaInput {
    #[serde(default)]
    post_type: Option<TypeFilter>,
    per_page: Option<i64>,
    page: Option<i64>,
    missing_desc: Option<bool>,
    search: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkItem {
    id: i64,
    title: String,
    post_type: &'static str,
    url: String,
    seo_title: String,
    seo_description: String,
    focus_keyword: String,
}

#[derive(Debug, Serialize)]
struct BulkGetMetaResponse {
    success: bool,
    items: Vec<BulkItem>,
    total: u64,
    page: u32,
    pages: u64,
}

pub(crate) fn bulk_get_meta(
    ctx: &AbilityContext<'_>,
    input: Value,
) -> Result<Value, AbilityError> {
    let input: BulkGetMetaInput = decode(input)?;
    let per_page = clamp_window(input.per_page, 20, 100);
    let page = clamp_page(input.page);
    let missing_desc = input.missing_desc.unwrap_or(false);
    let type_filter = input.post_type.unwrap_or_default();

    // The missing-description condition is evaluated after retrieval, so
    // over-fetch and degrade to a single synthetic page in that mode.
    let fetch_limit = if missing_desc { per_page.saturating_mul(5) } else { per_page };
    let offset = if missing_desc { 0 } else { (page - 1).saturating_mul(per_page) };

    // Callers without edit_others_posts only ever see their own records,
    // enforced in the query itself.
    let author_id =
        (!ctx.caller.can(Capability::EditOthersPosts)).then_some(ctx.caller.user_id);
    let search = input
        .search
        .as_deref()
        .map(sanitize_text_field)
        .filter(|search| !search.is_empty());

    let result = ctx.store.query_posts(&ContentQuery {
        kinds: type_filter.kinds(),
        author_id,
        search,
        limit: fetch_limit,
        offset,
    })?;

    let mut items = Vec::new();
    for record in result.records {
        if !ctx.caller.can_edit_record(&record) {
            continue;
        }
        let seo_description = meta_or_empty(ctx.store, record.id, meta_keys::DESCRIPTION)?;
        if missing_desc && !seo_description.is_empty() {
            continue;
        }
        items.push(BulkItem {
            id: record.id,
            title: record.title,
            post_type: record.kind.as_str(),
            url: record.permalink,
            seo_title: meta_or_empty(ctx.store, record.id, meta_keys::TITLE)?,
            seo_description,
            focus_keyword: meta_or_empty(ctx.store, record.id, meta_keys::FOCUS_KEYWORD)?,
        });
        if items.len() >= per_page as usize {
            break;
        }
    }

    let filtered_total = u64::try_from(items.len()).unwrap_or(u64::MAX);
    let (total, pages, page) = if missing_desc {
        (filtered_total, 1, 1)
    } else {
        (result.total, result.total.div_ceil(u64::from(per_page)), page)
    };
    encode(&BulkGetMetaResponse { success: true, items, total, page, pages })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListOptionsInput {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ListOptionsResponse {
    success: bool,
    options: Vec<String>,
    total: u64,
}

pub(crate) fn list_options(ctx: &AbilityContext<'_>, input: Value) -> Result<Value, AbilityError> {
    let input: ListOptionsInput = decode(input)?;
    let limit = clamp_window(input.limit, 200, 500);
    let offset = u32::try_from(input.offset.unwrap_or(0).max(0)).unwrap_or(u32::MAX);

    // Gather the full window across every allowed prefix, then apply the
    // caller's offset/limit to the merged, ordered set.
    let mut names = std::collections::BTreeSet::new();
    for prefix in &ctx.config.option_policy.allowed_prefixes {
        let window = offset.saturating_add(limit);
        for name in ctx.store.list_option_names(prefix, window, 0)? {
            names.insert(name);
        }
    }
    let options: Vec<String> = names
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect();
    let total = u64::try_from(options.len()).unwrap_or(u64::MAX);
    encode(&ListOptionsResponse { success: true, options, total })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetOptionsInput {
    names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GetOptionsResponse {
    success: bool,
    options: Map<String, Value>,
}

pub(crate) fn get_options(ctx: &AbilityContext<'_>, input: Value) -> Result<Value, AbilityError> {
    let input: GetOptionsInput = decode(input)?;
    if input.names.is_empty() {
        return Err(AbilityError::NoInputProvided(NO_OPTION_NAMES));
    }

    // Requested-but-absent names are omitted, not returned as null.
    let mut options = Map::new();
    for name in input.names {
        if !ctx.config.option_policy.is_allowed(&name) {
            continue;
        }
        if let Some(value) = ctx.store.get_option(&name)? {
            options.insert(name, value);
        }
    }
    encode(&GetOptionsResponse { success: true, options })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateOptionsInput {
    options: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct UpdateOptionsResponse {
    success: bool,
    updated: Vec<String>,
    message: String,
}

pub(crate) fn update_options(
    ctx: &AbilityContext<'_>,
    input: Value,
) -> Result<Value, AbilityError> {
    let input: UpdateOptionsInput = decode(input)?;
    if input.options.is_empty() {
        return Err(AbilityError::NoInputProvided(NO_OPTIONS_TO_UPDATE));
    }

    let mut updated = Vec::new();
    for (name, value) in input.options {
        if !ctx.config.option_policy.is_allowed(&name) {
            continue;
        }
        // values pass through verbatim, no coercion
        ctx.store.set_option(&name, &value)?;
        updated.push(name);
    }
    let message = format!("Updated {} option(s).", updated.len());
    encode(&UpdateOptionsResponse { success: true, updated, message })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogQueryInput {
    per_page: Option<i64>,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct LogPageResponse {
    success: bool,
    items: Vec<Map<String, Value>>,
    total: u64,
    page: u32,
    per_page: u32,
}

fn list_table(ctx: &AbilityContext<'_>, table: &str, input: Value) -> Result<Value, AbilityError> {
    let input: LogQueryInput = decode(input)?;
    let per_page = clamp_window(input.per_page, 20, 200);
    let page = clamp_page(input.page);

    if !ctx.store.table_exists(table)? {
        return Err(AbilityError::TableNotFound(table.to_string()));
    }

    let offset = (page - 1).saturating_mul(per_page);
    let items = ctx.store.read_table_rows(table, per_page, offset)?;
    // total counts only the returned page, a known simplification of the
    // original reader that this contract preserves
    let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
    encode(&LogPageResponse { success: true, items, total, page, per_page })
}

pub(crate) fn list_404_logs(ctx: &AbilityContext<'_>, input: Value) -> Result<Value, AbilityError> {
    list_table(ctx, &ctx.config.log_404_table, input)
}

pub(crate) fn list_redirections(
    ctx: &AbilityContext<'_>,
    input: Value,
) -> Result<Value, AbilityError> {
    list_table(ctx, &ctx.config.redirections_table, input)
}
