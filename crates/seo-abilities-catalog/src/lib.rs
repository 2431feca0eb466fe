#![forbid(unsafe_code)]

//! The SEO abilities catalog: a fixed registry of named operations, each
//! carrying strict input/output schemas, a required capability tier,
//! side-effect annotations, and a handler. Dispatch validates input against
//! the compiled schema, applies the feature-active and capability gates,
//! and turns every failure into a `success:false` envelope.

mod handlers;
pub mod schemas;

use anyhow::{anyhow, Result};
use jsonschema::JSONSchema;
use seo_abilities_core::{AbilityError, Caller, Capability, HostStore, OptionPolicy};
use serde::Serialize;
use serde_json::{json, Value};

/// What the host process exposes to the catalog at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Whether the host's ability-registration facility is present. When it
    /// is not, the catalog registers nothing.
    pub abilities_api_available: bool,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self { abilities_api_available: true }
    }
}

/// Side-effect class of an ability. Nothing in this catalog is destructive
/// and every operation is idempotent.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AbilityAnnotations {
    pub readonly: bool,
    pub destructive: bool,
    pub idempotent: bool,
}

/// Configuration data the handlers receive explicitly: the option
/// allow-list and the names of the external plugin's log tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub option_policy: OptionPolicy,
    pub log_404_table: String,
    pub redirections_table: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            option_policy: OptionPolicy::default(),
            log_404_table: "rank_math_404_logs".to_string(),
            redirections_table: "rank_math_redirections".to_string(),
        }
    }
}

/// Everything a single invocation runs against. Invocations are stateless
/// and independent; nothing here outlives the call.
pub struct AbilityContext<'a> {
    pub store: &'a dyn HostStore,
    pub caller: &'a Caller,
    pub config: &'a CatalogConfig,
}

type Handler = fn(&AbilityContext<'_>, Value) -> Result<Value, AbilityError>;

/// One registered operation.
pub struct Ability {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub required_capability: Capability,
    /// Record-scoped abilities short-circuit on the feature-active probe
    /// before any permission check runs.
    pub requires_feature: bool,
    pub annotations: AbilityAnnotations,
    pub input_schema: Value,
    pub output_schema: Value,
    compiled_input: JSONSchema,
    handler: Handler,
}

impl Ability {
    fn validate_input(&self, input: &Value) -> Result<(), AbilityError> {
        if let Err(errors) = self.compiled_input.validate(input) {
            let detail = errors.map(|err| err.to_string()).collect::<Vec<_>>().join("; ");
            return Err(AbilityError::InvalidInput(detail));
        }
        Ok(())
    }
}

struct AbilityDef {
    name: &'static str,
    label: &'static str,
    description: &'static str,
    required_capability: Capability,
    requires_feature: bool,
    annotations: AbilityAnnotations,
    input_schema: Value,
    output_schema: Value,
    handler: Handler,
}

const READ_ONLY: AbilityAnnotations =
    AbilityAnnotations { readonly: true, destructive: false, idempotent: true };
const MUTATING: AbilityAnnotations =
    AbilityAnnotations { readonly: false, destructive: false, idempotent: true };

fn catalog_defs() -> Vec<AbilityDef> {
    vec![
        AbilityDef {
            name: "rankmath/get-meta",
            label: "Get Rank Math SEO Meta",
            description: "Get Rank Math SEO meta data for a post or page. Returns title, \
                          description, focus keyword, robots, and other SEO settings.",
            required_capability: Capability::EditPosts,
            requires_feature: true,
            annotations: READ_ONLY,
            input_schema: schemas::get_meta_input(),
            output_schema: schemas::get_meta_output(),
            handler: handlers::get_meta,
        },
        AbilityDef {
            name: "rankmath/update-meta",
            label: "Update Rank Math SEO Meta",
            description: "Update Rank Math SEO meta data for a post or page. Can update title, \
                          description, focus keyword, robots, canonical URL, and content flags.",
            required_capability: Capability::EditPosts,
            requires_feature: true,
            annotations: MUTATING,
            input_schema: schemas::update_meta_input(),
            output_schema: schemas::update_meta_output(),
            handler: handlers::update_meta,
        },
        AbilityDef {
            name: "rankmath/bulk-get-meta",
            label: "Bulk Get Rank Math SEO Meta",
            description: "Get Rank Math SEO meta for multiple posts/pages. Useful for auditing \
                          SEO across content.",
            required_capability: Capability::EditPosts,
            requires_feature: true,
            annotations: READ_ONLY,
            input_schema: schemas::bulk_get_meta_input(),
            output_schema: schemas::bulk_get_meta_output(),
            handler: handlers::bulk_get_meta,
        },
        AbilityDef {
            name: "rankmath/list-options",
            label: "List Rank Math Options",
            description: "List Rank Math option names stored in the site options table.",
            required_capability: Capability::ManageOptions,
            requires_feature: false,
            annotations: READ_ONLY,
            input_schema: schemas::list_options_input(),
            output_schema: schemas::list_options_output(),
            handler: handlers::list_options,
        },
        AbilityDef {
            name: "rankmath/get-options",
            label: "Get Rank Math Options",
            description: "Get values for named Rank Math options.",
            required_capability: Capability::ManageOptions,
            requires_feature: false,
            annotations: READ_ONLY,
            input_schema: schemas::get_options_input(),
            output_schema: schemas::get_options_output(),
            handler: handlers::get_options,
        },
        AbilityDef {
            name: "rankmath/update-options",
            label: "Update Rank Math Options",
            description: "Update named Rank Math options with new values.",
            required_capability: Capability::ManageOptions,
            requires_feature: false,
            annotations: MUTATING,
            input_schema: schemas::update_options_input(),
            output_schema: schemas::update_options_output(),
            handler: handlers::update_options,
        },
        AbilityDef {
            name: "rankmath/list-404-logs",
            label: "List Rank Math 404 Logs",
            description: "List recent 404 log entries recorded by Rank Math's 404 monitor.",
            required_capability: Capability::ManageOptions,
            requires_feature: false,
            annotations: READ_ONLY,
            input_schema: schemas::log_query_input(),
            output_schema: schemas::log_query_output(),
            handler: handlers::list_404_logs,
        },
        AbilityDef {
            name: "rankmath/list-redirections",
            label: "List Rank Math Redirections",
            description: "List redirection rules managed by Rank Math.",
            required_capability: Capability::ManageOptions,
            requires_feature: false,
            annotations: READ_ONLY,
            input_schema: schemas::log_query_input(),
            output_schema: schemas::log_query_output(),
            handler: handlers::list_redirections,
        },
    ]
}

fn forbidden_message(capability: Capability) -> &'static str {
    match capability {
        Capability::EditPosts | Capability::EditOthersPosts => {
            "You do not have permission to edit posts."
        }
        Capability::ManageOptions => "You do not have permission to manage options.",
    }
}

/// The registered catalog. Built once per process, when the host signals
/// initialization; re-registration under the same name is not expected.
pub struct AbilityRegistry {
    abilities: Vec<Ability>,
}

impl AbilityRegistry {
    /// Build the catalog against the host environment. A host without the
    /// ability-registration facility gets an EMPTY registry plus an
    /// admin-visible warning.
    ///
    /// # Errors
    /// Returns an error if an input schema fails to compile.
    pub fn build(env: &HostEnvironment) -> Result<Self> {
        if !env.abilities_api_available {
            tracing::warn!(
                "the Abilities API is not available; the Rank Math SEO abilities catalog \
                 registers nothing"
            );
            return Ok(Self { abilities: Vec::new() });
        }

        let mut abilities = Vec::new();
        for def in catalog_defs() {
            let compiled_input = JSONSchema::compile(&def.input_schema)
                .map_err(|err| anyhow!("failed to compile input schema for {}: {err}", def.name))?;
            abilities.push(Ability {
                name: def.name,
                label: def.label,
                description: def.description,
                required_capability: def.required_capability,
                requires_feature: def.requires_feature,
                annotations: def.annotations,
                input_schema: def.input_schema,
                output_schema: def.output_schema,
                compiled_input,
                handler: def.handler,
            });
        }
        Ok(Self { abilities })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Ability> {
        self.abilities.iter().find(|ability| ability.name == name)
    }

    /// Invoke an ability by name. Every failure, including store I/O,
    /// surfaces as a `success:false` envelope with a message; nothing
    /// propagates as a fault.
    #[must_use]
    pub fn invoke(&self, ctx: &AbilityContext<'_>, name: &str, input: Value) -> Value {
        match self.try_invoke(ctx, name, input) {
            Ok(value) => value,
            Err(err) => json!({ "success": false, "message": err.to_string() }),
        }
    }

    fn try_invoke(
        &self,
        ctx: &AbilityContext<'_>,
        name: &str,
        input: Value,
    ) -> Result<Value, AbilityError> {
        let Some(ability) = self.get(name) else {
            return Err(AbilityError::UnknownAbility(name.to_string()));
        };
        ability.validate_input(&input)?;

        // feature gate runs before any permission check
        if ability.requires_feature && !ctx.store.seo_plugin_active()? {
            return Err(AbilityError::FeatureInactive);
        }
        if !ctx.caller.can(ability.required_capability) {
            return Err(AbilityError::Forbidden(forbidden_message(ability.required_capability)));
        }
        (ability.handler)(ctx, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seo_abilities_core::{ContentKind, ContentStatus, HostStore};
    use seo_abilities_store_sqlite::{NewPost, SqliteHostStore};
    use time::{Duration, OffsetDateTime};

    fn registry() -> AbilityRegistry {
        match AbilityRegistry::build(&HostEnvironment::default()) {
            Ok(registry) => registry,
            Err(err) => panic!("failed to build registry: {err:#}"),
        }
    }

    fn active_store() -> SqliteHostStore {
        let store = match SqliteHostStore::open_in_memory() {
            Ok(store) => store,
            Err(err) => panic!("failed to open store: {err:#}"),
        };
        if let Err(err) = store.migrate() {
            panic!("failed to migrate: {err:#}");
        }
        if let Err(err) = store.activate_seo_plugin("1.0.302") {
            panic!("failed to activate plugin: {err:#}");
        }
        store
    }

    fn insert_post(store: &SqliteHostStore, title: &str, author_id: i64, age_minutes: i64) -> i64 {
        let new_post = NewPost {
            kind: ContentKind::Post,
            status: ContentStatus::Publish,
            title: title.to_string(),
            permalink: format!("https://example.test/{}", title.to_lowercase().replace(' ', "-")),
            author_id,
            modified_at: OffsetDateTime::now_utc() - Duration::minutes(age_minutes),
        };
        match store.insert_post(&new_post) {
            Ok(id) => id,
            Err(err) => panic!("failed to insert post: {err:#}"),
        }
    }

    fn editor() -> Caller {
        Caller::new(1, [Capability::EditPosts])
    }

    fn admin() -> Caller {
        Caller::new(
            99,
            [Capability::EditPosts, Capability::EditOthersPosts, Capability::ManageOptions],
        )
    }

    fn invoke(store: &SqliteHostStore, caller: &Caller, name: &str, input: Value) -> Value {
        let config = CatalogConfig::default();
        let ctx = AbilityContext { store, caller, config: &config };
        registry().invoke(&ctx, name, input)
    }

    fn message(envelope: &Value) -> &str {
        envelope.get("message").and_then(Value::as_str).unwrap_or_default()
    }

    fn is_success(envelope: &Value) -> bool {
        envelope.get("success").and_then(Value::as_bool) == Some(true)
    }

    #[test]
    fn missing_abilities_api_registers_nothing() {
        let registry =
            match AbilityRegistry::build(&HostEnvironment { abilities_api_available: false }) {
                Ok(registry) => registry,
                Err(err) => panic!("build failed: {err:#}"),
            };
        assert!(registry.is_empty());
    }

    #[test]
    fn full_catalog_registers_eight_abilities() {
        let registry = registry();
        assert_eq!(registry.len(), 8);
        assert!(registry.get("rankmath/get-meta").is_some());
        assert!(registry.get("rankmath/list-redirections").is_some());
        assert!(registry.get("rankmath/delete-meta").is_none());
    }

    #[test]
    fn annotations_mark_mutating_operations() {
        let registry = registry();
        for ability in registry.iter() {
            assert!(!ability.annotations.destructive, "{} must not be destructive", ability.name);
            assert!(ability.annotations.idempotent, "{} must be idempotent", ability.name);
        }
        let readonly: Vec<bool> =
            registry.iter().map(|ability| ability.annotations.readonly).collect();
        assert_eq!(readonly.iter().filter(|readonly| !**readonly).count(), 2);
    }

    #[test]
    fn unknown_ability_fails_without_panicking() {
        let store = active_store();
        let result = invoke(&store, &admin(), "rankmath/delete-everything", json!({}));
        assert!(!is_success(&result));
        assert!(message(&result).contains("Unknown ability"));
    }

    #[test]
    fn unknown_input_properties_are_rejected_by_dispatch() {
        let store = active_store();
        let id = insert_post(&store, "Strict", 99, 0);
        let result =
            invoke(&store, &admin(), "rankmath/get-meta", json!({ "id": id, "bogus": true }));
        assert!(!is_success(&result));
        assert!(message(&result).contains("bogus"));
    }

    #[test]
    fn missing_required_id_is_rejected_by_dispatch() {
        let store = active_store();
        let result = invoke(&store, &admin(), "rankmath/get-meta", json!({}));
        assert!(!is_success(&result));
        assert!(message(&result).contains("id"));
    }

    #[test]
    fn out_of_range_per_page_is_rejected_by_the_published_schema() {
        let store = active_store();
        let result =
            invoke(&store, &admin(), "rankmath/bulk-get-meta", json!({ "per_page": 500 }));
        assert!(!is_success(&result));
        assert!(message(&result).contains("maximum"));
    }

    #[test]
    fn feature_gate_runs_before_the_permission_gate() {
        let store = match SqliteHostStore::open_in_memory() {
            Ok(store) => store,
            Err(err) => panic!("failed to open store: {err:#}"),
        };
        if let Err(err) = store.migrate() {
            panic!("failed to migrate: {err:#}");
        }
        // plugin NOT active, caller holds no capabilities at all: the
        // feature message must win
        let nobody = Caller::new(5, []);
        let result = invoke(&store, &nobody, "rankmath/get-meta", json!({ "id": 1 }));
        assert!(!is_success(&result));
        assert_eq!(message(&result), "Rank Math SEO plugin is not active.");
    }

    #[test]
    fn record_lookups_fail_not_found_regardless_of_authorization() {
        let store = active_store();
        for caller in [editor(), admin()] {
            let get = invoke(&store, &caller, "rankmath/get-meta", json!({ "id": 12345 }));
            assert_eq!(message(&get), "Post or page not found with ID: 12345");
            let update = invoke(
                &store,
                &caller,
                "rankmath/update-meta",
                json!({ "id": 12345, "seo_title": "x" }),
            );
            assert_eq!(message(&update), "Post or page not found with ID: 12345");
        }
    }

    #[test]
    fn get_meta_accepts_type_without_constraining_the_lookup() {
        let store = active_store();
        let id = insert_post(&store, "Typed", 1, 0);
        let result =
            invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id, "type": "page" }));
        assert!(is_success(&result));
        assert_eq!(result.get("post_type"), Some(&json!("post")));

        // a foreign record with a mismatched type still reads as a
        // permission refusal, so the parameter reveals nothing about the
        // record's kind
        let foreign = insert_post(&store, "Foreign typed", 42, 0);
        let refused = invoke(
            &store,
            &editor(),
            "rankmath/get-meta",
            json!({ "id": foreign, "type": "page" }),
        );
        assert_eq!(message(&refused), "You do not have permission to access this post.");
    }

    #[test]
    fn get_meta_defaults_unset_attributes() {
        let store = active_store();
        let id = insert_post(&store, "Fresh", 1, 0);
        let result = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert!(is_success(&result));
        assert_eq!(result.get("seo_title"), Some(&json!("")));
        assert_eq!(result.get("seo_description"), Some(&json!("")));
        assert_eq!(result.get("focus_keyword"), Some(&json!("")));
        assert_eq!(result.get("canonical_url"), Some(&json!("")));
        assert_eq!(result.get("robots"), Some(&json!([])));
        assert_eq!(result.get("is_pillar"), Some(&json!(false)));
        assert_eq!(result.get("is_cornerstone"), Some(&json!(false)));
        assert_eq!(result.get("post_type"), Some(&json!("post")));
    }

    #[test]
    fn get_meta_requires_per_record_edit_permission() {
        let store = active_store();
        let foreign = insert_post(&store, "Foreign", 42, 0);
        let result = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": foreign }));
        assert!(!is_success(&result));
        assert_eq!(message(&result), "You do not have permission to access this post.");
    }

    #[test]
    fn update_meta_requires_per_record_edit_permission() {
        let store = active_store();
        let foreign = insert_post(&store, "Foreign", 42, 0);
        let result = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": foreign, "seo_title": "x" }),
        );
        assert_eq!(message(&result), "You do not have permission to edit this post.");
    }

    #[test]
    fn update_meta_sanitizes_and_reports_updated_fields() {
        let store = active_store();
        let id = insert_post(&store, "Sanitize", 1, 0);
        let result = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({
                "id": id,
                "seo_title": "  Best <b>coffee</b>  beans ",
                "seo_description": "Line one\nLine   two",
                "focus_keyword": "coffee, beans"
            }),
        );
        assert!(is_success(&result));
        assert_eq!(
            result.get("updated"),
            Some(&json!(["seo_title", "seo_description", "focus_keyword"]))
        );
        assert_eq!(message(&result), "Updated 3 field(s): seo_title, seo_description, focus_keyword");
        assert_eq!(
            store.get_post_meta(id, "rank_math_title").ok().flatten().as_deref(),
            Some("Best coffee beans")
        );
        assert_eq!(
            store.get_post_meta(id, "rank_math_description").ok().flatten().as_deref(),
            Some("Line one\nLine two")
        );
    }

    #[test]
    fn update_meta_with_no_fields_is_a_validation_failure_after_authz() {
        let store = active_store();
        let id = insert_post(&store, "Empty", 1, 0);
        let result = invoke(&store, &editor(), "rankmath/update-meta", json!({ "id": id }));
        assert!(!is_success(&result));
        assert_eq!(message(&result), "No fields provided to update.");
        assert!(matches!(store.get_post_meta(id, "rank_math_title"), Ok(None)));
    }

    #[test]
    fn robots_are_filtered_to_the_fixed_vocabulary() {
        let store = active_store();
        let id = insert_post(&store, "Robots", 1, 0);
        let result = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "robots": ["index", "bogus", "noindex"] }),
        );
        assert!(is_success(&result));
        // presence, not effect, is what the updated list tracks
        assert_eq!(result.get("updated"), Some(&json!(["robots"])));

        let snapshot = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert_eq!(snapshot.get("robots"), Some(&json!(["index", "noindex"])));
    }

    #[test]
    fn all_invalid_robots_still_store_an_empty_set() {
        let store = active_store();
        let id = insert_post(&store, "NoRobots", 1, 0);
        let result = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "robots": ["bogus"] }),
        );
        assert_eq!(result.get("updated"), Some(&json!(["robots"])));
        let snapshot = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert_eq!(snapshot.get("robots"), Some(&json!([])));
        // the key exists and holds an empty list, it is not merely unset
        assert_eq!(
            store.get_post_meta(id, "rank_math_robots").ok().flatten().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn pillar_flag_round_trips_through_marker_presence() {
        let store = active_store();
        let id = insert_post(&store, "Pillar", 1, 0);

        let set = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "is_pillar": true }),
        );
        assert!(is_success(&set));
        assert_eq!(
            store.get_post_meta(id, "rank_math_pillar_content").ok().flatten().as_deref(),
            Some("on")
        );
        let snapshot = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert_eq!(snapshot.get("is_pillar"), Some(&json!(true)));

        let clear = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "is_pillar": false }),
        );
        assert_eq!(clear.get("updated"), Some(&json!(["is_pillar"])));
        // clearing deletes the key outright, it never stores "off"
        assert!(matches!(store.get_post_meta(id, "rank_math_pillar_content"), Ok(None)));
        let snapshot = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert_eq!(snapshot.get("is_pillar"), Some(&json!(false)));
    }

    #[test]
    fn empty_canonical_url_deletes_the_override() {
        let store = active_store();
        let id = insert_post(&store, "Canonical", 1, 0);

        let set = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "canonical_url": "https://example.test/canonical " }),
        );
        assert!(is_success(&set));
        assert_eq!(
            store.get_post_meta(id, "rank_math_canonical_url").ok().flatten().as_deref(),
            Some("https://example.test/canonical")
        );

        let clear = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "canonical_url": "" }),
        );
        assert_eq!(clear.get("updated"), Some(&json!(["canonical_url"])));
        assert!(matches!(store.get_post_meta(id, "rank_math_canonical_url"), Ok(None)));
        let snapshot = invoke(&store, &editor(), "rankmath/get-meta", json!({ "id": id }));
        assert_eq!(snapshot.get("canonical_url"), Some(&json!("")));
    }

    #[test]
    fn disallowed_canonical_scheme_is_sanitized_to_empty() {
        let store = active_store();
        let id = insert_post(&store, "Scheme", 1, 0);
        let result = invoke(
            &store,
            &editor(),
            "rankmath/update-meta",
            json!({ "id": id, "canonical_url": "javascript:alert(1)" }),
        );
        assert!(is_success(&result));
        // non-empty raw input is not a deletion; the sanitized value is
        // what gets stored, here the empty string
        assert_eq!(
            store.get_post_meta(id, "rank_math_canonical_url").ok().flatten().as_deref(),
            Some("")
        );
    }

    #[test]
    fn bulk_listing_narrows_to_own_records_without_edit_others() {
        let store = active_store();
        insert_post(&store, "Mine one", 1, 1);
        insert_post(&store, "Mine two", 1, 2);
        insert_post(&store, "Theirs", 42, 0);

        let result = invoke(&store, &editor(), "rankmath/bulk-get-meta", json!({}));
        assert!(is_success(&result));
        assert_eq!(result.get("total"), Some(&json!(2)));
        let titles: Vec<&str> = result
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("title").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(titles, vec!["Mine one", "Mine two"]);
    }

    #[test]
    fn bulk_listing_orders_newest_first_and_paginates_real_totals() {
        let store = active_store();
        for index in 0..5 {
            insert_post(&store, &format!("Post {index}"), 99, index);
        }
        let result = invoke(
            &store,
            &admin(),
            "rankmath/bulk-get-meta",
            json!({ "per_page": 2, "page": 2 }),
        );
        assert!(is_success(&result));
        assert_eq!(result.get("total"), Some(&json!(5)));
        assert_eq!(result.get("page"), Some(&json!(2)));
        assert_eq!(result.get("pages"), Some(&json!(3)));
        let titles: Vec<&str> = result
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("title").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(titles, vec!["Post 2", "Post 3"]);
    }

    #[test]
    fn bulk_missing_desc_filters_after_retrieval_and_degrades_pagination() {
        let store = active_store();
        let described = insert_post(&store, "Described", 99, 0);
        insert_post(&store, "Bare one", 99, 1);
        insert_post(&store, "Bare two", 99, 2);
        if let Err(err) = store.set_post_meta(described, "rank_math_description", "has one") {
            panic!("failed to seed description: {err:#}");
        }

        let result = invoke(
            &store,
            &admin(),
            "rankmath/bulk-get-meta",
            json!({ "missing_desc": true, "page": 3 }),
        );
        assert!(is_success(&result));
        // degraded single synthetic page: the requested page number is
        // ignored and pages is always 1 in this mode
        assert_eq!(result.get("page"), Some(&json!(1)));
        assert_eq!(result.get("pages"), Some(&json!(1)));
        assert_eq!(result.get("total"), Some(&json!(2)));
        let items = result.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        assert_eq!(items.len(), 2);
        for item in &items {
            assert_eq!(item.get("seo_description"), Some(&json!("")));
        }
    }

    #[test]
    fn bulk_search_matches_titles() {
        let store = active_store();
        insert_post(&store, "Coffee guide", 99, 0);
        insert_post(&store, "Tea guide", 99, 1);
        let result = invoke(
            &store,
            &admin(),
            "rankmath/bulk-get-meta",
            json!({ "search": "Coffee" }),
        );
        assert_eq!(result.get("total"), Some(&json!(1)));
    }

    #[test]
    fn elevated_operations_refuse_the_editor_tier() {
        let store = active_store();
        if let Err(err) = store.create_plugin_tables() {
            panic!("failed to create plugin tables: {err:#}");
        }
        for (name, input) in [
            ("rankmath/list-options", json!({})),
            ("rankmath/get-options", json!({ "names": ["rank_math_version"] })),
            ("rankmath/update-options", json!({ "options": { "rank_math_x": 1 } })),
            ("rankmath/list-404-logs", json!({})),
            ("rankmath/list-redirections", json!({})),
        ] {
            let result = invoke(&store, &editor(), name, input);
            assert!(!is_success(&result), "{name} must refuse the editor tier");
            assert_eq!(
                message(&result),
                "You do not have permission to manage options.",
                "unexpected refusal message for {name}"
            );
        }
    }

    #[test]
    fn list_options_returns_prefixed_names_in_order() {
        let store = active_store();
        for (name, value) in [
            ("rank_math_titles", json!("a")),
            ("rank_math_general", json!("b")),
            ("siteurl", json!("https://example.test")),
        ] {
            if let Err(err) = store.set_option(name, &value) {
                panic!("failed to seed option: {err:#}");
            }
        }
        let result = invoke(&store, &admin(), "rankmath/list-options", json!({}));
        assert!(is_success(&result));
        assert_eq!(
            result.get("options"),
            Some(&json!(["rank_math_general", "rank_math_titles", "rank_math_version"]))
        );
    }

    #[test]
    fn get_options_skips_disallowed_and_omits_absent_names() {
        let store = active_store();
        if let Err(err) = store.set_option("rank_math_titles", &json!({"sep": "-"})) {
            panic!("failed to seed option: {err:#}");
        }
        let result = invoke(
            &store,
            &admin(),
            "rankmath/get-options",
            json!({ "names": ["rank_math_titles", "siteurl", "rank_math_absent"] }),
        );
        assert!(is_success(&result));
        assert_eq!(result.get("options"), Some(&json!({ "rank_math_titles": {"sep": "-"} })));
    }

    #[test]
    fn get_options_with_no_names_fails_no_input() {
        let store = active_store();
        let result = invoke(&store, &admin(), "rankmath/get-options", json!({ "names": [] }));
        assert!(!is_success(&result));
        assert_eq!(message(&result), "No option names provided.");
    }

    #[test]
    fn update_options_writes_allowed_names_verbatim() {
        let store = active_store();
        let result = invoke(
            &store,
            &admin(),
            "rankmath/update-options",
            json!({ "options": {
                "rank_math_depth": 3,
                "siteurl": "https://evil.test",
                "rank_math_flags": ["a", "b"]
            }}),
        );
        assert!(is_success(&result));
        assert_eq!(result.get("updated"), Some(&json!(["rank_math_depth", "rank_math_flags"])));
        assert_eq!(store.get_option("rank_math_depth").ok().flatten(), Some(json!(3)));
        assert_eq!(store.get_option("rank_math_flags").ok().flatten(), Some(json!(["a", "b"])));
        assert!(matches!(store.get_option("siteurl"), Ok(None)));
    }

    #[test]
    fn update_options_with_empty_map_fails_no_input() {
        let store = active_store();
        let result = invoke(&store, &admin(), "rankmath/update-options", json!({ "options": {} }));
        assert!(!is_success(&result));
        assert_eq!(message(&result), "No options provided to update.");
    }

    #[test]
    fn log_readers_fail_when_the_backing_table_is_absent() {
        let store = active_store();
        for name in ["rankmath/list-404-logs", "rankmath/list-redirections"] {
            let result = invoke(&store, &admin(), name, json!({}));
            assert!(!is_success(&result));
            assert!(message(&result).starts_with("Table not found: rank_math_"));
        }
    }

    #[test]
    fn log_readers_page_descending_and_count_only_the_page() {
        let store = active_store();
        if let Err(err) = store.create_plugin_tables() {
            panic!("failed to create plugin tables: {err:#}");
        }
        for uri in ["/one", "/two", "/three"] {
            if let Err(err) = store.insert_404_log(uri, "crawler") {
                panic!("failed to insert log: {err:#}");
            }
        }
        let result = invoke(
            &store,
            &admin(),
            "rankmath/list-404-logs",
            json!({ "per_page": 2, "page": 1 }),
        );
        assert!(is_success(&result));
        let items = result.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("uri"), Some(&json!("/three")));
        assert_eq!(items[1].get("uri"), Some(&json!("/two")));
        // `total` reflects the returned page only; preserved quirk of the
        // original reader, not the table's grand total
        assert_eq!(result.get("total"), Some(&json!(2)));
    }

    #[test]
    fn redirections_reader_returns_rule_rows() {
        let store = active_store();
        if let Err(err) = store.create_plugin_tables() {
            panic!("failed to create plugin tables: {err:#}");
        }
        if let Err(err) = store.insert_redirection("/old", "https://example.test/new", 301) {
            panic!("failed to insert redirection: {err:#}");
        }
        let result = invoke(&store, &admin(), "rankmath/list-redirections", json!({}));
        assert!(is_success(&result));
        let items = result.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("url_to"), Some(&json!("https://example.test/new")));
        assert_eq!(items[0].get("header_code"), Some(&json!(301)));
    }

    // Handler-level clamps: the published schema rejects out-of-range
    // values at dispatch, so the defensive clamps are exercised directly.
    mod handler_clamps {
        use super::*;

        fn direct(
            store: &SqliteHostStore,
            caller: &Caller,
            handler: super::super::Handler,
            input: Value,
        ) -> Value {
            let config = CatalogConfig::default();
            let ctx = AbilityContext { store, caller, config: &config };
            match handler(&ctx, input) {
                Ok(value) => value,
                Err(err) => json!({ "success": false, "message": err.to_string() }),
            }
        }

        #[test]
        fn bulk_per_page_clamps_to_floor_of_one() {
            let store = active_store();
            insert_post(&store, "One", 99, 0);
            insert_post(&store, "Two", 99, 1);
            let result = direct(
                &store,
                &admin(),
                crate::handlers::bulk_get_meta,
                json!({ "per_page": 0 }),
            );
            assert!(is_success(&result));
            let items = result.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
            assert_eq!(items.len(), 1);
        }

        #[test]
        fn bulk_page_clamps_to_minimum_of_one() {
            let store = active_store();
            insert_post(&store, "Only", 99, 0);
            let result = direct(
                &store,
                &admin(),
                crate::handlers::bulk_get_meta,
                json!({ "page": -3 }),
            );
            assert!(is_success(&result));
            assert_eq!(result.get("page"), Some(&json!(1)));
            assert_eq!(result.get("total"), Some(&json!(1)));
        }

        #[test]
        fn log_per_page_clamps_to_ceiling() {
            let store = active_store();
            if let Err(err) = store.create_plugin_tables() {
                panic!("failed to create plugin tables: {err:#}");
            }
            let result = direct(
                &store,
                &admin(),
                crate::handlers::list_404_logs,
                json!({ "per_page": 100_000 }),
            );
            assert!(is_success(&result));
            assert_eq!(result.get("per_page"), Some(&json!(200)));
        }
    }
}
