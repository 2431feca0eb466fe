//! Command-line surface for the SEO abilities catalog.
//!
//! Host runtimes embed the catalog through:
//! - [`run_cli`] for full parsed CLI execution.
//! - [`seo_abilities_catalog::AbilityRegistry::invoke`] against their own
//!   store and caller.
//!
//! The binary exists for local inspection and scripted invocation; the
//! caller identity is assembled from `--user-id` and repeated
//! `--capability` flags, so permission behavior can be exercised end to
//! end from a shell.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use seo_abilities_catalog::{AbilityContext, AbilityRegistry, CatalogConfig, HostEnvironment};
use seo_abilities_core::{meta_keys, Caller, Capability, ContentKind, ContentStatus, HostStore};
use seo_abilities_store_sqlite::{NewPost, SqliteHostStore};
use serde_json::json;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Parser)]
#[command(name = "seoab")]
#[command(about = "SEO abilities catalog CLI")]
pub struct Cli {
    #[arg(long, default_value = "./seo_abilities.sqlite3")]
    db: PathBuf,

    /// Acting user for permission checks.
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// Capability granted to the acting user; repeat for several.
    #[arg(long = "capability")]
    capabilities: Vec<CapabilityArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Init(InitArgs),
    Seed,
    Abilities {
        #[command(subcommand)]
        command: Box<AbilitiesCommand>,
    },
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Also create the 404-log and redirection tables.
    #[arg(long)]
    plugin_tables: bool,
    #[arg(long, default_value = "1.0.302")]
    plugin_version: String,
}

#[derive(Debug, Subcommand)]
pub enum AbilitiesCommand {
    List(ListArgs),
    Describe(DescribeArgs),
    Invoke(InvokeArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    name: String,
}

#[derive(Debug, Args)]
pub struct InvokeArgs {
    name: String,
    #[arg(long, default_value = "{}")]
    input_json: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CapabilityArg {
    EditPosts,
    EditOthersPosts,
    ManageOptions,
}

fn map_capability(value: CapabilityArg) -> Capability {
    match value {
        CapabilityArg::EditPosts => Capability::EditPosts,
        CapabilityArg::EditOthersPosts => Capability::EditOthersPosts,
        CapabilityArg::ManageOptions => Capability::ManageOptions,
    }
}

/// Executes the parsed top-level CLI command graph.
///
/// # Errors
/// Returns an error when the database cannot be opened or migrated, or the
/// requested command fails.
pub fn run_cli(cli: Cli) -> Result<()> {
    let store = SqliteHostStore::open(&cli.db)?;
    store.migrate()?;
    match cli.command {
        Command::Init(args) => run_init(&store, &args),
        Command::Seed => run_seed(&store),
        Command::Abilities { command } => {
            let caller =
                Caller::new(cli.user_id, cli.capabilities.iter().copied().map(map_capability));
            run_abilities(*command, &store, &caller)
        }
    }
}

fn run_init(store: &SqliteHostStore, args: &InitArgs) -> Result<()> {
    store.activate_seo_plugin(&args.plugin_version)?;
    if args.plugin_tables {
        store.create_plugin_tables()?;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "initialized": true,
            "plugin_version": args.plugin_version,
            "plugin_tables": args.plugin_tables,
        }))?
    );
    Ok(())
}

fn run_seed(store: &SqliteHostStore) -> Result<()> {
    store.activate_seo_plugin("1.0.302")?;
    store.create_plugin_tables()?;

    let now = OffsetDateTime::now_utc();
    let fixtures = [
        ("Hello world", ContentKind::Post, 1_i64, 30_i64),
        ("About us", ContentKind::Page, 1, 20),
        ("Guest article", ContentKind::Post, 2, 10),
    ];
    let mut post_ids = Vec::new();
    for (title, kind, author_id, age_minutes) in fixtures {
        let permalink =
            format!("https://example.test/{}", title.to_lowercase().replace(' ', "-"));
        let id = store.insert_post(&NewPost {
            kind,
            status: ContentStatus::Publish,
            title: title.to_string(),
            permalink,
            author_id,
            modified_at: now - Duration::minutes(age_minutes),
        })?;
        post_ids.push(id);
    }
    store.set_post_meta(post_ids[0], meta_keys::TITLE, "Hello world %sep% %sitename%")?;
    store.set_post_meta(post_ids[0], meta_keys::FOCUS_KEYWORD, "hello")?;
    store.set_option("rank_math_titles", &json!({ "title_separator": "-" }))?;
    store.insert_404_log("/missing-page", "demo-agent")?;
    store.insert_redirection("/old-url", "https://example.test/new-url", 301)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "seeded": true,
            "post_ids": post_ids,
        }))?
    );
    Ok(())
}

fn run_abilities(
    command: AbilitiesCommand,
    store: &SqliteHostStore,
    caller: &Caller,
) -> Result<()> {
    let registry = AbilityRegistry::build(&HostEnvironment::default())?;
    match command {
        AbilitiesCommand::List(args) => {
            if args.json {
                let listing: Vec<_> = registry
                    .iter()
                    .map(|ability| {
                        json!({
                            "name": ability.name,
                            "label": ability.label,
                            "capability": ability.required_capability.as_str(),
                            "requires_feature": ability.requires_feature,
                            "readonly": ability.annotations.readonly,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print_ability_table(&registry);
            }
            Ok(())
        }
        AbilitiesCommand::Describe(args) => {
            let ability = registry
                .get(&args.name)
                .ok_or_else(|| anyhow!("unknown ability: {}", args.name))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "name": ability.name,
                    "label": ability.label,
                    "description": ability.description,
                    "capability": ability.required_capability.as_str(),
                    "requires_feature": ability.requires_feature,
                    "annotations": ability.annotations,
                    "input_schema": ability.input_schema,
                    "output_schema": ability.output_schema,
                }))?
            );
            Ok(())
        }
        AbilitiesCommand::Invoke(args) => {
            let input = parse_input_json(&args.input_json)?;
            let config = CatalogConfig::default();
            let ctx = AbilityContext { store, caller, config: &config };
            let output = registry.invoke(&ctx, &args.name, input);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn print_ability_table(registry: &AbilityRegistry) {
    println!("{:<28} {:<16} {:<9} label", "name", "capability", "readonly");
    println!("{}", "-".repeat(86));
    for ability in registry.iter() {
        println!(
            "{:<28} {:<16} {:<9} {}",
            ability.name,
            ability.required_capability.as_str(),
            if ability.annotations.readonly { "yes" } else { "no" },
            ability.label
        );
    }
}

fn parse_input_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("input_json must be valid JSON: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use ulid::Ulid;

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err:#}"),
        }
    }

    fn execute_cli(args: Vec<String>) -> Result<()> {
        let cli = Cli::try_parse_from(args)?;
        run_cli(cli)
    }

    #[test]
    fn parse_input_accepts_valid_json() {
        let value = must(parse_input_json(r#"{"id":1}"#));
        assert_eq!(value["id"], json!(1));
    }

    #[test]
    fn parse_input_rejects_invalid_json() {
        assert!(parse_input_json("{").is_err());
    }

    #[test]
    fn capability_flags_map_onto_the_core_vocabulary() {
        assert_eq!(map_capability(CapabilityArg::EditPosts), Capability::EditPosts);
        assert_eq!(map_capability(CapabilityArg::ManageOptions), Capability::ManageOptions);
    }

    #[test]
    fn cli_end_to_end_init_seed_list_and_invoke() {
        let db_path = std::env::temp_dir().join(format!("seo-abilities-cli-{}.sqlite3", Ulid::new()));
        let db = match db_path.to_str() {
            Some(value) => value.to_string(),
            None => panic!("temp db path must be valid UTF-8"),
        };

        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "init".to_string(),
            "--plugin-tables".to_string(),
        ]));
        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "seed".to_string(),
        ]));
        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "abilities".to_string(),
            "list".to_string(),
            "--json".to_string(),
        ]));
        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "abilities".to_string(),
            "describe".to_string(),
            "rankmath/get-meta".to_string(),
        ]));

        // invocation failures surface as printed envelopes, not process errors
        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "--user-id".to_string(),
            "1".to_string(),
            "--capability".to_string(),
            "edit-posts".to_string(),
            "abilities".to_string(),
            "invoke".to_string(),
            "rankmath/get-meta".to_string(),
            "--input-json".to_string(),
            r#"{"id":1}"#.to_string(),
        ]));
        must(execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db.clone(),
            "--capability".to_string(),
            "manage-options".to_string(),
            "abilities".to_string(),
            "invoke".to_string(),
            "rankmath/list-options".to_string(),
        ]));

        let _ = fs::remove_file(&db_path);
    }

    #[test]
    fn describe_unknown_ability_is_an_error() {
        let db_path =
            std::env::temp_dir().join(format!("seo-abilities-cli-{}.sqlite3", Ulid::new()));
        let db = match db_path.to_str() {
            Some(value) => value.to_string(),
            None => panic!("temp db path must be valid UTF-8"),
        };
        let result = execute_cli(vec![
            "seoab".to_string(),
            "--db".to_string(),
            db,
            "abilities".to_string(),
            "describe".to_string(),
            "rankmath/no-such-thing".to_string(),
        ]);
        assert!(result.is_err());
        let _ = fs::remove_file(&db_path);
    }
}
