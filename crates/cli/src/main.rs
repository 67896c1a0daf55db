//! Headless front-end for the skill store: list, inspect, install, update,
//! delete, and publish skills from the command line.

use {
    anyhow::bail,
    clap::{Parser, Subcommand, ValueEnum},
    skilldeck_skills::{
        types::Platform,
        version::{self, BumpKind},
    },
    skilldeck_store::{
        DetailState, HttpRegistryClient, ListState, RegistryClient, SkillStore, SkillshubCli,
    },
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "skilldeck", about = "Skilldeck — manage AI assistant skills")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom state directory for publish records (overrides default).
    #[arg(long, global = true, env = "SKILLDECK_STATE_DIR")]
    state_dir: Option<std::path::PathBuf>,

    /// Registry base URL.
    #[arg(
        long,
        global = true,
        env = "SKILLDECK_REGISTRY",
        default_value = "https://skillshub.ai"
    )]
    registry: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List all discovered skills, grouped across platforms.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show details and the manifest body of a skill.
    Show {
        /// Skill id (`codex:pdf-tools`) or bare slug.
        skill: String,
    },
    /// Install a skill from the registry.
    Install {
        /// Registry slug.
        slug: String,
        /// Pin a version instead of installing the latest.
        #[arg(long)]
        version: Option<String>,
        /// Target platform: codex, claude, opencode, or copilot (repeatable).
        #[arg(long = "platform", value_parser = parse_platform, required = true)]
        platforms: Vec<Platform>,
    },
    /// Update an installed skill in place on every platform it is on.
    Update {
        /// Registry slug.
        slug: String,
        /// Pin a version instead of updating to the latest.
        #[arg(long)]
        version: Option<String>,
    },
    /// Delete skills. A bare slug deletes every installation of it.
    Delete {
        /// Skill ids (`codex:pdf-tools`) or bare slugs.
        #[arg(required = true)]
        skills: Vec<String>,
    },
    /// Publish a locally authored skill through the skillshub CLI.
    Publish {
        /// Skill id (`codex:pdf-tools`) or bare slug.
        skill: String,
        /// Version component to bump.
        #[arg(long, value_enum, default_value_t = BumpArg::Patch)]
        bump: BumpArg,
        /// Changelog entry for this release.
        #[arg(long, default_value = "")]
        changelog: String,
        /// Tag for the release (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Currently published version, when known.
        #[arg(long)]
        published_version: Option<String>,
        /// Publish even when the content is unchanged since the last publish.
        #[arg(long)]
        force: bool,
    },
    /// Show skillshub CLI availability and login state.
    Status,
}

fn parse_platform(key: &str) -> Result<Platform, String> {
    Platform::from_storage_key(key).ok_or_else(|| {
        format!("unknown platform '{key}' (expected codex, claude, opencode, or copilot)")
    })
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BumpArg {
    Major,
    Minor,
    Patch,
}

impl From<BumpArg> for BumpKind {
    fn from(arg: BumpArg) -> Self {
        match arg {
            BumpArg::Major => BumpKind::Major,
            BumpArg::Minor => BumpKind::Minor,
            BumpArg::Patch => BumpKind::Patch,
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "skilldeck starting");

    if let Some(ref dir) = cli.state_dir {
        skilldeck_config::set_state_dir(dir.clone());
    }

    let mut store = SkillStore::new();

    match cli.command {
        Commands::List { json } => {
            load_catalog(&mut store).await?;
            list_skills(&store, json)
        },
        Commands::Show { skill } => {
            load_catalog(&mut store).await?;
            show_skill(&mut store, &skill).await
        },
        Commands::Install {
            slug,
            version,
            platforms,
        } => {
            let client = HttpRegistryClient::new(&cli.registry);
            store
                .install_or_update(&slug, version.as_deref(), &platforms, &client)
                .await?;
            println!("Installed '{slug}'.");
            Ok(())
        },
        Commands::Update { slug, version } => {
            load_catalog(&mut store).await?;
            let client = HttpRegistryClient::new(&cli.registry);
            update_skill(&mut store, &slug, version.as_deref(), &client).await
        },
        Commands::Delete { skills } => {
            load_catalog(&mut store).await?;
            delete_skills(&mut store, &skills).await
        },
        Commands::Publish {
            skill,
            bump,
            changelog,
            tags,
            published_version,
            force,
        } => {
            load_catalog(&mut store).await?;
            publish_skill(
                &store,
                &skill,
                bump.into(),
                &changelog,
                &tags,
                published_version.as_deref(),
                force,
            )
            .await
        },
        Commands::Status => {
            let cli_worker = SkillshubCli::new();
            let status = store.fetch_cli_status(&cli_worker).await;
            if !status.installed {
                println!("skillshub CLI: not installed");
            } else if !status.logged_in {
                println!("skillshub CLI: installed, not logged in");
            } else {
                let user = status.username.as_deref().unwrap_or("unknown");
                println!("skillshub CLI: logged in as {user}");
            }
            if let Some(error) = status.error {
                println!("  warning: {error}");
            }
            Ok(())
        },
    }
}

/// Scan all platform roots, turning a failed scan into a process error.
async fn load_catalog(store: &mut SkillStore) -> anyhow::Result<()> {
    store.load_catalog().await;
    match store.list_state() {
        ListState::Failed(message) => bail!("catalog scan failed: {message}"),
        _ => {
            debug!(count = store.skills().len(), "catalog loaded");
            Ok(())
        },
    }
}

fn list_skills(store: &SkillStore, json: bool) -> anyhow::Result<()> {
    let groups = store.grouped_skills();

    if json {
        let entries: Vec<serde_json::Value> = groups
            .iter()
            .map(|group| {
                serde_json::json!({
                    "id": group.id,
                    "slug": group.skill.name,
                    "name": group.skill.display_name,
                    "description": group.skill.description,
                    "platforms": group
                        .installed_platforms
                        .iter()
                        .map(|p| p.storage_key())
                        .collect::<Vec<_>>(),
                    "owned": store.is_owned(&group.skill),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No skills found.");
        return Ok(());
    }
    for group in &groups {
        let platforms: Vec<&str> = group
            .installed_platforms
            .iter()
            .map(|p| p.storage_key())
            .collect();
        println!(
            "  {} — {} [{}]",
            group.skill.display_name,
            group.skill.description,
            platforms.join(", ")
        );
    }
    Ok(())
}

/// Update an installed slug, skipping the download when the registry's
/// latest version is not newer than the installed one.
async fn update_skill(
    store: &mut SkillStore,
    slug: &str,
    version: Option<&str>,
    client: &dyn RegistryClient,
) -> anyhow::Result<()> {
    if !store.is_installed(slug) {
        println!("'{slug}' is not installed; nothing to update.");
        return Ok(());
    }

    let target = match version {
        Some(version) => version.to_string(),
        None => client.fetch_latest_version(slug).await?,
    };
    let installed = store
        .skills()
        .iter()
        .find(|skill| skill.name == slug)
        .and_then(|skill| store.origin(skill))
        .and_then(|origin| origin.version);
    if let Some(installed) = installed
        && !version::is_newer(&target, &installed)
    {
        println!("'{slug}' is already at {installed}; nothing to update.");
        return Ok(());
    }

    store.update_installed(slug, Some(&target), client).await?;
    println!("Updated '{slug}' to {target}.");
    Ok(())
}

async fn show_skill(store: &mut SkillStore, query: &str) -> anyhow::Result<()> {
    let Some(id) = resolve_skill_id(store, query) else {
        bail!("no skill matches '{query}'");
    };
    store.select_skill(Some(id)).await;

    let Some(skill) = store.selected_skill() else {
        bail!("no skill matches '{query}'");
    };
    println!("Name:        {}", skill.display_name);
    println!("Slug:        {}", skill.name);
    println!("Description: {}", skill.description);
    let platforms: Vec<&str> = store
        .installed_platforms(&skill.name)
        .into_iter()
        .map(|p| p.label())
        .collect();
    println!("Platforms:   {}", platforms.join(", "));
    let stats = skill.stats;
    println!(
        "Contents:    {} reference(s), {} asset(s), {} script(s), {} template(s)",
        stats.references, stats.assets, stats.scripts, stats.templates
    );
    if let Some(origin) = store.origin(skill) {
        let version = origin.version.as_deref().unwrap_or("unknown");
        println!("Origin:      {} (v{version})", origin.slug);
    }
    if !skill.references.is_empty() {
        let names: Vec<&str> = skill.references.iter().map(|r| r.name.as_str()).collect();
        println!("References:  {}", names.join(", "));
    }

    match store.detail_state() {
        DetailState::Loaded => {
            println!();
            println!("{}", store.selected_markdown());
            Ok(())
        },
        DetailState::Missing => bail!("manifest vanished while reading"),
        DetailState::Failed(message) => bail!("could not read manifest: {message}"),
        DetailState::Idle | DetailState::Loading => Ok(()),
    }
}

async fn delete_skills(store: &mut SkillStore, queries: &[String]) -> anyhow::Result<()> {
    let mut ids = Vec::new();
    for query in queries {
        let matched = expand_delete_query(store, query);
        if matched.is_empty() {
            bail!("no skill matches '{query}'");
        }
        ids.extend(matched);
    }

    let count = ids.len();
    store.delete_skills(&ids).await;
    println!("Deleted {count} skill folder(s).");
    Ok(())
}

async fn publish_skill(
    store: &SkillStore,
    query: &str,
    bump: BumpKind,
    changelog: &str,
    tags: &[String],
    published_version: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let Some(skill) = resolve_skill_id(store, query)
        .and_then(|id| store.skills().iter().find(|s| s.id == id))
        .cloned()
    else {
        bail!("no skill matches '{query}'");
    };
    if !store.is_owned(&skill) {
        bail!(
            "'{}' was installed from the registry; only authored skills can be published",
            skill.name
        );
    }
    if !force && !store.check_needs_publish(&skill).await {
        println!("'{}' is unchanged since its last publish.", skill.name);
        return Ok(());
    }

    let cli_worker = SkillshubCli::new();
    store
        .publish(&skill, bump, changelog, tags, published_version, &cli_worker)
        .await?;
    match published_version.and_then(|current| version::bump_version(current, bump)) {
        Some(next) => println!("Published '{}' as {next}.", skill.name),
        None => println!("Published '{}' ({bump} bump).", skill.name),
    }
    Ok(())
}

/// Resolve an exact id, falling back to the preferred installation of a
/// bare slug.
fn resolve_skill_id(store: &SkillStore, query: &str) -> Option<String> {
    if store.skills().iter().any(|skill| skill.id == query) {
        return Some(query.to_string());
    }
    store
        .grouped_skills()
        .into_iter()
        .find(|group| group.skill.name == query)
        .map(|group| group.id)
}

/// A bare slug expands to every installation of it; an id matches itself.
fn expand_delete_query(store: &SkillStore, query: &str) -> Vec<String> {
    if store.skills().iter().any(|skill| skill.id == query) {
        return vec![query.to_string()];
    }
    store
        .grouped_skills()
        .into_iter()
        .find(|group| group.skill.name == query)
        .map(|group| group.delete_ids)
        .unwrap_or_default()
}
