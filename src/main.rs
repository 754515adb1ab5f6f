//! Rateboard - register people and places, rate them, browse the ranking
//!
//! Serves a two-page web dashboard (evaluate + results) backed by Supabase,
//! and exposes the same operations as subcommands for the terminal.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (bad arguments, config, store failure, ...)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod store;
mod web;

use anyhow::{bail, Context, Result};
use cli::{Args, Command, OutputFormat, RankingArgs, RegisterArgs, ReviewArgs, ShowArgs};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{NewReview, NewTarget, TargetId};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so load it first
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("Rateboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.command);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .rateboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Fill in [supabase] url and key to use your project.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
///
/// Also returns the path the configuration came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(CONFIG_FILE_NAME)))),
        None => Ok((Config::default(), None)),
    }
}

/// Dispatch the selected subcommand.
async fn run(args: Args, config: Config) -> Result<()> {
    match args.command {
        Command::Serve(ref serve) => {
            let store = store::connect(&config.supabase, serve.memory)?;
            let addr: SocketAddr = config
                .server
                .bind
                .parse()
                .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;

            println!("🌐 Dashboard: http://{}/", addr);
            web::serve(web::AppState::new(store), addr)
                .await
                .context("Web server failed")?;
            Ok(())
        }
        Command::Register(ref register) => {
            let store = store::connect(&config.supabase, false)?;
            handle_register(store.as_ref(), register).await
        }
        Command::Review(ref review) => {
            let store = store::connect(&config.supabase, false)?;
            handle_review(store.as_ref(), review).await
        }
        Command::Targets => {
            let store = store::connect(&config.supabase, false)?;
            let targets = store.list_targets().await?;
            print!("{}", report::generate_targets_table(&targets));
            Ok(())
        }
        Command::Ranking(ref ranking) => {
            let store = store::connect(&config.supabase, false)?;
            handle_ranking(store, ranking, args.quiet).await
        }
        Command::Show(ref show) => {
            let store = store::connect(&config.supabase, false)?;
            handle_show(store, show, args.quiet).await
        }
        Command::InitConfig => unreachable!("init-config is handled before loading config"),
    }
}

async fn handle_register(store: &dyn Store, register: &RegisterArgs) -> Result<()> {
    let new_target = NewTarget::new(&register.name, register.role, &register.department)?;
    let target = store
        .insert_target(&new_target)
        .await
        .context("Failed to register")?;

    info!("Registered target {} ({})", target.id, target.name);
    println!(
        "✅ {} registered successfully! (id {}, {})",
        target.name, target.id, target.role
    );
    Ok(())
}

async fn handle_review(store: &dyn Store, review: &ReviewArgs) -> Result<()> {
    let target_id = match (review.target_id, review.target.as_deref()) {
        (Some(id), _) => id,
        (None, Some(name)) => resolve_target(store, name).await?,
        (None, None) => bail!("Pass --target or --target-id"),
    };

    let new_review = NewReview::new(target_id, review.rating, &review.comment);
    let stored = store
        .insert_review(&new_review)
        .await
        .context("Failed to submit")?;

    info!("Stored review {} for target {}", stored.id, stored.target_id);
    println!(
        "✅ Review submitted! 🚀 ({}/5 {})",
        stored.rating,
        stored.rating.tone().emoji()
    );
    Ok(())
}

/// Find the id of the single target called `name`.
async fn resolve_target(store: &dyn Store, name: &str) -> Result<TargetId> {
    let name = name.trim();
    let matches: Vec<TargetId> = store
        .list_targets()
        .await?
        .into_iter()
        .filter(|t| t.name == name)
        .map(|t| t.id)
        .collect();

    match matches.as_slice() {
        [] => bail!(
            "No target named '{}'. Run `rateboard targets` to see who is registered.",
            name
        ),
        [id] => Ok(*id),
        ids => bail!(
            "{} targets are named '{}' (ids {:?}); pick one with --target-id",
            ids.len(),
            name,
            ids
        ),
    }
}

async fn handle_ranking(store: Arc<dyn Store>, ranking: &RankingArgs, quiet: bool) -> Result<()> {
    let filter = parse_filter(ranking.category.as_deref())?;

    let spinner = spinner(quiet);
    let dashboard = analysis::load_dashboard(store.as_ref(), filter).await;
    spinner.finish_and_clear();
    let dashboard = dashboard?;

    let output = match ranking.format {
        OutputFormat::Json => report::generate_json_dashboard(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_dashboard(&dashboard),
    };

    match ranking.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Ranking saved to: {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

async fn handle_show(store: Arc<dyn Store>, show: &ShowArgs, quiet: bool) -> Result<()> {
    let filter = parse_filter(show.category.as_deref())?;

    let spinner = spinner(quiet);
    let dashboard = analysis::load_dashboard(store.as_ref(), filter).await;
    spinner.finish_and_clear();

    let view = match dashboard? {
        analysis::Dashboard::NoTargets => bail!("No targets registered yet."),
        analysis::Dashboard::NoReviews => bail!("There are no reviews yet."),
        analysis::Dashboard::Ready(view) => view,
    };

    let Some(detail) = view.detail(show.name.trim()) else {
        bail!("No reviews for '{}' in category {}", show.name.trim(), filter);
    };

    let output = match show.format {
        OutputFormat::Json => report::generate_json_detail(&detail)?,
        OutputFormat::Markdown => report::generate_markdown_detail(&detail),
    };
    print!("{}", output);

    Ok(())
}

fn parse_filter(category: Option<&str>) -> Result<analysis::CategoryFilter> {
    Ok(category.unwrap_or("All").parse()?)
}

/// Spinner shown on stderr while both tables are fetched.
fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Updating data...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Role;
    use store::MemoryStore;

    async fn register(store: &MemoryStore, name: &str) -> TargetId {
        store
            .insert_target(&NewTarget::new(name, Role::Student, "").unwrap())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_resolve_target_by_name() {
        let store = MemoryStore::new();
        let id = register(&store, "Carlos").await;
        register(&store, "Dora").await;

        assert_eq!(resolve_target(&store, " Carlos ").await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_resolve_target_missing_or_ambiguous() {
        let store = MemoryStore::new();
        register(&store, "Ana").await;
        register(&store, "Ana").await;

        let err = resolve_target(&store, "Zeca").await.unwrap_err();
        assert!(err.to_string().contains("No target named 'Zeca'"));

        let err = resolve_target(&store, "Ana").await.unwrap_err();
        assert!(err.to_string().contains("--target-id"));
    }

    #[test]
    fn test_parse_filter_defaults_to_all() {
        assert_eq!(parse_filter(None).unwrap(), analysis::CategoryFilter::All);
        assert_eq!(
            parse_filter(Some("Professor")).unwrap(),
            analysis::CategoryFilter::Only(Role::Professor)
        );
        assert!(parse_filter(Some("Reitoria")).is_err());
    }
}
