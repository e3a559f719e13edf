//! Command-line front end.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use metasearch_core::{Coordinator, RequestCache, SortMode};

use crate::config::MetasearchConfig;
use crate::error::Result;
use crate::preferences::{PreferenceStore, Preferences};
use crate::render::{RenderStyle, render_group};
use crate::server::{SearchServer, ServerState};
use crate::stream::search_groups;

#[derive(Debug, Parser)]
#[command(name = "metasearch", version, about = "One query, many providers", rename_all = "kebab")]
pub struct Args {
    /// Config file. Defaults to `<config dir>/metasearch/config.toml`.
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
    /// Preferences file. Defaults to `<data dir>/metasearch/preferences.json`.
    #[arg(long, value_name = "FILE", global = true)]
    pub preferences: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Search every provider and print groups as they arrive.
    Search {
        /// Query text.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Sort mode: best, recent or az. Defaults to the saved preference.
        #[arg(long, short)]
        sort: Option<SortMode>,
        /// Disable terminal colors.
        #[arg(long)]
        no_color: bool,
    },
    /// List configured providers.
    Engines,
    /// Show or change preferences.
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsCommand>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum PrefsCommand {
    /// Print current preferences.
    Show,
    /// Set the sort mode.
    Sort { mode: SortMode },
    /// Hide a provider, or show it again.
    ToggleEngine { id: String },
    /// Toggle the dark theme.
    ToggleDark,
    /// Toggle a boolean option for one provider, e.g. `jira includeComments`.
    ToggleOption { engine: String, flag: String },
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error for invalid configuration, provider setup failures,
/// server failures or unwritable output.
pub async fn run(args: Args) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(MetasearchConfig::default_config_path);
    let config = MetasearchConfig::load_or_default(&config_path)?;
    config.validate()?;

    let mut store = args
        .preferences
        .clone()
        .map_or_else(PreferenceStore::at_default_path, PreferenceStore::new);
    let mut stdout = std::io::stdout();

    match args.command {
        Command::Serve => serve(&config).await,
        Command::Search {
            query,
            sort,
            no_color,
        } => {
            let prefs = store.load();
            let coordinator = Coordinator::new(
                config.build_registry()?,
                RequestCache::new(config.search.cache_capacity),
                config.search.coordinator_config(),
            )?;
            let sort = sort.unwrap_or(prefs.sort_mode);
            let style = RenderStyle {
                color: !no_color,
                zone: config.display.date_zone()?,
            };
            print_search(&coordinator, &prefs, &query.join(" "), sort, style, &mut stdout)
                .await
                .map(|_| ())
        }
        Command::Engines => {
            let prefs = store.load();
            print_engines(&config.build_registry()?, &prefs, &mut stdout)
        }
        Command::Prefs { action } => {
            apply_prefs(&mut store, action.unwrap_or(PrefsCommand::Show), &mut stdout)
        }
    }
}

async fn serve(config: &MetasearchConfig) -> Result<()> {
    let state = ServerState::new(
        config.build_registry()?,
        RequestCache::new(config.search.cache_capacity),
        config.search.coordinator_config(),
        config.server.footer.clone(),
    );
    let server = SearchServer::start(state, &config.server).await?;

    tokio::select! {
        result = server.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    }
}

/// Run `query` and print each visible group as it is published.
///
/// Returns the number of results printed.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub async fn print_search(
    coordinator: &Coordinator,
    prefs: &Preferences,
    query: &str,
    sort: SortMode,
    style: RenderStyle,
    out: &mut impl Write,
) -> Result<usize> {
    for descriptor in coordinator.registry().list() {
        let options = prefs.options_for(&descriptor.id);
        if !options.is_empty() {
            coordinator.set_provider_options(descriptor.id.clone(), options);
        }
    }

    let Some(groups) = search_groups(coordinator, query) else {
        writeln!(out, "Nothing to search for.")?;
        return Ok(0);
    };
    tokio::pin!(groups);

    let mut total = 0;
    while let Some(group) = groups.next().await {
        if prefs.is_hidden(&group.provider_id) {
            continue;
        }
        total += group.results.len();
        let descriptor = coordinator.registry().descriptor(&group.provider_id);
        writeln!(out, "{}", render_group(&group, descriptor, sort, style))?;
        out.flush()?;
    }

    match total {
        1 => writeln!(out, "1 result")?,
        n => writeln!(out, "{n} results")?,
    }
    Ok(total)
}

fn print_engines(
    registry: &metasearch_core::ProviderRegistry,
    prefs: &Preferences,
    out: &mut impl Write,
) -> Result<()> {
    if registry.is_empty() {
        writeln!(out, "No providers configured.")?;
        return Ok(());
    }
    for descriptor in registry.list() {
        let mut line = format!("{} ({})", descriptor.name, descriptor.id);
        if !descriptor.capabilities.is_empty() {
            let caps: Vec<&str> = descriptor.capabilities.iter().map(|c| c.as_str()).collect();
            line.push_str(&format!(" [{}]", caps.join(", ")));
        }
        if prefs.is_hidden(&descriptor.id) {
            line.push_str(" hidden");
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn apply_prefs(store: &mut PreferenceStore, action: PrefsCommand, out: &mut impl Write) -> Result<()> {
    let mut prefs = store.load();
    match action {
        PrefsCommand::Show => {}
        PrefsCommand::Sort { mode } => prefs.set_sort_mode(mode),
        PrefsCommand::ToggleEngine { id } => {
            prefs.toggle_hidden_engine(&id);
        }
        PrefsCommand::ToggleDark => {
            prefs.toggle_dark();
        }
        PrefsCommand::ToggleOption { engine, flag } => {
            prefs.toggle_option(&engine, &flag);
        }
    }
    store.save(&prefs);
    print_prefs(&prefs, out)
}

fn print_prefs(prefs: &Preferences, out: &mut impl Write) -> Result<()> {
    writeln!(out, "dark: {}", prefs.dark)?;
    writeln!(out, "sort: {}", prefs.sort_mode.id())?;
    if prefs.hidden_engines.is_empty() {
        writeln!(out, "hidden: none")?;
    } else {
        writeln!(out, "hidden: {}", prefs.hidden_engines.join(", "))?;
    }
    for (engine, options) in &prefs.provider_options {
        for (key, value) in options.iter() {
            writeln!(out, "option: {engine}.{key}={value}")?;
        }
    }
    Ok(())
}
