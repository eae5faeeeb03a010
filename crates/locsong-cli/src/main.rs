mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use locsong_api::CatalogService;
use locsong_core::config::AppConfig;
use locsong_core::error::LocsongError;
use locsong_runtime::sort::DEFAULT_SORT;
use locsong_runtime::{BrowseSource, FilterKind, Runtime, RuntimeError, WatchPage};

#[derive(Debug, Parser)]
#[command(name = "locsong", version, about = "Browse and watch the OPhim catalog")]
struct Cli {
    /// Config file to use instead of the user config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// `modified.time_desc`, `year_desc` or `year_asc`.
    #[arg(long, default_value = DEFAULT_SORT)]
    sort: String,

    /// Search within the page instead of listing it.
    #[arg(long)]
    query: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hero, top 10 and the home rows.
    Home,
    /// A named list such as `phim-bo` or `phim-moi`.
    List {
        slug: String,
        #[command(flatten)]
        args: ListArgs,
        /// Narrow the list to one category.
        #[arg(long)]
        category: Option<String>,
    },
    Category {
        slug: String,
        #[command(flatten)]
        args: ListArgs,
    },
    Country {
        slug: String,
        #[command(flatten)]
        args: ListArgs,
    },
    Year {
        year: u32,
        #[command(flatten)]
        args: ListArgs,
    },
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Categories, countries or years.
    Filters { kind: FilterArg },
    Detail { slug: String },
    /// Resolve the stream for a title and record the position.
    Watch {
        slug: String,
        #[arg(long)]
        server: Option<usize>,
        #[arg(long)]
        episode: Option<usize>,
    },
    /// Recently watched titles.
    History {
        /// Forget one title.
        #[arg(long)]
        clear: Option<String>,
    },
    /// Print where the user config file lives.
    ConfigPath,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    Categories,
    Countries,
    Years,
}

impl From<FilterArg> for FilterKind {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Categories => FilterKind::Categories,
            FilterArg::Countries => FilterKind::Countries,
            FilterArg::Years => FilterKind::Years,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Config(#[from] LocsongError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("locsong=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("locsong=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, LocsongError> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::ConfigPath = cli.command {
        println!("{}", AppConfig::config_path().display());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let runtime = Runtime::new(config)?;
    let result = execute(&runtime, cli.command, cli.json).await;
    runtime.shutdown();
    result
}

async fn execute(runtime: &Runtime, command: Command, json: bool) -> Result<(), CliError> {
    match command {
        Command::Home => {
            let mut feed = runtime.home();
            let view = feed.settled().await;
            emit(json, &view, render::home)
        }
        Command::List {
            slug,
            args,
            category,
        } => browse(runtime, BrowseSource::List(slug), args, category, json).await,
        Command::Category { slug, args } => {
            browse(runtime, BrowseSource::Category(slug), args, None, json).await
        }
        Command::Country { slug, args } => {
            browse(runtime, BrowseSource::Country(slug), args, None, json).await
        }
        Command::Year { year, args } => {
            browse(runtime, BrowseSource::Year(year), args, None, json).await
        }
        Command::Search { keyword, page } => {
            let mut search = runtime.search(&keyword, page);
            let view = search.settled().await;
            emit(json, &view, render::list)
        }
        Command::Filters { kind } => {
            let filters = runtime.filters(kind.into()).await?;
            emit(json, &*filters, render::filters)
        }
        Command::Detail { slug } => {
            let detail = runtime.detail(&slug).await?;
            emit(json, &detail.item, render::detail)
        }
        Command::Watch {
            slug,
            server,
            episode,
        } => watch(runtime, slug, server, episode, json).await,
        Command::History { clear } => {
            if let Some(slug) = clear {
                runtime.clear_history(&slug);
            }
            emit(json, &runtime.history(), |entries| render::history(entries))
        }
        Command::ConfigPath => Ok(()),
    }
}

async fn browse<A: CatalogService + 'static>(
    runtime: &Runtime<A>,
    source: BrowseSource,
    args: ListArgs,
    category: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let options = runtime
        .browse_options(args.page)
        .await
        .sort(&args.sort)
        .category(category);
    let mut session = runtime.browse(source, options);
    if let Some(query) = args.query {
        session.set_search_text(&query);
        session.submit_search();
    }
    let view = session.settled().await;
    emit(json, &view, render::list)
}

async fn watch<A: CatalogService + 'static>(
    runtime: &Runtime<A>,
    slug: String,
    server: Option<usize>,
    episode: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let mut session = runtime.watch(&slug).await;
    if let WatchPage::Ready(view) = session.settled().await {
        if let Some(server) = server {
            session.select_server(server);
        }
        let episode = match (server, episode) {
            (_, Some(episode)) => episode,
            (Some(_), None) => 0,
            (None, None) => view.episode_index,
        };
        session.select_episode(episode);
    }
    match session.page() {
        WatchPage::NotFound => Err(RuntimeError::NotFound(slug).into()),
        page => emit(json, &page, render::watch),
    }
}
