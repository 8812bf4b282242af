use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use papertrail_search::{
    Config, ConfigOverrides, MetaSearchClient, PaperSource, SearchField, SearchRequest,
    SearchResponse, SortBy, SortOrder,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "papertrail")]
#[command(about = "Search scholarly papers across multiple sources")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Shared deadline for one search, in seconds
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search every available source, or the ones given with --source
    Search(SearchArgs),
    /// Look up a paper by composite id, e.g. arxiv_2301.01234
    Get { id: String },
    /// List the sources that are currently available
    Sources,
    /// Probe every registered source
    Health,
    /// Print the JSON Schema of the request and response types
    Schema,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    query: String,

    #[arg(long, default_value_t = 0)]
    start: u32,

    #[arg(long, default_value_t = 10)]
    max_results: u32,

    /// relevance, lastUpdatedDate or submittedDate
    #[arg(long, default_value = "relevance")]
    sort_by: SortBy,

    /// ascending or descending
    #[arg(long, default_value = "descending")]
    sort_order: SortOrder,

    /// Field the query is matched against
    #[arg(long, default_value = "all")]
    field: SearchField,

    /// Data source to include (repeatable)
    #[arg(long = "source")]
    sources: Vec<PaperSource>,

    /// Earliest publication date, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest publication date, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Category filter (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Author filter (repeatable)
    #[arg(long = "author")]
    authors: Vec<String>,

    /// Keep duplicate titles
    #[arg(long)]
    no_dedup: bool,

    /// Query sources one after another instead of in parallel
    #[arg(long)]
    sequential: bool,
}

impl From<SearchArgs> for SearchRequest {
    fn from(args: SearchArgs) -> Self {
        Self {
            sort_by: args.sort_by,
            sort_order: args.sort_order,
            search_field: args.field,
            date_from: args.from,
            date_to: args.to,
            categories: args.categories.into_iter().collect(),
            author_filter: args.authors.into_iter().collect(),
            enable_deduplication: !args.no_dedup,
            enable_parallel_search: !args.sequential,
            ..Self::new(args.query)
                .with_sources(args.sources)
                .with_paging(args.start, args.max_results)
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if config.logging.format == "json" {
        subscriber.with(layer.json()).init();
    } else {
        subscriber.with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        log_level: cli.log_level.clone(),
        log_format: cli.log_format.map(|f| f.as_str().to_string()),
        deadline_secs: cli.deadline_secs,
    };
    let config = Config::load(cli.config.as_deref())
        .and_then(|config| config.apply_overrides(&overrides))
        .context("Failed to load configuration")?;

    init_tracing(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting papertrail");
    debug!(deadline = ?config.deadline(), "Configuration loaded");

    if matches!(cli.command, Command::Schema) {
        return print_json(&serde_json::json!({
            "searchRequest": schemars::schema_for!(SearchRequest),
            "searchResponse": schemars::schema_for!(SearchResponse),
        }));
    }

    let client = MetaSearchClient::from_config(&config)
        .context("Failed to create search client")?;

    match cli.command {
        Command::Search(args) => {
            let request = SearchRequest::from(args);
            let response = client.search_papers(&request).await?;
            print_json(&response)
        }
        Command::Get { id } => {
            let paper = client.get_paper_by_id(&id).await;
            if paper.is_none() {
                info!("No paper found for {}", id);
            }
            print_json(&paper)
        }
        Command::Sources => print_json(&client.list_available_sources().await),
        Command::Health => print_json(&client.health_report().await),
        Command::Schema => Ok(()),
    }
}
