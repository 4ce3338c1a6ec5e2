use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use solrgate::query::{FuzzyQuerySpec, SortExpression, TableQuery};
use solrgate::schema::{SchemaLoader, SchemaProvider, SchemaRegistry};
use solrgate::{Config, SolrConnector, Table};

#[derive(Parser, Debug)]
#[command(name = "solrgate")]
#[command(about = "Query and index Apache Solr cores through caller-defined schemas")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.solrgate/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of *.yaml schema definitions, overrides the config file
    #[arg(long, global = true)]
    schemas_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every query subcommand
#[derive(Args, Debug)]
struct QueryArgs {
    /// Core/index name
    #[arg(long)]
    core: String,

    /// Solr query string, passed through verbatim
    #[arg(short, long)]
    query: Option<String>,

    /// Sort expression, e.g. '{"sorts":[{"fieldName":"price","isAscending":false}]}'
    #[arg(long)]
    sort: Option<String>,

    /// Schema used to shape the results
    #[arg(short, long)]
    schema: String,
}

/// `[start, stop)` result window
#[derive(Args, Debug)]
struct WindowArgs {
    /// fq parameter, passed through verbatim
    #[arg(long)]
    filter: Option<String>,

    #[arg(long)]
    start: i64,

    #[arg(long)]
    stop: i64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the number of matching documents
    Count {
        #[command(flatten)]
        query: QueryArgs,

        /// fq parameter, passed through verbatim
        #[arg(long)]
        filter: Option<String>,
    },

    /// Search with a row cap and an optional post-fetch table filter
    Search {
        #[command(flatten)]
        query: QueryArgs,

        /// Table query applied to the fetched rows, e.g. '{"filters":{"type":"EQ","fieldName":"inStock","value":true}}'
        #[arg(long)]
        post_filter: Option<String>,

        /// Maximum rows to return (default 500)
        #[arg(long)]
        max_rows: Option<usize>,
    },

    /// Search returning up to 500 rows with optional similarity expansion
    Boosted {
        #[command(flatten)]
        query: QueryArgs,

        /// fq parameter, passed through verbatim
        #[arg(long)]
        filter: Option<String>,

        /// Enable "more like this" similarity
        #[arg(long)]
        similarity: bool,

        /// Fields and boosts, e.g. "title^2 subject"
        #[arg(long, default_value = "")]
        boost_fields: String,
    },

    /// Fetch rows [start, stop)
    Paged {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Fetch rows [start, stop) with matches highlighted
    Highlight {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Fuzzy term search
    Fuzzy {
        #[arg(long)]
        core: String,

        #[arg(short, long)]
        schema: String,

        /// Field to match against
        #[arg(long)]
        field: String,

        #[arg(long)]
        default_field: String,

        #[arg(long)]
        term: String,

        #[arg(long, default_value = "0")]
        prefix_length: String,

        #[arg(long, default_value = "2")]
        max_edits: String,

        #[arg(long, default_value = "50")]
        max_expansions: String,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        transpositions: bool,
    },

    /// Index one document given as a JSON object
    Index {
        #[arg(long)]
        core: String,

        /// Document fields, e.g. '{"id":"1","title":"Widget"}'
        #[arg(short, long)]
        document: String,
    },

    /// Index every object of a JSON array file, shaped by a schema
    IndexBulk {
        #[arg(long)]
        core: String,

        #[arg(short, long)]
        schema: String,

        /// JSON file holding an array of objects
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Merge the core's field catalogue into a schema and save it
    SyncSchema {
        #[arg(long)]
        core: String,

        #[arg(short, long)]
        schema: String,
    },
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.logging.format.clone());

    // Logs go to stderr so stdout stays machine-readable
    let layer = if format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_or_create(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading default config")?,
    };
    if let Some(dir) = &cli.schemas_dir {
        config.schemas_dir = dir.clone();
    }
    Ok(config)
}

fn parse_sort(raw: Option<&str>) -> Result<Option<SortExpression>> {
    raw.map(|s| SortExpression::from_json(s).context("invalid sort expression"))
        .transpose()
}

fn print_table(table: &Table) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&table.to_documents())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    std::fs::create_dir_all(&config.schemas_dir)
        .with_context(|| format!("creating {}", config.schemas_dir.display()))?;
    let loader = SchemaLoader::new(&config.schemas_dir);
    let registry = Arc::new(SchemaRegistry::with_schemas(loader.load_all()?));
    tracing::debug!(schemas = ?registry.names(), "Loaded schemas");

    let connector = SolrConnector::from_config(&config, registry.clone());

    match cli.command {
        Commands::Count { query, filter } => {
            let sort = parse_sort(query.sort.as_deref())?;
            let count = connector
                .count_matches(
                    &query.core,
                    query.query.as_deref(),
                    sort.as_ref(),
                    filter.as_deref(),
                    &query.schema,
                )
                .await?;
            println!("{}", count);
        }
        Commands::Search {
            query,
            post_filter,
            max_rows,
        } => {
            let sort = parse_sort(query.sort.as_deref())?;
            let post_filter = post_filter
                .as_deref()
                .map(|f| TableQuery::from_json(f).context("invalid post filter"))
                .transpose()?;
            let table = connector
                .search(
                    &query.core,
                    query.query.as_deref(),
                    sort.as_ref(),
                    post_filter.as_ref(),
                    &query.schema,
                    max_rows,
                )
                .await?;
            print_table(&table)?;
        }
        Commands::Boosted {
            query,
            filter,
            similarity,
            boost_fields,
        } => {
            let sort = parse_sort(query.sort.as_deref())?;
            let table = connector
                .boosted_search(
                    &query.core,
                    query.query.as_deref(),
                    sort.as_ref(),
                    filter.as_deref(),
                    &query.schema,
                    similarity,
                    &boost_fields,
                )
                .await?;
            print_table(&table)?;
        }
        Commands::Paged { query, window } => {
            let sort = parse_sort(query.sort.as_deref())?;
            let table = connector
                .paged_search(
                    &query.core,
                    query.query.as_deref(),
                    sort.as_ref(),
                    window.filter.as_deref(),
                    &query.schema,
                    window.start,
                    window.stop,
                )
                .await?;
            print_table(&table)?;
        }
        Commands::Highlight { query, window } => {
            let sort = parse_sort(query.sort.as_deref())?;
            let table = connector
                .paged_highlighted_search(
                    &query.core,
                    query.query.as_deref(),
                    sort.as_ref(),
                    window.filter.as_deref(),
                    &query.schema,
                    window.start,
                    window.stop,
                )
                .await?;
            print_table(&table)?;
        }
        Commands::Fuzzy {
            core,
            schema,
            field,
            default_field,
            term,
            prefix_length,
            max_edits,
            max_expansions,
            transpositions,
        } => {
            let spec = FuzzyQuerySpec::parse(
                &field,
                &default_field,
                &term,
                &prefix_length,
                &max_edits,
                &max_expansions,
                transpositions,
            )?;
            let table = connector.fuzzy_search(&core, &schema, &spec).await?;
            print_table(&table)?;
        }
        Commands::Index { core, document } => {
            let fields: Map<String, Value> =
                serde_json::from_str(&document).context("document must be a JSON object")?;
            connector.index_document(&core, &fields).await?;
        }
        Commands::IndexBulk { core, schema, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let objects: Vec<Map<String, Value>> =
                serde_json::from_str(&content).context("file must hold a JSON array of objects")?;
            let table = Table::from_json_rows(registry.lookup(&schema)?, &objects)?;
            connector.index_documents(&core, &table).await?;
            tracing::info!(core = %core, rows = table.len(), "Bulk index complete");
        }
        Commands::SyncSchema { core, schema } => {
            let table = connector.sync_schema(&core, &schema).await?;
            let path = loader.save_schema(table.schema())?;
            tracing::info!(schema = %schema, path = %path.display(), "Saved schema");
            println!("{}", serde_json::to_string_pretty(table.schema())?);
        }
    }

    Ok(())
}
