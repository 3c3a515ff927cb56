//! Command-line front end: translate a request and run it against an
//! in-memory store loaded from a seed file.

mod seed;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use parley_dispatch::{DispatchConfig, Dispatcher, MutationMode, render};
use parley_store::{MemoryStore, StoreError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Seed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Parser, Debug)]
#[command(
    name = "parley",
    version,
    about = "Query a document store in plain language",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        env = "PARLEY_SEED",
        value_name = "FILE",
        help = "JSON file of {database: {collection: [documents]}} loaded before the command runs"
    )]
    seed: Option<PathBuf>,

    #[arg(
        long,
        env = "PARLEY_CONFIG",
        value_name = "FILE",
        help = "JSON dispatch config (field sets, stamp fields)"
    )]
    config: Option<PathBuf>,

    #[arg(long, env = "PARLEY_PAGE_SIZE", help = "Maximum documents returned by a find")]
    page_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Target {
    database: String,
    collection: String,
}

#[derive(Args, Debug)]
struct Request {
    #[command(flatten)]
    target: Target,

    #[arg(trailing_var_arg = true, num_args = 0.., help = "Free-form request text or JSON")]
    text: Vec<String>,
}

impl Request {
    fn text(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a read request: documents, a count, or a lookup by id.
    Find(Request),
    /// Count documents; no text counts everything.
    Count(Request),
    /// Fetch one document by its ObjectId.
    Get {
        #[command(flatten)]
        target: Target,
        id: String,
    },
    /// Group, average or sum, or run a JSON pipeline.
    Aggregate(Request),
    /// Insert a document from `field: value` pairs or JSON.
    Insert(Request),
    /// Update a document by id from `field: value` pairs or JSON.
    Update {
        #[command(flatten)]
        target: Target,
        id: String,
        #[arg(trailing_var_arg = true, num_args = 1..)]
        data: Vec<String>,
    },
    /// Delete one document by id.
    Delete {
        #[command(flatten)]
        target: Target,
        id: String,
    },
    /// Delete every document matching a filter. An empty filter is refused.
    DeleteMany(Request),
    /// List user databases.
    Databases,
    /// List the collections of a database.
    Collections { database: String },
    /// Show a collection's size and a sample document.
    Describe(Target),
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<DispatchConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| Error::Config {
                path: path.clone(),
                source,
            })?
        }
        None => DispatchConfig::default(),
    };
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    Ok(config)
}

fn open(cli: &Cli) -> Result<Dispatcher<MemoryStore>, Error> {
    let config = load_config(cli)?;
    let store = MemoryStore::new();
    if let Some(path) = &cli.seed {
        let inserted = seed::apply(&store, seed::load(path)?)?;
        tracing::debug!(path = %path.display(), inserted, "seed loaded");
    }
    Ok(Dispatcher::new(store, config))
}

fn main() -> ExitCode {
    install_tracing_subscriber();
    let cli = Cli::parse();

    let dispatcher = match open(&cli) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let d = &dispatcher;
    let result = match &cli.command {
        Command::Find(req) => d.find(&req.target.database, &req.target.collection, &req.text()),
        Command::Count(req) => d.count(&req.target.database, &req.target.collection, &req.text()),
        Command::Get { target, id } => d.get_by_id(&target.database, &target.collection, id),
        Command::Aggregate(req) => {
            d.aggregate(&req.target.database, &req.target.collection, &req.text())
        }
        Command::Insert(req) => d.mutate(
            &req.target.database,
            &req.target.collection,
            &req.text(),
            &MutationMode::Insert,
        ),
        Command::Update { target, id, data } => d.mutate(
            &target.database,
            &target.collection,
            &data.join(" "),
            &MutationMode::Update { id: id.clone() },
        ),
        Command::Delete { target, id } => d.delete(&target.database, &target.collection, id),
        Command::DeleteMany(req) => {
            d.delete_many(&req.target.database, &req.target.collection, &req.text())
        }
        Command::Databases => d.list_databases(),
        Command::Collections { database } => d.list_collections(database),
        Command::Describe(target) => d.describe_collection(&target.database, &target.collection),
    };

    let failed = result.is_err();
    println!("{}", render(result));
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
