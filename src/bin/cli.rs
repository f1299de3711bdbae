//! FractalKV CLI
//!
//! Command-line access to a store of schemaless JSON documents. Every
//! document must carry a string `"key"` field.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use fractalkv::{Collection, Config, Engine, FieldPatch, JsonDocument, ReduceLeft, DEFAULT_LIMIT};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// FractalKV CLI
#[derive(Parser, Debug)]
#[command(name = "fractalkv-cli")]
#[command(about = "CLI for the FractalKV embedded document store")]
#[command(version)]
struct Args {
    /// Store root directory
    #[arg(short, long, default_value = "./FractalDB")]
    root: PathBuf,

    /// Collection to operate on
    #[arg(short, long, default_value = "Documents")]
    collection: String,

    /// Leading hash digits to discard (0, 2, 4 or 6)
    #[arg(long, default_value = "6")]
    reduce_left: u8,

    /// Scan worker threads (defaults to available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// `--field name --equals value` filter; no field matches everything
#[derive(ClapArgs, Debug)]
struct Filter {
    /// Top-level field to compare
    #[arg(long)]
    field: Option<String>,

    /// Expected value (parsed as JSON, falling back to a plain string)
    #[arg(long, requires = "field")]
    equals: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a JSON document
    Put {
        /// Document, e.g. '{"key":"alice","age":30}'
        json: String,
    },

    /// Get a document by key
    Get {
        /// The key to get
        key: String,
    },

    /// Check whether a key exists
    Has {
        /// The key to check
        key: String,
    },

    /// Replace an existing document
    Update {
        /// Document with the same key as the stored one
        json: String,
    },

    /// Delete a document by key
    Del {
        /// The key to delete
        key: String,
    },

    /// Find documents by field value
    Find {
        #[command(flatten)]
        filter: Filter,

        /// Page size
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Count documents by full scan
    Count {
        #[command(flatten)]
        filter: Filter,
    },

    /// Document count from collection metadata
    EstimatedCount,

    /// Delete all matching documents
    DeleteMany {
        #[command(flatten)]
        filter: Filter,
    },

    /// Set fields on all matching documents
    UpdateMany {
        #[command(flatten)]
        filter: Filter,

        /// Field assignment, e.g. --set age=31 (repeatable)
        #[arg(long = "set", required = true)]
        assignments: Vec<String>,
    },

    /// Print the leaf file a key resolves to
    Path {
        /// The key to resolve
        key: String,
    },

    /// List collections
    Collections,

    /// Delete a collection
    Drop {
        /// Collection name
        name: String,
    },

    /// Delete the whole store
    Napalm,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,fractalkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> fractalkv::Result<()> {
    let mut builder = Config::builder()
        .root(&args.root)
        .reduce_left(ReduceLeft::try_from(args.reduce_left)?);
    if let Some(workers) = args.workers {
        builder = builder.max_workers(workers);
    }
    let engine = Engine::open(builder.build())?;

    tracing::debug!("FractalKV CLI v{}", fractalkv::VERSION);

    let collection = args.collection;
    let open = || -> fractalkv::Result<Collection<JsonDocument>> { engine.open_collection(&collection) };

    match args.command {
        Commands::Put { json } => {
            open()?.add_doc(&JsonDocument::parse(&json)?)?;
            println!("OK");
        }
        Commands::Get { key } => print_doc(&open()?.get_doc(&key)?)?,
        Commands::Has { key } => println!("{}", open()?.has_key(&key)?),
        Commands::Update { json } => {
            open()?.update_doc(&JsonDocument::parse(&json)?)?;
            println!("OK");
        }
        Commands::Del { key } => {
            open()?.delete_doc(&key)?;
            println!("OK");
        }
        Commands::Find {
            filter,
            limit,
            page,
        } => match open()?.find_many(filter.predicate(), limit, page)? {
            Some(found) => {
                for doc in &found {
                    print_doc(doc)?;
                }
            }
            None => println!("(no documents)"),
        },
        Commands::Count { filter } => println!("{}", open()?.count_documents(filter.predicate())?),
        Commands::EstimatedCount => println!("{}", open()?.estimated_document_count()?),
        Commands::DeleteMany { filter } => println!("{}", open()?.delete_many(filter.predicate())?),
        Commands::UpdateMany {
            filter,
            assignments,
        } => {
            let fields = parse_assignments(&assignments)?;
            println!("{}", open()?.update_many(filter.predicate(), &fields)?);
        }
        Commands::Path { key } => {
            let (path, prepared_key) = open()?.leaf_path(&key)?;
            println!("{} ({})", path.display(), prepared_key);
        }
        Commands::Collections => {
            for name in engine.list_collections()? {
                println!("{}", name);
            }
        }
        Commands::Drop { name } => {
            engine.delete_collection(&name)?;
            println!("OK");
        }
        Commands::Napalm => {
            engine.napalm()?;
            println!("OK");
        }
    }

    Ok(())
}

impl Filter {
    fn predicate(&self) -> impl Fn(&JsonDocument) -> bool + Sync {
        let field = self.field.clone();
        let expected = self.equals.as_deref().map(parse_value);
        move |doc: &JsonDocument| match (&field, &expected) {
            (None, _) => true,
            (Some(field), Some(expected)) => doc.field(field) == Some(expected),
            (Some(field), None) => doc.field(field).is_some(),
        }
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_assignments(assignments: &[String]) -> fractalkv::Result<FieldPatch> {
    let mut fields = FieldPatch::new();
    for assignment in assignments {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            fractalkv::FractalError::InvalidArgument(format!(
                "expected name=value, got `{}`",
                assignment
            ))
        })?;
        fields.insert(name.to_string(), parse_value(value));
    }
    Ok(fields)
}

fn print_doc(doc: &JsonDocument) -> fractalkv::Result<()> {
    println!("{}", serde_json::to_string(doc)?);
    Ok(())
}
