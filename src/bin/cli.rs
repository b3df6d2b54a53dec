//! tablekv CLI
//!
//! Loads JSON-lines rows into an in-memory table and runs one operation
//! against it. Useful for seeing how rows are batched and how queries page.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tablekv::batch::partition;
use tablekv::client::memory::MemoryTableClient;
use tablekv::{Config, PropertyMap, ReplaceDisallowed, Row, Table};
use tracing_subscriber::{fmt, EnvFilter};

/// tablekv CLI
#[derive(Parser, Debug)]
#[command(name = "tablekv-cli")]
#[command(about = "Explore batching and paging over an in-memory table")]
#[command(version)]
struct Args {
    /// JSON-lines file, one row object per line
    #[arg(short, long)]
    input: PathBuf,

    /// Max rows per batch transaction (1-100)
    #[arg(short, long, default_value = "100")]
    batch_size: usize,

    /// Rows per query segment returned by the in-memory store
    #[arg(short, long, default_value = "1000")]
    page_size: usize,

    /// Replace disallowed key characters with '_' while loading
    #[arg(short, long)]
    sanitize: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the batches the input would be split into (no I/O)
    Plan,

    /// Load the input and report per-row results
    Load,

    /// Query a partition (or the whole table)
    Query {
        #[arg(long)]
        partition: Option<String>,
    },

    /// Point lookup
    Get { partition: String, row: String },

    /// Delete every row of a partition
    DeletePartition { partition: String },

    /// Delete every row with the given row key
    DeleteRow { row: String },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tablekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("tablekv CLI v{}", tablekv::VERSION);

    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let rows = read_rows(&args.input)?;
    tracing::info!("Read {} rows from {}", rows.len(), args.input.display());

    let config = Config::builder()
        .table_name(args.input.display().to_string())
        .max_batch_size(args.batch_size)
        .build();
    config.validate()?;

    if let Commands::Plan = args.command {
        for (i, batch) in partition(rows, config.max_batch_size).iter().enumerate() {
            println!("batch {}: partition '{}' rows {}", i, batch.partition_key(), batch.len());
        }
        return Ok(());
    }

    let client = Arc::new(MemoryTableClient::new().with_page_size(args.page_size));
    let table = Table::open(Arc::clone(&client), config)?;
    table.create_if_not_exists().await?;

    let loaded = if args.sanitize {
        table
            .insert_or_replace_all_sanitized(rows, &ReplaceDisallowed::default())
            .await?
    } else {
        table.insert_or_replace_all(rows).await?
    };

    match args.command {
        Commands::Plan => {}
        Commands::Load => {
            for result in &loaded {
                println!(
                    "{}\t{}\t{}\t{}",
                    result.partition_key,
                    result.row_key,
                    result.status,
                    result.etag.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Query { partition } => {
            let rows = match partition {
                Some(pk) => table.query_by_partition(&pk).await?,
                None => table.query_all().await?,
            };
            print_rows(rows)?;
        }
        Commands::Get { partition, row } => match table.get_map(&partition, &row).await? {
            Some(map) => println!("{}", serde_json::to_string(&map)?),
            None => println!("not found"),
        },
        Commands::DeletePartition { partition } => {
            let deleted = table.delete_by_partition(&partition).await?;
            println!("deleted {} rows", deleted.len());
        }
        Commands::DeleteRow { row } => {
            let deleted = table.delete_by_row(&row).await?;
            println!("deleted {} rows", deleted.len());
        }
    }

    let stats = client.stats();
    tracing::info!(
        "Store calls: {} batch ({:?}), {} single, {} query segments; {} rows remain",
        stats.batch_calls,
        stats.batch_sizes,
        stats.single_calls,
        stats.segment_calls,
        client.len()
    );

    Ok(())
}

fn read_rows(path: &PathBuf) -> Result<Vec<Row>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let mut rows = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let map: PropertyMap = serde_json::from_str(line)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        rows.push(Row::from_map(map).map_err(|e| format!("line {}: {}", line_no + 1, e))?);
    }

    Ok(rows)
}

fn print_rows(rows: Vec<Row>) -> Result<(), Box<dyn Error>> {
    for row in rows {
        println!("{}", serde_json::to_string(&row.into_map())?);
    }
    Ok(())
}
