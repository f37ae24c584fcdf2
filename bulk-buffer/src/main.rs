use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{error, info};

use bulk_buffer::{input, load, Dependencies, InputFormat, LoadSettings};
use bulk_buffer_core::BufferConfig;

#[derive(Parser)]
#[command(name = "bulk-buffer")]
#[command(about = "Buffer documents and write them to OpenSearch in bulk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents from a file (or `-` for stdin)
    Load {
        /// Input file, or `-` for stdin
        input: String,

        /// Input format
        #[arg(long, value_enum, default_value_t = InputFormat::Ndjson)]
        format: InputFormat,

        /// Number of buffered documents that triggers a bulk write
        #[arg(long, default_value_t = BufferConfig::default().size)]
        size: usize,

        /// Default index for documents without `_index`
        #[arg(long)]
        index: Option<String>,

        /// Field copied into `_id`
        #[arg(long)]
        id_field: Option<String>,

        /// CSV column used as the row index
        #[arg(long)]
        index_column: Option<String>,

        /// Directory for dump files written when the load fails
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// Report flush failures without the backend's response
        #[arg(long)]
        quiet_errors: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            input: path,
            format,
            size,
            index,
            id_field,
            index_column,
            dump_dir,
            quiet_errors,
        } => {
            let settings = LoadSettings {
                size,
                index,
                id_field,
                dump_dir,
                verbose_errors: !quiet_errors,
            };

            let reader = open_input(&path)?;
            let bundles = input::read_bundles(reader, format, index_column.as_deref())
                .with_context(|| format!("Failed to read {}", path))?;
            info!(input = %path, bundles = bundles.len(), "Read input");

            let mut deps = Dependencies::new(&settings).context("Failed to initialize dependencies")?;

            match load(&mut deps.buffer, bundles).await {
                Ok(written) => {
                    println!("{}", written);
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Load failed");
                    Err(e).context("Load failed")
                }
            }
        }
    }
}
