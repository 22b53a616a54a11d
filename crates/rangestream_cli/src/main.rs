//! RangeStream CLI
//!
//! Command-line tools for RangeStream backends.
//!
//! # Commands
//!
//! - `types` - List registered backend types
//! - `streams` - List non-empty streams
//! - `add` / `read` / `del` / `len` - Operate on one stream
//! - `config` - Print the backend configuration
//! - `drop` - Erase all data of a backend
//! - `compact` - Rewrite a list backend's operation log

mod commands;

use clap::{Parser, Subcommand};
use rangestream_core::LIST_BACKEND;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RangeStream command-line stream tools.
#[derive(Parser)]
#[command(name = "rangestream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the storage directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Backend type to open
    #[arg(global = true, short, long, default_value = LIST_BACKEND)]
    backend: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered backend types
    Types,

    /// List streams that hold at least one event
    Streams,

    /// Append events to a stream
    Add {
        /// Stream name
        stream: String,

        /// Events to append, in order
        #[arg(required = true)]
        events: Vec<String>,
    },

    /// Read a range of a stream
    Read {
        /// Stream name
        stream: String,

        /// First index
        #[arg(long, default_value = "0")]
        from: u64,

        /// End index, exclusive; negative counts from the end
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        to: i64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete a range of a stream
    Del {
        /// Stream name
        stream: String,

        /// First index
        #[arg(long)]
        from: u64,

        /// End index, exclusive; negative counts from the end
        #[arg(long, allow_hyphen_values = true)]
        to: i64,
    },

    /// Print the number of events in a stream
    Len {
        /// Stream name
        stream: String,
    },

    /// Print the backend configuration
    Config,

    /// Erase all data of the backend
    Drop {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },

    /// Rewrite the operation log of a list backend
    Compact {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let open = || commands::open_backend(&cli.backend, cli.path.as_deref());

    match &cli.command {
        Commands::Types => {
            for kind in commands::backend::types() {
                println!("{kind}");
            }
        }
        Commands::Streams => {
            let backend = open()?;
            for name in commands::backend::streams(backend.as_ref())? {
                println!("{name}");
            }
            backend.close()?;
        }
        Commands::Add { stream, events } => {
            let backend = open()?;
            commands::stream::add(backend.as_ref(), stream, events)?;
            backend.close()?;
        }
        Commands::Read {
            stream,
            from,
            to,
            format,
        } => {
            let backend = open()?;
            commands::stream::run_read(backend.as_ref(), stream, *from, *to, format)?;
            backend.close()?;
        }
        Commands::Del { stream, from, to } => {
            let backend = open()?;
            let removed = commands::stream::del(backend.as_ref(), stream, *from, *to)?;
            println!("{}", if removed { "deleted" } else { "nothing to delete" });
            backend.close()?;
        }
        Commands::Len { stream } => {
            let backend = open()?;
            println!("{}", commands::stream::len(backend.as_ref(), stream)?);
            backend.close()?;
        }
        Commands::Config => {
            let backend = open()?;
            println!("{}", commands::backend::config(backend.as_ref())?);
            backend.close()?;
        }
        Commands::Drop { yes } => {
            let backend = open()?;
            commands::backend::drop_data(backend.as_ref(), *yes)?;
            backend.close()?;
        }
        Commands::Compact { format } => {
            let path = cli.path.as_deref().ok_or("Storage path required for compact")?;
            commands::compact::run(path, format)?;
        }
        Commands::Version => {
            println!("RangeStream CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("RangeStream Core v{}", rangestream_core::VERSION);
        }
    }

    Ok(())
}
