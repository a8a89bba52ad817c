//! entidoc CLI
//!
//! Command-line access to an entidoc catalog directory.
//!
//! # Commands
//!
//! - `init` - Bootstrap the standard documents
//! - `create` - Create an entity and print its id
//! - `get` / `set` - Read or update a field (or `@attribute`)
//! - `remove` - Remove an entity
//! - `list` - List entity ids
//! - `dump` - Print a whole document

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// entidoc command-line tools.
#[derive(Parser)]
#[command(name = "entidoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the catalog directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the standard documents
    Init,

    /// Create an entity and print its id
    Create {
        /// Entity kind (users, groups, tags, queries, collections, admins)
        #[arg(short, long)]
        kind: String,

        /// Element name (defaults to the kind's tag)
        #[arg(short, long)]
        tag: Option<String>,

        /// Attribute as name=value (repeatable)
        #[arg(short, long = "attr")]
        attrs: Vec<String>,

        /// Field as path=value (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Print a field or `@attribute` of an entity
    Get {
        /// Entity kind
        #[arg(short, long)]
        kind: String,

        /// Entity id
        #[arg(short, long)]
        id: u64,

        /// Field path, or `@name` for an attribute
        #[arg(short, long)]
        field: String,
    },

    /// Update a field or `@attribute` of an entity
    Set {
        /// Entity kind
        #[arg(short, long)]
        kind: String,

        /// Entity id
        #[arg(short, long)]
        id: u64,

        /// Field path, or `@name` for an attribute
        #[arg(short, long)]
        field: String,

        /// New value (empty clears the content)
        #[arg(long, default_value = "")]
        value: String,
    },

    /// Remove an entity
    Remove {
        /// Entity kind
        #[arg(short, long)]
        kind: String,

        /// Entity id
        #[arg(short, long)]
        id: u64,
    },

    /// List entity ids
    List {
        /// Entity kind
        #[arg(short, long)]
        kind: String,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print a whole document
    Dump {
        /// Entity kind
        #[arg(short, long)]
        kind: String,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("entidoc CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("entidoc core v{}", entidoc_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Catalog path required (--path)")?;
    let catalog = commands::open_catalog(&path)?;

    match cli.command {
        Commands::Init => {
            commands::init::run(&catalog)?;
        }
        Commands::Create {
            kind,
            tag,
            attrs,
            fields,
        } => {
            commands::create::run(&catalog, &kind, tag.as_deref(), &attrs, &fields)?;
        }
        Commands::Get { kind, id, field } => {
            commands::field::get(&catalog, &kind, id, &field)?;
        }
        Commands::Set {
            kind,
            id,
            field,
            value,
        } => {
            commands::field::set(&catalog, &kind, id, &field, &value)?;
        }
        Commands::Remove { kind, id } => {
            commands::remove::run(&catalog, &kind, id)?;
        }
        Commands::List { kind, format } => {
            commands::list::run(&catalog, &kind, &format)?;
        }
        Commands::Dump { kind } => {
            commands::dump::run(&catalog, &kind)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
