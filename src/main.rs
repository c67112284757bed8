use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Command-line client for the PardusDB vector store", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Database file (in-memory when omitted)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Engine binary (PATH lookup when omitted)
    #[arg(long, global = true)]
    binary: Option<PathBuf>,

    /// Per-command timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables
    Tables,

    /// Create a table with a leading embedding column
    Create {
        /// Table name
        name: String,

        /// Vector dimension
        #[arg(long)]
        dim: usize,

        /// Extra columns as name:type (e.g. title:str,score:float)
        #[arg(long, value_delimiter = ',')]
        column: Vec<String>,

        /// Do not fail if the table exists
        #[arg(long)]
        if_not_exists: bool,
    },

    /// Drop a table
    Drop {
        name: String,

        #[arg(long)]
        if_exists: bool,
    },

    /// Insert one row
    Insert {
        #[arg(long)]
        table: String,

        /// Vector as comma-separated floats (e.g. "0.1,0.2,0.3")
        #[arg(long, allow_hyphen_values = true)]
        vector: String,

        /// Column values as key=value, repeatable
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// Nearest-neighbor search
    Search {
        #[arg(long)]
        table: String,

        /// Query vector as comma-separated floats
        #[arg(long, allow_hyphen_values = true, required_unless_present = "text", conflicts_with = "text")]
        vector: Option<String>,

        /// Embed this text and search with the result
        #[arg(long)]
        text: Option<String>,

        /// Number of results
        #[arg(short, long, default_value_t = 10)]
        k: usize,
    },

    /// Fetch one row by id
    Get {
        #[arg(long)]
        table: String,
        id: u64,
    },

    /// Overwrite columns of one row
    Update {
        #[arg(long)]
        table: String,
        id: u64,

        /// Column values as key=value, repeatable
        #[arg(long = "set", required = true)]
        set: Vec<String>,
    },

    /// Delete one row, or every row with --all
    Delete {
        #[arg(long)]
        table: String,

        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<u64>,

        #[arg(long)]
        all: bool,
    },

    /// Send a command verbatim and print the engine's output
    Raw {
        command: String,
    },

    /// Print the embedding of a text
    Embed {
        text: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PARDUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Tables => {
            commands::tables::list(&global)?;
        }
        Commands::Create {
            name,
            dim,
            column,
            if_not_exists,
        } => {
            commands::tables::create(&global, &name, dim, &column, if_not_exists)?;
        }
        Commands::Drop { name, if_exists } => {
            commands::tables::drop(&global, &name, if_exists)?;
        }
        Commands::Insert { table, vector, set } => {
            commands::rows::insert(&global, &table, &vector, &set)?;
        }
        Commands::Search {
            table,
            vector,
            text,
            k,
        } => {
            commands::search::execute(&global, &table, vector.as_deref(), text.as_deref(), k)?;
        }
        Commands::Get { table, id } => {
            commands::rows::get(&global, &table, id)?;
        }
        Commands::Update { table, id, set } => {
            commands::rows::update(&global, &table, id, &set)?;
        }
        Commands::Delete { table, id, all } => {
            commands::rows::delete(&global, &table, id, all)?;
        }
        Commands::Raw { command } => {
            commands::raw::execute(&global, &command)?;
        }
        Commands::Embed { text } => {
            commands::embed::execute(&global, &text)?;
        }
    }

    Ok(())
}
