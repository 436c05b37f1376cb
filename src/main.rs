use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Talk to a SQLite database in plain English", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand that touches the database.
#[derive(Args)]
struct CommonArgs {
    /// Path to the SQLite database (overrides config file and ASKQL_DB)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Path to a config file (default: ./askql.toml, then ~/.askql/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database with the seeded STUDENT table
    Init {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Ask a question in English and run the generated SQL
    Ask {
        /// The question, e.g. "how many students study Data Science?"
        question: String,

        /// Print the generated SQL without executing it
        #[arg(long)]
        no_execute: bool,

        /// Model to use (overrides config file and ASKQL_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Execute a SQL statement verbatim
    Sql {
        /// The statement; omit to read it from stdin
        statement: Option<String>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List tables and their columns
    Tables {
        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the columns of one table
    Describe {
        /// Table name
        table: String,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Create a table from a column spec
    CreateTable {
        /// Table name
        name: String,

        /// Comma-separated column definitions, e.g. "name TEXT, age INTEGER"
        #[arg(long)]
        columns: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Insert one row as col=value pairs
    Insert {
        /// Table name
        table: String,

        /// Values, e.g. NAME=Student6 MARKS=85
        #[arg(required = true)]
        values: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show recent ask history
    History {
        /// Maximum entries to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run the HTTP JSON API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, default_value = "7432")]
        port: u16,

        #[command(flatten)]
        common: CommonArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { common } => {
            commands::init::execute(common.db.as_deref(), common.config.as_deref())?;
        }
        Commands::Ask {
            question,
            no_execute,
            model,
            json,
            common,
        } => {
            let exit_code = commands::ask::execute(
                &question,
                no_execute,
                model.as_deref(),
                json,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Commands::Sql {
            statement,
            json,
            common,
        } => {
            commands::sql::execute(
                statement.as_deref(),
                json,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
        Commands::Tables { json, common } => {
            commands::tables::execute_list(json, common.db.as_deref(), common.config.as_deref())?;
        }
        Commands::Describe {
            table,
            json,
            common,
        } => {
            commands::tables::execute_describe(
                &table,
                json,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
        Commands::CreateTable {
            name,
            columns,
            common,
        } => {
            commands::create::execute(
                &name,
                &columns,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
        Commands::Insert {
            table,
            values,
            common,
        } => {
            commands::insert::execute(
                &table,
                &values,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
        Commands::History {
            limit,
            json,
            common,
        } => {
            commands::history::execute(
                limit,
                json,
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
        Commands::Serve { host, port, common } => {
            commands::serve::execute(
                commands::serve::ServeOptions { host, port },
                common.db.as_deref(),
                common.config.as_deref(),
            )?;
        }
    }

    Ok(())
}
