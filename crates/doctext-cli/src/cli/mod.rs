//! Command-line interface for doctext.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use doctext::logging::LogFormat;

#[derive(Parser)]
#[command(name = "doctext")]
#[command(about = "Document text extraction with local conversion and asynchronous OCR")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON config file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "DOCTEXT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a local file in the object store with its document identifier
    Upload {
        /// File to upload
        file: PathBuf,
        /// Document identifier attached as object metadata
        #[arg(short, long)]
        document_id: String,
        /// Object key (defaults to the file name)
        #[arg(short, long)]
        key: Option<String>,
        #[arg(short, long, default_value = "uploads")]
        bucket: String,
        /// MIME type stored as content-type metadata
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Extract text locally and store it
    Extract(Targets),

    /// Start OCR jobs and record their correlation
    Dispatch(Targets),

    /// Route uploads to local extraction or OCR
    Ingest(Targets),

    /// Handle a completion notification batch
    Notify {
        /// File holding the notification JSON (stdin when omitted or "-")
        input: Option<PathBuf>,
    },

    /// Print the stored text of a document
    Show {
        document_id: String,
    },

    /// Print the document a job is correlated with
    Job {
        job_id: String,
    },
}

/// Objects named on the command line or by an upload event.
#[derive(Args)]
pub struct Targets {
    /// Object keys
    pub keys: Vec<String>,
    #[arg(short, long, default_value = "uploads")]
    pub bucket: String,
    /// Upload event JSON file ("-" for stdin)
    #[arg(short, long, conflicts_with = "keys")]
    pub event: Option<PathBuf>,
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = commands::load(cli.config.as_deref())?;

    let success = match cli.command {
        Commands::Upload {
            file,
            document_id,
            key,
            bucket,
            content_type,
        } => {
            commands::upload(&config, &file, &document_id, key, &bucket, content_type).await
        }
        Commands::Extract(targets) => commands::extract(&config, &targets).await,
        Commands::Dispatch(targets) => commands::dispatch(&config, &targets).await,
        Commands::Ingest(targets) => commands::ingest(&config, &targets).await,
        Commands::Notify { input } => commands::notify(&config, input.as_deref()).await,
        Commands::Show { document_id } => commands::show(&config, &document_id).await,
        Commands::Job { job_id } => commands::job(&config, &job_id).await,
    }?;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
