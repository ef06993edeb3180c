//! doctext - document text extraction with local conversion and
//! asynchronous OCR.

mod cli;

use std::process::ExitCode;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Cli::parse();

    doctext::logging::init(args.log_format, args.verbose)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    cli::run(args).await
}
