//! mdpress CLI — batch-render markdown knowledge bases into print-ready PDFs.
//!
//! Reads a manifest of categories and artifacts, assembles each artifact
//! from its markdown fragments, and prints it to PDF with a headless browser.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
