//! docmirror CLI: mirror an online documentation site into a local Markdown tree.
//!
//! Reads the site's table of contents, converts every linked page to Markdown
//! with a metadata header, and writes one directory per category with an
//! `index.md` in each.

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
