#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod assets;
mod browser;
mod config;
mod error;
mod export;
mod orchestrator;
mod prelude;
mod serve;

#[cfg(test)]
mod testing;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Generates clinic PDF documents: prescriptions, certificates and anamnesis forms"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "DENTDOC_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Run the PDF generation server
    Serve(crate::serve::cli::ServeOptions),

    /// Export a document through the server, rendering locally when it is unavailable
    Export(crate::export::cli::ExportOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Serve(options) => crate::serve::run(options, app.global).await,
        SubCommands::Export(options) => crate::export::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
