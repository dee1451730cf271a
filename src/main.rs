mod catalog;
mod cli;
mod config;
mod context;
mod executor;
mod i18n;
mod model;
mod opener;
mod relay;
mod state;
mod ui;
mod usage;

use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use crate::config::DataPaths;
use crate::context::AppContext;

#[derive(Parser, Debug)]
#[command(author, version, about = "Catalog and launch your everyday tools", long_about = None)]
struct Args {
    /// Keep settings, catalog and usage log in this directory
    #[arg(long, global = true, env = "IVYDOCK_HOME")]
    data_dir: Option<PathBuf>,

    /// No colors
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<cli::Command>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Locate and load the stores
    let paths = match &args.data_dir {
        Some(dir) => DataPaths::in_dir(dir),
        None => DataPaths::platform(),
    };
    let mut ctx = AppContext::load(paths)?;

    // 2. Run the command; the bare invocation lists the catalog
    let palette = cli::palette(&ctx, args.plain);
    let command = args.command.unwrap_or(cli::Command::List { query: None });
    cli::dispatch(command, &mut ctx, palette)
}
