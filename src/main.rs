use std::process::ExitCode;

use clap::Parser;
use coi_serve::cli::Cli;
use coi_serve::config::Config;
use coi_serve::error::ServerError;
use coi_serve::{logger, server};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[FATAL] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cli = Cli::parse();

    let mut cfg = Config::load_from(&cli.config)?;
    cfg.apply_cli(&cli);

    logger::init(&cfg).map_err(ServerError::Logger)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(server::start(cfg))
}
