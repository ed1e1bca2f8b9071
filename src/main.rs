use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use ueindex::cli::CliApp;
use ueindex::cli_types::{Cli, Commands};
use ueindex::config::IndexConfig;
use ueindex::logging::init_logging;

fn run(cli: Cli, app: &CliApp) -> Result<()> {
    match cli.command {
        Commands::Scan(args) => app.scan(args),
        Commands::Search(args) => app.search(args),
        Commands::Hierarchy(args) => app.hierarchy(args),
        Commands::Usages(args) => app.usages(args),
        Commands::Stats(args) => app.stats(args),
        Commands::Config(args) => app.show_config(args, cli.config.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config_path = cli.config.clone().or_else(IndexConfig::default_path);
    let config = match IndexConfig::load(config_path.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = CliApp::new(config, cli.format, cli.verbose, !cli.no_color);
    match run(cli, &app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            app.report_error(&e);
            ExitCode::FAILURE
        }
    }
}
