use clap::Parser;
use std::process::ExitCode;
use voice_batch::app::handle_run;
use voice_batch::cli::Cli;
use voice_batch::infrastructure::config::{Config, LogFormat};
use voice_batch::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let log_format = config
        .as_ref()
        .map(|c| c.log_format.clone())
        .unwrap_or(LogFormat::Pretty);
    init_logging(&log_format, cli.debug);

    let result = match config {
        Ok(config) => handle_run(&cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.report() as u8)
        }
    }
}
