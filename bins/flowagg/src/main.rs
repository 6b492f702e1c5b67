mod cmd;
mod config;
mod error;

use clap::Parser;
use config::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cmd::run::execute(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
