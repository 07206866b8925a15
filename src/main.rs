use anyhow::Result;
use clap::Parser;

use bookpress::Cli;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    bookpress::run(cli)
}
