pub mod config;
pub mod load_config;
pub mod publish;
pub mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use load_config::load_config;

#[derive(Parser)]
#[clap(
    name = "bookpress",
    version,
    about = "Render a book's output targets and publish the artifacts to a hosting branch"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render every configured output target, stopping at the first failure
    Build {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Sync rendered artifacts to the publish branch, if the CI gates allow it
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted CLI logic entrypoint for integration tests and main()
pub fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Build { config } => {
            let config = load_config(config)?;
            println!("Build starting...");
            match render::run(&config.render) {
                Ok(report) => {
                    println!("Build complete.\nRendered targets:");
                    for format in &report.rendered {
                        println!("  - {format}");
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Build failed: {}", e);
                    Err(e.into())
                }
            }
        }
        Commands::Publish { config } => {
            let config = load_config(config)?;
            let env = publish::Environment::from_env();
            match publish::run(&config.publish, &config.render.artifact_dir, &env) {
                // A missed gate exits zero, same as a successful publish.
                Ok(publish::Outcome::Skipped(reason)) => {
                    println!("Publish skipped: {reason}");
                    Ok(())
                }
                Ok(publish::Outcome::Published(report)) => {
                    println!("Publish complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Publish failed: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
