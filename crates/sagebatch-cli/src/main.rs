//! Sagebatch CLI - drives instance readers from the command line.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sagebatch_cli::{Cli, CliResult, Commands};

fn main() -> CliResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("sagebatch=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(cmd) => {
            let summary = cmd.run()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    info!("Sagebatch CLI completed successfully");
    Ok(())
}
