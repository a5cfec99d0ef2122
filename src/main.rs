use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod schema;

use commands::quote::QuoteArgs;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("petalex=info")),
        )
        .with_target(false)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Addresses { network, contracts } => commands::addresses::run(&network, &contracts),
        cli::Command::Collaterals { conn } => commands::collaterals::run(&conn),
        cli::Command::Quote {
            conn,
            token_in,
            decimals_in,
            token_out,
            decimals_out,
            hops,
            amount,
            exact_output,
        } => commands::quote::run(&conn, &QuoteArgs {
            token_in,
            decimals_in,
            token_out,
            decimals_out,
            hops,
            amount,
            exact_output,
        }),
        cli::Command::Plan {
            file,
            execute,
            conn,
        } => commands::preview::run(&file, execute, &conn),
    }
}
