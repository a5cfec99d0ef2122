use clap::{Parser, Subcommand};
use std::path::PathBuf;

use petalex::config::{ConnectionArgs, ContractOverrides};

/// Batch DeFi position actions (Gravita, Liquity, Uniswap V3, flash loans)
/// into a single executor transaction.
#[derive(Parser)]
#[command(name = "petalex", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for plan files
    Schema,

    /// Print the contract address table for a network
    Addresses {
        #[arg(long, default_value = "homestead")]
        network: String,

        #[command(flatten)]
        contracts: ContractOverrides,
    },

    /// Fetch and print the Gravita collateral snapshot
    Collaterals {
        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Find the best Uniswap V3 fee route for a swap
    Quote {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Input token address
        #[arg(long)]
        token_in: String,

        #[arg(long, default_value = "18")]
        decimals_in: u8,

        /// Output token address
        #[arg(long)]
        token_out: String,

        #[arg(long, default_value = "18")]
        decimals_out: u8,

        /// Intermediate token, repeatable
        #[arg(long = "hop")]
        hops: Vec<String>,

        /// Amount in whole units (input amount, or output with --exact-output)
        #[arg(long)]
        amount: String,

        /// Quote the input needed for an exact output amount
        #[arg(long)]
        exact_output: bool,
    },

    /// Compile a plan file and preview its balances and submission
    Plan {
        /// Path to the plan JSON file
        file: PathBuf,

        /// Approve tokens and submit the batch on-chain
        #[arg(long)]
        execute: bool,

        #[command(flatten)]
        conn: ConnectionArgs,
    },
}
