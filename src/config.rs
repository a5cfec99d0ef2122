use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, bail};
use clap::Args;

use crate::network::{AddressBook, Contract, Network};

pub const PRIVATE_KEY_ENV: &str = "PETALEX_PRIVATE_KEY";
pub const RPC_URL_ENV: &str = "PETALEX_RPC_URL";

/// Connection flags shared by every command that talks to a chain.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Network to connect to (homestead, goerli, arbitrum, optimism)
    #[arg(long, default_value = "homestead")]
    pub network: String,

    /// JSON-RPC endpoint
    #[arg(long, env = RPC_URL_ENV)]
    pub rpc_url: Option<String>,

    /// Position NFT id to act on
    #[arg(long)]
    pub position: Option<String>,

    /// Proxy wallet owned by the position
    #[arg(long)]
    pub proxy: Option<String>,

    /// Print what would be sent without sending it
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub contracts: ContractOverrides,
}

/// Deployments missing from the built-in address table.
#[derive(Args, Debug, Clone, Default)]
pub struct ContractOverrides {
    /// ActionExecutor contract
    #[arg(long, env = "PETALEX_EXECUTOR")]
    pub executor: Option<String>,

    /// Gravita VesselManager contract
    #[arg(long, env = "PETALEX_VESSEL_MANAGER")]
    pub vessel_manager: Option<String>,

    /// Gravita VesselManagerOperations contract
    #[arg(long, env = "PETALEX_VESSEL_MANAGER_OPERATIONS")]
    pub vessel_manager_operations: Option<String>,

    /// Gravita SortedVessels contract
    #[arg(long, env = "PETALEX_SORTED_VESSELS")]
    pub sorted_vessels: Option<String>,

    /// Flash loan lender
    #[arg(long, env = "PETALEX_FLASH_LENDER")]
    pub flash_lender: Option<String>,
}

impl ContractOverrides {
    /// Write every supplied address into `book`.
    pub fn apply(&self, book: &mut AddressBook) -> Result<()> {
        let flags = [
            ("--executor", Contract::ActionExecutor, &self.executor),
            ("--vessel-manager", Contract::GravitaVesselManager, &self.vessel_manager),
            (
                "--vessel-manager-operations",
                Contract::GravitaVesselManagerOperations,
                &self.vessel_manager_operations,
            ),
            ("--sorted-vessels", Contract::GravitaSortedVessels, &self.sorted_vessels),
            ("--flash-lender", Contract::FlashLender, &self.flash_lender),
        ];
        for (flag, contract, value) in flags {
            if let Some(value) = value {
                let addr = value
                    .trim()
                    .parse::<Address>()
                    .with_context(|| format!("invalid {flag} '{value}'"))?;
                book.set(contract, addr);
            }
        }
        Ok(())
    }
}

/// Runtime configuration resolved from flags and environment.
pub struct RuntimeConfig {
    pub network: Network,
    pub addresses: AddressBook,
    pub rpc_url: String,
    pub private_key: String,
    pub wallet_address: Address,
    pub position: Option<U256>,
    pub proxy: Option<Address>,
    pub dry_run: bool,
}

impl RuntimeConfig {
    pub fn from_cli(args: &ConnectionArgs) -> Result<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
            anyhow::anyhow!(
                "{PRIVATE_KEY_ENV} env var not set. \
                 Set it to your hex private key."
            )
        })?;

        let network: Network = args.network.parse()?;
        let Some(rpc_url) = args.rpc_url.clone() else {
            bail!("No RPC endpoint. Pass --rpc-url or set {RPC_URL_ENV}.");
        };

        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
        let wallet_address = signer.address();

        let position = args
            .position
            .as_deref()
            .map(|p| p.parse::<U256>().with_context(|| format!("invalid --position '{p}'")))
            .transpose()?;
        let proxy = args
            .proxy
            .as_deref()
            .map(|p| p.parse::<Address>().with_context(|| format!("invalid --proxy '{p}'")))
            .transpose()?;

        let mut addresses = AddressBook::for_network(network);
        args.contracts.apply(&mut addresses)?;

        Ok(RuntimeConfig {
            network,
            addresses,
            rpc_url,
            private_key: private_key.trim().to_string(),
            wallet_address,
            position,
            proxy,
            dry_run: args.dry_run,
        })
    }

    pub fn multicall(&self) -> Result<Address> {
        Ok(self.addresses.require(Contract::Multicall3)?)
    }
}
