pub mod addresses;
pub mod collaterals;
pub mod preview;
pub mod quote;

use anyhow::{Context, Result, bail};
use petalex::chain::rpc::RpcClient;
use petalex::config::{ConnectionArgs, RuntimeConfig};
use petalex::session::Session;

/// Resolve config, build the RPC client and open a session on it.
pub async fn connect(args: &ConnectionArgs) -> Result<(RuntimeConfig, Session<RpcClient>)> {
    // Install rustls crypto provider (required by reqwest's TLS)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = RuntimeConfig::from_cli(args)?;
    let client = RpcClient::new(&config.rpc_url, &config.private_key, config.multicall()?)
        .context("building RPC client")?;

    let chain_id = client.chain_id().await.context("reading chain id")?;
    if chain_id != config.network.chain_id() {
        bail!(
            "RPC endpoint is on chain {chain_id}, expected {} ({})",
            config.network.chain_id(),
            config.network
        );
    }

    let mut session = Session::connect(client, config.addresses.clone(), config.wallet_address);
    if let (Some(id), Some(proxy)) = (config.position, config.proxy) {
        session.select_position(id, proxy);
    }
    Ok((config, session))
}
