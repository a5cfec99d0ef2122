use anyhow::{Context, Result, bail};
use petalex::config::ConnectionArgs;
use petalex::units;

use super::connect;

/// Entry point for the `collaterals` command.
pub fn run(args: &ConnectionArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(args))
}

async fn run_async(args: &ConnectionArgs) -> Result<()> {
    let (config, mut session) = connect(args).await?;
    if session.position().is_none() {
        bail!("--position and --proxy are required to read vessel state");
    }
    session.refresh_gravita().await.context("fetching gravita snapshot")?;

    println!("Wallet:  {}", config.wallet_address);
    println!("Network: {}", config.network);
    println!();
    println!(
        "{:<8} {:>14} {:>14} {:>8} {:>8} {:>16} {:>16}",
        "ASSET", "PRICE", "WALLET", "MCR", "ACTIVE", "VESSEL COLL", "VESSEL DEBT"
    );
    for c in session.gravita().collaterals() {
        println!(
            "{:<8} {:>14} {:>14} {:>8} {:>8} {:>16} {:>16}",
            c.symbol,
            units::format_units(c.price, c.price_decimals),
            units::format_units(c.balance_of, c.decimals),
            units::format_units(c.min_collateral_ratio, 18),
            c.is_active,
            units::format_units(c.vessel_collateral, c.decimals),
            units::format_units(c.vessel_debt, 18),
        );
    }

    let open: Vec<String> = session
        .active_vessels()
        .into_iter()
        .filter(|v| v.has_vessel)
        .map(|v| v.address.to_string())
        .collect();
    println!();
    println!("Open vessels: {}", if open.is_empty() { "none".into() } else { open.join(", ") });
    Ok(())
}
