//! Builds a fresh [`CollateralInfo`] snapshot in three batched phases:
//! collateral discovery, per-asset parameters, then oracle prices.

use alloy::primitives::{Address, U256};

use super::{CollateralInfo, RestoreData, VesselStatus};
use crate::abi::{IChainlinkAggregator, IERC20, IGravitaAdmin, IGravitaPriceFeed, IVesselManager};
use crate::chain::ChainClient;
use crate::error::Result;
use crate::multicall::Batch;
use crate::units;

/// Addresses a snapshot fetch reads against.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext {
    pub admin: Address,
    pub vessel_manager: Address,
    pub account: Address,
    pub proxy: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    MintCap,
    MinNetDebt,
    TotalAssetDebt,
    IsActive,
    Mcr,
    Ccr,
    Name,
    Symbol,
    Decimals,
    WalletBalance,
    ProxyBalance,
    Oracle,
    VesselColl,
    VesselDebt,
    VesselStatus,
}

const ADMIN_READS: [Field; 6] = [
    Field::MintCap,
    Field::MinNetDebt,
    Field::TotalAssetDebt,
    Field::IsActive,
    Field::Mcr,
    Field::Ccr,
];
const TOKEN_READS: [Field; 5] = [
    Field::Name,
    Field::Symbol,
    Field::Decimals,
    Field::WalletBalance,
    Field::ProxyBalance,
];
const VESSEL_READS: [Field; 3] = [Field::VesselColl, Field::VesselDebt, Field::VesselStatus];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Read {
    ValidCollateral,
    PriceFeed,
    Asset(usize, Field),
    Price(usize),
}

/// Fetch the full snapshot. Failed parameter, token or vessel reads abort;
/// a missing oracle or price leaves the price at zero.
pub async fn fetch_collaterals<C: ChainClient + ?Sized>(
    client: &C,
    ctx: &FetchContext,
) -> Result<Vec<CollateralInfo>> {
    // ── Phase 1: valid collaterals + price feed router ──
    let mut init = Batch::new();
    init.push(Read::ValidCollateral, ctx.admin, &IGravitaAdmin::getValidCollateralCall {});
    init.push(Read::PriceFeed, ctx.admin, &IGravitaAdmin::priceFeedCall {});
    let init = init.execute(client).await?;
    let collaterals = init.required::<IGravitaAdmin::getValidCollateralCall>(&Read::ValidCollateral)?;
    let price_feed = init.required::<IGravitaAdmin::priceFeedCall>(&Read::PriceFeed)?;
    tracing::debug!(count = collaterals.len(), %price_feed, "gravita collaterals");

    // ── Phase 2: per-asset parameters, token metadata, oracle records, vessels ──
    let mut batch = Batch::new();
    for (i, &asset) in collaterals.iter().enumerate() {
        for field in ADMIN_READS {
            let key = Read::Asset(i, field);
            let admin = ctx.admin;
            match field {
                Field::MintCap => batch.push(key, admin, &IGravitaAdmin::getMintCapCall { collateral: asset }),
                Field::MinNetDebt => batch.push(key, admin, &IGravitaAdmin::getMinNetDebtCall { collateral: asset }),
                Field::TotalAssetDebt => {
                    batch.push(key, admin, &IGravitaAdmin::getTotalAssetDebtCall { collateral: asset })
                }
                Field::IsActive => batch.push(key, admin, &IGravitaAdmin::getIsActiveCall { collateral: asset }),
                Field::Mcr => batch.push(key, admin, &IGravitaAdmin::getMcrCall { collateral: asset }),
                _ => batch.push(key, admin, &IGravitaAdmin::getCcrCall { collateral: asset }),
            }
        }
    }
    for (i, &asset) in collaterals.iter().enumerate() {
        for field in TOKEN_READS {
            let key = Read::Asset(i, field);
            match field {
                Field::Name => batch.push(key, asset, &IERC20::nameCall {}),
                Field::Symbol => batch.push(key, asset, &IERC20::symbolCall {}),
                Field::Decimals => batch.push(key, asset, &IERC20::decimalsCall {}),
                Field::WalletBalance => batch.push(key, asset, &IERC20::balanceOfCall { account: ctx.account }),
                _ => batch.push(key, asset, &IERC20::balanceOfCall { account: ctx.proxy }),
            }
        }
    }
    for (i, &asset) in collaterals.iter().enumerate() {
        batch.push(Read::Asset(i, Field::Oracle), price_feed, &IGravitaPriceFeed::oraclesCall { token: asset });
    }
    for (i, &asset) in collaterals.iter().enumerate() {
        for field in VESSEL_READS {
            let key = Read::Asset(i, field);
            let vm = ctx.vessel_manager;
            match field {
                Field::VesselColl => batch.push(
                    key,
                    vm,
                    &IVesselManager::getVesselCollCall { asset, borrower: ctx.proxy },
                ),
                Field::VesselDebt => batch.push(
                    key,
                    vm,
                    &IVesselManager::getVesselDebtCall { asset, borrower: ctx.proxy },
                ),
                _ => batch.push(
                    key,
                    vm,
                    &IVesselManager::getVesselStatusCall { asset, borrower: ctx.proxy },
                ),
            }
        }
    }
    tracing::debug!(calls = batch.len(), "gravita parameter batch");
    let results = batch.execute(client).await?;

    let mut infos = Vec::with_capacity(collaterals.len());
    for (i, &address) in collaterals.iter().enumerate() {
        let key = |field| Read::Asset(i, field);
        let mut info = CollateralInfo {
            address,
            mint_cap: results.required::<IGravitaAdmin::getMintCapCall>(&key(Field::MintCap))?,
            min_net_debt: results.required::<IGravitaAdmin::getMinNetDebtCall>(&key(Field::MinNetDebt))?,
            total_asset_debt: results
                .required::<IGravitaAdmin::getTotalAssetDebtCall>(&key(Field::TotalAssetDebt))?,
            is_active: results.required::<IGravitaAdmin::getIsActiveCall>(&key(Field::IsActive))?,
            min_collateral_ratio: results.required::<IGravitaAdmin::getMcrCall>(&key(Field::Mcr))?,
            critical_collateral_ratio: results.required::<IGravitaAdmin::getCcrCall>(&key(Field::Ccr))?,
            name: results.required::<IERC20::nameCall>(&key(Field::Name))?,
            symbol: results.required::<IERC20::symbolCall>(&key(Field::Symbol))?,
            decimals: results.required::<IERC20::decimalsCall>(&key(Field::Decimals))?,
            balance_of: results.required::<IERC20::balanceOfCall>(&key(Field::WalletBalance))?,
            balance_of_proxy: results.required::<IERC20::balanceOfCall>(&key(Field::ProxyBalance))?,
            vessel_collateral: results.required::<IVesselManager::getVesselCollCall>(&key(Field::VesselColl))?,
            vessel_debt: results.required::<IVesselManager::getVesselDebtCall>(&key(Field::VesselDebt))?,
            vessel_status: VesselStatus::from_code(
                results.required::<IVesselManager::getVesselStatusCall>(&key(Field::VesselStatus))?,
            ),
            price_decimals: 8,
            ..Default::default()
        };

        match results.optional::<IGravitaPriceFeed::oraclesCall>(&key(Field::Oracle)) {
            Some(record) => match u8::try_from(record.decimals)
                .ok()
                .filter(|d| *d <= units::MAX_DECIMALS)
            {
                Some(decimals) => {
                    info.price_feed = record.oracleAddress;
                    info.price_decimals = decimals;
                    info.is_price_eth_indexed = record.isEthIndexed;
                }
                None => tracing::warn!(
                    collateral = %address,
                    decimals = %record.decimals,
                    "oracle decimals out of range; price left at zero"
                ),
            },
            None => tracing::warn!(collateral = %address, "no oracle record; price left at zero"),
        }
        infos.push(info);
    }

    // ── Phase 3: latest oracle answers ──
    let mut prices = Batch::new();
    for (i, info) in infos.iter().enumerate() {
        if !info.price_feed.is_zero() {
            prices.push(Read::Price(i), info.price_feed, &IChainlinkAggregator::latestRoundDataCall {});
        }
    }
    let prices = prices.execute(client).await?;
    for (i, info) in infos.iter_mut().enumerate() {
        if info.price_feed.is_zero() {
            continue;
        }
        match prices.optional::<IChainlinkAggregator::latestRoundDataCall>(&Read::Price(i)) {
            Some(round) if round.answer.is_positive() => info.price = round.answer.into_raw(),
            _ => tracing::warn!(collateral = %info.address, feed = %info.price_feed, "price read failed"),
        }
    }

    apply_eth_indexing(&mut infos);
    for info in &mut infos {
        info.restore_data = RestoreData {
            status: info.vessel_status,
            collateral: info.vessel_collateral,
            debt: info.vessel_debt,
        };
    }
    Ok(infos)
}

/// Re-denominate ETH-indexed prices using the WETH collateral's price.
pub fn apply_eth_indexing(infos: &mut [CollateralInfo]) {
    let Some(weth) = infos.iter().find(|c| c.symbol == "WETH") else {
        return;
    };
    let (weth_price, weth_decimals) = (weth.price, weth.price_decimals);
    for info in infos.iter_mut().filter(|c| c.is_price_eth_indexed) {
        info.price = compose_eth_indexed(info.price, weth_price, weth_decimals);
    }
}

/// `price × eth_price`, both de-scaled by their own precision, rescaled to
/// `price`'s precision. Truncates toward zero.
pub fn compose_eth_indexed(price: U256, eth_price: U256, eth_decimals: u8) -> U256 {
    match units::pow10(eth_decimals) {
        Some(scale) => price.saturating_mul(eth_price) / scale,
        None => U256::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_eth_indexed_price_exactly() {
        let e8 = units::pow10(8).unwrap();
        let composed = compose_eth_indexed(U256::from(2000u64) * e8, U256::from(1800u64) * e8, 8);
        assert_eq!(composed, U256::from(3_600_000u64) * e8);

        // Mixed precision: 1.05 (18 decimals) against 1800.5 (8 decimals)
        let price = U256::from(105u64) * units::pow10(16).unwrap();
        let eth = U256::from(180_050_000_000u64);
        assert_eq!(
            compose_eth_indexed(price, eth, 8),
            U256::from(1_890_525u64) * units::pow10(15).unwrap()
        );
    }

    #[test]
    fn eth_indexing_uses_weth_entry() {
        let e8 = units::pow10(8).unwrap();
        let mut infos = vec![
            CollateralInfo {
                symbol: "WETH".into(),
                price: U256::from(1800u64) * e8,
                price_decimals: 8,
                ..Default::default()
            },
            CollateralInfo {
                symbol: "rETH".into(),
                price: U256::from(107u64) * units::pow10(6).unwrap(),
                price_decimals: 8,
                is_price_eth_indexed: true,
                ..Default::default()
            },
        ];
        apply_eth_indexing(&mut infos);
        assert_eq!(infos[0].price, U256::from(1800u64) * e8);
        assert_eq!(infos[1].price, U256::from(1926u64) * e8);
    }
}
