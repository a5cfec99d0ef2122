mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, I256, U256};
use alloy::sol_types::SolValue;

use common::{MockChain, addr, ret, units};
use petalex::Error;
use petalex::abi::{
    IChainlinkAggregator, IERC20, IGravitaAdmin, IGravitaPriceFeed, ISortedVessels, IVesselManager,
    IVesselManagerOperations,
};
use petalex::actions::{Token, build};
use petalex::gravita::VesselStatus;
use petalex::gravita::fetch::{FetchContext, fetch_collaterals};
use petalex::gravita::hints;
use petalex::network::{AddressBook, Contract, Network};
use petalex::session::Session;

const ACCOUNT: u8 = 0xa1;
const PROXY: u8 = 0xb2;
const ADMIN: u8 = 0xad;
const VESSELS: u8 = 0x5e;
const FEED: u8 = 0xfe;
const WETH: u8 = 0x0e;
const RETH: u8 = 0x0f;
const WETH_ORACLE: u8 = 0x91;
const RETH_ORACLE: u8 = 0x92;

fn round(answer: i64) -> Vec<u8> {
    (
        U256::from(1u64),
        I256::try_from(answer).unwrap(),
        U256::ZERO,
        U256::ZERO,
        U256::from(1u64),
    )
        .abi_encode_params()
}

/// Two collaterals. The proxy holds an active WETH vessel (10 WETH / 5000 GRAI);
/// rETH is priced in ETH.
fn gravita_chain() -> MockChain {
    let mut chain = MockChain::new();
    let admin = addr(ADMIN);
    chain
        .returns::<IGravitaAdmin::getValidCollateralCall>(admin, ret(vec![addr(WETH), addr(RETH)]))
        .returns::<IGravitaAdmin::priceFeedCall>(admin, ret(addr(FEED)))
        .on::<IGravitaAdmin::getMintCapCall, _>(admin, |_| Some(ret(units(1_000_000, 18))))
        .on::<IGravitaAdmin::getMinNetDebtCall, _>(admin, |_| Some(ret(units(2000, 18))))
        .on::<IGravitaAdmin::getTotalAssetDebtCall, _>(admin, |_| Some(ret(units(50_000, 18))))
        .on::<IGravitaAdmin::getIsActiveCall, _>(admin, |_| Some(ret(true)))
        .on::<IGravitaAdmin::getMcrCall, _>(admin, |_| Some(ret(units(11, 17))))
        .on::<IGravitaAdmin::getCcrCall, _>(admin, |_| Some(ret(units(15, 17))));

    for (token, symbol) in [(WETH, "WETH"), (RETH, "rETH")] {
        chain
            .returns::<IERC20::nameCall>(addr(token), ret(format!("{symbol} token")))
            .returns::<IERC20::symbolCall>(addr(token), ret(symbol.to_string()))
            .returns::<IERC20::decimalsCall>(addr(token), ret(U256::from(18u8)))
            .on::<IERC20::balanceOfCall, _>(addr(token), |call| {
                let held = if call.account == addr(ACCOUNT) { 3 } else { 1 };
                Some(ret(units(held, 18)))
            });
    }

    chain.on::<IGravitaPriceFeed::oraclesCall, _>(addr(FEED), |call| {
        let (oracle, eth_indexed) = if call.token == addr(WETH) {
            (addr(WETH_ORACLE), false)
        } else {
            (addr(RETH_ORACLE), true)
        };
        Some((oracle, U256::ZERO, U256::from(3600u64), U256::from(8u64), eth_indexed).abi_encode_params())
    });
    chain.returns::<IChainlinkAggregator::latestRoundDataCall>(addr(WETH_ORACLE), round(1800_00000000));
    chain.returns::<IChainlinkAggregator::latestRoundDataCall>(addr(RETH_ORACLE), round(1_07000000));

    let vm = addr(VESSELS);
    chain
        .on::<IVesselManager::getVesselCollCall, _>(vm, |call| {
            Some(ret(if call.asset == addr(WETH) { units(10, 18) } else { U256::ZERO }))
        })
        .on::<IVesselManager::getVesselDebtCall, _>(vm, |call| {
            Some(ret(if call.asset == addr(WETH) { units(5000, 18) } else { U256::ZERO }))
        })
        .on::<IVesselManager::getVesselStatusCall, _>(vm, |call| {
            Some(ret(U256::from(if call.asset == addr(WETH) { 1u64 } else { 0 })))
        });
    chain
}

fn ctx() -> FetchContext {
    FetchContext {
        admin: addr(ADMIN),
        vessel_manager: addr(VESSELS),
        account: addr(ACCOUNT),
        proxy: addr(PROXY),
    }
}

fn book() -> AddressBook {
    let mut book = AddressBook::for_network(Network::Goerli);
    book.set(Contract::GravitaAdmin, addr(ADMIN));
    book.set(Contract::GravitaVesselManager, addr(VESSELS));
    book
}

fn grai() -> Token {
    Token::new(addr(0x6a), "GRAI", 18)
}

// ── Snapshot fetch ──────────────────────────────────────────────────

#[tokio::test]
async fn fetch_builds_full_snapshot() {
    let chain = gravita_chain();
    let infos = fetch_collaterals(&chain, &ctx()).await.unwrap();
    assert_eq!(infos.len(), 2);
    // discovery, parameters, prices
    assert_eq!(chain.multicall_count(), 3);

    let weth = &infos[0];
    assert_eq!(weth.symbol, "WETH");
    assert_eq!(weth.name, "WETH token");
    assert_eq!(weth.decimals, 18);
    assert_eq!(weth.balance_of, units(3, 18));
    assert_eq!(weth.balance_of_proxy, units(1, 18));
    assert_eq!(weth.min_collateral_ratio, units(11, 17));
    assert_eq!(weth.price_feed, addr(WETH_ORACLE));
    assert_eq!(weth.price, units(1800, 8));
    assert_eq!(weth.vessel_status, VesselStatus::Active);
    assert_eq!(weth.restore_data.collateral, units(10, 18));
    assert_eq!(weth.restore_data.debt, units(5000, 18));

    let reth = &infos[1];
    assert!(reth.is_price_eth_indexed);
    // 1.07 ETH × 1800 USD
    assert_eq!(reth.price, units(1926, 8));
    assert_eq!(reth.vessel_status, VesselStatus::None);
}

#[tokio::test]
async fn failed_price_read_is_tolerated() {
    let mut chain = gravita_chain();
    chain.fails::<IChainlinkAggregator::latestRoundDataCall>(addr(WETH_ORACLE));
    let infos = fetch_collaterals(&chain, &ctx()).await.unwrap();

    assert_eq!(infos[0].price, U256::ZERO);
    // WETH price unknown, so the ETH-indexed price collapses to zero too
    assert_eq!(infos[1].price, U256::ZERO);
    assert_eq!(infos[0].mint_cap, units(1_000_000, 18));
}

#[tokio::test]
async fn missing_oracle_record_is_tolerated() {
    let mut chain = gravita_chain();
    chain.fails::<IGravitaPriceFeed::oraclesCall>(addr(FEED));
    let infos = fetch_collaterals(&chain, &ctx()).await.unwrap();
    assert!(infos.iter().all(|c| c.price.is_zero() && c.price_feed == Address::ZERO));
    assert_eq!(infos[0].price_decimals, 8);
}

#[tokio::test]
async fn unusable_oracle_decimals_count_as_missing_oracle() {
    let mut chain = gravita_chain();
    chain.on::<IGravitaPriceFeed::oraclesCall, _>(addr(FEED), |call| {
        let decimals = if call.token == addr(RETH) { U256::from(300u64) } else { U256::from(8u64) };
        let oracle = if call.token == addr(RETH) { addr(RETH_ORACLE) } else { addr(WETH_ORACLE) };
        Some((oracle, U256::ZERO, U256::from(3600u64), decimals, false).abi_encode_params())
    });
    let infos = fetch_collaterals(&chain, &ctx()).await.unwrap();

    assert_eq!(infos[0].price, units(1800, 8));
    assert_eq!(infos[1].price_feed, Address::ZERO);
    assert_eq!(infos[1].price, U256::ZERO);
    assert_eq!(infos[1].price_decimals, 8);
}

#[tokio::test]
async fn failed_parameter_read_is_fatal() {
    let mut chain = gravita_chain();
    chain.fails::<IGravitaAdmin::getMcrCall>(addr(ADMIN));
    assert!(matches!(
        fetch_collaterals(&chain, &ctx()).await,
        Err(Error::BatchReadFailure { .. })
    ));
}

#[tokio::test]
async fn failed_vessel_read_is_fatal() {
    let mut chain = gravita_chain();
    chain.fails::<IVesselManager::getVesselDebtCall>(addr(VESSELS));
    assert!(fetch_collaterals(&chain, &ctx()).await.is_err());
}

// ── Pending vessel view ─────────────────────────────────────────────

async fn live_session() -> Session<MockChain> {
    let mut s = Session::connect(gravita_chain(), book(), addr(ACCOUNT));
    s.select_position(U256::from(1u64), addr(PROXY));
    s.refresh_gravita().await.unwrap();
    s
}

#[tokio::test]
async fn refresh_without_position_is_a_no_op() {
    let mut s = Session::connect(gravita_chain(), book(), addr(ACCOUNT));
    s.refresh_gravita().await.unwrap();
    assert!(s.gravita().collaterals().is_empty());
    assert_eq!(s.client().multicall_count(), 0);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut chain = gravita_chain();
    let seen = calls.clone();
    chain.on::<IGravitaAdmin::getValidCollateralCall, _>(addr(ADMIN), move |_| {
        // only the first discovery succeeds
        (seen.fetch_add(1, Ordering::SeqCst) == 0).then(|| ret(vec![addr(WETH), addr(RETH)]))
    });
    let mut s = Session::connect(chain, book(), addr(ACCOUNT));
    s.select_position(U256::from(1u64), addr(PROXY));

    s.refresh_gravita().await.unwrap();
    assert_eq!(s.gravita().collaterals().len(), 2);

    assert!(matches!(
        s.refresh_gravita().await,
        Err(Error::BatchReadFailure { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(s.gravita().collaterals().len(), 2);
}

#[tokio::test]
async fn pending_actions_replay_onto_restore_data() {
    let mut s = live_session().await;
    let weth = s.gravita().by_symbol("WETH").unwrap().token();
    let reth = s.gravita().by_symbol("rETH").unwrap().token();

    s.push_action(build::gravita_open(
        &reth,
        &grai(),
        units(4, 18),
        units(2500, 18),
        Default::default(),
    ))
    .unwrap();
    s.push_action(build::gravita_adjust(
        &weth,
        &grai(),
        (units(10, 18), units(5000, 18)),
        (units(12, 18), units(6000, 18)),
        Default::default(),
    ))
    .unwrap();

    let reth_info = s.gravita().collateral(reth.address).unwrap();
    assert!(reth_info.has_vessel());
    assert_eq!(reth_info.vessel_debt, units(2500, 18));
    let weth_info = s.gravita().collateral(weth.address).unwrap();
    assert_eq!(weth_info.vessel_collateral, units(12, 18));
    // baseline untouched
    assert_eq!(weth_info.restore_data.collateral, units(10, 18));

    let before = s.gravita().collaterals().to_vec();
    s.recalculate_vessels();
    s.recalculate_vessels();
    assert_eq!(s.gravita().collaterals(), before.as_slice());

    // removing the open restores the on-chain state
    s.remove_action(0).unwrap();
    assert!(!s.gravita().collateral(reth.address).unwrap().has_vessel());
}

#[tokio::test]
async fn close_wins_over_earlier_adjust() {
    let mut s = live_session().await;
    let weth = s.gravita().by_symbol("WETH").unwrap().token();

    s.push_action(build::gravita_close(&weth, &grai(), units(10, 18), units(5000, 18)))
        .unwrap();
    s.push_action(build::gravita_adjust(
        &weth,
        &grai(),
        (units(10, 18), units(5000, 18)),
        (units(11, 18), units(5000, 18)),
        Default::default(),
    ))
    .unwrap();

    let info = s.gravita().collateral(weth.address).unwrap();
    assert_eq!(info.vessel_status, VesselStatus::None);
    assert_eq!(info.vessel_collateral, U256::ZERO);

    let active = s.active_vessels();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|v| !v.has_vessel));
}

#[tokio::test]
async fn active_vessels_lists_pending_opens_first() {
    let mut s = live_session().await;
    let reth = s.gravita().by_symbol("rETH").unwrap().token();
    s.push_action(build::gravita_open(
        &reth,
        &grai(),
        units(1, 18),
        units(2000, 18),
        Default::default(),
    ))
    .unwrap();

    let active = s.active_vessels();
    assert_eq!(active.len(), 3);
    assert_eq!(active[0].address, reth.address);
    assert!(active[0].has_vessel);
    assert_eq!(active[1].address, addr(WETH));
    assert!(active[1].has_vessel);
}

// ── Hints ───────────────────────────────────────────────────────────

#[tokio::test]
async fn hints_walk_the_sorted_list() {
    let sorted = addr(0x50);
    let ops = addr(0x0b);
    let mut chain = MockChain::new();
    chain
        .returns::<ISortedVessels::getSizeCall>(sorted, ret(U256::from(4u64)))
        .on::<IVesselManagerOperations::computeNominalCRCall, _>(ops, |call| {
            Some(ret(call.coll * U256::from(100u64) / call.debt))
        })
        .on::<IVesselManagerOperations::getApproxHintCall, _>(ops, |call| {
            assert_eq!(call.numTrials, U256::from(60u64));
            assert_eq!(call.inputRandomSeed, U256::from(99u64));
            Some((addr(0x77), U256::ZERO, U256::from(1u64)).abi_encode_params())
        })
        .on::<ISortedVessels::findInsertPositionCall, _>(sorted, |call| {
            assert_eq!(call.prevId, addr(0x77));
            assert_eq!(call.nextId, addr(0x77));
            assert_eq!(call.nicr, U256::from(200u64));
            Some((addr(0x71), addr(0x72)).abi_encode_params())
        });

    let h = hints::calculate(&chain, sorted, ops, addr(WETH), U256::from(4u64), U256::from(2u64), U256::from(99u64))
        .await
        .unwrap();
    assert_eq!(h.upper, addr(0x71));
    assert_eq!(h.lower, addr(0x72));
}
