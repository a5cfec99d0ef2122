use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;

use crate::abi::{ISortedVessels, IVesselManagerOperations};
use crate::actions::build::Hints;
use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::multicall::Batch;

/// Trials per list entry for the approximate hint walk.
const HINT_TRIALS_PER_VESSEL: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Read {
    Size,
    NominalCr,
}

/// Find the sorted-list neighbours for a vessel of `coll` against `debt`.
pub async fn calculate<C: ChainClient + ?Sized>(
    client: &C,
    sorted_vessels: Address,
    vessel_manager_operations: Address,
    collateral: Address,
    coll: U256,
    debt: U256,
    random_seed: U256,
) -> Result<Hints> {
    let mut batch = Batch::new();
    batch.push(Read::Size, sorted_vessels, &ISortedVessels::getSizeCall { asset: collateral });
    batch.push(
        Read::NominalCr,
        vessel_manager_operations,
        &IVesselManagerOperations::computeNominalCRCall { coll, debt },
    );
    let results = batch.execute(client).await?;
    let size = results.required::<ISortedVessels::getSizeCall>(&Read::Size)?;
    let nicr = results.required::<IVesselManagerOperations::computeNominalCRCall>(&Read::NominalCr)?;

    let approx = IVesselManagerOperations::getApproxHintCall {
        asset: collateral,
        cr: nicr,
        numTrials: size * U256::from(HINT_TRIALS_PER_VESSEL),
        inputRandomSeed: random_seed,
    };
    let raw = client
        .call(vessel_manager_operations, approx.abi_encode().into())
        .await?;
    let hint = IVesselManagerOperations::getApproxHintCall::abi_decode_returns(&raw)
        .map_err(|e| Error::decode("getApproxHint", e))?
        .hintAddress;

    let insert = ISortedVessels::findInsertPositionCall {
        asset: collateral,
        nicr,
        prevId: hint,
        nextId: hint,
    };
    let raw = client.call(sorted_vessels, insert.abi_encode().into()).await?;
    let position = ISortedVessels::findInsertPositionCall::abi_decode_returns(&raw)
        .map_err(|e| Error::decode("findInsertPosition", e))?;

    tracing::debug!(%collateral, %size, upper = %position._0, lower = %position._1, "vessel hints");
    Ok(Hints {
        upper: position._0,
        lower: position._1,
    })
}
