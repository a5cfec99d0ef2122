#[cfg(feature = "full")]
pub mod rpc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::multicall::{CallOutcome, ReadCall};

/// A state-changing call to submit from the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Short label for logs and revert errors.
    pub label: String,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Read/write access to the chain on behalf of the connected wallet.
///
/// The live implementation talks JSON-RPC through alloy; tests script it.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Single read (`eth_call`), returning raw return data.
    async fn call(&self, target: Address, calldata: Bytes) -> Result<Bytes>;

    /// Batched read in one round trip. Individual calls may fail; the batch
    /// returns one outcome per call in request order.
    async fn multicall(&self, calls: &[ReadCall]) -> Result<Vec<CallOutcome>>;

    /// Sign and submit a transaction, returning once it is mined successfully.
    async fn send(&self, tx: TxRequest) -> Result<TxHash>;
}
