use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use super::{ChainClient, TxRequest};
use crate::abi::IMulticall3;
use crate::error::{Error, Result};
use crate::multicall::{CallOutcome, ReadCall};

/// JSON-RPC chain client with a local signer. Reads are batched through Multicall3.
pub struct RpcClient {
    provider: DynProvider,
    multicall: Address,
    wallet_address: Address,
}

impl RpcClient {
    pub fn new(rpc_url: &str, private_key: &str, multicall: Address) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| Error::Rpc(format!("Invalid private key: {e}")))?;
        let wallet_address = signer.address();
        let url = rpc_url
            .parse()
            .map_err(|e| Error::Rpc(format!("Invalid RPC URL {rpc_url}: {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(RpcClient {
            provider,
            multicall,
            wallet_address,
        })
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| Error::Rpc(format!("eth_chainId: {e}")))
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn call(&self, target: Address, calldata: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .with_to(target)
            .with_input(calldata);
        self.provider
            .call(tx)
            .await
            .map_err(|e| Error::Rpc(format!("eth_call to {target}: {e}")))
    }

    async fn multicall(&self, calls: &[ReadCall]) -> Result<Vec<CallOutcome>> {
        let aggregate = IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|c| IMulticall3::Call3 {
                    target: c.target,
                    allowFailure: true,
                    callData: c.calldata.clone(),
                })
                .collect(),
        };
        let raw = self
            .call(self.multicall, aggregate.abi_encode().into())
            .await?;
        let results = IMulticall3::aggregate3Call::abi_decode_returns(&raw)
            .map_err(|e| Error::decode("aggregate3", e))?;
        tracing::debug!(calls = calls.len(), "multicall round trip");
        Ok(results
            .into_iter()
            .map(|r| CallOutcome {
                success: r.success,
                return_data: r.returnData,
            })
            .collect())
    }

    async fn send(&self, tx: TxRequest) -> Result<TxHash> {
        let request = TransactionRequest::default()
            .with_from(self.wallet_address)
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value);

        let receipt = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| Error::Rpc(format!("{} tx send: {e}", tx.label)))?
            .get_receipt()
            .await
            .map_err(|e| Error::Rpc(format!("{} tx receipt: {e}", tx.label)))?;

        if !receipt.status() {
            return Err(Error::Reverted {
                label: tx.label,
                tx: receipt.transaction_hash,
            });
        }
        tracing::info!(label = %tx.label, tx = ?receipt.transaction_hash, "transaction mined");
        Ok(receipt.transaction_hash)
    }
}
