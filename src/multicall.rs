//! Keyed read batching.
//!
//! Every call pushed into a [`Batch`] carries a correlation key. The chain
//! client executes the batch in one round trip and results are looked up by
//! key, never by position.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;

use crate::chain::ChainClient;
use crate::error::{Error, Result};

/// A single read against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub target: Address,
    pub calldata: Bytes,
}

impl ReadCall {
    pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
        ReadCall {
            target,
            calldata: call.abi_encode().into(),
        }
    }
}

/// Per-call status as reported by the batching contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Bytes,
}

impl CallOutcome {
    pub fn ok(return_data: impl Into<Bytes>) -> Self {
        CallOutcome {
            success: true,
            return_data: return_data.into(),
        }
    }

    pub fn failed() -> Self {
        CallOutcome {
            success: false,
            return_data: Bytes::new(),
        }
    }
}

// ── Batch builder ──────────────────────────────────────────────────

#[derive(Debug)]
pub struct Batch<K> {
    keys: Vec<K>,
    calls: Vec<ReadCall>,
}

impl<K> Default for Batch<K> {
    fn default() -> Self {
        Batch {
            keys: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> Batch<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<C: SolCall>(&mut self, key: K, target: Address, call: &C) {
        self.keys.push(key);
        self.calls.push(ReadCall::new(target, call));
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn calls(&self) -> &[ReadCall] {
        &self.calls
    }

    /// Execute the whole batch in one round trip.
    pub async fn execute<C: ChainClient + ?Sized>(self, client: &C) -> Result<BatchResults<K>> {
        if self.calls.is_empty() {
            return Ok(BatchResults {
                outcomes: HashMap::new(),
            });
        }
        let outcomes = client.multicall(&self.calls).await?;
        self.into_results(outcomes)
    }

    /// Pair raw outcomes with their keys.
    pub fn into_results(self, outcomes: Vec<CallOutcome>) -> Result<BatchResults<K>> {
        if outcomes.len() != self.keys.len() {
            return Err(Error::Rpc(format!(
                "multicall returned {} results for {} calls",
                outcomes.len(),
                self.keys.len()
            )));
        }
        Ok(BatchResults {
            outcomes: self.keys.into_iter().zip(outcomes).collect(),
        })
    }
}

// ── Results ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BatchResults<K> {
    outcomes: HashMap<K, CallOutcome>,
}

impl<K: Eq + Hash + Debug> BatchResults<K> {
    /// Decode a read the caller cannot do without. Missing or failed is fatal.
    pub fn required<C: SolCall>(&self, key: &K) -> Result<C::Return> {
        match self.outcomes.get(key) {
            Some(outcome) if outcome.success => C::abi_decode_returns(&outcome.return_data)
                .map_err(|e| Error::decode(format!("{key:?}"), e)),
            _ => Err(Error::BatchReadFailure {
                call: format!("{key:?}"),
            }),
        }
    }

    /// Decode a read that is allowed to fail. Undecodable data counts as missing.
    pub fn optional<C: SolCall>(&self, key: &K) -> Option<C::Return> {
        let outcome = self.outcomes.get(key).filter(|o| o.success)?;
        match C::abi_decode_returns(&outcome.return_data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(call = ?key, error = %e, "optional read returned undecodable data");
                None
            }
        }
    }
}
