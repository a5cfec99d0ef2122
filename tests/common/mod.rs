#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use petalex::chain::{ChainClient, TxRequest};
use petalex::multicall::{CallOutcome, ReadCall};
use petalex::{Error, Result};

// ── Mock chain ──────────────────────────────────────────────────────

type Handler = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// A scripted chain: reads are answered by per-(target, selector) handlers,
/// writes are recorded. Unscripted reads fail.
#[derive(Default)]
pub struct MockChain {
    handlers: HashMap<(Address, [u8; 4]), Handler>,
    pub sent: Mutex<Vec<TxRequest>>,
    pub multicalls: Mutex<usize>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `C` call to `target` with `handler(decoded call)`.
    /// Returning `None` makes that call fail.
    pub fn on<C, F>(&mut self, target: Address, handler: F) -> &mut Self
    where
        C: SolCall,
        F: Fn(C) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        let handler: Handler = Box::new(move |data| C::abi_decode(data).ok().and_then(&handler));
        self.handlers.insert((target, C::SELECTOR), handler);
        self
    }

    /// Answer every `C` call to `target` with a fixed return value.
    pub fn returns<C: SolCall>(&mut self, target: Address, encoded: Vec<u8>) -> &mut Self {
        self.on::<C, _>(target, move |_| Some(encoded.clone()))
    }

    /// Make every `C` call to `target` fail.
    pub fn fails<C: SolCall>(&mut self, target: Address) -> &mut Self {
        self.on::<C, _>(target, |_| None)
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn multicall_count(&self) -> usize {
        *self.multicalls.lock().unwrap()
    }

    fn answer(&self, target: Address, data: &[u8]) -> Option<Vec<u8>> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let handler = self.handlers.get(&(target, selector))?;
        handler(data)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, target: Address, calldata: Bytes) -> Result<Bytes> {
        self.answer(target, &calldata)
            .map(Bytes::from)
            .ok_or_else(|| Error::Rpc(format!("execution reverted: {target}")))
    }

    async fn multicall(&self, calls: &[ReadCall]) -> Result<Vec<CallOutcome>> {
        *self.multicalls.lock().unwrap() += 1;
        Ok(calls
            .iter()
            .map(|c| match self.answer(c.target, &c.calldata) {
                Some(data) => CallOutcome::ok(data),
                None => CallOutcome::failed(),
            })
            .collect())
    }

    async fn send(&self, tx: TxRequest) -> Result<TxHash> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(TxHash::with_last_byte(sent.len() as u8))
    }
}

// ── Encoding helpers ────────────────────────────────────────────────

/// Return data for a function with a single return value.
pub fn ret<T: SolValue>(value: T) -> Vec<u8> {
    (value,).abi_encode_params()
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn units(whole: u64, decimals: u8) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(decimals))
}
