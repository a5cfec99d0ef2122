pub mod abi;
pub mod actions;
pub mod chain;
pub mod error;
pub mod gravita;
pub mod multicall;
pub mod network;
pub mod plan;
pub mod prices;
pub mod session;
pub mod swap;
pub mod units;

#[cfg(feature = "full")]
pub mod config;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Error, Result};
