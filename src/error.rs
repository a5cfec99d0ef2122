use alloy::primitives::TxHash;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A read that the caller cannot proceed without came back unsuccessful.
    #[error("Batched read `{call}` failed")]
    BatchReadFailure { call: String },

    #[error("Index {index} out of range for action list of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("A flash loan is already pending; remove it before adding another")]
    FlashLoanActive,

    #[error("Flash loan steps must be added as a pair via insert_flash_loan")]
    FlashLoanInsert,

    #[error("A flash loan borrows one or two assets, got {0}")]
    FlashLoanLegs(usize),

    #[error("Route through {hops} intermediate assets exceeds the limit of {max}")]
    TooManyHops { hops: usize, max: usize },

    #[error("{segments} path segments over {tiers} fee tiers is too many routes to quote")]
    TooManyRoutes { segments: usize, tiers: usize },

    #[error("Could not decode result of `{call}`: {reason}")]
    Decode { call: String, reason: String },

    #[error("Invalid amount `{0}`")]
    InvalidAmount(String),

    #[error("No `{name}` address configured for network {network}")]
    UnknownAddress { name: String, network: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("{label} tx reverted (hash: {tx:?})")]
    Reverted { label: String, tx: TxHash },

    #[error("Price API error: {0}")]
    PriceApi(String),

    #[error("Plan error: {0}")]
    Plan(String),
}

impl Error {
    pub(crate) fn decode(call: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Decode {
            call: call.into(),
            reason: err.to_string(),
        }
    }
}
