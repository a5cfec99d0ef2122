//! Best-route search over Uniswap V3 fee tiers.

use alloy::primitives::{Address, Bytes, U256};

use crate::abi::IQuoter;
use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::multicall::Batch;
use crate::units;

/// Fee tiers (hundredths of a bip) a pool may exist at.
pub const FEE_TIERS: [u32; 4] = [100, 500, 3000, 10_000];

/// Most intermediate assets a quoted route may pass through.
pub const MAX_HOPS: usize = 3;

/// Upper bound on tier combinations enumerated for a single quote.
const MAX_ROUTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    /// `amount` is the input; maximise output.
    ExactInput,
    /// `amount` is the desired output; minimise input.
    ExactOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    /// Intermediate assets, in swap order.
    pub hops: Vec<Address>,
    pub amount: U256,
    pub mode: QuoteMode,
}

impl QuoteRequest {
    fn tokens(&self) -> Vec<Address> {
        let mut tokens = Vec::with_capacity(self.hops.len() + 2);
        tokens.push(self.token_in);
        tokens.extend(&self.hops);
        tokens.push(self.token_out);
        tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Quote {
    /// Output for exact-input, required input for exact-output. Zero when no route quoted.
    pub amount: U256,
    /// Packed path as the router expects it (reversed for exact-output).
    pub path: Bytes,
    /// Fee tier per segment, in swap order.
    pub fees: Vec<u32>,
}

/// Every assignment of a tier to each of `segments` path segments.
///
/// Combination `i` assigns segment `j` the tier at digit `j` of `i` in base `tiers.len()`.
pub fn fee_combinations(tiers: &[u32], segments: usize) -> Result<Vec<Vec<u32>>> {
    if tiers.is_empty() || segments == 0 {
        return Ok(Vec::new());
    }
    let base = tiers.len();
    let total = u32::try_from(segments)
        .ok()
        .and_then(|s| base.checked_pow(s))
        .filter(|total| *total <= MAX_ROUTES)
        .ok_or(Error::TooManyRoutes { segments, tiers: base })?;
    Ok((0..total)
        .map(|i| {
            let mut rest = i;
            (0..segments)
                .map(|_| {
                    let tier = tiers[rest % base];
                    rest /= base;
                    tier
                })
                .collect()
        })
        .collect())
}

/// Pack `token (20) | fee (3) | token (20) | ...`.
pub fn encode_path(tokens: &[Address], fees: &[u32]) -> Option<Bytes> {
    if tokens.len() < 2 || fees.len() + 1 != tokens.len() {
        return None;
    }
    let mut out: Vec<u8> = Vec::with_capacity(tokens.len() * 23);
    out.extend_from_slice(tokens[0].as_slice());
    for (i, fee) in fees.iter().enumerate() {
        out.extend_from_slice(&fee.to_be_bytes()[1..]);
        out.extend_from_slice(tokens[i + 1].as_slice());
    }
    Some(out.into())
}

fn router_path(tokens: &[Address], fees: &[u32], mode: QuoteMode) -> Option<Bytes> {
    match mode {
        QuoteMode::ExactInput => encode_path(tokens, fees),
        QuoteMode::ExactOutput => {
            let tokens: Vec<Address> = tokens.iter().rev().copied().collect();
            let fees: Vec<u32> = fees.iter().rev().copied().collect();
            encode_path(&tokens, &fees)
        }
    }
}

/// Quote every tier combination in one batch and keep the best.
///
/// Ties keep the first combination; if nothing quotes, returns a zero quote.
pub async fn best_quote<C: ChainClient + ?Sized>(
    client: &C,
    quoter: Address,
    tiers: &[u32],
    request: &QuoteRequest,
) -> Result<Quote> {
    if request.hops.len() > MAX_HOPS {
        return Err(Error::TooManyHops {
            hops: request.hops.len(),
            max: MAX_HOPS,
        });
    }
    let tokens = request.tokens();
    let combos = fee_combinations(tiers, tokens.len() - 1)?;

    let mut paths = Vec::with_capacity(combos.len());
    let mut batch = Batch::new();
    for (i, fees) in combos.iter().enumerate() {
        let Some(path) = router_path(&tokens, fees, request.mode) else {
            continue;
        };
        match request.mode {
            QuoteMode::ExactInput => batch.push(
                i,
                quoter,
                &IQuoter::quoteExactInputCall {
                    path: path.clone(),
                    amountIn: request.amount,
                },
            ),
            QuoteMode::ExactOutput => batch.push(
                i,
                quoter,
                &IQuoter::quoteExactOutputCall {
                    path: path.clone(),
                    amountOut: request.amount,
                },
            ),
        }
        paths.push((i, path));
    }
    tracing::debug!(combinations = paths.len(), mode = ?request.mode, "quoting routes");
    let results = batch.execute(client).await?;

    let mut best: Option<(U256, usize, Bytes)> = None;
    for (i, path) in paths {
        let quoted = match request.mode {
            QuoteMode::ExactInput => results.optional::<IQuoter::quoteExactInputCall>(&i),
            QuoteMode::ExactOutput => results.optional::<IQuoter::quoteExactOutputCall>(&i),
        };
        let Some(amount) = quoted else {
            continue;
        };
        let better = match (&best, request.mode) {
            (None, _) => true,
            (Some((current, ..)), QuoteMode::ExactInput) => amount > *current,
            (Some((current, ..)), QuoteMode::ExactOutput) => amount < *current,
        };
        if better {
            best = Some((amount, i, path));
        }
    }

    Ok(match best {
        Some((amount, i, path)) => Quote {
            amount,
            path,
            fees: combos[i].clone(),
        },
        None => Quote::default(),
    })
}

/// Percentage by which a fill is worse than the reference market rate.
/// Positive means the trade receives less (or pays more) than market.
pub fn price_impact(
    amount_in: U256,
    decimals_in: u8,
    price_in: f64,
    amount_out: U256,
    decimals_out: u8,
    price_out: f64,
) -> f64 {
    let value_in = units::standardise(amount_in, decimals_in) * price_in;
    let value_out = units::standardise(amount_out, decimals_out) * price_out;
    if value_in <= 0.0 || price_out <= 0.0 {
        return 0.0;
    }
    (value_in - value_out) / value_in * 100.0
}
