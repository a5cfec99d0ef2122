//! Conversions between human-readable decimal amounts and integer base units.

use alloy::primitives::U256;

use crate::error::{Error, Result};

/// Largest precision whose scale `10^decimals` fits in a `U256`.
pub const MAX_DECIMALS: u8 = 77;

/// `10^decimals` as a `U256`, or `None` above [`MAX_DECIMALS`].
pub fn pow10(decimals: u8) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(decimals))
}

/// Convert base units to a human-readable float. Lossy; display and price math only.
pub fn standardise(amount: U256, decimals: u8) -> f64 {
    let raw: f64 = amount.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}

/// Parse a decimal string ("1000.50", "0.000005", "42") into base units.
///
/// Empty input is zero. More fractional digits than `decimals` is rejected
/// rather than silently rounded.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Ok(U256::ZERO);
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    let valid = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !valid(whole) || !valid(frac) {
        return Err(Error::InvalidAmount(amount.to_string()));
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(Error::InvalidAmount(format!(
            "{amount} has more than {decimals} decimal places"
        )));
    }

    let parse = |s: &str| -> Result<U256> {
        if s.is_empty() {
            return Ok(U256::ZERO);
        }
        U256::from_str_radix(s, 10).map_err(|_| Error::InvalidAmount(amount.to_string()))
    };

    let scale = |d: u8| {
        pow10(d).ok_or_else(|| Error::InvalidAmount(format!("{amount}: {decimals} decimals is out of range")))
    };
    let whole_units = parse(whole)?
        .checked_mul(scale(decimals)?)
        .ok_or_else(|| Error::InvalidAmount(amount.to_string()))?;
    let frac_units = parse(frac)? * scale(decimals - frac.len() as u8)?;
    Ok(whole_units + frac_units)
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let (whole, frac) = match pow10(decimals) {
        Some(divisor) => (amount / divisor, amount % divisor),
        // any U256 is below one whole unit at this precision
        None => (U256::ZERO, amount),
    };
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
