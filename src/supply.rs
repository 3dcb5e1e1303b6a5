use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// A whole-unit supply together with its value in the token's base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyAmount {
    pub raw_whole_units: String,
    pub decimals: u8,
    pub scaled: U256,
}

/// Scales a whole-unit decimal string by `10^decimals`.
///
/// Only ASCII digits are accepted. The result must fit in a `uint256`,
/// which is what the token constructor takes.
pub fn scale_supply(raw: &str, decimals: u8) -> DeployResult<SupplyAmount> {
    let raw = raw.trim();

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeployError::InvalidAmount(raw.to_string()));
    }

    let whole = U256::from_dec_str(raw)
        .map_err(|_| DeployError::InvalidAmount(raw.to_string()))?;

    // 10^decimals alone overflows past 77 decimals, zero never does
    let scaled = if whole.is_zero() {
        Some(U256::zero())
    } else {
        U256::from(10u8)
            .checked_pow(U256::from(decimals))
            .and_then(|multiplier| whole.checked_mul(multiplier))
    }
    .ok_or_else(|| {
        DeployError::InvalidAmount(format!(
            "{raw} with {decimals} decimals overflows uint256"
        ))
    })?;

    Ok(SupplyAmount {
        raw_whole_units: raw.to_string(),
        decimals,
        scaled,
    })
}
