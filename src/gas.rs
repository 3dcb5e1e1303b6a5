use std::fmt;
use std::str::FromStr;

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::LedgerClient;
use crate::error::{DeployError, DeployResult};
use crate::types::GasLimit;

/// Number of fractional digits a gwei amount can carry into wei.
const GWEI_DECIMALS: usize = 9;

/// A gas price as typed by a human, in gwei.
///
/// Conversion to wei is exact: up to nine fractional digits are kept and
/// anything finer is rejected instead of being truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPriceInput {
    wei: U256,
}

impl GasPriceInput {
    pub fn wei(&self) -> U256 {
        self.wei
    }

    pub fn is_zero(&self) -> bool {
        self.wei.is_zero()
    }
}

impl FromStr for GasPriceInput {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |why: &str| {
            DeployError::Configuration(format!("gas price {s:?}: {why}"))
        };

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number of gwei"));
        }

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(whole) || !is_digits(fraction) {
            return Err(invalid("expected a non-negative decimal number"));
        }

        if fraction.len() > GWEI_DECIMALS {
            return Err(invalid("more precise than 1 wei"));
        }

        let digits =
            format!("{whole}{fraction:0<width$}", width = GWEI_DECIMALS);
        let wei = U256::from_dec_str(&digits)
            .map_err(|_| invalid("does not fit in 256 bits"))?;

        Ok(Self { wei })
    }
}

impl fmt::Display for GasPriceInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let gwei = ethers::utils::format_units(self.wei, "gwei")
            .map_err(|_| fmt::Error)?;

        write!(f, "{gwei}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasPriceSource {
    Explicit,
    Suggested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
    pub gas_limit: GasLimit,
    pub gas_price: U256,
    pub source: GasPriceSource,
}

impl GasPolicy {
    /// Uses the explicit price when it is set and non-zero, otherwise asks
    /// the network for a suggestion.
    #[instrument(skip(client))]
    pub async fn resolve(
        client: &dyn LedgerClient,
        gas_limit: GasLimit,
        explicit_price: Option<GasPriceInput>,
    ) -> DeployResult<Self> {
        if let Some(price) = explicit_price.filter(|p| !p.is_zero()) {
            info!(gas_price_gwei = %price, "Using explicit gas price");

            return Ok(Self {
                gas_limit,
                gas_price: price.wei(),
                source: GasPriceSource::Explicit,
            });
        }

        let gas_price = client
            .gas_price()
            .await
            .map_err(|err| DeployError::GasPriceUnavailable(err.to_string()))?;

        if gas_price.is_zero() {
            return Err(DeployError::GasPriceUnavailable(
                "network suggested a zero gas price".to_string(),
            ));
        }

        info!(%gas_price, "Using network suggested gas price");

        Ok(Self {
            gas_limit,
            gas_price,
            source: GasPriceSource::Suggested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::testing::FakeLedger;

    fn wei(s: &str) -> U256 {
        s.parse::<GasPriceInput>().unwrap().wei()
    }

    #[test]
    fn whole_gwei_converts_to_wei() {
        assert_eq!(wei("5"), U256::from(5_000_000_000u64));
        assert_eq!(wei("0"), U256::zero());
        assert_eq!(wei("250"), U256::from(250_000_000_000u64));
    }

    #[test]
    fn fractional_gwei_is_exact() {
        assert_eq!(wei("1.5"), U256::from(1_500_000_000u64));
        assert_eq!(wei("0.1"), U256::from(100_000_000u64));
        assert_eq!(wei("0.000000001"), U256::one());
        assert_eq!(wei(".25"), U256::from(250_000_000u64));
        assert_eq!(wei("3."), U256::from(3_000_000_000u64));
    }

    #[test]
    fn sub_wei_precision_is_rejected() {
        assert!(matches!(
            "0.0000000001".parse::<GasPriceInput>(),
            Err(DeployError::Configuration(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", ".", "-1", "abc", "1.2.3", "1e9", " 1 5"] {
            assert!(
                input.parse::<GasPriceInput>().is_err(),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn displays_in_gwei() {
        let price: GasPriceInput = "1.5".parse().unwrap();

        assert_eq!(price.to_string(), "1.500000000");
    }

    #[tokio::test]
    async fn explicit_price_skips_the_network() {
        let ledger = FakeLedger::default();

        let policy = GasPolicy::resolve(
            &ledger,
            GasLimit(3_000_000),
            Some("5".parse().unwrap()),
        )
        .await
        .unwrap();

        assert_eq!(policy.gas_price, U256::from(5_000_000_000u64));
        assert_eq!(policy.source, GasPriceSource::Explicit);
        assert_eq!(policy.gas_limit, GasLimit(3_000_000));
        assert_eq!(ledger.calls().gas_price, 0);
    }

    #[tokio::test]
    async fn zero_price_falls_back_to_suggestion() {
        let ledger = FakeLedger {
            gas_price: Ok(U256::from(42)),
            ..Default::default()
        };

        let policy = GasPolicy::resolve(
            &ledger,
            GasLimit(21_000),
            Some("0".parse().unwrap()),
        )
        .await
        .unwrap();

        assert_eq!(policy.gas_price, U256::from(42));
        assert_eq!(policy.source, GasPriceSource::Suggested);
        assert_eq!(ledger.calls().gas_price, 1);
    }

    #[tokio::test]
    async fn missing_suggestion_is_fatal() {
        let ledger = FakeLedger {
            gas_price: Err(ClientError::Transport("refused".into())),
            ..Default::default()
        };

        let err = GasPolicy::resolve(&ledger, GasLimit(21_000), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::GasPriceUnavailable(_)));
    }

    #[tokio::test]
    async fn zero_suggestion_is_fatal() {
        let ledger = FakeLedger {
            gas_price: Ok(U256::zero()),
            ..Default::default()
        };

        let err = GasPolicy::resolve(&ledger, GasLimit(21_000), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::GasPriceUnavailable(_)));
    }
}
