use std::fmt::Display;
use std::io::{self, Write};

use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::abis::MetadataCall;
use crate::client::LedgerClient;
use crate::config::TokenSpec;
use crate::deployment::Submission;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "failure")]
    Failure,
}

/// What the network recorded for the deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    pub contract_address: Address,
    pub transaction_hash: H256,
    pub status: ReceiptStatus,
    pub gas_used: Option<U256>,
    pub block_number: Option<U64>,
}

impl DeploymentReceipt {
    /// Anything but an explicit status of 1 counts as a failure, which
    /// includes pre-byzantium receipts that carry no status at all.
    pub fn from_mined(
        submission: &Submission,
        receipt: &TransactionReceipt,
    ) -> Self {
        let status = if receipt.status == Some(U64::one()) {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failure
        };

        let contract_address = match receipt.contract_address {
            Some(address) if address != submission.contract_address => {
                warn!(
                    expected = ?submission.contract_address,
                    actual = ?address,
                    "Receipt reports a different contract address"
                );
                address
            }
            _ => submission.contract_address,
        };

        Self {
            contract_address,
            transaction_hash: submission.transaction_hash,
            status,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        }
    }
}

/// Result of comparing one on-chain value with what was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check<T> {
    Verified(T),
    Mismatch { expected: T, actual: T },
    Unavailable(String),
}

impl<T: PartialEq + Clone> Check<T> {
    fn compare(expected: &T, actual: eyre::Result<T>) -> Self {
        match actual {
            Ok(actual) if &actual == expected => Self::Verified(actual),
            Ok(actual) => Self::Mismatch {
                expected: expected.clone(),
                actual,
            },
            Err(err) => Self::Unavailable(format!("{err:#}")),
        }
    }

    fn unavailable(&self) -> Option<&str> {
        match self {
            Self::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVerification {
    pub name: Check<String>,
    pub symbol: Check<String>,
    pub decimals: Check<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { verification: TokenVerification },
    /// Mined, but the constructor reverted or ran out of gas.
    ExecutionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub token: TokenSpec,
    pub receipt: DeploymentReceipt,
    pub outcome: Outcome,
}

impl DeploymentReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }
}

async fn query(
    client: &dyn LedgerClient,
    address: Address,
    call: MetadataCall,
) -> eyre::Result<ethers::types::Bytes> {
    let output = client.call(address, call.calldata()).await?;

    Ok(output)
}

/// Reads back name, symbol and decimals from a successful deployment.
///
/// Each read is independent and best effort. A failed deployment is not
/// queried at all.
#[instrument(skip_all, fields(contract = ?receipt.contract_address))]
pub async fn verify_deployment(
    client: &dyn LedgerClient,
    receipt: &DeploymentReceipt,
    expected: &TokenSpec,
) -> Outcome {
    if receipt.status == ReceiptStatus::Failure {
        return Outcome::ExecutionFailed;
    }

    let address = receipt.contract_address;

    let name = query(client, address, MetadataCall::Name)
        .await
        .and_then(|data| MetadataCall::Name.decode_string(&data));
    let symbol = query(client, address, MetadataCall::Symbol)
        .await
        .and_then(|data| MetadataCall::Symbol.decode_string(&data));
    let decimals = query(client, address, MetadataCall::Decimals)
        .await
        .and_then(|data| MetadataCall::Decimals.decode_u8(&data));

    let verification = TokenVerification {
        name: Check::compare(&expected.name, name),
        symbol: Check::compare(&expected.symbol, symbol),
        decimals: Check::compare(&expected.decimals(), decimals),
    };

    for (call, unavailable) in [
        (MetadataCall::Name, verification.name.unavailable()),
        (MetadataCall::Symbol, verification.symbol.unavailable()),
        (MetadataCall::Decimals, verification.decimals.unavailable()),
    ] {
        if let Some(reason) = unavailable {
            warn!(%call, %reason, "Could not verify token metadata");
        }
    }

    Outcome::Succeeded { verification }
}

pub fn render_submission(
    submission: &Submission,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Token deployment initiated!")?;
    writeln!(out, "Contract address: {:?}", submission.contract_address)?;
    writeln!(out, "Transaction hash: {:?}", submission.transaction_hash)?;
    writeln!(out, "Waiting for transaction to be mined...")?;

    Ok(())
}

fn render_check<T: Display>(
    out: &mut impl Write,
    label: &str,
    check: &Check<T>,
) -> io::Result<()> {
    match check {
        Check::Verified(value) => writeln!(out, "Token {label}: {value}"),
        Check::Mismatch { expected, actual } => {
            writeln!(out, "Token {label}: {actual} (expected {expected})")
        }
        Check::Unavailable(reason) => {
            writeln!(out, "Token {label}: unavailable ({reason})")
        }
    }
}

pub fn render(
    report: &DeploymentReport,
    out: &mut impl Write,
) -> io::Result<()> {
    let receipt = &report.receipt;

    match &report.outcome {
        Outcome::Succeeded { verification } => {
            writeln!(out)?;
            writeln!(out, "Deployment successful!")?;

            if let Some(gas_used) = receipt.gas_used {
                writeln!(out, "Gas used: {gas_used}")?;
            }
            if let Some(block_number) = receipt.block_number {
                writeln!(out, "Block: {block_number}")?;
            }

            render_check(out, "name", &verification.name)?;
            render_check(out, "symbol", &verification.symbol)?;
            render_check(out, "decimals", &verification.decimals)?;
        }
        Outcome::ExecutionFailed => {
            writeln!(out)?;
            writeln!(
                out,
                "Deployment failed! Check transaction {:?} on a block explorer.",
                receipt.transaction_hash
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers::abi::Token;

    use super::*;
    use crate::client::ClientError;
    use crate::supply::scale_supply;
    use crate::testing::{mined_receipt, FakeLedger};

    fn token() -> TokenSpec {
        TokenSpec {
            name: "TestCoin".into(),
            symbol: "TST".into(),
            supply: scale_supply("1000", 18).unwrap(),
        }
    }

    fn submission() -> Submission {
        Submission {
            contract_address: Address::repeat_byte(0xaa),
            transaction_hash: H256::repeat_byte(0xbb),
        }
    }

    fn receipt(success: bool) -> DeploymentReceipt {
        DeploymentReceipt::from_mined(
            &submission(),
            &mined_receipt(
                H256::repeat_byte(0xbb),
                Address::repeat_byte(0xaa),
                success,
            ),
        )
    }

    fn encoded(token: Token) -> Result<ethers::types::Bytes, ClientError> {
        Ok(ethers::abi::encode(&[token]).into())
    }

    #[test]
    fn status_one_is_success() {
        assert_eq!(receipt(true).status, ReceiptStatus::Success);
        assert_eq!(receipt(false).status, ReceiptStatus::Failure);
        assert_eq!(receipt(false).status.to_string(), "failure");
    }

    #[test]
    fn missing_status_is_failure() {
        let mut mined = mined_receipt(H256::zero(), Address::zero(), true);
        mined.status = None;

        let receipt = DeploymentReceipt::from_mined(&submission(), &mined);

        assert_eq!(receipt.status, ReceiptStatus::Failure);
    }

    #[test]
    fn receipt_address_wins_over_derived_one() {
        let mined =
            mined_receipt(H256::zero(), Address::repeat_byte(0xcc), true);

        let receipt = DeploymentReceipt::from_mined(&submission(), &mined);

        assert_eq!(receipt.contract_address, Address::repeat_byte(0xcc));
        assert_eq!(receipt.transaction_hash, H256::repeat_byte(0xbb));
    }

    #[tokio::test]
    async fn success_issues_three_calls_even_when_they_fail() {
        let ledger = FakeLedger::default();

        let outcome =
            verify_deployment(&ledger, &receipt(true), &token()).await;

        assert_eq!(ledger.calls().call, 3);

        let Outcome::Succeeded { verification } = outcome else {
            panic!("deployment itself succeeded");
        };
        assert!(matches!(verification.name, Check::Unavailable(_)));
        assert!(matches!(verification.symbol, Check::Unavailable(_)));
        assert!(matches!(verification.decimals, Check::Unavailable(_)));
    }

    #[tokio::test]
    async fn one_failing_call_does_not_affect_the_others() {
        let ledger = FakeLedger {
            call_responses: [
                (
                    MetadataCall::Name.selector(),
                    encoded(Token::String("TestCoin".into())),
                ),
                (
                    MetadataCall::Symbol.selector(),
                    Err(ClientError::Transport("timeout".into())),
                ),
                (
                    MetadataCall::Decimals.selector(),
                    encoded(Token::Uint(U256::from(8))),
                ),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let outcome =
            verify_deployment(&ledger, &receipt(true), &token()).await;

        assert_eq!(ledger.calls().call, 3);
        assert_eq!(
            outcome,
            Outcome::Succeeded {
                verification: TokenVerification {
                    name: Check::Verified("TestCoin".into()),
                    symbol: Check::Unavailable(
                        "transport: timeout".into()
                    ),
                    decimals: Check::Mismatch {
                        expected: 18,
                        actual: 8
                    },
                }
            }
        );
    }

    #[tokio::test]
    async fn failure_issues_no_calls() {
        let ledger = FakeLedger::default();

        let outcome =
            verify_deployment(&ledger, &receipt(false), &token()).await;

        assert_eq!(outcome, Outcome::ExecutionFailed);
        assert_eq!(ledger.calls().call, 0);
    }

    #[test]
    fn renders_failure_notice() {
        let report = DeploymentReport {
            token: token(),
            receipt: receipt(false),
            outcome: Outcome::ExecutionFailed,
        };
        let mut out = Vec::new();

        render(&report, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Deployment failed!"));
        assert!(out.contains("block explorer"));
        assert!(!report.succeeded());
    }

    #[test]
    fn renders_mismatches_and_unavailable_values() {
        let report = DeploymentReport {
            token: token(),
            receipt: receipt(true),
            outcome: Outcome::Succeeded {
                verification: TokenVerification {
                    name: Check::Verified("TestCoin".into()),
                    symbol: Check::Mismatch {
                        expected: "TST".into(),
                        actual: "XXX".into(),
                    },
                    decimals: Check::Unavailable("reverted".into()),
                },
            },
        };
        let mut out = Vec::new();

        render(&report, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Deployment successful!"));
        assert!(out.contains("Gas used: 1234567"));
        assert!(out.contains("Block: 42"));
        assert!(out.contains("Token name: TestCoin"));
        assert!(out.contains("Token symbol: XXX (expected TST)"));
        assert!(out.contains("Token decimals: unavailable (reverted)"));
    }

    #[test]
    fn report_serializes_to_yaml() {
        let report = DeploymentReport {
            token: token(),
            receipt: receipt(false),
            outcome: Outcome::ExecutionFailed,
        };

        let yaml = serde_yaml::to_string(&report).unwrap();
        let parsed: DeploymentReport = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed, report);
    }
}
