use std::future::Future;
use std::time::Duration;

use ethers::types::{TransactionReceipt, H256};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::client::LedgerClient;
use crate::error::{DeployError, DeployResult, Step};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(7);
pub const DEFAULT_LOCAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_consecutive_errors: u32,
}

impl PollPolicy {
    /// Local dev nodes mine instantly, so they are polled far more often.
    pub fn for_endpoint(url: &Url) -> Self {
        let is_local = matches!(
            url.host_str(),
            Some("localhost" | "127.0.0.1" | "[::1]" | "0.0.0.0")
        );

        Self {
            interval: if is_local {
                DEFAULT_LOCAL_POLL_INTERVAL
            } else {
                DEFAULT_POLL_INTERVAL
            },
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchFailure {
    DeadlineExceeded,
    Cancelled,
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchState {
    Submitted,
    Pending {
        polls: u32,
        consecutive_errors: u32,
    },
    /// Included in a block. The receipt may still report a revert.
    Mined(Box<TransactionReceipt>),
    Failed(WatchFailure),
}

impl WatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Mined(_) | Self::Failed(_))
    }
}

/// Polls for the receipt of one broadcast transaction.
pub struct ConfirmationWatch<'a> {
    client: &'a dyn LedgerClient,
    hash: H256,
    policy: PollPolicy,
    started: Instant,
    state: WatchState,
}

impl<'a> ConfirmationWatch<'a> {
    pub fn new(
        client: &'a dyn LedgerClient,
        hash: H256,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            hash,
            policy,
            started: Instant::now(),
            state: WatchState::Submitted,
        }
    }

    /// Advances the state machine by one transition. Terminal states are
    /// returned as they are, without touching the network.
    pub async fn step(&mut self) -> &WatchState {
        if self.state.is_terminal() {
            return &self.state;
        }

        let WatchState::Pending {
            polls,
            consecutive_errors,
        } = self.state
        else {
            self.state = WatchState::Pending {
                polls: 0,
                consecutive_errors: 0,
            };
            return &self.state;
        };

        let remaining = self.remaining();
        if remaining.is_zero() {
            self.state = WatchState::Failed(WatchFailure::DeadlineExceeded);
            return &self.state;
        }

        let polls = polls + 1;

        // A query that outlives the deadline is abandoned
        let Ok(answer) = tokio::time::timeout(
            remaining,
            self.client.transaction_receipt(self.hash),
        )
        .await
        else {
            warn!(polls, "Receipt query still pending at the deadline");
            self.state = WatchState::Failed(WatchFailure::DeadlineExceeded);
            return &self.state;
        };

        self.state = match answer {
            Ok(Some(receipt)) => WatchState::Mined(Box::new(receipt)),
            Ok(None) => {
                debug!(polls, "Transaction not mined yet");
                WatchState::Pending {
                    polls,
                    consecutive_errors: 0,
                }
            }
            Err(err) => {
                let consecutive_errors = consecutive_errors + 1;
                warn!(%err, consecutive_errors, "Receipt query failed");

                if consecutive_errors >= self.policy.max_consecutive_errors {
                    WatchState::Failed(WatchFailure::Unreachable(
                        err.to_string(),
                    ))
                } else {
                    WatchState::Pending {
                        polls,
                        consecutive_errors,
                    }
                }
            }
        };

        &self.state
    }

    /// Polls until the transaction is mined, the deadline passes or
    /// `cancel` resolves.
    #[instrument(skip_all, fields(tx = ?self.hash))]
    pub async fn run(
        mut self,
        cancel: impl Future<Output = ()>,
    ) -> DeployResult<TransactionReceipt> {
        tokio::pin!(cancel);

        loop {
            let state = tokio::select! {
                state = self.step() => state.clone(),
                _ = &mut cancel => WatchState::Failed(WatchFailure::Cancelled),
            };

            match state {
                WatchState::Mined(receipt) => return Ok(*receipt),
                WatchState::Failed(failure) => {
                    return Err(self.failure_error(failure))
                }
                // Just entered pending, poll right away
                WatchState::Pending { polls: 0, .. } => continue,
                WatchState::Submitted | WatchState::Pending { .. } => {}
            }

            let pause = self.policy.interval.min(self.remaining());

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = &mut cancel => {
                    return Err(self.failure_error(WatchFailure::Cancelled))
                }
            }
        }
    }

    fn remaining(&self) -> Duration {
        self.policy.timeout.saturating_sub(self.started.elapsed())
    }

    fn failure_error(&self, failure: WatchFailure) -> DeployError {
        let waited = self.started.elapsed();

        match failure {
            WatchFailure::DeadlineExceeded => DeployError::ConfirmationTimeout {
                hash: self.hash,
                waited,
                reason: "deadline exceeded",
            },
            WatchFailure::Cancelled => DeployError::ConfirmationTimeout {
                hash: self.hash,
                waited,
                reason: "cancelled",
            },
            WatchFailure::Unreachable(message) => {
                DeployError::NetworkUnavailable {
                    step: Step::Receipt,
                    message,
                }
            }
        }
    }
}
