use std::time::Duration;

use ethers::types::H256;
use strum::Display;
use thiserror::Error;

use crate::client::ClientError;

/// The pipeline step a network error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Step {
    #[strum(serialize = "nonce lookup")]
    Nonce,
    #[strum(serialize = "chain id lookup")]
    ChainId,
    #[strum(serialize = "receipt polling")]
    Receipt,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no private key supplied: {0}")]
    MissingCredential(String),

    #[error("invalid private key: {0}")]
    InvalidCredential(String),

    #[error("invalid supply amount {0:?}")]
    InvalidAmount(String),

    #[error("network unavailable during {step}: {message}")]
    NetworkUnavailable { step: Step, message: String },

    #[error("unexpected RPC response during {step}: {message}")]
    Rpc { step: Step, message: String },

    #[error("gas price unavailable: {0}")]
    GasPriceUnavailable(String),

    #[error("transaction rejected by the network: {0}")]
    Broadcast(String),

    #[error("transaction {hash:?} not confirmed after {waited:?} ({reason})")]
    ConfirmationTimeout {
        hash: H256,
        waited: Duration,
        reason: &'static str,
    },
}

impl DeployError {
    /// Maps a client failure onto the taxonomy, keeping transport and
    /// protocol failures apart.
    pub fn from_client(step: Step, err: ClientError) -> Self {
        match err {
            ClientError::Transport(message) => {
                Self::NetworkUnavailable { step, message }
            }
            ClientError::Rpc(message) => Self::Rpc { step, message },
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
