use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::LedgerClient;
use crate::error::{DeployError, DeployResult, Step};
use crate::types::ChainId;

/// Per-deployment network facts, fetched once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContext {
    pub chain_id: ChainId,
    pub nonce: U256,
}

impl ChainContext {
    #[instrument(skip(client))]
    pub async fn fetch(
        client: &dyn LedgerClient,
        address: Address,
    ) -> DeployResult<Self> {
        let nonce = client
            .pending_nonce(address)
            .await
            .map_err(|err| DeployError::from_client(Step::Nonce, err))?;

        let chain_id = client
            .chain_id()
            .await
            .map_err(|err| DeployError::from_client(Step::ChainId, err))?;

        let chain_id = u64::try_from(chain_id).map_err(|_| DeployError::Rpc {
            step: Step::ChainId,
            message: format!("chain id {chain_id} does not fit in 64 bits"),
        })?;

        info!(chain_id, %nonce, "Fetched chain context");

        Ok(Self {
            chain_id: ChainId(chain_id),
            nonce,
        })
    }
}
