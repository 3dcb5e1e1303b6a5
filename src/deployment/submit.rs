use ethers::signers::Signer;
use ethers::types::{Address, H256};
use ethers::utils::{get_contract_address, keccak256};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::DeploymentRequest;
use crate::client::LedgerClient;
use crate::error::{DeployError, DeployResult};
use crate::template::TokenTemplate;

/// A broadcast deployment, not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub contract_address: Address,
    pub transaction_hash: H256,
}

/// Signs the contract-creation transaction locally and broadcasts it.
#[instrument(skip_all, fields(name = %request.token.name, symbol = %request.token.symbol))]
pub async fn submit(
    client: &dyn LedgerClient,
    template: &TokenTemplate,
    request: DeploymentRequest,
) -> DeployResult<Submission> {
    let DeploymentRequest {
        token,
        authorization,
    } = request;

    let init_code =
        template.init_code(&token.name, &token.symbol, &token.supply)?;

    let contract_address =
        get_contract_address(authorization.from(), authorization.nonce());

    let (tx, wallet) = authorization.into_creation(init_code);

    let signature = wallet.sign_transaction(&tx).await.map_err(|err| {
        DeployError::InvalidCredential(format!("signing failed: {err}"))
    })?;

    let raw = tx.rlp_signed(&signature);
    let local_hash = H256(keccak256(&raw));

    let transaction_hash = client
        .send_raw_transaction(raw)
        .await
        .map_err(|err| DeployError::Broadcast(err.to_string()))?;

    if transaction_hash != local_hash {
        warn!(
            ?local_hash,
            node_hash = ?transaction_hash,
            "Node reported a different transaction hash"
        );
    }

    info!(?contract_address, ?transaction_hash, "Deployment broadcast");

    Ok(Submission {
        contract_address,
        transaction_hash,
    })
}
