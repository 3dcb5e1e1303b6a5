use ethers::signers::LocalWallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};

use crate::chain_context::ChainContext;
use crate::credential::Credential;
use crate::gas::GasPolicy;

/// Everything needed to sign exactly one transaction from the deployer.
///
/// Not `Clone`. The nonce is only good for one transaction, so building the
/// transaction consumes the authorization.
#[derive(Debug)]
pub struct TransactionAuthorization {
    credential: Credential,
    chain: ChainContext,
    gas: GasPolicy,
}

impl TransactionAuthorization {
    pub fn new(
        credential: Credential,
        chain: ChainContext,
        gas: GasPolicy,
    ) -> Self {
        Self {
            credential,
            chain,
            gas,
        }
    }

    pub fn from(&self) -> Address {
        self.credential.address()
    }

    pub fn nonce(&self) -> U256 {
        self.chain.nonce
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    pub fn gas(&self) -> &GasPolicy {
        &self.gas
    }

    /// Builds the contract-creation transaction for `init_code` and hands
    /// back the wallet that has to sign it.
    pub fn into_creation(
        self,
        init_code: Bytes,
    ) -> (TypedTransaction, LocalWallet) {
        let chain_id = *self.chain.chain_id;

        let tx = TransactionRequest::new()
            .from(self.credential.address())
            .nonce(self.chain.nonce)
            .value(U256::zero())
            .gas(*self.gas.gas_limit)
            .gas_price(self.gas.gas_price)
            .data(init_code)
            .chain_id(chain_id);

        (tx.into(), self.credential.wallet_for_chain(chain_id))
    }
}
