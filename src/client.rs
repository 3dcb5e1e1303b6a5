use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockNumber, Bytes, TransactionReceipt, H256, U256,
};
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The endpoint could not be reached or the connection broke.
    #[error("transport: {0}")]
    Transport(String),

    /// The endpoint answered with an error or with something unparseable.
    #[error("rpc: {0}")]
    Rpc(String),
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        if err.as_error_response().is_some() || err.as_serde_error().is_some()
        {
            return Self::Rpc(err.to_string());
        }

        match err {
            ProviderError::SerdeJson(_) | ProviderError::HexError(_) => {
                Self::Rpc(err.to_string())
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

/// The JSON-RPC surface the deployment pipeline depends on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn pending_nonce(&self, address: Address)
        -> Result<U256, ClientError>;

    async fn chain_id(&self) -> Result<U256, ClientError>;

    async fn gas_price(&self) -> Result<U256, ClientError>;

    async fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> Result<H256, ClientError>;

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ClientError>;

    async fn call(&self, to: Address, data: Bytes)
        -> Result<Bytes, ClientError>;
}

#[derive(Debug, Clone)]
pub struct EthersClient {
    provider: Provider<Http>,
}

impl EthersClient {
    pub fn new(rpc_url: &Url) -> Self {
        let provider = Provider::new(Http::new(rpc_url.clone()));

        Self { provider }
    }
}

#[async_trait]
impl LedgerClient for EthersClient {
    async fn pending_nonce(
        &self,
        address: Address,
    ) -> Result<U256, ClientError> {
        let nonce = self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?;

        Ok(nonce)
    }

    async fn chain_id(&self) -> Result<U256, ClientError> {
        Ok(self.provider.get_chainid().await?)
    }

    async fn gas_price(&self) -> Result<U256, ClientError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> Result<H256, ClientError> {
        let pending = self.provider.send_raw_transaction(raw).await?;

        Ok(*pending)
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ClientError> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    async fn call(
        &self,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ClientError> {
        let tx: TypedTransaction = ethers::types::TransactionRequest::new()
            .to(to)
            .data(data)
            .into();

        Ok(self.provider.call(&tx, None).await?)
    }
}
