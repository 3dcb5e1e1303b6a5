//! In-memory ledger and secret source used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use ethers::utils::keccak256;

use crate::client::{ClientError, LedgerClient};
use crate::credential::SecretSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub pending_nonce: usize,
    pub chain_id: usize,
    pub gas_price: usize,
    pub send_raw_transaction: usize,
    pub transaction_receipt: usize,
    pub call: usize,
}

#[derive(Debug)]
pub struct FakeLedger {
    pub nonce: Result<U256, ClientError>,
    pub chain_id: Result<U256, ClientError>,
    pub gas_price: Result<U256, ClientError>,
    /// Overrides the hash echoed back for broadcasts.
    pub broadcast: Option<Result<H256, ClientError>>,
    /// Answers handed out in order; an empty queue means "not mined yet".
    pub receipts: Mutex<VecDeque<Result<Option<TransactionReceipt>, ClientError>>>,
    /// `eth_call` answers keyed by function selector.
    pub call_responses: HashMap<[u8; 4], Result<Bytes, ClientError>>,
    pub broadcasts: Mutex<Vec<Bytes>>,
    /// Receipt queries never answer, like a node behind a partition.
    pub stall_receipts: bool,
    pub calls: Mutex<Calls>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self {
            nonce: Ok(U256::zero()),
            chain_id: Ok(U256::from(31337)),
            gas_price: Ok(U256::from(1_000_000_000u64)),
            broadcast: None,
            receipts: Mutex::default(),
            call_responses: HashMap::new(),
            broadcasts: Mutex::default(),
            stall_receipts: false,
            calls: Mutex::default(),
        }
    }
}

impl FakeLedger {
    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_receipt(
        &self,
        receipt: Result<Option<TransactionReceipt>, ClientError>,
    ) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap());
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn pending_nonce(
        &self,
        _address: Address,
    ) -> Result<U256, ClientError> {
        self.record(|c| c.pending_nonce += 1);
        self.nonce.clone()
    }

    async fn chain_id(&self) -> Result<U256, ClientError> {
        self.record(|c| c.chain_id += 1);
        self.chain_id.clone()
    }

    async fn gas_price(&self) -> Result<U256, ClientError> {
        self.record(|c| c.gas_price += 1);
        self.gas_price.clone()
    }

    async fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> Result<H256, ClientError> {
        self.record(|c| c.send_raw_transaction += 1);
        self.broadcasts.lock().unwrap().push(raw.clone());

        match &self.broadcast {
            Some(result) => result.clone(),
            None => Ok(H256(keccak256(&raw))),
        }
    }

    async fn transaction_receipt(
        &self,
        _hash: H256,
    ) -> Result<Option<TransactionReceipt>, ClientError> {
        self.record(|c| c.transaction_receipt += 1);

        if self.stall_receipts {
            std::future::pending::<()>().await;
        }

        self.receipts.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn call(
        &self,
        _to: Address,
        data: Bytes,
    ) -> Result<Bytes, ClientError> {
        self.record(|c| c.call += 1);

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);

        self.call_responses
            .get(&selector)
            .cloned()
            .unwrap_or_else(|| Err(ClientError::Rpc("execution reverted".into())))
    }
}

/// Hands out the same secret every time it is asked.
#[derive(Debug, Default)]
pub struct FixedSecret(pub String);

impl SecretSource for FixedSecret {
    fn obtain_secret(&self) -> eyre::Result<String> {
        Ok(self.0.clone())
    }
}

pub fn mined_receipt(
    hash: H256,
    contract_address: Address,
    success: bool,
) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        contract_address: Some(contract_address),
        status: Some(u64::from(success).into()),
        gas_used: Some(U256::from(1_234_567)),
        block_number: Some(42u64.into()),
        ..Default::default()
    }
}
