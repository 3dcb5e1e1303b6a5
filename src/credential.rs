use std::fmt;
use std::str::FromStr;

use ethers::prelude::k256::SecretKey;
use ethers::signers::{LocalWallet, Signer, Wallet};
use ethers::types::Address;

use crate::error::{DeployError, DeployResult};

/// Somewhere a secret key can be obtained from when none was passed in.
pub trait SecretSource {
    fn obtain_secret(&self) -> eyre::Result<String>;
}

/// Asks for the key on the terminal, masked.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptSecret;

impl SecretSource for PromptSecret {
    fn obtain_secret(&self) -> eyre::Result<String> {
        let secret = inquire::Password::new("Private key:")
            .without_confirmation()
            .with_help_message("hex encoded, with or without 0x")
            .prompt()?;

        Ok(secret)
    }
}

#[derive(Clone)]
pub struct PrivateKey {
    pub key: SecretKey,
}

impl FromStr for PrivateKey {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let bytes = hex::decode(s)
            .map_err(|err| DeployError::InvalidCredential(err.to_string()))?;

        if bytes.len() != 32 {
            return Err(DeployError::InvalidCredential(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let key = SecretKey::from_slice(&bytes).map_err(|_| {
            DeployError::InvalidCredential(
                "not a valid secp256k1 scalar".to_string(),
            )
        })?;

        Ok(Self { key })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A signing wallet and the account it controls.
#[derive(Clone)]
pub struct Credential {
    wallet: LocalWallet,
}

impl Credential {
    pub fn new(private_key: PrivateKey) -> Self {
        Self {
            wallet: Wallet::from(private_key.key),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// The wallet, bound to the chain it will sign for.
    pub fn wallet_for_chain(&self, chain_id: u64) -> LocalWallet {
        self.wallet.clone().with_chain_id(chain_id)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Uses `explicit` when it is non-empty, otherwise asks `source` once.
pub fn resolve_credential(
    explicit: Option<&str>,
    source: &dyn SecretSource,
) -> DeployResult<Credential> {
    let secret = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => secret.to_string(),
        None => source.obtain_secret().map_err(|err| {
            DeployError::MissingCredential(format!(
                "could not read it from the prompt: {err:#}"
            ))
        })?,
    };

    let secret = secret.trim();
    if secret.is_empty() {
        return Err(DeployError::MissingCredential(
            "an empty key was entered".to_string(),
        ));
    }

    let private_key: PrivateKey = secret.parse()?;
    let credential = Credential::new(private_key);

    tracing::info!(address = ?credential.address(), "Resolved deployer");

    Ok(credential)
}
