use std::path::{Path, PathBuf};

use ethers::abi::{Abi, Token};
use ethers::types::{Bytes, U256};
use serde::Deserialize;

use crate::error::{DeployError, DeployResult};
use crate::supply::SupplyAmount;

pub const DEFAULT_ARTIFACT_PATH: &str =
    "contracts/out/ERC20Token.sol/ERC20Token.json";

/// Number of constructor inputs: name, symbol, decimals, supply.
const CONSTRUCTOR_ARITY: usize = 4;

#[derive(Debug, Deserialize)]
struct Artifact {
    abi: Abi,
    bytecode: ArtifactBytecode,
}

// forge nests the bytecode under `object`, hardhat and solc do not
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Forge { object: Bytes },
    Flat(Bytes),
}

/// The compiled token contract the deployment instantiates.
#[derive(Debug, Clone)]
pub struct TokenTemplate {
    pub path: PathBuf,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl TokenTemplate {
    pub async fn load(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();

        let content = tokio::fs::read_to_string(path).await.map_err(|err| {
            DeployError::Configuration(format!(
                "reading contract artifact {}: {err}",
                path.display()
            ))
        })?;

        Self::from_json(path, &content)
    }

    pub fn from_json(path: &Path, content: &str) -> DeployResult<Self> {
        let invalid = |why: String| {
            DeployError::Configuration(format!(
                "contract artifact {}: {why}",
                path.display()
            ))
        };

        let artifact: Artifact = serde_json::from_str(content)
            .map_err(|err| invalid(err.to_string()))?;

        let bytecode = match artifact.bytecode {
            ArtifactBytecode::Forge { object } => object,
            ArtifactBytecode::Flat(bytes) => bytes,
        };

        if bytecode.is_empty() {
            return Err(invalid(
                "bytecode is empty, is the contract abstract?".to_string(),
            ));
        }

        let arity = artifact
            .abi
            .constructor()
            .map(|constructor| constructor.inputs.len())
            .unwrap_or_default();

        if arity != CONSTRUCTOR_ARITY {
            return Err(invalid(format!(
                "constructor takes {arity} arguments, expected \
                 (name, symbol, decimals, supply)"
            )));
        }

        Ok(Self {
            path: path.to_owned(),
            abi: artifact.abi,
            bytecode,
        })
    }

    /// Bytecode followed by the ABI-encoded constructor arguments.
    pub fn init_code(
        &self,
        name: &str,
        symbol: &str,
        supply: &SupplyAmount,
    ) -> DeployResult<Bytes> {
        let constructor = self.abi.constructor().ok_or_else(|| {
            DeployError::Configuration("template has no constructor".into())
        })?;

        let args = [
            Token::String(name.to_string()),
            Token::String(symbol.to_string()),
            Token::Uint(U256::from(supply.decimals)),
            Token::Uint(supply.scaled),
        ];

        let code = constructor
            .encode_input(self.bytecode.to_vec(), &args)
            .map_err(|err| {
                DeployError::Configuration(format!(
                    "encoding constructor arguments for {}: {err}",
                    self.path.display()
                ))
            })?;

        Ok(code.into())
    }
}
