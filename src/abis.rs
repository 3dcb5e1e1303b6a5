use ethers::abi::{ParamType, Token};
use ethers::types::{Bytes, U256};
use strum::Display;

/// The read-only ERC20 metadata getters used to verify a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MetadataCall {
    Name,
    Symbol,
    Decimals,
}

impl MetadataCall {
    pub fn signature(self) -> &'static str {
        match self {
            Self::Name => "name()",
            Self::Symbol => "symbol()",
            Self::Decimals => "decimals()",
        }
    }

    pub fn selector(self) -> [u8; 4] {
        ethers::utils::id(self.signature())
    }

    pub fn calldata(self) -> Bytes {
        Bytes::from(self.selector().to_vec())
    }

    fn output(self) -> ParamType {
        match self {
            Self::Name | Self::Symbol => ParamType::String,
            Self::Decimals => ParamType::Uint(8),
        }
    }

    fn decode(self, data: &[u8]) -> eyre::Result<Token> {
        let mut tokens = ethers::abi::decode(&[self.output()], data)?;

        tokens
            .pop()
            .ok_or_else(|| eyre::eyre!("{self}() returned nothing"))
    }

    pub fn decode_string(self, data: &[u8]) -> eyre::Result<String> {
        match self.decode(data)? {
            Token::String(value) => Ok(value),
            other => eyre::bail!("{self}() returned {other:?}"),
        }
    }

    pub fn decode_u8(self, data: &[u8]) -> eyre::Result<u8> {
        match self.decode(data)? {
            Token::Uint(value) if value <= U256::from(u8::MAX) => {
                Ok(value.low_u32() as u8)
            }
            other => eyre::bail!("{self}() returned {other:?}"),
        }
    }
}
