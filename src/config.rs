use std::path::PathBuf;
use std::time::Duration;

use eyre::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::deployment::confirmation::PollPolicy;
use crate::error::{DeployError, DeployResult};
use crate::gas::GasPriceInput;
use crate::serde_utils;
use crate::supply::{scale_supply, SupplyAmount};
use crate::types::GasLimit;

pub const DEFAULT_DECIMALS: u8 = 18;

/// The token to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub supply: SupplyAmount,
}

impl TokenSpec {
    pub fn decimals(&self) -> u8 {
        self.supply.decimals
    }
}

/// Token parameters read from `--token-config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenFile {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    #[serde(default, deserialize_with = "serde_utils::decimal_string::deserialize")]
    pub supply: Option<String>,
}

/// Everything a deployment run needs, validated up front.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub rpc_url: Url,
    pub token: TokenSpec,
    pub gas_limit: GasLimit,
    /// `None` means the network's suggested price is used.
    pub gas_price: Option<GasPriceInput>,
    pub artifact: PathBuf,
    pub poll: PollPolicy,
    pub report_path: Option<PathBuf>,
}

impl DeploymentConfig {
    pub async fn load(args: &Args) -> eyre::Result<Self> {
        let file = match &args.token_config {
            Some(path) => serde_utils::read_deserialize(path)
                .await
                .wrap_err("Loading token config")?,
            None => TokenFile::default(),
        };

        Ok(Self::from_args(args, file)?)
    }

    /// Merges flags over the token file. Every missing required value is
    /// reported at once.
    pub fn from_args(args: &Args, file: TokenFile) -> DeployResult<Self> {
        let mut missing = vec![];
        let mut require = |value: Option<String>, flag: &'static str| {
            let value = value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            if value.is_none() {
                missing.push(flag);
            }

            value.unwrap_or_default()
        };

        let rpc_url = require(args.rpc_url.clone(), "--rpc-url");
        let name = require(args.name.clone().or(file.name), "--name");
        let symbol = require(args.symbol.clone().or(file.symbol), "--symbol");
        let supply = require(args.supply.clone().or(file.supply), "--supply");

        if !missing.is_empty() {
            return Err(DeployError::Configuration(format!(
                "missing required parameters: {}",
                missing.join(", ")
            )));
        }

        let rpc_url = Url::parse(&rpc_url).map_err(|err| {
            DeployError::Configuration(format!(
                "invalid RPC url {rpc_url:?}: {err}"
            ))
        })?;

        let decimals = args
            .decimals
            .or(file.decimals)
            .unwrap_or(DEFAULT_DECIMALS);
        let supply = scale_supply(&supply, decimals)?;

        if args.gas_limit.0 == 0 {
            return Err(DeployError::Configuration(
                "gas limit must be greater than zero".into(),
            ));
        }

        let gas_price = args
            .gas_price
            .as_deref()
            .map(str::parse::<GasPriceInput>)
            .transpose()?;

        let mut poll = PollPolicy::for_endpoint(&rpc_url);

        if args.confirmation_timeout == 0 {
            return Err(DeployError::Configuration(
                "confirmation timeout must be greater than zero".into(),
            ));
        }
        poll.timeout = Duration::from_secs(args.confirmation_timeout);

        match args.poll_interval {
            Some(0) => {
                return Err(DeployError::Configuration(
                    "poll interval must be greater than zero".into(),
                ))
            }
            Some(ms) => poll.interval = Duration::from_millis(ms),
            None => {}
        }

        Ok(Self {
            rpc_url,
            token: TokenSpec {
                name,
                symbol,
                supply,
            },
            gas_limit: args.gas_limit,
            gas_price,
            artifact: args.artifact.clone(),
            poll,
            report_path: args.report.clone(),
        })
    }
}
