use std::path::PathBuf;

use clap::Parser;

use crate::template::DEFAULT_ARTIFACT_PATH;
use crate::types::GasLimit;

/// Deploys an ERC20 token from a compiled template and reports the result.
#[derive(Debug, Clone, Default, Parser)]
#[clap(rename_all = "kebab-case", version)]
pub struct Args {
    /// The RPC Url to use for the deployment
    #[clap(short, long, env)]
    pub rpc_url: Option<String>,

    /// Private key to deploy with, prompted for when absent
    #[clap(short, long, env, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Token name, e.g. 'TestCoin'
    #[clap(short, long, env = "TOKEN_NAME")]
    pub name: Option<String>,

    /// Token symbol, e.g. 'TST'
    #[clap(short, long, env = "TOKEN_SYMBOL")]
    pub symbol: Option<String>,

    /// Initial supply in whole tokens
    #[clap(long, env = "TOKEN_SUPPLY")]
    pub supply: Option<String>,

    /// Number of decimals the token uses [default: 18]
    #[clap(short, long, env = "TOKEN_DECIMALS")]
    pub decimals: Option<u8>,

    #[clap(long, env, default_value_t = GasLimit::default())]
    pub gas_limit: GasLimit,

    /// Gas price in gwei, the network's suggestion is used when absent
    #[clap(long, env)]
    pub gas_price: Option<String>,

    /// Path to the compiled token contract
    #[clap(long, env, default_value = DEFAULT_ARTIFACT_PATH)]
    pub artifact: PathBuf,

    /// YAML file with name, symbol, decimals and supply
    ///
    /// Values given as flags take precedence over the file.
    #[clap(short, long, env)]
    pub token_config: Option<PathBuf>,

    /// Seconds to wait for the deployment to be mined
    #[clap(long, env, default_value_t = 300)]
    pub confirmation_timeout: u64,

    /// Milliseconds between receipt polls [default: depends on the endpoint]
    #[clap(long, env)]
    pub poll_interval: Option<u64>,

    /// Where to write the deployment report
    #[clap(long, env = "REPORT_PATH")]
    pub report: Option<PathBuf>,
}
