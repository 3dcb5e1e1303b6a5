use std::future::Future;
use std::io::Write;

use eyre::Context;
use tracing::{info, instrument};

use self::confirmation::ConfirmationWatch;
pub use self::submit::{submit, Submission};
use crate::authorization::TransactionAuthorization;
use crate::chain_context::ChainContext;
use crate::client::LedgerClient;
use crate::config::{DeploymentConfig, TokenSpec};
use crate::credential::Credential;
use crate::gas::GasPolicy;
use crate::report::{self, DeploymentReceipt, DeploymentReport};
use crate::template::TokenTemplate;

pub mod confirmation;
pub mod submit;

/// A token to deploy and the authorization to deploy it with.
#[derive(Debug)]
pub struct DeploymentRequest {
    pub token: TokenSpec,
    pub authorization: TransactionAuthorization,
}

impl DeploymentRequest {
    pub fn new(
        token: TokenSpec,
        authorization: TransactionAuthorization,
    ) -> Self {
        Self {
            token,
            authorization,
        }
    }
}

/// Fetches the chain context and gas policy and binds them to `credential`.
#[instrument(skip_all, fields(deployer = ?credential.address()))]
pub async fn authorize(
    client: &dyn LedgerClient,
    config: &DeploymentConfig,
    credential: Credential,
) -> eyre::Result<TransactionAuthorization> {
    let chain = ChainContext::fetch(client, credential.address())
        .await
        .wrap_err("Fetching chain context")?;

    let gas = GasPolicy::resolve(client, config.gas_limit, config.gas_price)
        .await
        .wrap_err("Determining gas price")?;

    let authorization = TransactionAuthorization::new(credential, chain, gas);

    info!(
        chain_id = %authorization.chain().chain_id,
        nonce = %authorization.nonce(),
        gas_limit = %authorization.gas().gas_limit,
        gas_price = %authorization.gas().gas_price,
        source = ?authorization.gas().source,
        "Authorized deployment"
    );

    Ok(authorization)
}

/// Runs the whole deployment, writing the human readable report to `out`.
///
/// A transaction that is mined but reverted is not an error, it is
/// reported through [`DeploymentReport::outcome`].
pub async fn run_deployment(
    client: &dyn LedgerClient,
    config: &DeploymentConfig,
    template: &TokenTemplate,
    credential: Credential,
    cancel: impl Future<Output = ()>,
    out: &mut impl Write,
) -> eyre::Result<DeploymentReport> {
    let authorization = authorize(client, config, credential).await?;
    let request = DeploymentRequest::new(config.token.clone(), authorization);

    let submission = submit(client, template, request)
        .await
        .wrap_err("Submitting deployment")?;

    report::render_submission(&submission, out)?;

    let receipt = ConfirmationWatch::new(
        client,
        submission.transaction_hash,
        config.poll,
    )
    .run(cancel)
    .await
    .wrap_err("Waiting for the deployment to be mined")?;

    let receipt = DeploymentReceipt::from_mined(&submission, &receipt);
    info!(status = %receipt.status, "Deployment mined");

    let outcome =
        report::verify_deployment(client, &receipt, &config.token).await;

    let report = DeploymentReport {
        token: config.token.clone(),
        receipt,
        outcome,
    };

    report::render(&report, out)?;

    Ok(report)
}
