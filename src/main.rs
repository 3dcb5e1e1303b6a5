use clap::Parser;
use cli::Args;
use client::EthersClient;
use config::DeploymentConfig;
use credential::{resolve_credential, PromptSecret};
use indicatif::ProgressStyle;
use report::DeploymentReport;
use template::TokenTemplate;
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod serde_utils;

mod abis;
mod authorization;
mod chain_context;
mod cli;
mod client;
mod config;
mod credential;
mod error;
mod gas;
mod report;
mod supply;
mod template;
mod types;

mod deployment;

#[cfg(test)]
mod testing;

/// Exit status for a transaction that was mined but reverted.
const EXIT_EXECUTION_FAILED: i32 = 2;

fn parse_args() -> Args {
    Args::try_parse().unwrap_or_else(|err| {
        // Exit status 2 is reserved for reverted deployments
        if err.use_stderr() {
            let _ = err.print();
            std::process::exit(1)
        }

        err.exit()
    })
}

/// Resolves when the user asks to stop waiting.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "Cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn start() -> eyre::Result<DeploymentReport> {
    let args = parse_args();
    let config = DeploymentConfig::load(&args).await?;

    let template = TokenTemplate::load(&config.artifact).await?;
    let credential =
        resolve_credential(args.private_key.as_deref(), &PromptSecret)?;

    let client = EthersClient::new(&config.rpc_url);

    let report = deployment::run_deployment(
        &client,
        &config,
        &template,
        credential,
        interrupted(),
        &mut std::io::stdout(),
    )
    .await?;

    if let Some(path) = &config.report_path {
        serde_utils::write_serialize(path, &report).await?;
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    dotenv::dotenv().ok();

    let indicatif_layer = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template(
            "{span_child_prefix}{spinner:.green} {span_name}{{{span_fields}}} [{elapsed}]",
        )?,
    );

    let filter = EnvFilter::from_default_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(indicatif_layer)
        .with(ErrorLayer::default())
        .init();

    match start().await {
        Ok(report) if report.succeeded() => Ok(()),
        Ok(_) => std::process::exit(EXIT_EXECUTION_FAILED),
        Err(err) => {
            tracing::error!("{:?}", err);
            std::process::exit(1)
        }
    }
}
