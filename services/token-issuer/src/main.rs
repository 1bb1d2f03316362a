//! Token Issuer - certificate rotation host.
//!
//! Loads configuration, installs the first signing credentials before
//! anything else, then keeps them rotated until shutdown.
//!
//! This binary serves no token requests. Hosts that do embed the library
//! with their own transport and [`PrincipalDirectory`], building a
//! `TokenServer` over the same `CertificateManager`.
//!
//! [`PrincipalDirectory`]: token_issuer::identity::PrincipalDirectory

use anyhow::Context;
use rust_common::{init_tracing, LogFormat, TracingConfig};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use token_issuer::certificates::{
    CertificateConfigurationSource, CertificateFetcher, CertificateManager, CertificateUpdater,
};
use token_issuer::stores::aws::{S3ObjectStore, SsmParameterStore};
use token_issuer::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    init_tracing(
        &TracingConfig::new("token-issuer")
            .with_default_filter(config.log_level.clone())
            .with_format(LogFormat::from_json_flag(config.log_json)),
    );

    info!(issuer = %config.issuer, "Starting Token Issuer");

    let parameters = Arc::new(SsmParameterStore::from_env().await);
    let objects = Arc::new(S3ObjectStore::from_env().await);
    let manager = Arc::new(CertificateManager::new());

    let updater = Arc::new(CertificateUpdater::new(
        CertificateConfigurationSource::new(parameters, config.certificate_parameter_name.clone()),
        CertificateFetcher::new(objects),
        manager.clone(),
        config.certificate_refresh_interval,
    ));

    let cancel = CancellationToken::new();

    // no traffic without a signing key
    if let Err(err) = updater.update_certificates(&cancel).await {
        error!(error = %err, code = err.code(), "Initial certificate update failed");
        return Err(err).context("no usable signing credential at startup");
    }

    info!(key_ids = ?manager.key_ids(), "Signing credentials installed");

    let updater_task = updater.start(cancel.clone());

    wait_for_signal().await;

    cancel.cancel();
    updater_task.await.context("certificate updater panicked")?;

    info!("Token Issuer stopped");
    Ok(())
}

/// Waits for SIGTERM or SIGINT.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}
