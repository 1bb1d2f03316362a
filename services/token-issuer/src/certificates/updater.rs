//! Certificate updater.
//!
//! One cycle reads the configuration, fetches the active and optional
//! inactive certificates and hands them to the manager. The host runs a
//! cycle eagerly at startup, then on a fixed interval in a background task.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config_source::CertificateConfigurationSource;
use super::fetcher::CertificateFetcher;
use super::manager::CertificateManager;
use crate::error::IssuerError;
use crate::metrics;

/// Keeps the manager's credentials in line with the configuration.
pub struct CertificateUpdater {
    source: CertificateConfigurationSource,
    fetcher: CertificateFetcher,
    manager: Arc<CertificateManager>,
    interval: Duration,
}

impl CertificateUpdater {
    /// Create an updater feeding `manager` every `interval`.
    #[must_use]
    pub fn new(
        source: CertificateConfigurationSource,
        fetcher: CertificateFetcher,
        manager: Arc<CertificateManager>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            fetcher,
            manager,
            interval,
        }
    }

    /// The manager this updater feeds.
    #[must_use]
    pub fn manager(&self) -> &Arc<CertificateManager> {
        &self.manager
    }

    /// Run one refresh cycle.
    ///
    /// A failing inactive certificate only costs the inactive slot.
    ///
    /// # Errors
    ///
    /// - [`IssuerError::ConfigUnavailable`] when the configuration cannot be read
    /// - [`IssuerError::NoActiveCredential`] when the active certificate does
    ///   not resolve; the installed set is left unchanged
    /// - [`IssuerError::Cancelled`] when `cancel` fires
    #[instrument(skip_all)]
    pub async fn update_certificates(&self, cancel: &CancellationToken) -> Result<(), IssuerError> {
        let result = self.run_cycle(cancel).await;
        match &result {
            Ok(()) => metrics::record_certificate_refresh("success"),
            Err(err) => metrics::record_certificate_refresh(err.code()),
        }
        result
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), IssuerError> {
        let config = self.source.get_configuration(cancel).await?;

        let active = self
            .fetcher
            .fetch(&config.bucket, &config.active_hash, cancel)
            .await;

        let inactive = match config.inactive_hash.as_deref() {
            Some(hash) => {
                let inactive = self.fetcher.fetch(&config.bucket, hash, cancel).await;
                if inactive.is_none() && !cancel.is_cancelled() {
                    warn!(hash = %hash, "Inactive certificate unavailable, validating with active only");
                }
                inactive
            }
            None => None,
        };

        if cancel.is_cancelled() {
            return Err(IssuerError::Cancelled);
        }

        let Some(active) = active else {
            error!(hash = %config.active_hash, "Active certificate could not be resolved");
            return Err(IssuerError::NoActiveCredential {
                hash: config.active_hash,
            });
        };

        self.manager.update_credentials([Some(active), inactive]).await?;
        info!(
            active = %config.active_hash,
            inactive = ?config.inactive_hash,
            "Certificate update complete"
        );
        Ok(())
    }

    /// Run the periodic loop until `cancel` fires.
    ///
    /// The first tick happens one interval from now; run
    /// [`Self::update_certificates`] beforehand for the eager startup cycle.
    /// A failed cycle is logged and the next one runs as scheduled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Certificate updater started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.update_certificates(&cancel).await {
                        Ok(()) => {}
                        Err(IssuerError::Cancelled) => break,
                        Err(err) => {
                            error!(error = %err, code = err.code(), "Certificate update cycle failed");
                        }
                    }
                }
            }
        }

        debug!("Certificate updater stopped");
    }

    /// Spawn [`Self::run`] on the runtime.
    #[must_use]
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
