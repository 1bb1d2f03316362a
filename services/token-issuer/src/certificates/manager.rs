//! Certificate manager.
//!
//! Sole owner of the live signing credential set. Readers load the current
//! snapshot without locking; replacement swaps the whole snapshot at once,
//! so nobody can observe a new active key next to an old validation list.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::credential::{SigningCredential, SigningCredentialSet};
use crate::error::IssuerError;
use crate::jwks::Jwks;
use crate::metrics;

/// Holds the credentials used to sign and validate tokens.
#[derive(Debug, Default)]
pub struct CertificateManager {
    current: ArcSwap<SigningCredentialSet>,
    generation: AtomicU64,
    // serializes writers; readers never touch it
    update_lock: Mutex<()>,
}

impl CertificateManager {
    /// Create a manager with an empty credential set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the credential set.
    ///
    /// `None` candidates are dropped; the first remaining credential becomes
    /// the signer, all remaining credentials stay valid for validation.
    /// Duplicate key ids keep their first position.
    ///
    /// # Errors
    ///
    /// [`IssuerError::NoSigningCredential`] when every candidate is `None`.
    /// The installed set is left untouched in that case.
    pub async fn update_credentials<I>(&self, candidates: I) -> Result<(), IssuerError>
    where
        I: IntoIterator<Item = Option<SigningCredential>>,
    {
        let mut credentials: Vec<Arc<SigningCredential>> = Vec::new();
        for credential in candidates.into_iter().flatten() {
            if credentials.iter().all(|c| c.key_id() != credential.key_id()) {
                credentials.push(Arc::new(credential));
            }
        }

        if credentials.is_empty() {
            return Err(IssuerError::NoSigningCredential);
        }

        let _guard = self.update_lock.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let set = SigningCredentialSet::new(credentials, generation);
        let key_ids: Vec<String> = set.key_ids().iter().map(ToString::to_string).collect();
        let count = set.len();

        self.current.store(Arc::new(set));
        metrics::set_installed_credentials(count);

        info!(generation, key_ids = ?key_ids, "Signing credentials replaced");
        Ok(())
    }

    /// The current snapshot.
    ///
    /// Callers that need the signer and the validation list together must
    /// read both from the same snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SigningCredentialSet> {
        self.current.load_full()
    }

    /// The credential new tokens are signed with.
    ///
    /// # Errors
    ///
    /// [`IssuerError::NoSigningCredential`] before the first successful update.
    pub fn signing_credential(&self) -> Result<Arc<SigningCredential>, IssuerError> {
        self.current
            .load()
            .active()
            .cloned()
            .ok_or(IssuerError::NoSigningCredential)
    }

    /// Find a validation credential by key id.
    #[must_use]
    pub fn find(&self, key_id: &str) -> Option<Arc<SigningCredential>> {
        self.current.load().find(key_id).cloned()
    }

    /// Key ids currently accepted for validation, active first.
    #[must_use]
    pub fn key_ids(&self) -> Vec<String> {
        self.current
            .load()
            .key_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Public key set for every validation credential.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks::from_credentials(&self.current.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::fetcher::parse_certificate_bundle;
    use test_utils::fixtures::certificate_bundle;
    use test_utils::Curve;

    fn credential(kid: &str) -> SigningCredential {
        parse_certificate_bundle(kid, &certificate_bundle(Curve::P256).to_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_before_update() {
        let manager = CertificateManager::new();
        assert!(manager.snapshot().is_empty());
        assert!(matches!(
            manager.signing_credential(),
            Err(IssuerError::NoSigningCredential)
        ));
    }

    #[tokio::test]
    async fn test_first_candidate_signs() {
        let manager = CertificateManager::new();
        manager
            .update_credentials([Some(credential("active")), Some(credential("inactive"))])
            .await
            .unwrap();

        assert_eq!(manager.signing_credential().unwrap().key_id(), "active");
        assert_eq!(manager.key_ids(), vec!["active", "inactive"]);
        assert!(manager.find("inactive").is_some());
    }

    #[tokio::test]
    async fn test_none_candidates_filtered() {
        let manager = CertificateManager::new();
        manager
            .update_credentials([None, Some(credential("second")), None])
            .await
            .unwrap();

        assert_eq!(manager.signing_credential().unwrap().key_id(), "second");
        assert_eq!(manager.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_all_none_keeps_previous_set() {
        let manager = CertificateManager::new();
        manager
            .update_credentials([Some(credential("keep"))])
            .await
            .unwrap();
        let before = manager.snapshot();

        let result = manager.update_credentials([None, None]).await;
        assert!(matches!(result, Err(IssuerError::NoSigningCredential)));
        assert!(Arc::ptr_eq(&before, &manager.snapshot()));
    }

    #[tokio::test]
    async fn test_duplicate_key_ids_collapse() {
        let manager = CertificateManager::new();
        manager
            .update_credentials([Some(credential("same")), Some(credential("same"))])
            .await
            .unwrap();
        assert_eq!(manager.key_ids(), vec!["same"]);
    }

    #[tokio::test]
    async fn test_generation_increases() {
        let manager = CertificateManager::new();
        manager.update_credentials([Some(credential("a"))]).await.unwrap();
        manager.update_credentials([Some(credential("b"))]).await.unwrap();
        assert_eq!(manager.snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn test_old_snapshot_unchanged_after_swap() {
        let manager = CertificateManager::new();
        manager.update_credentials([Some(credential("old"))]).await.unwrap();
        let old = manager.snapshot();

        manager.update_credentials([Some(credential("new"))]).await.unwrap();
        assert_eq!(old.active().unwrap().key_id(), "old");
        assert_eq!(manager.signing_credential().unwrap().key_id(), "new");
    }

    #[tokio::test]
    async fn test_jwks_lists_validation_keys() {
        let manager = CertificateManager::new();
        manager
            .update_credentials([Some(credential("a")), Some(credential("b"))])
            .await
            .unwrap();
        let jwks = manager.jwks();
        let kids: Vec<&str> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, vec!["a", "b"]);
    }
}
