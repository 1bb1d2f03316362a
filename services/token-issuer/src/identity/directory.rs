//! Role and profile lookups feeding claims construction.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::IssuerError;

/// Read-only source of roles for applications and users.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Roles granted to an application (OAuth client).
    async fn find_roles_for_application(&self, application_id: Uuid)
        -> Result<Vec<String>, IssuerError>;

    /// Roles granted to a user.
    async fn find_roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, IssuerError>;

    /// Display name of a user, if the directory knows one.
    async fn find_user_name(&self, user_id: Uuid) -> Result<Option<String>, IssuerError> {
        let _ = user_id;
        Ok(None)
    }
}

#[derive(Debug, Clone, Default)]
struct UserRecord {
    name: Option<String>,
    roles: Vec<String>,
}

/// Directory held in memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    applications: RwLock<HashMap<Uuid, Vec<String>>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
    lookups: AtomicUsize,
}

impl MemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the roles of an application.
    pub async fn set_application_roles<I, S>(&self, application_id: Uuid, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applications
            .write()
            .await
            .insert(application_id, roles.into_iter().map(Into::into).collect());
    }

    /// Register a user with a display name and roles.
    pub async fn set_user<I, S>(&self, user_id: Uuid, name: Option<&str>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.write().await.insert(
            user_id,
            UserRecord {
                name: name.map(str::to_string),
                roles: roles.into_iter().map(Into::into).collect(),
            },
        );
    }

    /// Number of role lookups served.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryDirectory {
    async fn find_roles_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<String>, IssuerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .applications
            .read()
            .await
            .get(&application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, IssuerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.roles.clone())
            .unwrap_or_default())
    }

    async fn find_user_name(&self, user_id: Uuid) -> Result<Option<String>, IssuerError> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .and_then(|u| u.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_principals_have_no_roles() {
        let directory = MemoryDirectory::new();
        let id = Uuid::new_v4();
        assert!(directory.find_roles_for_application(id).await.unwrap().is_empty());
        assert!(directory.find_roles_for_user(id).await.unwrap().is_empty());
        assert_eq!(directory.find_user_name(id).await.unwrap(), None);
        assert_eq!(directory.lookups(), 2);
    }

    #[tokio::test]
    async fn test_application_and_user_roles_are_separate() {
        let directory = MemoryDirectory::new();
        let id = Uuid::new_v4();
        directory.set_application_roles(id, ["Service"]).await;
        directory.set_user(id, Some("alice"), ["Reader"]).await;

        assert_eq!(
            directory.find_roles_for_application(id).await.unwrap(),
            vec!["Service"]
        );
        assert_eq!(directory.find_roles_for_user(id).await.unwrap(), vec!["Reader"]);
        assert_eq!(
            directory.find_user_name(id).await.unwrap().as_deref(),
            Some("alice")
        );
    }
}
