//! Collaborator interfaces the gatekeeper reads from.
//!
//! Sessions, accounts and permission grants live in the external database.
//! The gatekeeper only sees them through these traits, so the server wires in
//! the Postgres implementations while tests and the CLI use [`MemoryStore`].

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::access::{Identity, PermissionLevel, ResourceCategory};
use crate::auth::TokenError;
use crate::gatekeeper::SessionCredential;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Outcome of resolving a credential to a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub identity: Identity,
    /// Set when resolution minted new tokens that must reach the client
    pub refreshed: Option<SessionCredential>,
}

impl ResolvedSession {
    pub fn current(identity: Identity) -> Self {
        Self {
            identity,
            refreshed: None,
        }
    }

    pub fn refreshed(identity: Identity, credential: SessionCredential) -> Self {
        Self {
            identity,
            refreshed: Some(credential),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `Ok(None)` means the credential is absent, expired or revoked.
    async fn resolve(&self, credential: &SessionCredential) -> Result<Option<ResolvedSession>, StoreError>;

    /// Signs the identity out everywhere. Calling it twice is harmless.
    async fn invalidate(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn open(&self, identity: &Identity) -> Result<SessionCredential, StoreError>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    /// `Ok(None)` when the account row does not exist
    async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, StoreError>;

    /// `Ok(None)` when no grant is stored for the pair
    async fn permission_level(
        &self,
        user_id: Uuid,
        category: ResourceCategory,
    ) -> Result<Option<PermissionLevel>, StoreError>;
}
