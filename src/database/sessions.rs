use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::access::Identity;
use crate::auth::{hash_refresh_token, new_refresh_token, TokenSigner};
use crate::config::SessionConfig;
use crate::gatekeeper::SessionCredential;
use crate::store::{ResolvedSession, SessionStore, StoreError};

/// Sessions backed by the `auth_sessions` table.
///
/// Access tokens are signed JWTs naming their session row (`sid`); a token is
/// only honoured while that row is neither revoked nor expired. Refresh tokens
/// are opaque, stored as SHA-256 hashes, and rotated on every use.
pub struct PgSessionStore {
    pool: PgPool,
    signer: TokenSigner,
    refresh_ttl: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, signer: TokenSigner, refresh_ttl_secs: u64) -> Self {
        Self {
            pool,
            signer,
            refresh_ttl: Duration::seconds(refresh_ttl_secs as i64),
        }
    }

    pub fn from_config(pool: PgPool, config: &SessionConfig) -> Result<Self, StoreError> {
        let signer = TokenSigner::from_config(config)?;
        Ok(Self::new(pool, signer, config.refresh_ttl_secs))
    }

    async fn session_is_live(&self, session_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let live = sqlx::query(
            r#"
            SELECT 1
            FROM auth_sessions
            WHERE id = $1
            AND user_id = $2
            AND revoked_at IS NULL
            AND expires_at > now()
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(live.is_some())
    }

    /// Swaps the refresh token in a single statement so a token can be spent once
    async fn rotate(&self, refresh_token: &str) -> Result<Option<ResolvedSession>, StoreError> {
        let next_refresh = new_refresh_token();
        let expires_at = Utc::now() + self.refresh_ttl;

        let row = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET refresh_token_hash = $2, expires_at = $3
            WHERE refresh_token_hash = $1
            AND revoked_at IS NULL
            AND expires_at > now()
            RETURNING id, user_id,
                (SELECT email FROM users WHERE users.id = auth_sessions.user_id) AS email
            "#,
        )
        .bind(hash_refresh_token(refresh_token))
        .bind(hash_refresh_token(&next_refresh))
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session_id: Uuid = row.try_get("id")?;
        let identity = Identity {
            id: row.try_get("user_id")?,
            email: row.try_get("email")?,
        };
        let access_token = self.signer.issue(&identity, session_id)?;

        tracing::debug!(user_id = %identity.id, session_id = %session_id, "session refreshed");
        Ok(Some(ResolvedSession::refreshed(
            identity,
            SessionCredential::new(access_token, next_refresh),
        )))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn resolve(&self, credential: &SessionCredential) -> Result<Option<ResolvedSession>, StoreError> {
        if let Some(token) = &credential.access_token {
            match self.signer.verify(token) {
                Ok(claims) => {
                    if self.session_is_live(claims.sid, claims.sub).await? {
                        return Ok(Some(ResolvedSession::current(claims.identity())));
                    }
                    // The row is revoked or gone; its refresh token is dead too
                    return Ok(None);
                }
                Err(e) => tracing::debug!("access token not usable, trying refresh: {}", e),
            }
        }

        match &credential.refresh_token {
            Some(refresh_token) => self.rotate(refresh_token).await,
            None => Ok(None),
        }
    }

    async fn invalidate(&self, identity: &Identity) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked_at = now()
            WHERE user_id = $1
            AND revoked_at IS NULL
            "#,
        )
        .bind(identity.id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            user_id = %identity.id,
            revoked = result.rows_affected(),
            "sessions revoked"
        );
        Ok(())
    }

    async fn open(&self, identity: &Identity) -> Result<SessionCredential, StoreError> {
        let session_id = Uuid::new_v4();
        let refresh_token = new_refresh_token();

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, user_id, refresh_token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session_id)
        .bind(identity.id)
        .bind(hash_refresh_token(&refresh_token))
        .bind(Utc::now() + self.refresh_ttl)
        .execute(&self.pool)
        .await?;

        let access_token = self.signer.issue(identity, session_id)?;
        Ok(SessionCredential::new(access_token, refresh_token))
    }
}
