use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::{PermissionLevel, ResourceCategory};
use crate::store::{AccessStore, StoreError};

/// Account and permission lookups against `users` and `user_permissions`
#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, StoreError> {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(active)
    }

    async fn permission_level(
        &self,
        user_id: Uuid,
        category: ResourceCategory,
    ) -> Result<Option<PermissionLevel>, StoreError> {
        let level: Option<String> = sqlx::query_scalar(
            r#"
            SELECT level
            FROM user_permissions
            WHERE user_id = $1
            AND resource = $2
            "#,
        )
        .bind(user_id)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(level.map(|raw| stored_level(&raw, user_id, category)))
    }
}

/// Unrecognised level strings deny access
fn stored_level(raw: &str, user_id: Uuid, category: ResourceCategory) -> PermissionLevel {
    raw.trim().parse().unwrap_or_else(|e| {
        tracing::warn!(user_id = %user_id, category = %category, "{}; treating as block", e);
        PermissionLevel::Block
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_levels_parse() {
        let user = Uuid::new_v4();
        assert_eq!(stored_level("view", user, ResourceCategory::Po), PermissionLevel::View);
        assert_eq!(stored_level(" edit ", user, ResourceCategory::Po), PermissionLevel::Edit);
        assert_eq!(stored_level("block", user, ResourceCategory::Po), PermissionLevel::Block);
    }

    #[test]
    fn unknown_stored_level_blocks() {
        assert_eq!(
            stored_level("superuser", Uuid::new_v4(), ResourceCategory::Admin),
            PermissionLevel::Block
        );
    }
}
