/// Visitor profiles
use crate::{
    db::models::Profile,
    error::{DistimError, DistimResult},
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

/// Profile fields a user may set on their own profile
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_artist: bool,
}

/// Profile store
#[derive(Clone)]
pub struct ProfileStore {
    db: SqlitePool,
}

impl ProfileStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create or update the profile of `user_id`
    pub async fn upsert(&self, user_id: &str, update: ProfileUpdate) -> DistimResult<Profile> {
        update.validate()?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, display_name, is_artist, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                is_artist = excluded.is_artist
            "#,
        )
        .bind(user_id)
        .bind(&update.email)
        .bind(&update.display_name)
        .bind(update.is_artist)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.get(user_id)
            .await?
            .ok_or_else(|| DistimError::Internal(format!("Profile {} vanished after upsert", user_id)))
    }

    pub async fn get(&self, user_id: &str) -> DistimResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, is_artist, created_at FROM profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// List all profiles, newest first
    pub async fn list(&self) -> DistimResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, display_name, is_artist, created_at
            FROM profiles
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(profiles)
    }

    /// Delete a profile; NotFound when nothing was deleted
    pub async fn delete(&self, user_id: &str) -> DistimResult<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DistimError::NotFound(format!("Profile {} not found", user_id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_upsert_then_delete_profile() {
        let pool = db::create_memory_pool().await.unwrap();
        let store = ProfileStore::new(pool);

        store
            .upsert(
                "auth0|maria",
                ProfileUpdate {
                    email: Some("maria@example.com".to_string()),
                    display_name: Some("Maria".to_string()),
                    is_artist: false,
                },
            )
            .await
            .unwrap();

        let updated = store
            .upsert(
                "auth0|maria",
                ProfileUpdate {
                    email: Some("maria@example.com".to_string()),
                    display_name: Some("Maria Popescu".to_string()),
                    is_artist: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Maria Popescu"));
        assert!(updated.is_artist);
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete("auth0|maria").await.unwrap();
        assert!(store.get("auth0|maria").await.unwrap().is_none());
        assert!(matches!(
            store.delete("auth0|maria").await,
            Err(DistimError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let pool = db::create_memory_pool().await.unwrap();
        let store = ProfileStore::new(pool);

        let result = store
            .upsert(
                "auth0|ion",
                ProfileUpdate {
                    email: Some("not-an-email".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DistimError::Validation(_))));
    }
}
