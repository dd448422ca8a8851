/// Account unlock store: durable, cross-device proof of visits
use super::Stamp;
use crate::error::DistimResult;
use chrono::Utc;
use sqlx::SqlitePool;

/// Store backed by the `totem_unlocks` table
#[derive(Clone)]
pub struct UnlockStore {
    db: SqlitePool,
}

impl UnlockStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record that `user_id` unlocked `totem_id`
    ///
    /// Idempotent; returns whether a new record was created.
    pub async fn upsert(&self, user_id: &str, totem_id: &str) -> DistimResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO totem_unlocks (user_id, totem_id, unlocked_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, totem_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(totem_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn has(&self, user_id: &str, totem_id: &str) -> DistimResult<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT totem_id FROM totem_unlocks WHERE user_id = ? AND totem_id = ?",
        )
        .bind(user_id)
        .bind(totem_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(found.is_some())
    }

    /// Stamps of a user, joined with totem metadata, oldest first
    pub async fn stamps_for_user(&self, user_id: &str) -> DistimResult<Vec<Stamp>> {
        let stamps = sqlx::query_as::<_, Stamp>(
            r#"
            SELECT u.totem_id AS totem_id,
                   COALESCE(NULLIF(t.stamp_label, ''), t.name, u.totem_id) AS stamp_label,
                   t.stamp_emoji AS stamp_emoji,
                   u.unlocked_at AS collected_at
            FROM totem_unlocks u
            LEFT JOIN totems t ON t.id = u.totem_id
            WHERE u.user_id = ?
            ORDER BY u.unlocked_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(stamps)
    }

    /// Distinct stamp labels of the places a user visited
    pub async fn visited_places(&self, user_id: &str) -> DistimResult<Vec<String>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }

        let mut places: Vec<String> = Vec::new();
        for stamp in self.stamps_for_user(user_id).await? {
            if !places.contains(&stamp.stamp_label) {
                places.push(stamp.stamp_label);
            }
        }

        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewTotem, TotemStore};
    use crate::db;

    async fn setup() -> UnlockStore {
        let pool = db::create_memory_pool().await.unwrap();
        let totems = TotemStore::new(pool.clone());
        for (id, label) in [("opera", Some("Opera")), ("catedrala", None), ("dom", Some("Opera"))] {
            totems
                .create(NewTotem {
                    id: id.to_string(),
                    name: format!("Stația {}", id),
                    description: None,
                    teaser_text: None,
                    locked_text: None,
                    qr_slug: Some(format!("{}-qr", id)),
                    stamp_label: label.map(str::to_string),
                    stamp_emoji: None,
                    latitude: 45.75,
                    longitude: 21.22,
                })
                .await
                .unwrap();
        }
        UnlockStore::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = setup().await;

        assert!(store.upsert("auth0|ana", "opera").await.unwrap());
        assert!(!store.upsert("auth0|ana", "opera").await.unwrap());
        assert!(store.has("auth0|ana", "opera").await.unwrap());
        assert!(!store.has("auth0|ion", "opera").await.unwrap());

        assert_eq!(store.stamps_for_user("auth0|ana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stamp_label_falls_back_to_totem_name() {
        let store = setup().await;
        store.upsert("auth0|ana", "catedrala").await.unwrap();

        let stamps = store.stamps_for_user("auth0|ana").await.unwrap();
        assert_eq!(stamps[0].stamp_label, "Stația catedrala");
    }

    #[tokio::test]
    async fn test_visited_places_are_deduplicated() {
        let store = setup().await;
        store.upsert("auth0|ana", "opera").await.unwrap();
        store.upsert("auth0|ana", "dom").await.unwrap();
        store.upsert("auth0|ana", "catedrala").await.unwrap();

        let places = store.visited_places("auth0|ana").await.unwrap();
        assert_eq!(places.len(), 2);
        assert!(places.contains(&"Opera".to_string()));
        assert!(store.visited_places("").await.unwrap().is_empty());
    }
}
