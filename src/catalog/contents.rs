/// Content items: category listings, detail views and submissions
use crate::{
    db::models::{ContentCategory, ContentItem},
    error::{DistimError, DistimResult},
    metrics,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

/// Content submission from an artist
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitContent {
    #[validate(length(min = 1, message = "totem is required"))]
    pub totem_id: String,
    pub category: ContentCategory,
    #[validate(length(min = 1, max = 300, message = "title is required"))]
    pub title: String,
    pub artist: Option<String>,
    #[validate(email)]
    pub artist_email: Option<String>,
    pub snippet: Option<String>,
    pub full_text: Option<String>,
    #[validate(url)]
    pub media_url: Option<String>,
}

impl SubmitContent {
    /// Trim every field; blank optional fields become None
    fn normalized(self) -> Self {
        Self {
            totem_id: self.totem_id.trim().to_string(),
            category: self.category,
            title: self.title.trim().to_string(),
            artist: non_blank(self.artist),
            artist_email: non_blank(self.artist_email),
            snippet: non_blank(self.snippet),
            full_text: non_blank(self.full_text),
            media_url: non_blank(self.media_url),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Content store
#[derive(Clone)]
pub struct ContentStore {
    db: SqlitePool,
}

impl ContentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List contents of a category, most viewed first
    pub async fn list_by_category(
        &self,
        category: ContentCategory,
    ) -> DistimResult<Vec<ContentItem>> {
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT c.id, c.totem_id, c.category, c.title, c.artist, c.snippet, c.full_text,
                   c.media_url, c.views, c.submitter_name, c.submitter_email, c.created_at,
                   t.name AS totem_name
            FROM contents c
            LEFT JOIN totems t ON t.id = c.totem_id
            WHERE c.category = ?
            ORDER BY c.views DESC, c.created_at ASC
            "#,
        )
        .bind(category)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// List every content item, newest first
    pub async fn list_all(&self) -> DistimResult<Vec<ContentItem>> {
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT c.id, c.totem_id, c.category, c.title, c.artist, c.snippet, c.full_text,
                   c.media_url, c.views, c.submitter_name, c.submitter_email, c.created_at,
                   t.name AS totem_name
            FROM contents c
            LEFT JOIN totems t ON t.id = c.totem_id
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Get a content item with its totem name
    pub async fn get(&self, id: &str) -> DistimResult<Option<ContentItem>> {
        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT c.id, c.totem_id, c.category, c.title, c.artist, c.snippet, c.full_text,
                   c.media_url, c.views, c.submitter_name, c.submitter_email, c.created_at,
                   t.name AS totem_name
            FROM contents c
            LEFT JOIN totems t ON t.id = c.totem_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    /// Load a content item for display and count the view
    ///
    /// The returned item carries the view count including this view.
    pub async fn view(&self, id: &str) -> DistimResult<ContentItem> {
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| DistimError::NotFound(format!("Content {} not found", id)))?;

        match self.increment_views(id).await {
            Ok(Some(views)) => item.views = views,
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to increment views for {}: {}", id, e),
        }

        metrics::record_content_view(item.category.as_str());
        Ok(item)
    }

    /// Atomically increment the view counter, returning the new count
    pub async fn increment_views(&self, id: &str) -> DistimResult<Option<i64>> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE contents SET views = views + 1 WHERE id = ? RETURNING views")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(views)
    }

    /// Store a content submission
    pub async fn submit(&self, submission: SubmitContent) -> DistimResult<ContentItem> {
        let submission = submission.normalized();
        submission.validate()?;

        let totem_exists: Option<String> = sqlx::query_scalar("SELECT id FROM totems WHERE id = ?")
            .bind(&submission.totem_id)
            .fetch_optional(&self.db)
            .await?;
        if totem_exists.is_none() {
            return Err(DistimError::Validation(format!(
                "Unknown totem: {}",
                submission.totem_id
            )));
        }

        let item = ContentItem {
            id: Uuid::new_v4().to_string(),
            totem_id: Some(submission.totem_id),
            category: submission.category,
            title: submission.title,
            artist: submission.artist.clone(),
            snippet: submission.snippet,
            full_text: submission.full_text,
            media_url: submission.media_url,
            views: 0,
            submitter_name: submission.artist,
            submitter_email: submission.artist_email,
            created_at: Utc::now(),
            totem_name: None,
        };

        sqlx::query(
            r#"
            INSERT INTO contents (id, totem_id, category, title, artist, snippet, full_text,
                                  media_url, views, submitter_name, submitter_email, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.totem_id)
        .bind(item.category)
        .bind(&item.title)
        .bind(&item.artist)
        .bind(&item.snippet)
        .bind(&item.full_text)
        .bind(&item.media_url)
        .bind(&item.submitter_name)
        .bind(&item.submitter_email)
        .bind(item.created_at)
        .execute(&self.db)
        .await?;

        tracing::info!("Content {} submitted for totem {:?}", item.id, item.totem_id);
        Ok(item)
    }

    /// Delete a content item; NotFound when nothing was deleted
    pub async fn delete(&self, id: &str) -> DistimResult<()> {
        let result = sqlx::query("DELETE FROM contents WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DistimError::NotFound(format!("Content {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewTotem, TotemStore};
    use crate::db;

    async fn setup() -> (TotemStore, ContentStore) {
        let pool = db::create_memory_pool().await.unwrap();
        let totems = TotemStore::new(pool.clone());
        totems
            .create(NewTotem {
                id: "bastion".to_string(),
                name: "Bastionul Theresia".to_string(),
                description: None,
                teaser_text: None,
                locked_text: None,
                qr_slug: Some("b4st10n".to_string()),
                stamp_label: None,
                stamp_emoji: None,
                latitude: 45.7561,
                longitude: 21.2336,
            })
            .await
            .unwrap();
        (totems, ContentStore::new(pool))
    }

    fn submission(title: &str, category: ContentCategory) -> SubmitContent {
        SubmitContent {
            totem_id: "bastion".to_string(),
            category,
            title: title.to_string(),
            artist: Some("  Ana Stoica ".to_string()),
            artist_email: Some("".to_string()),
            snippet: Some("   ".to_string()),
            full_text: Some("Versuri despre oraș".to_string()),
            media_url: None,
        }
    }

    #[tokio::test]
    async fn test_submit_trims_and_nulls_blank_fields() {
        let (_, contents) = setup().await;

        let item = contents
            .submit(submission("  Zidurile  ", ContentCategory::Poezie))
            .await
            .unwrap();

        assert_eq!(item.title, "Zidurile");
        assert_eq!(item.artist.as_deref(), Some("Ana Stoica"));
        assert!(item.snippet.is_none());
        assert!(item.submitter_email.is_none());

        let stored = contents.get(&item.id).await.unwrap().unwrap();
        assert!(stored.snippet.is_none());
        assert_eq!(stored.totem_name.as_deref(), Some("Bastionul Theresia"));
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_title_and_unknown_totem() {
        let (_, contents) = setup().await;

        let blank = contents.submit(submission("   ", ContentCategory::Arte)).await;
        assert!(matches!(blank, Err(DistimError::Validation(_))));

        let mut orphan = submission("Titlu", ContentCategory::Arte);
        orphan.totem_id = "nowhere".to_string();
        assert!(matches!(
            contents.submit(orphan).await,
            Err(DistimError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_views_increment_per_load() {
        let (_, contents) = setup().await;
        let item = contents
            .submit(submission("Jazz la bastion", ContentCategory::Muzica))
            .await
            .unwrap();

        assert_eq!(contents.view(&item.id).await.unwrap().views, 1);
        assert_eq!(contents.view(&item.id).await.unwrap().views, 2);
        assert_eq!(contents.get(&item.id).await.unwrap().unwrap().views, 2);
    }

    #[tokio::test]
    async fn test_category_listing_sorted_by_views() {
        let (_, contents) = setup().await;
        let quiet = contents
            .submit(submission("Liniște", ContentCategory::Literatura))
            .await
            .unwrap();
        let popular = contents
            .submit(submission("Aplauze", ContentCategory::Literatura))
            .await
            .unwrap();
        contents
            .submit(submission("Culori", ContentCategory::Arte))
            .await
            .unwrap();

        contents.view(&popular.id).await.unwrap();

        let listed = contents
            .list_by_category(ContentCategory::Literatura)
            .await
            .unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![popular.id.as_str(), quiet.id.as_str()]);
    }

    #[tokio::test]
    async fn test_delete_missing_content() {
        let (_, contents) = setup().await;
        assert!(matches!(
            contents.delete("missing").await,
            Err(DistimError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_totem_page_groups_categories() {
        let (totems, contents) = setup().await;
        contents
            .submit(submission("Pânză", ContentCategory::Arte))
            .await
            .unwrap();
        contents
            .submit(submission("Roman", ContentCategory::Literatura))
            .await
            .unwrap();

        let page = totems.page("bastion").await.unwrap();
        let order: Vec<ContentCategory> = page.categories.iter().map(|g| g.category).collect();
        assert_eq!(order, vec![ContentCategory::Literatura, ContentCategory::Arte]);
    }
}
