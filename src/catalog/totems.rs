/// Totem catalog
use crate::{
    db::models::{ContentCategory, ContentItem, Totem},
    error::{DistimError, DistimResult},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

const TOTEM_COLUMNS: &str = "id, name, description, teaser_text, locked_text, qr_slug, \
     stamp_label, stamp_emoji, latitude, longitude, created_at";

/// Totem creation payload (admin)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTotem {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub teaser_text: Option<String>,
    pub locked_text: Option<String>,
    pub qr_slug: Option<String>,
    pub stamp_label: Option<String>,
    pub stamp_emoji: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Contents of one category on a totem page
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: ContentCategory,
    pub label: &'static str,
    pub items: Vec<ContentItem>,
}

/// Totem page: metadata plus contents grouped by category
#[derive(Debug, Clone, Serialize)]
pub struct TotemPage {
    pub totem: Totem,
    /// Only non-empty categories, in display order
    pub categories: Vec<CategoryGroup>,
}

/// Totem catalog store
#[derive(Clone)]
pub struct TotemStore {
    db: SqlitePool,
}

impl TotemStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List all totems ordered by name
    pub async fn list(&self) -> DistimResult<Vec<Totem>> {
        let totems = sqlx::query_as::<_, Totem>(&format!(
            "SELECT {} FROM totems ORDER BY name ASC",
            TOTEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(totems)
    }

    /// Get a totem by id
    pub async fn get(&self, id: &str) -> DistimResult<Option<Totem>> {
        let totem = sqlx::query_as::<_, Totem>(&format!(
            "SELECT {} FROM totems WHERE id = ?",
            TOTEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(totem)
    }

    /// Get a totem by id or fail with NotFound
    pub async fn require(&self, id: &str) -> DistimResult<Totem> {
        self.get(id)
            .await?
            .ok_or_else(|| DistimError::NotFound(format!("Totem {} not found", id)))
    }

    /// Create a totem
    pub async fn create(&self, new: NewTotem) -> DistimResult<Totem> {
        new.validate()?;

        if self.get(&new.id).await?.is_some() {
            return Err(DistimError::Conflict(format!("Totem {} already exists", new.id)));
        }

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO totems (id, name, description, teaser_text, locked_text, qr_slug,
                                stamp_label, stamp_emoji, latitude, longitude, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.teaser_text)
        .bind(&new.locked_text)
        .bind(&new.qr_slug)
        .bind(&new.stamp_label)
        .bind(&new.stamp_emoji)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!("Created totem {}", new.id);

        Ok(Totem {
            id: new.id,
            name: new.name,
            description: new.description,
            teaser_text: new.teaser_text,
            locked_text: new.locked_text,
            qr_slug: new.qr_slug,
            stamp_label: new.stamp_label,
            stamp_emoji: new.stamp_emoji,
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: now,
        })
    }

    /// Load a totem with its contents grouped by category
    pub async fn page(&self, id: &str) -> DistimResult<TotemPage> {
        let totem = self.require(id).await?;

        let contents = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT id, totem_id, category, title, artist, snippet, full_text, media_url,
                   views, submitter_name, submitter_email, created_at
            FROM contents
            WHERE totem_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(TotemPage {
            totem,
            categories: group_by_category(contents),
        })
    }
}

/// Group contents into the fixed category order, dropping empty groups
pub fn group_by_category(contents: Vec<ContentItem>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = ContentCategory::ALL
        .iter()
        .map(|category| CategoryGroup {
            category: *category,
            label: category.label(),
            items: Vec::new(),
        })
        .collect();

    for item in contents {
        if let Some(group) = groups.iter_mut().find(|g| g.category == item.category) {
            group.items.push(item);
        }
    }

    groups.retain(|g| !g.items.is_empty());
    groups
}
