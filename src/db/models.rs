/// Catalog and passport database models
use crate::error::DistimError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Totem record: a QR-bearing marker at a transit station
///
/// `qr_slug` and `locked_text` are never serialized; the unlock flow decides
/// when the bonus text may be shown.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Totem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub teaser_text: Option<String>,
    #[serde(skip_serializing)]
    pub locked_text: Option<String>,
    #[serde(skip_serializing)]
    pub qr_slug: Option<String>,
    pub stamp_label: Option<String>,
    pub stamp_emoji: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Totem {
    /// Label shown on the stamp, falling back to the totem name
    pub fn stamp_label_or_name(&self) -> &str {
        self.stamp_label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentCategory {
    Literatura,
    Poezie,
    Muzica,
    Arte,
}

impl ContentCategory {
    /// Display order on totem pages
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Literatura,
        ContentCategory::Poezie,
        ContentCategory::Muzica,
        ContentCategory::Arte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Literatura => "literatura",
            ContentCategory::Poezie => "poezie",
            ContentCategory::Muzica => "muzica",
            ContentCategory::Arte => "arte",
        }
    }

    /// Human-readable Romanian label
    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::Literatura => "Literatură",
            ContentCategory::Poezie => "Poezie",
            ContentCategory::Muzica => "Muzică",
            ContentCategory::Arte => "Arte vizuale",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = DistimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literatura" => Ok(ContentCategory::Literatura),
            "poezie" => Ok(ContentCategory::Poezie),
            "muzica" => Ok(ContentCategory::Muzica),
            "arte" => Ok(ContentCategory::Arte),
            _ => Err(DistimError::Validation(format!("Invalid category: {}", s))),
        }
    }
}

/// Content item attached to a totem
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub totem_id: Option<String>,
    pub category: ContentCategory,
    pub title: String,
    pub artist: Option<String>,
    pub snippet: Option<String>,
    pub full_text: Option<String>,
    pub media_url: Option<String>,
    pub views: i64,
    pub submitter_name: Option<String>,
    #[serde(skip_serializing)]
    pub submitter_email: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Joined from `totems.name` where the query selects it
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totem_name: Option<String>,
}

/// Visitor profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_artist: bool,
    pub created_at: DateTime<Utc>,
}
