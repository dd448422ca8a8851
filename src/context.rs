/// Application context and dependency injection
use crate::{
    auth::TokenVerifier,
    catalog::{ContentStore, ProfileStore, TotemStore},
    config::{DeviceStoreConfig, ServerConfig},
    db,
    error::{DistimError, DistimResult},
    passport::{
        DiskKeyValueStore, KeyValueStore, LocalStampStore, MemoryKeyValueStore, PassportService,
        UnlockStore,
    },
    rate_limit::RateLimiter,
    story::StoryGenerator,
    unlock::UnlockResolver,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    // Catalog
    pub totems: TotemStore,
    pub contents: ContentStore,
    pub profiles: ProfileStore,
    // Passport and unlocks
    pub passport: PassportService,
    pub unlock_resolver: UnlockResolver,
    pub story: StoryGenerator,
    pub token_verifier: Arc<TokenVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> DistimResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let device_storage: Arc<dyn KeyValueStore> = match &config.storage.device_store {
            DeviceStoreConfig::Disk { location } => {
                tracing::info!("Device passports stored under {:?}", location);
                Arc::new(DiskKeyValueStore::new(location.clone()))
            }
            DeviceStoreConfig::Memory => {
                tracing::warn!("Device passports kept in memory; they are lost on restart");
                Arc::new(MemoryKeyValueStore::new())
            }
        };

        Self::from_parts(config, db, device_storage)
    }

    /// Context over a migrated in-memory database and in-memory device store
    pub async fn in_memory(config: ServerConfig) -> DistimResult<Self> {
        config.validate()?;
        let db = db::create_memory_pool().await?;
        Self::from_parts(config, db, Arc::new(MemoryKeyValueStore::new()))
    }

    fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        device_storage: Arc<dyn KeyValueStore>,
    ) -> DistimResult<Self> {
        let totems = TotemStore::new(db.clone());
        let contents = ContentStore::new(db.clone());
        let profiles = ProfileStore::new(db.clone());

        let passport = PassportService::new(
            LocalStampStore::new(device_storage),
            UnlockStore::new(db.clone()),
        );
        let unlock_resolver = UnlockResolver::new(totems.clone(), passport.clone());

        let story = StoryGenerator::new(config.story.clone())?;
        let token_verifier = Arc::new(TokenVerifier::new(&config.authentication)?);
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            db,
            totems,
            contents,
            profiles,
            passport,
            unlock_resolver,
            story,
            token_verifier,
            rate_limiter,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> DistimResult<()> {
        let mut dirs = vec![config.storage.data_directory.clone()];
        if let DeviceStoreConfig::Disk { location } = &config.storage.device_store {
            dirs.push(location.clone());
        }

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                    DistimError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
