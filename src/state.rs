use std::sync::Arc;

use crate::{
    accounts::services::AccountService,
    auth::jwt::JwtKeys,
    config::{AppConfig, ImageStorageConfig, JwtConfig},
    db,
    recipes::services::RecipeService,
    reviews::services::ReviewService,
    storage::{LocalStorage, MemoryStorage, Storage, StorageClient},
    store::{memory::MemoryStore, postgres::PgStore, ContentStore, CredentialStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub accounts: AccountService,
    pub recipes: RecipeService,
    pub reviews: ReviewService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        let store = Arc::new(PgStore::new(pool));

        let storage: Arc<dyn StorageClient> = match &config.images {
            ImageStorageConfig::Local { upload_dir } => Arc::new(LocalStorage::new(upload_dir)),
            ImageStorageConfig::S3(s3) => Arc::new(Storage::new(s3).await?),
        };

        Ok(Self::from_parts(config, store.clone(), store, storage))
    }

    /// Wires the services over explicit backends.
    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn CredentialStore>,
        content: Arc<dyn ContentStore>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        Self {
            accounts: AccountService::new(users, content.clone(), storage.clone(), jwt.clone()),
            recipes: RecipeService::new(content.clone(), storage),
            reviews: ReviewService::new(content),
            jwt,
            config: Arc::new(config),
        }
    }

    /// In-memory store and storage with a fixed test secret.
    pub fn fake() -> Self {
        Self::fake_with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn fake_with_storage(storage: Arc<MemoryStorage>) -> Self {
        let config = AppConfig {
            database_url: "postgres://unused".into(),
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "recipehub".into(),
                audience: "recipehub-users".into(),
                ttl_minutes: 60,
                refresh_ttl_minutes: 120,
            },
            images: ImageStorageConfig::Local {
                upload_dir: "uploads".into(),
            },
            max_upload_bytes: 1024 * 1024,
            host: "127.0.0.1".into(),
            port: 0,
        };
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store, storage)
    }
}
