use crate::config::AppConfig;
use crate::providers::Providers;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub providers: Arc<Providers>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        let providers = Arc::new(Providers::new(&config.providers)?);

        Ok(Self {
            db,
            config,
            providers,
        })
    }
}
