use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::auth::session::{SessionKeys, SessionStore};
use crate::config::AppConfig;
use crate::db;
use crate::reports::charts::{ChartRenderer, PngChartRenderer};
use crate::repo::{Repository, SqliteRepository};

/// Everything a request handler needs, built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub repo: Arc<dyn Repository>,
    pub sessions: SessionStore,
    pub keys: SessionKeys,
    pub charts: Arc<dyn ChartRenderer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    /// Connects to `config.database_url` and creates the schema if absent.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect_pool(&config.database_url).await?;
        db::create_schema(&db).await.context("create schema")?;

        let repo = Arc::new(SqliteRepository::new(db.clone())) as Arc<dyn Repository>;
        let charts = Arc::new(PngChartRenderer::default()) as Arc<dyn ChartRenderer>;
        Ok(Self::from_parts(db, repo, charts, Arc::new(config)))
    }

    pub fn from_parts(
        db: SqlitePool,
        repo: Arc<dyn Repository>,
        charts: Arc<dyn ChartRenderer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            repo,
            sessions: SessionStore::new(),
            keys: SessionKeys::from_config(&config.session),
            charts,
            config,
        }
    }

    /// Isolated state over a private in-memory database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::in_memory()).await
    }
}
