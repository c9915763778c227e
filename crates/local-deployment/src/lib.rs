use std::sync::Arc;

use async_trait::async_trait;
use config::{Config, load_config_from_file};
use db::DBService;
use deployment::{Deployment, DeploymentError};
use utils_core::assets::config_path;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let db = DBService::new(config.database_url().as_deref()).await?;
        tracing::info!(
            project = %config.project_name,
            backend = config.database_backend(),
            "Database connected"
        );
        Ok(Self::from_parts(config, db))
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }
}

impl LocalDeployment {
    pub fn from_parts(config: Config, db: DBService) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    /// `config.json` in the asset directory, then `.env`, then the environment.
    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let config = load_config_from_file(&config_path()).await.with_env();
        config.validate()?;
        Ok(config)
    }
}
