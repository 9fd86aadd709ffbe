use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_PATH_VAR: &str = "LEARNSERVER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "learnserver.toml";
pub const ENV_PREFIX: &str = "LEARNSERVER_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub quiz: QuizConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin is accepted.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://learnuser:@localhost:5432/learnserver".to_string(),
            pool_size: 10,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON seed loaded into the memory backend at startup.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizConfig {
    pub default_size: i32,
    pub max_size: i32,
    /// Denominator for completed-percentage. Fixed per deployment, not per course.
    pub total_modules: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_size: 5,
            max_size: 50,
            total_modules: 10,
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then `LEARNSERVER_*` variables, then `DATABASE_URL`.
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        if let Ok(url) = std::env::var("DATABASE_URL") {
            figment = figment.merge(Serialized::default("database.url", url));
        }
        figment
    }

    pub fn load() -> Result<Self, anyhow::Error> {
        let config: AppConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let quiz = &self.quiz;
        if quiz.max_size < 1 {
            anyhow::bail!("quiz.max_size must be at least 1, got {}", quiz.max_size);
        }
        if quiz.default_size < 1 || quiz.default_size > quiz.max_size {
            anyhow::bail!(
                "quiz.default_size must be within 1..={}, got {}",
                quiz.max_size,
                quiz.default_size
            );
        }
        if quiz.total_modules == 0 {
            anyhow::bail!("quiz.total_modules must be positive");
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be positive");
        }
        Ok(())
    }
}
