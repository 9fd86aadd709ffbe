use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use learnserver::config::{AppConfig, StorageBackend};
use learnserver::learn::storage::{LearnStore, MemoryStore, PgStore, Seed};
use learnserver::main_module::run_server;
use learnserver::shared::state::AppState;
use learnserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!(
        "Starting learnserver {} with {:?} storage",
        env!("CARGO_PKG_VERSION"),
        config.storage.backend
    );

    let store = open_store(&config)?;
    let state = Arc::new(AppState::new(config, store));

    if let Err(e) = run_server(state).await {
        error!("Server stopped with error: {e}");
        return Err(e.into());
    }
    info!("Server stopped");
    Ok(())
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LearnStore>> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = create_conn(&config.database).context("failed to create database pool")?;
            if config.database.run_migrations {
                run_migrations(&pool).context("failed to run migrations")?;
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            let store = match &config.storage.seed_file {
                Some(path) => {
                    let seed = Seed::from_file(path)
                        .with_context(|| format!("failed to load seed {}", path.display()))?;
                    info!(
                        "Seeded memory store from {}: {} modules, {} users, {} questions",
                        path.display(),
                        seed.modules.len(),
                        seed.users.len(),
                        seed.questions.len()
                    );
                    MemoryStore::from_seed(seed)
                }
                None => MemoryStore::new(),
            };
            Ok(Arc::new(store))
        }
    }
}
