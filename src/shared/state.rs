use std::sync::Arc;

use crate::config::AppConfig;
use crate::learn::storage::LearnStore;
use crate::learn::LearnEngine;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn LearnStore>,
    pub engine: LearnEngine,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn LearnStore>) -> Self {
        let engine = LearnEngine::new(Arc::clone(&store), config.quiz.clone());
        Self {
            config,
            store,
            engine,
        }
    }
}
