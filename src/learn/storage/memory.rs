use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Directory, LearnStore, ProgressRepository, QuestionBank, QuizRepository};
use crate::learn::error::LearnError;
use crate::learn::types::{
    ModuleRef, Progress, Question, QuestionSample, Quiz, QuizResponse, UserRef,
};

/// Initial contents for a [`MemoryStore`], usually read from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub courses: Vec<Uuid>,
    #[serde(default)]
    pub modules: Vec<ModuleRef>,
    #[serde(default)]
    pub users: Vec<UserRef>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Seed {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LearnError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LearnError::Internal(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| LearnError::Internal(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Default)]
struct MemoryTables {
    courses: HashSet<Uuid>,
    modules: HashMap<Uuid, ModuleRef>,
    users: HashMap<Uuid, UserRef>,
    questions: Vec<Question>,
    quizzes: HashMap<Uuid, Quiz>,
    responses: Vec<QuizResponse>,
    progress: HashMap<(Uuid, Uuid), Progress>,
}

/// Process-local backend for development and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let mut tables = MemoryTables::default();
        tables.courses.extend(seed.courses);
        for module in seed.modules {
            if let Some(course_id) = module.course_id {
                tables.courses.insert(course_id);
            }
            tables.modules.insert(module.id, module);
        }
        tables
            .users
            .extend(seed.users.into_iter().map(|u| (u.id, u)));
        tables.questions = seed.questions;
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub async fn add_course(&self, course_id: Uuid) {
        self.tables.write().await.courses.insert(course_id);
    }

    pub async fn add_module(&self, module: ModuleRef) {
        self.tables.write().await.modules.insert(module.id, module);
    }

    pub async fn add_user(&self, user: UserRef) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_module(&self, module_id: Uuid) -> Result<Option<ModuleRef>, LearnError> {
        Ok(self.tables.read().await.modules.get(&module_id).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, LearnError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn course_exists(&self, course_id: Uuid) -> Result<bool, LearnError> {
        Ok(self.tables.read().await.courses.contains(&course_id))
    }
}

#[async_trait]
impl QuestionBank for MemoryStore {
    async fn insert_question(&self, question: Question) -> Result<Question, LearnError> {
        self.tables.write().await.questions.push(question.clone());
        Ok(question)
    }

    async fn list_questions(&self, module_id: Uuid) -> Result<Vec<Question>, LearnError> {
        Ok(self
            .tables
            .read()
            .await
            .questions
            .iter()
            .filter(|q| q.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn sample_questions(
        &self,
        sample: &QuestionSample,
    ) -> Result<Vec<Question>, LearnError> {
        let tables = self.tables.read().await;
        let pool: Vec<&Question> = tables
            .questions
            .iter()
            .filter(|q| sample.matches(q))
            .collect();
        Ok(pool
            .choose_multiple(&mut rand::thread_rng(), sample.count)
            .map(|q| (*q).clone())
            .collect())
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, LearnError> {
        self.tables.write().await.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, LearnError> {
        Ok(self.tables.read().await.quizzes.get(&quiz_id).cloned())
    }

    async fn insert_response(&self, response: QuizResponse) -> Result<QuizResponse, LearnError> {
        self.tables.write().await.responses.push(response.clone());
        Ok(response)
    }

    async fn list_responses(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<QuizResponse>, LearnError> {
        Ok(self
            .tables
            .read()
            .await
            .responses
            .iter()
            .filter(|r| r.user_id == user_id && r.quiz_id == quiz_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn find_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Progress>, LearnError> {
        Ok(self
            .tables
            .read()
            .await
            .progress
            .get(&(user_id, course_id))
            .cloned())
    }

    async fn insert_progress(&self, progress: Progress) -> Result<Progress, LearnError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .progress
            .entry((progress.user_id, progress.course_id))
            .or_insert(progress);
        Ok(stored.clone())
    }

    async fn save_progress(&self, mut progress: Progress) -> Result<Progress, LearnError> {
        let mut tables = self.tables.write().await;
        let key = (progress.user_id, progress.course_id);
        let current = tables
            .progress
            .get(&key)
            .ok_or_else(|| LearnError::NotFound("progress record".to_string()))?;
        if current.version != progress.version {
            return Err(LearnError::Conflict(format!(
                "progress {} changed since it was read",
                current.id
            )));
        }
        progress.version += 1;
        tables.progress.insert(key, progress.clone());
        Ok(progress)
    }
}

impl LearnStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
