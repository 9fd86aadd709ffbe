//! Test store that fails progress saves with a version conflict.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use super::{Directory, LearnStore, MemoryStore, ProgressRepository, QuestionBank, QuizRepository};
use crate::learn::error::LearnError;
use crate::learn::types::{
    ModuleRef, Progress, Question, QuestionSample, Quiz, QuizResponse, UserRef,
};

/// Delegates to a [`MemoryStore`] but reports a conflict on the first
/// `conflicts` calls to `save_progress`.
pub struct ContendedStore {
    pub inner: MemoryStore,
    conflicts: usize,
    saves: AtomicUsize,
}

impl ContendedStore {
    pub fn new(inner: MemoryStore, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts,
            saves: AtomicUsize::new(0),
        }
    }

    /// Every save conflicts.
    pub fn always(inner: MemoryStore) -> Self {
        Self::new(inner, usize::MAX)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for ContendedStore {
    async fn find_module(&self, id: Uuid) -> Result<Option<ModuleRef>, LearnError> {
        self.inner.find_module(id).await
    }
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRef>, LearnError> {
        self.inner.find_user(id).await
    }
    async fn course_exists(&self, id: Uuid) -> Result<bool, LearnError> {
        self.inner.course_exists(id).await
    }
}

#[async_trait]
impl QuestionBank for ContendedStore {
    async fn insert_question(&self, q: Question) -> Result<Question, LearnError> {
        self.inner.insert_question(q).await
    }
    async fn list_questions(&self, id: Uuid) -> Result<Vec<Question>, LearnError> {
        self.inner.list_questions(id).await
    }
    async fn sample_questions(&self, s: &QuestionSample) -> Result<Vec<Question>, LearnError> {
        self.inner.sample_questions(s).await
    }
}

#[async_trait]
impl QuizRepository for ContendedStore {
    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, LearnError> {
        self.inner.insert_quiz(quiz).await
    }
    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, LearnError> {
        self.inner.find_quiz(id).await
    }
    async fn insert_response(&self, r: QuizResponse) -> Result<QuizResponse, LearnError> {
        self.inner.insert_response(r).await
    }
    async fn list_responses(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<QuizResponse>, LearnError> {
        self.inner.list_responses(user_id, quiz_id).await
    }
}

#[async_trait]
impl ProgressRepository for ContendedStore {
    async fn find_progress(&self, u: Uuid, c: Uuid) -> Result<Option<Progress>, LearnError> {
        self.inner.find_progress(u, c).await
    }
    async fn insert_progress(&self, p: Progress) -> Result<Progress, LearnError> {
        self.inner.insert_progress(p).await
    }
    async fn save_progress(&self, p: Progress) -> Result<Progress, LearnError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) < self.conflicts {
            return Err(LearnError::Conflict("concurrent writer".to_string()));
        }
        self.inner.save_progress(p).await
    }
}

impl LearnStore for ContendedStore {
    fn backend_name(&self) -> &'static str {
        "contended"
    }
}
