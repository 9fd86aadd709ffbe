//! Storage seams used by the quiz engine.
//!
//! Module, user and course records belong to the wider platform; the engine
//! only reads them through [`Directory`]. Questions, quizzes, responses and
//! progress are owned here.

#[cfg(test)]
pub mod contended;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::LearnError;
use super::types::{
    ModuleRef, Progress, Question, QuestionSample, Quiz, QuizResponse, UserRef,
};

pub use memory::{MemoryStore, Seed};
pub use postgres::PgStore;

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_module(&self, module_id: Uuid) -> Result<Option<ModuleRef>, LearnError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, LearnError>;

    async fn course_exists(&self, course_id: Uuid) -> Result<bool, LearnError>;
}

#[async_trait]
pub trait QuestionBank: Send + Sync {
    async fn insert_question(&self, question: Question) -> Result<Question, LearnError>;

    async fn list_questions(&self, module_id: Uuid) -> Result<Vec<Question>, LearnError>;

    /// Uniform random sample of at most `sample.count` matching questions.
    async fn sample_questions(&self, sample: &QuestionSample)
        -> Result<Vec<Question>, LearnError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, LearnError>;

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, LearnError>;

    async fn insert_response(&self, response: QuizResponse) -> Result<QuizResponse, LearnError>;

    /// Oldest first.
    async fn list_responses(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<QuizResponse>, LearnError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn find_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Progress>, LearnError>;

    /// Inserts unless a record for (user, course) exists; returns the stored one.
    async fn insert_progress(&self, progress: Progress) -> Result<Progress, LearnError>;

    /// Writes `progress` if the stored version still equals `progress.version`
    /// and returns it with the version bumped. A stale version is a
    /// [`LearnError::Conflict`].
    async fn save_progress(&self, progress: Progress) -> Result<Progress, LearnError>;
}

#[async_trait]
pub trait LearnStore: Directory + QuestionBank + QuizRepository + ProgressRepository {
    fn backend_name(&self) -> &'static str;

    /// Readiness probe for the health endpoint.
    async fn ping(&self) -> Result<(), LearnError> {
        Ok(())
    }
}
