//! # Learn Module - Adaptive Quizzes and Course Progress
//!
//! - Quiz builder that picks a difficulty tier from the learner's average
//! - Response scoring with a per-question breakdown
//! - Progress tracking per (user, course) with optimistic versioning
//! - Question authoring for instructors and admins
//!
//! ## Architecture
//!
//! Handlers only talk to [`LearnEngine`]. The engine works over a shared
//! [`storage::LearnStore`], backed either by Postgres (diesel) or by the
//! in-memory store used for tests and seeded demos.

pub mod builder;
pub mod difficulty;
pub mod error;
pub mod handlers;
pub mod progress;
pub mod scorer;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::shared::state::AppState;

use builder::QuizBuilder;
use error::LearnError;
use progress::ProgressTracker;
use scorer::ResponseScorer;
use storage::LearnStore;
use types::{
    CompleteModuleRequest, CreateQuestionRequest, CreateQuizRequest, Progress, ProgressRequest,
    Question, QuestionType, Quiz, QuizDetail, QuizResponse, QuizViewer, ResponseFilters,
    SubmissionResult, SubmitResponseRequest,
};

// ============================================================================
// LEARN ENGINE
// ============================================================================

#[derive(Clone)]
pub struct LearnEngine {
    store: Arc<dyn LearnStore>,
    builder: QuizBuilder,
    scorer: ResponseScorer,
    progress: ProgressTracker,
}

impl LearnEngine {
    pub fn new(store: Arc<dyn LearnStore>, config: QuizConfig) -> Self {
        let progress = ProgressTracker::new(Arc::clone(&store), config.total_modules);
        Self {
            builder: QuizBuilder::new(Arc::clone(&store), config),
            scorer: ResponseScorer::new(Arc::clone(&store), progress.clone()),
            progress,
            store,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // ----- Quiz Operations -----

    /// The answer key is left in only when the creator can author questions.
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, LearnError> {
        let quiz = self.builder.create_quiz(req).await?;
        if self.sees_answers(Some(quiz.created_by)).await? {
            Ok(quiz)
        } else {
            Ok(quiz.without_answers())
        }
    }

    pub async fn get_quiz(
        &self,
        quiz_id: Uuid,
        viewer: QuizViewer,
    ) -> Result<QuizDetail, LearnError> {
        let mut detail = self.builder.get_quiz(quiz_id).await?;
        if !self.sees_answers(viewer.user_id).await? {
            detail.quiz = detail.quiz.without_answers();
        }
        Ok(detail)
    }

    async fn sees_answers(&self, user_id: Option<Uuid>) -> Result<bool, LearnError> {
        let Some(user_id) = user_id else {
            return Ok(false);
        };
        Ok(self
            .store
            .find_user(user_id)
            .await?
            .is_some_and(|user| user.role.can_author()))
    }

    // ----- Response Operations -----

    pub async fn submit_response(
        &self,
        req: SubmitResponseRequest,
    ) -> Result<SubmissionResult, LearnError> {
        self.scorer.submit_response(req).await
    }

    pub async fn list_responses(
        &self,
        filters: ResponseFilters,
    ) -> Result<Vec<QuizResponse>, LearnError> {
        self.scorer.list_responses(filters).await
    }

    // ----- Progress Operations -----

    pub async fn get_or_create_progress(&self, req: ProgressRequest) -> Result<Progress, LearnError> {
        self.progress.get_or_create(req.user_id, req.course_id).await
    }

    pub async fn get_progress(&self, req: ProgressRequest) -> Result<Progress, LearnError> {
        self.progress.get(req.user_id, req.course_id).await
    }

    pub async fn complete_module(&self, req: CompleteModuleRequest) -> Result<Progress, LearnError> {
        self.progress
            .complete_module(req.user_id, req.course_id, req.module_id)
            .await
    }

    // ----- Question Operations -----

    pub async fn create_question(&self, req: CreateQuestionRequest) -> Result<Question, LearnError> {
        let user = self
            .store
            .find_user(req.user_id)
            .await?
            .ok_or_else(|| LearnError::Validation(format!("user {} does not exist", req.user_id)))?;
        if !user.role.can_author() {
            return Err(LearnError::Validation(format!(
                "{} users cannot author questions",
                user.role
            )));
        }
        if self.store.find_module(req.module_id).await?.is_none() {
            return Err(LearnError::NotFound(format!("module {}", req.module_id)));
        }
        validate_question(&req)?;

        let question = Question {
            id: Uuid::new_v4(),
            module_id: req.module_id,
            difficulty: req.difficulty,
            question_type: req.question_type,
            prompt: req.prompt.trim().to_string(),
            options: req.options,
            answer: req.answer,
            created_by: Some(user.id),
            created_at: Utc::now(),
        };
        let question = self.store.insert_question(question).await?;
        info!(
            "Added {} {} question {} to module {}",
            question.difficulty, question.question_type, question.id, question.module_id
        );
        Ok(question)
    }

    pub async fn list_questions(&self, module_id: Uuid) -> Result<Vec<Question>, LearnError> {
        if self.store.find_module(module_id).await?.is_none() {
            return Err(LearnError::NotFound(format!("module {module_id}")));
        }
        self.store.list_questions(module_id).await
    }
}

fn validate_question(req: &CreateQuestionRequest) -> Result<(), LearnError> {
    if req.prompt.trim().is_empty() {
        return Err(LearnError::Validation("prompt must not be empty".to_string()));
    }
    if req.options.is_empty() {
        return Err(LearnError::Validation("options must not be empty".to_string()));
    }
    if req.options.iter().any(|o| o.trim().is_empty()) {
        return Err(LearnError::Validation("options must not be blank".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = req.options.iter().find(|o| !seen.insert(o.as_str())) {
        return Err(LearnError::Validation(format!("duplicate option '{dup}'")));
    }
    if req.question_type == QuestionType::TrueFalse && req.options.len() != 2 {
        return Err(LearnError::Validation(format!(
            "true-false questions need exactly 2 options, got {}",
            req.options.len()
        )));
    }
    if !req.options.contains(&req.answer) {
        return Err(LearnError::Validation(format!(
            "answer '{}' is not one of the options",
            req.answer
        )));
    }
    Ok(())
}

// ============================================================================
// ROUTE CONFIGURATION
// ============================================================================

pub fn configure_learn_routes() -> Router<Arc<AppState>> {
    use handlers::*;

    Router::new()
        // Quiz routes
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/:id", get(get_quiz))
        // Response routes
        .route("/responses", get(list_responses).post(submit_response))
        // Progress routes
        .route("/progress", get(get_progress).post(get_or_create_progress))
        .route("/progress/complete", put(complete_module))
        // Question bank
        .route("/questions", post(create_question))
        .route("/modules/:id/questions", get(list_questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::storage::MemoryStore;
    use crate::learn::types::{Difficulty, ModuleRef, Role, UserRef};

    struct Fixture {
        engine: LearnEngine,
        instructor: Uuid,
        student: Uuid,
        module_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let course_id = Uuid::new_v4();
        let module_id = Uuid::new_v4();
        let instructor = Uuid::new_v4();
        let student = Uuid::new_v4();
        store.add_course(course_id).await;
        store
            .add_module(ModuleRef {
                id: module_id,
                course_id: Some(course_id),
                title: "Lifetimes".to_string(),
            })
            .await;
        store
            .add_user(UserRef {
                id: instructor,
                role: Role::Instructor,
            })
            .await;
        store
            .add_user(UserRef {
                id: student,
                role: Role::Student,
            })
            .await;
        Fixture {
            engine: LearnEngine::new(Arc::new(store), QuizConfig::default()),
            instructor,
            student,
            module_id,
        }
    }

    fn request(user_id: Uuid, module_id: Uuid) -> CreateQuestionRequest {
        CreateQuestionRequest {
            user_id,
            module_id,
            difficulty: Difficulty::Medium,
            question_type: QuestionType::Mcq,
            prompt: "Which keyword borrows mutably?".to_string(),
            options: vec!["&".to_string(), "&mut".to_string(), "move".to_string()],
            answer: "&mut".to_string(),
        }
    }

    #[tokio::test]
    async fn test_instructor_authors_question() {
        let fx = fixture().await;
        let question = fx
            .engine
            .create_question(request(fx.instructor, fx.module_id))
            .await
            .unwrap();
        assert_eq!(question.created_by, Some(fx.instructor));

        let listed = fx.engine.list_questions(fx.module_id).await.unwrap();
        assert_eq!(listed, vec![question]);
    }

    #[tokio::test]
    async fn test_student_cannot_author() {
        let fx = fixture().await;
        let err = fx
            .engine
            .create_question(request(fx.student, fx.module_id))
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));
    }

    #[tokio::test]
    async fn test_question_needs_module() {
        let fx = fixture().await;
        let err = fx
            .engine
            .create_question(request(fx.instructor, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::NotFound(_)));
        assert!(matches!(
            fx.engine.list_questions(Uuid::new_v4()).await,
            Err(LearnError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_answer_key_only_for_authors() {
        let fx = fixture().await;
        for _ in 0..5 {
            fx.engine
                .create_question(request(fx.instructor, fx.module_id))
                .await
                .unwrap();
        }

        let quiz = fx
            .engine
            .create_quiz(CreateQuizRequest {
                user_id: fx.instructor,
                module_id: fx.module_id,
                size: None,
                question_type: None,
            })
            .await
            .unwrap();
        assert!(quiz.questions.iter().all(|q| q.answer == "&mut"));

        let anonymous = fx.engine.get_quiz(quiz.id, QuizViewer::default()).await.unwrap();
        assert!(anonymous.quiz.questions.iter().all(|q| q.answer.is_empty()));

        let student = QuizViewer {
            user_id: Some(fx.student),
        };
        let seen = fx.engine.get_quiz(quiz.id, student).await.unwrap();
        assert!(seen.quiz.questions.iter().all(|q| q.answer.is_empty()));

        let author = QuizViewer {
            user_id: Some(fx.instructor),
        };
        let seen = fx.engine.get_quiz(quiz.id, author).await.unwrap();
        assert!(seen.quiz.questions.iter().all(|q| q.answer == "&mut"));
    }

    #[test]
    fn test_question_shape_rules() {
        let base = request(Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_question(&base).is_ok());

        let mut blank = base.clone();
        blank.prompt = "   ".to_string();
        assert!(validate_question(&blank).is_err());

        let mut wrong_answer = base.clone();
        wrong_answer.answer = "ref".to_string();
        assert!(validate_question(&wrong_answer).is_err());

        let mut duplicated = base.clone();
        duplicated.options.push("&".to_string());
        assert!(validate_question(&duplicated).is_err());

        let mut true_false = base.clone();
        true_false.question_type = QuestionType::TrueFalse;
        assert!(validate_question(&true_false).is_err());
        true_false.options = vec!["true".to_string(), "false".to_string()];
        true_false.answer = "false".to_string();
        assert!(validate_question(&true_false).is_ok());

        let mut blank_option = base.clone();
        blank_option.options.push(" ".to_string());
        assert!(validate_question(&blank_option).is_err());

        let mut empty = base;
        empty.options.clear();
        assert!(validate_question(&empty).is_err());
    }
}
