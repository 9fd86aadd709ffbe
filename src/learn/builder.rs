//! Quiz creation with progress-driven difficulty.

use chrono::Utc;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use super::difficulty::score_percentage;
use super::error::LearnError;
use super::storage::LearnStore;
use super::types::{
    CreateQuizRequest, Difficulty, Question, QuestionSample, Quiz, QuizDetail, Role,
};
use crate::config::QuizConfig;

#[derive(Clone)]
pub struct QuizBuilder {
    store: Arc<dyn LearnStore>,
    config: QuizConfig,
}

impl QuizBuilder {
    pub fn new(store: Arc<dyn LearnStore>, config: QuizConfig) -> Self {
        Self { store, config }
    }

    /// Instructors get a uniform sample of the whole module. Everyone else is
    /// sampled from the tier matching their course average. Nothing is stored
    /// unless the full quiz can be filled.
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, LearnError> {
        let size = req.size.unwrap_or(self.config.default_size);
        if size < 1 || size > self.config.max_size {
            return Err(LearnError::Validation(format!(
                "quiz size must be between 1 and {}, got {size}",
                self.config.max_size
            )));
        }

        let module = self
            .store
            .find_module(req.module_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("module {}", req.module_id)))?;
        let course_id = module.course_id.ok_or_else(|| {
            LearnError::Validation(format!("module {} is not linked to a course", module.id))
        })?;

        let user = self
            .store
            .find_user(req.user_id)
            .await?
            .ok_or_else(|| LearnError::Validation(format!("user {} does not exist", req.user_id)))?;

        let difficulty = match user.role {
            Role::Instructor => None,
            Role::Student | Role::Admin => {
                Some(self.target_difficulty(user.id, course_id, size).await?)
            }
        };

        let sample = QuestionSample {
            module_id: module.id,
            difficulty,
            question_type: req.question_type,
            count: size as usize,
        };
        let questions = self.store.sample_questions(&sample).await?;
        if questions.len() < sample.count {
            return Err(LearnError::InsufficientData(format!(
                "not enough questions available: need {}, found {}",
                sample.count,
                questions.len()
            )));
        }

        let quiz = Quiz {
            id: Uuid::new_v4(),
            module_id: module.id,
            created_by: user.id,
            size,
            question_type: req.question_type,
            difficulty,
            questions: questions.iter().map(Question::snapshot).collect(),
            created_at: Utc::now(),
        };
        let quiz = self.store.insert_quiz(quiz).await?;

        info!(
            "Created quiz {} for module {} by {} user {} ({} questions, tier {})",
            quiz.id,
            quiz.module_id,
            user.role,
            user.id,
            quiz.questions.len(),
            difficulty.map_or_else(|| "any".to_string(), |d| d.to_string())
        );

        Ok(quiz)
    }

    pub async fn target_difficulty(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        size: i32,
    ) -> Result<Difficulty, LearnError> {
        let progress = self
            .store
            .find_progress(user_id, course_id)
            .await?
            .ok_or_else(|| {
                LearnError::Validation(format!(
                    "no progress recorded for user {user_id} in course {course_id}"
                ))
            })?;
        let average = progress.average_score.ok_or_else(|| {
            LearnError::Validation(format!(
                "progress for user {user_id} in course {course_id} has no average score"
            ))
        })?;
        Ok(Difficulty::for_percentage(score_percentage(average, size)))
    }

    pub async fn get_quiz(&self, quiz_id: Uuid) -> Result<QuizDetail, LearnError> {
        let quiz = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("quiz {quiz_id}")))?;
        let module = self
            .store
            .find_module(quiz.module_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("module {}", quiz.module_id)))?;
        Ok(QuizDetail { quiz, module })
    }
}
