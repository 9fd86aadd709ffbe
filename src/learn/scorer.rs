//! Response grading and the follow-up fold into course progress.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::difficulty::average_score;
use super::error::LearnError;
use super::progress::ProgressTracker;
use super::storage::LearnStore;
use super::types::{
    Answer, AnswerResult, QuizQuestion, QuizResponse, ResponseFilters, SubmissionResult,
    SubmitResponseRequest,
};

/// Applies `answers` to copies of the quiz questions by question id.
///
/// Unknown ids and repeated ids are rejected. Unanswered questions keep a
/// blank choice.
pub fn grade(
    questions: &[QuizQuestion],
    answers: &[Answer],
) -> Result<Vec<QuizQuestion>, LearnError> {
    let mut graded: Vec<QuizQuestion> = questions.to_vec();
    let index: HashMap<Uuid, usize> = graded
        .iter()
        .enumerate()
        .map(|(i, q)| (q.question_id, i))
        .collect();

    for answer in answers {
        let Some(&i) = index.get(&answer.question_id) else {
            return Err(LearnError::Validation(format!(
                "question {} is not part of this quiz",
                answer.question_id
            )));
        };
        if graded[i].choice.is_some() {
            return Err(LearnError::Validation(format!(
                "question {} answered more than once",
                answer.question_id
            )));
        }
        graded[i].choice = Some(answer.answer.clone());
    }

    Ok(graded)
}

pub fn score(graded: &[QuizQuestion]) -> i32 {
    graded.iter().filter(|q| q.is_correct()).count() as i32
}

#[derive(Clone)]
pub struct ResponseScorer {
    store: Arc<dyn LearnStore>,
    progress: ProgressTracker,
}

impl ResponseScorer {
    pub fn new(store: Arc<dyn LearnStore>, progress: ProgressTracker) -> Self {
        Self { store, progress }
    }

    pub async fn submit_response(
        &self,
        req: SubmitResponseRequest,
    ) -> Result<SubmissionResult, LearnError> {
        let quiz = self
            .store
            .find_quiz(req.quiz_id)
            .await?
            .ok_or_else(|| LearnError::Validation(format!("quiz {} does not exist", req.quiz_id)))?;
        if self.store.find_user(req.user_id).await?.is_none() {
            return Err(LearnError::Validation(format!(
                "user {} does not exist",
                req.user_id
            )));
        }

        let graded = grade(&quiz.questions, &req.answers)?;
        let response = QuizResponse {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            user_id: req.user_id,
            answers: req.answers,
            score: score(&graded),
            created_at: Utc::now(),
        };
        let response = self.store.insert_response(response).await?;

        info!(
            "User {} scored {}/{} on quiz {}",
            response.user_id,
            response.score,
            graded.len(),
            response.quiz_id
        );

        if let Err(e) = self.fold_into_progress(&response, quiz.module_id).await {
            warn!(
                "Progress not updated after response {}: {e}",
                response.id
            );
        }

        let breakdown = graded
            .into_iter()
            .map(|q| AnswerResult {
                is_correct: q.is_correct(),
                question_id: q.question_id,
                choice: q.choice,
                correct_answer: q.answer,
            })
            .collect::<Vec<_>>();

        Ok(SubmissionResult {
            max_score: breakdown.len() as i32,
            response,
            breakdown,
        })
    }

    pub async fn list_responses(
        &self,
        filters: ResponseFilters,
    ) -> Result<Vec<QuizResponse>, LearnError> {
        self.store
            .list_responses(filters.user_id, filters.quiz_id)
            .await
    }

    async fn fold_into_progress(
        &self,
        response: &QuizResponse,
        module_id: Uuid,
    ) -> Result<(), LearnError> {
        let module = self
            .store
            .find_module(module_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("module {module_id}")))?;
        let course_id = module.course_id.ok_or_else(|| {
            LearnError::Validation(format!("module {module_id} is not linked to a course"))
        })?;

        let history = self
            .store
            .list_responses(response.user_id, response.quiz_id)
            .await?;
        let average = average_score(&history);

        match self
            .progress
            .update_average_score(response.user_id, course_id, average)
            .await?
        {
            Some(progress) => debug!(
                "Average for user {} in course {course_id} is now {average:.2} (v{})",
                response.user_id, progress.version
            ),
            None => debug!(
                "No progress for user {} in course {course_id}, average not recorded",
                response.user_id
            ),
        }
        Ok(())
    }
}
