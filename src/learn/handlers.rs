use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::error::LearnError;
use super::types::{
    CompleteModuleRequest, CreateQuestionRequest, CreateQuizRequest, Progress, ProgressRequest,
    Question, Quiz, QuizDetail, QuizResponse, QuizViewer, ResponseFilters, SubmissionResult,
    SubmitResponseRequest,
};
use crate::shared::state::AppState;

// ============================================================================
// HTTP HANDLERS
// ============================================================================
//
// Body and query rejections surface as `LearnError::Validation`.

pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Quiz>), LearnError> {
    let Json(req) = payload?;
    let quiz = state.engine.create_quiz(req).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Quiz with its module populated. `?userId=` of an author includes answers.
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<Uuid>,
    viewer: Result<Query<QuizViewer>, QueryRejection>,
) -> Result<Json<QuizDetail>, LearnError> {
    let Query(viewer) = viewer?;
    Ok(Json(state.engine.get_quiz(quiz_id, viewer).await?))
}

pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitResponseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionResult>), LearnError> {
    let Json(req) = payload?;
    let result = state.engine.submit_response(req).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    filters: Result<Query<ResponseFilters>, QueryRejection>,
) -> Result<Json<Vec<QuizResponse>>, LearnError> {
    let Query(filters) = filters?;
    Ok(Json(state.engine.list_responses(filters).await?))
}

pub async fn get_or_create_progress(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<Json<Progress>, LearnError> {
    let Json(req) = payload?;
    Ok(Json(state.engine.get_or_create_progress(req).await?))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProgressRequest>, QueryRejection>,
) -> Result<Json<Progress>, LearnError> {
    let Query(req) = query?;
    Ok(Json(state.engine.get_progress(req).await?))
}

pub async fn complete_module(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompleteModuleRequest>, JsonRejection>,
) -> Result<Json<Progress>, LearnError> {
    let Json(req) = payload?;
    Ok(Json(state.engine.complete_module(req).await?))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Question>), LearnError> {
    let Json(req) = payload?;
    let question = state.engine.create_question(req).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<Uuid>,
) -> Result<Json<Vec<Question>>, LearnError> {
    Ok(Json(state.engine.list_questions(module_id).await?))
}
