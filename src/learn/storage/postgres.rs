use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use super::{Directory, LearnStore, ProgressRepository, QuestionBank, QuizRepository};
use crate::learn::error::LearnError;
use crate::learn::types::{
    Difficulty, ModuleRef, Progress, Question, QuestionSample, QuestionType, Quiz, QuizResponse,
    Role, UserRef,
};
use crate::shared::schema::{
    learn_courses, learn_modules, learn_progress, learn_questions, learn_quizzes,
    learn_responses, learn_users,
};
use crate::shared::utils::DbPool;

diesel::define_sql_function!(fn random() -> Double);

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = learn_questions)]
pub struct DbQuestion {
    pub id: Uuid,
    pub module_id: Uuid,
    pub difficulty: String,
    pub question_type: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = learn_quizzes)]
pub struct DbQuiz {
    pub id: Uuid,
    pub module_id: Uuid,
    pub created_by: Uuid,
    pub size: i32,
    pub question_type: Option<String>,
    pub difficulty: Option<String>,
    pub questions: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = learn_responses)]
pub struct DbResponse {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub answers: serde_json::Value,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = learn_progress)]
pub struct DbProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub completed_percentage: f64,
    pub completed_modules: Vec<Uuid>,
    pub average_score: Option<f64>,
    pub last_accessed_at: DateTime<Utc>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> LearnError {
    LearnError::Internal(format!("stored {what} is malformed: {e}"))
}

pub fn db_question_to_question(db: DbQuestion) -> Result<Question, LearnError> {
    Ok(Question {
        id: db.id,
        module_id: db.module_id,
        difficulty: db.difficulty.parse().map_err(|e| corrupt("question", e))?,
        question_type: db.question_type.parse().map_err(|e| corrupt("question", e))?,
        prompt: db.prompt,
        options: db.options,
        answer: db.answer,
        created_by: db.created_by,
        created_at: db.created_at,
    })
}

fn question_to_db(question: &Question) -> DbQuestion {
    DbQuestion {
        id: question.id,
        module_id: question.module_id,
        difficulty: question.difficulty.to_string(),
        question_type: question.question_type.to_string(),
        prompt: question.prompt.clone(),
        options: question.options.clone(),
        answer: question.answer.clone(),
        created_by: question.created_by,
        created_at: question.created_at,
    }
}

pub fn db_quiz_to_quiz(db: DbQuiz) -> Result<Quiz, LearnError> {
    let question_type = db
        .question_type
        .map(|t| t.parse::<QuestionType>())
        .transpose()
        .map_err(|e| corrupt("quiz", e))?;
    let difficulty = db
        .difficulty
        .map(|d| d.parse::<Difficulty>())
        .transpose()
        .map_err(|e| corrupt("quiz", e))?;
    Ok(Quiz {
        id: db.id,
        module_id: db.module_id,
        created_by: db.created_by,
        size: db.size,
        question_type,
        difficulty,
        questions: serde_json::from_value(db.questions).map_err(|e| corrupt("quiz", e))?,
        created_at: db.created_at,
    })
}

fn quiz_to_db(quiz: &Quiz) -> Result<DbQuiz, LearnError> {
    Ok(DbQuiz {
        id: quiz.id,
        module_id: quiz.module_id,
        created_by: quiz.created_by,
        size: quiz.size,
        question_type: quiz.question_type.map(|t| t.to_string()),
        difficulty: quiz.difficulty.map(|d| d.to_string()),
        questions: serde_json::to_value(&quiz.questions)
            .map_err(|e| LearnError::Internal(e.to_string()))?,
        created_at: quiz.created_at,
    })
}

pub fn db_response_to_response(db: DbResponse) -> Result<QuizResponse, LearnError> {
    Ok(QuizResponse {
        id: db.id,
        quiz_id: db.quiz_id,
        user_id: db.user_id,
        answers: serde_json::from_value(db.answers).map_err(|e| corrupt("response", e))?,
        score: db.score,
        created_at: db.created_at,
    })
}

fn response_to_db(response: &QuizResponse) -> Result<DbResponse, LearnError> {
    Ok(DbResponse {
        id: response.id,
        quiz_id: response.quiz_id,
        user_id: response.user_id,
        answers: serde_json::to_value(&response.answers)
            .map_err(|e| LearnError::Internal(e.to_string()))?,
        score: response.score,
        created_at: response.created_at,
    })
}

pub fn user_from_row(id: Uuid, role: &str) -> Result<UserRef, LearnError> {
    Ok(UserRef {
        id,
        role: role.parse::<Role>().map_err(|e| corrupt("user", e))?,
    })
}

impl From<DbProgress> for Progress {
    fn from(db: DbProgress) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            course_id: db.course_id,
            completed_percentage: db.completed_percentage,
            completed_modules: db.completed_modules,
            average_score: db.average_score,
            last_accessed_at: db.last_accessed_at,
            version: db.version,
            created_at: db.created_at,
        }
    }
}

impl From<&Progress> for DbProgress {
    fn from(p: &Progress) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            course_id: p.course_id,
            completed_percentage: p.completed_percentage,
            completed_modules: p.completed_modules.clone(),
            average_score: p.average_score,
            last_accessed_at: p.last_accessed_at,
            version: p.version,
            created_at: p.created_at,
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

/// PostgreSQL backend. Diesel is synchronous, so every call runs on the
/// blocking pool with its own pooled connection.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, LearnError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, LearnError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| LearnError::Database(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn find_module(&self, module_id: Uuid) -> Result<Option<ModuleRef>, LearnError> {
        self.run(move |conn| {
            let row: Option<(Uuid, Option<Uuid>, String)> = learn_modules::table
                .filter(learn_modules::id.eq(module_id))
                .select((learn_modules::id, learn_modules::course_id, learn_modules::title))
                .first(conn)
                .optional()?;
            Ok(row.map(|(id, course_id, title)| ModuleRef {
                id,
                course_id,
                title,
            }))
        })
        .await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, LearnError> {
        self.run(move |conn| {
            let role: Option<String> = learn_users::table
                .filter(learn_users::id.eq(user_id))
                .select(learn_users::role)
                .first(conn)
                .optional()?;
            role.map(|role| user_from_row(user_id, &role)).transpose()
        })
        .await
    }

    async fn course_exists(&self, course_id: Uuid) -> Result<bool, LearnError> {
        self.run(move |conn| {
            let count: i64 = learn_courses::table
                .filter(learn_courses::id.eq(course_id))
                .count()
                .get_result(conn)?;
            Ok(count > 0)
        })
        .await
    }
}

#[async_trait]
impl QuestionBank for PgStore {
    async fn insert_question(&self, question: Question) -> Result<Question, LearnError> {
        let row = question_to_db(&question);
        self.run(move |conn| {
            diesel::insert_into(learn_questions::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(question)
    }

    async fn list_questions(&self, module_id: Uuid) -> Result<Vec<Question>, LearnError> {
        self.run(move |conn| {
            let rows: Vec<DbQuestion> = learn_questions::table
                .filter(learn_questions::module_id.eq(module_id))
                .order(learn_questions::created_at.asc())
                .load(conn)?;
            rows.into_iter().map(db_question_to_question).collect()
        })
        .await
    }

    async fn sample_questions(
        &self,
        sample: &QuestionSample,
    ) -> Result<Vec<Question>, LearnError> {
        let sample = sample.clone();
        let limit = i64::try_from(sample.count)
            .map_err(|_| LearnError::Validation("sample size out of range".to_string()))?;
        self.run(move |conn| {
            let mut query = learn_questions::table
                .filter(learn_questions::module_id.eq(sample.module_id))
                .into_boxed();

            if let Some(difficulty) = sample.difficulty {
                query = query.filter(learn_questions::difficulty.eq(difficulty.to_string()));
            }

            if let Some(question_type) = sample.question_type {
                query =
                    query.filter(learn_questions::question_type.eq(question_type.to_string()));
            }

            let rows: Vec<DbQuestion> = query.order(random()).limit(limit).load(conn)?;
            rows.into_iter().map(db_question_to_question).collect()
        })
        .await
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, LearnError> {
        let row = quiz_to_db(&quiz)?;
        self.run(move |conn| {
            diesel::insert_into(learn_quizzes::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(quiz)
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, LearnError> {
        self.run(move |conn| {
            let row: Option<DbQuiz> = learn_quizzes::table
                .filter(learn_quizzes::id.eq(quiz_id))
                .first(conn)
                .optional()?;
            row.map(db_quiz_to_quiz).transpose()
        })
        .await
    }

    async fn insert_response(&self, response: QuizResponse) -> Result<QuizResponse, LearnError> {
        let row = response_to_db(&response)?;
        self.run(move |conn| {
            diesel::insert_into(learn_responses::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(response)
    }

    async fn list_responses(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<QuizResponse>, LearnError> {
        self.run(move |conn| {
            let rows: Vec<DbResponse> = learn_responses::table
                .filter(learn_responses::user_id.eq(user_id))
                .filter(learn_responses::quiz_id.eq(quiz_id))
                .order(learn_responses::created_at.asc())
                .load(conn)?;
            rows.into_iter().map(db_response_to_response).collect()
        })
        .await
    }
}

fn load_progress(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<Option<Progress>, LearnError> {
    let row: Option<DbProgress> = learn_progress::table
        .filter(learn_progress::user_id.eq(user_id))
        .filter(learn_progress::course_id.eq(course_id))
        .first(conn)
        .optional()?;
    Ok(row.map(Progress::from))
}

#[async_trait]
impl ProgressRepository for PgStore {
    async fn find_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Progress>, LearnError> {
        self.run(move |conn| load_progress(conn, user_id, course_id))
            .await
    }

    async fn insert_progress(&self, progress: Progress) -> Result<Progress, LearnError> {
        let row = DbProgress::from(&progress);
        self.run(move |conn| {
            diesel::insert_into(learn_progress::table)
                .values(&row)
                .on_conflict((learn_progress::user_id, learn_progress::course_id))
                .do_nothing()
                .execute(conn)?;
            load_progress(conn, row.user_id, row.course_id)?.ok_or_else(|| {
                LearnError::Database("progress row vanished after insert".to_string())
            })
        })
        .await
    }

    async fn save_progress(&self, progress: Progress) -> Result<Progress, LearnError> {
        self.run(move |conn| {
            let next_version = progress.version + 1;
            let updated = diesel::update(
                learn_progress::table
                    .filter(learn_progress::id.eq(progress.id))
                    .filter(learn_progress::version.eq(progress.version)),
            )
            .set((
                learn_progress::completed_percentage.eq(progress.completed_percentage),
                learn_progress::completed_modules.eq(&progress.completed_modules),
                learn_progress::average_score.eq(progress.average_score),
                learn_progress::last_accessed_at.eq(progress.last_accessed_at),
                learn_progress::version.eq(next_version),
            ))
            .execute(conn)?;

            if updated == 0 {
                let exists: i64 = learn_progress::table
                    .filter(learn_progress::id.eq(progress.id))
                    .count()
                    .get_result(conn)?;
                return Err(if exists == 0 {
                    LearnError::NotFound("progress record".to_string())
                } else {
                    LearnError::Conflict(format!(
                        "progress {} changed since it was read",
                        progress.id
                    ))
                });
            }

            Ok(Progress {
                version: next_version,
                ..progress
            })
        })
        .await
    }
}

#[async_trait]
impl LearnStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), LearnError> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}
