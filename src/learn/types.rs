//! Types for the Learn module (adaptive quizzes)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuestionType {
    #[serde(rename = "mcq")]
    Mcq,
    #[serde(rename = "true-false")]
    TrueFalse,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mcq => write!(f, "mcq"),
            Self::TrueFalse => write!(f, "true-false"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(Self::Mcq),
            "true-false" => Ok(Self::TrueFalse),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn can_author(&self) -> bool {
        matches!(self, Self::Instructor | Self::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

// ============================================================================
// COLLABORATOR RECORDS
// ============================================================================

/// A course subdivision as seen by the quiz engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRef {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub role: Role,
}

// ============================================================================
// QUESTION MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub module_id: Uuid,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Copy taken into a quiz, with a blank choice.
    pub fn snapshot(&self) -> QuizQuestion {
        QuizQuestion {
            question_id: self.id,
            difficulty: self.difficulty,
            question_type: self.question_type,
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            answer: self.answer.clone(),
            choice: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// Filter handed to the question store when sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSample {
    pub module_id: Uuid,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub count: usize,
}

impl QuestionSample {
    pub fn matches(&self, question: &Question) -> bool {
        question.module_id == self.module_id
            && self.difficulty.map_or(true, |d| question.difficulty == d)
            && self.question_type.map_or(true, |t| question.question_type == t)
    }
}

// ============================================================================
// QUIZ MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question_id: Uuid,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    /// Empty once redacted for learners; omitted from JSON then.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub answer: String,
    pub choice: Option<String>,
}

impl QuizQuestion {
    pub fn is_correct(&self) -> bool {
        self.choice.as_deref() == Some(self.answer.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub module_id: Uuid,
    pub created_by: Uuid,
    pub size: i32,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub difficulty: Option<Difficulty>,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    /// Copy without the answer key, as shown to learners before they submit.
    pub fn without_answers(mut self) -> Self {
        for question in &mut self.questions {
            question.answer.clear();
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub size: Option<i32>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
}

/// Who is looking at a quiz. Authors see the answer key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizViewer {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub module: ModuleRef,
}

// ============================================================================
// RESPONSE MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: Uuid,
    pub answer: String,
}

/// A scored attempt at a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub answers: Vec<Answer>,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: Uuid,
    pub choice: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    #[serde(flatten)]
    pub response: QuizResponse,
    pub max_score: i32,
    pub breakdown: Vec<AnswerResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFilters {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
}

// ============================================================================
// PROGRESS MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
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

impl Progress {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            completed_percentage: 0.0,
            completed_modules: Vec::new(),
            average_score: Some(0.0),
            last_accessed_at: now,
            version: 0,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteModuleRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_strict() {
        assert_eq!("instructor".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert!("teacher".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_redacted_quiz_omits_answers() {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            size: 1,
            question_type: None,
            difficulty: Some(Difficulty::Easy),
            questions: vec![QuizQuestion {
                question_id: Uuid::new_v4(),
                difficulty: Difficulty::Easy,
                question_type: QuestionType::TrueFalse,
                prompt: "Slices know their length".to_string(),
                options: vec!["true".to_string(), "false".to_string()],
                answer: "true".to_string(),
                choice: None,
            }],
            created_at: Utc::now(),
        };

        let full = serde_json::to_value(&quiz).unwrap();
        assert_eq!(full["questions"][0]["answer"], "true");

        let redacted = serde_json::to_value(quiz.without_answers()).unwrap();
        assert!(redacted["questions"][0].get("answer").is_none());
        assert_eq!(redacted["questions"][0]["options"][1], "false");
    }
}
