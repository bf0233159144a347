use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{EngineError, ErrorCode};
use crate::pipelines::orchestrator::PlanEngine;
use crate::quiz::Question;
use crate::schedule::analysis::{analyze, CompletionAnalysis};
use crate::schedule::{GenerationRequest, LearningPath, Period, WeekSchedule, Weekday};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Serializable error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl HandlerError {
    fn invalid(message: &str) -> Self {
        HandlerError::InvalidRequest(message.to_string())
    }

    /// HTTP-equivalent status code
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::InvalidRequest(_) => 400,
            HandlerError::NotFound(_) => 404,
            HandlerError::Engine(e) => match e.code() {
                ErrorCode::GeminiRateLimit => 503,
                ErrorCode::GeminiParseError | ErrorCode::GeminiError => 502,
            },
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (error, retry_after) = match self {
            HandlerError::InvalidRequest(_) => ("invalid_request", None),
            HandlerError::NotFound(_) => ("not_found", None),
            HandlerError::Engine(e) => {
                let error = match e.code() {
                    ErrorCode::GeminiRateLimit => "gemini_rate_limited",
                    ErrorCode::GeminiParseError => "gemini_parse_error",
                    ErrorCode::GeminiError => "gemini_error",
                };
                (error, e.retry_after_secs())
            }
        };
        ErrorBody {
            error: error.to_string(),
            message: self.to_string(),
            retry_after,
        }
    }
}

/// A stored study plan. Persistence belongs to the caller; handlers take a plan
/// and hand back the updated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub user_id: String,
    pub learning_path: LearningPath,
    pub weekly_hours: f64,
    pub preferred_days: Vec<Weekday>,
    pub schedule: WeekSchedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    fn new(user_id: String, request: GenerationRequest, schedule: WeekSchedule) -> Self {
        let now = Utc::now();
        Plan {
            user_id,
            learning_path: request.learning_path,
            weekly_hours: request.weekly_hours,
            preferred_days: request.preferred_days,
            schedule,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest::new(
            self.learning_path.clone(),
            self.weekly_hours,
            &self.preferred_days,
        )
    }
}

/// Raw create request; fields stay loosely typed until [`CreatePlanRequest::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub user_id: Option<String>,
    pub learning_path: Option<String>,
    pub weekly_hours: Option<Value>,
    pub preferred_days: Option<Value>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_weekly_hours(value: &Value) -> Result<f64, HandlerError> {
    let hours = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => return Err(HandlerError::invalid("weeklyHours must be a number or numeric string")),
    };
    match hours {
        Some(h) if h.is_finite() && h > 0.0 => Ok(h),
        _ => Err(HandlerError::invalid("weeklyHours must be a positive number")),
    }
}

fn parse_preferred_days(value: &Value) -> Result<Vec<Weekday>, HandlerError> {
    let Value::Array(items) = value else {
        return Err(HandlerError::invalid("preferredDays must be an array of day names"));
    };

    let mut days = Vec::with_capacity(items.len());
    for item in items {
        let Some(name) = item.as_str() else {
            return Err(HandlerError::invalid("preferredDays must be an array of day names"));
        };
        match Weekday::parse_loose(name) {
            Some(day) => days.push(day),
            None => tracing::warn!(day = name, "Ignoring unknown preferred day"),
        }
    }
    Ok(days)
}

impl CreatePlanRequest {
    /// Check required fields and types; returns the user id and generation request
    pub fn validate(&self) -> Result<(String, GenerationRequest), HandlerError> {
        let (Some(user_id), Some(path), Some(hours), Some(days)) = (
            non_empty(self.user_id.as_deref()),
            non_empty(self.learning_path.as_deref()),
            self.weekly_hours.as_ref(),
            self.preferred_days.as_ref(),
        ) else {
            return Err(HandlerError::invalid("Missing required fields"));
        };

        let preferred_days = parse_preferred_days(days)?;
        let weekly_hours = parse_weekly_hours(hours)?;
        let learning_path = LearningPath::new(path);
        if !learning_path.is_recognised() {
            return Err(HandlerError::invalid("Invalid learning path"));
        }

        Ok((
            user_id.to_string(),
            GenerationRequest::new(learning_path, weekly_hours, &preferred_days),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPlanRequest {
    pub plan: Plan,
    #[serde(default)]
    pub modification_request: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McqRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBlockRequest {
    pub plan: Plan,
    pub day: String,
    pub block_index: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextPeriodRequest {
    pub plan: Plan,
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPeriodResult {
    pub plan: Plan,
    pub analysis: CompletionAnalysis,
}

pub async fn create_plan(
    engine: &PlanEngine,
    request: CreatePlanRequest,
) -> Result<Plan, HandlerError> {
    let (user_id, generation) = request.validate()?;
    let schedule = engine.generate_schedule(&generation).await;
    tracing::info!(
        user_id = %user_id,
        learning_path = %generation.learning_path,
        total_minutes = schedule.total_minutes(),
        "Plan created"
    );
    Ok(Plan::new(user_id, generation, schedule))
}

pub async fn modify_plan(
    engine: &PlanEngine,
    request: ModifyPlanRequest,
) -> Result<Plan, HandlerError> {
    let modification = request.modification_request.trim();
    if modification.is_empty() {
        return Err(HandlerError::invalid("Missing required fields"));
    }

    let mut plan = request.plan;
    plan.schedule = engine
        .modify_schedule(&plan.schedule, modification, &plan.learning_path)
        .await?;
    plan.updated_at = Utc::now();
    Ok(plan)
}

pub async fn get_mcqs(engine: &PlanEngine, request: McqRequest) -> Result<Vec<Question>, HandlerError> {
    let topic = request.topic.trim();
    let subject = request.subject.trim();
    if topic.is_empty() || subject.is_empty() {
        return Err(HandlerError::invalid("Missing topic or subject"));
    }
    Ok(engine.generate_mcqs(topic, subject).await.questions)
}

/// Record the quiz outcome on one block: `completed` and `mcqPassed` both take `passed`
pub fn mark_block_complete(request: CompleteBlockRequest) -> Result<Plan, HandlerError> {
    let not_found = || HandlerError::NotFound("Study block not found".to_string());

    let day = Weekday::parse_loose(&request.day).ok_or_else(not_found)?;
    let mut plan = request.plan;
    if !plan
        .schedule
        .day_mut(day)
        .set_block_completion(request.block_index, request.passed)
    {
        return Err(not_found());
    }
    plan.updated_at = Utc::now();
    Ok(plan)
}

/// Analyse the finished plan and generate its successor for `period`
pub async fn generate_next_period(engine: &PlanEngine, request: NextPeriodRequest) -> NextPeriodResult {
    let previous = request.plan;
    let analysis = analyze(&previous.schedule);
    let generation = previous.generation_request();

    let schedule = engine
        .generate_next_schedule(&generation, &analysis, request.period)
        .await;
    tracing::info!(
        user_id = %previous.user_id,
        period = request.period.as_str(),
        completion_rate = analysis.completion_rate,
        "Next period plan created"
    );

    NextPeriodResult {
        plan: Plan::new(previous.user_id, generation, schedule),
        analysis,
    }
}

/// One request as read from the command line boundary
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    Create(CreatePlanRequest),
    Modify(ModifyPlanRequest),
    Mcqs(McqRequest),
    Complete(CompleteBlockRequest),
    GenerateNext(NextPeriodRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Plan {
        success: bool,
        plan: Plan,
    },
    NextPeriod {
        success: bool,
        plan: Plan,
        analysis: CompletionAnalysis,
    },
    Mcqs {
        success: bool,
        mcqs: Vec<Question>,
    },
}

impl Response {
    fn plan(plan: Plan) -> Self {
        Response::Plan { success: true, plan }
    }
}

pub async fn dispatch(engine: &PlanEngine, command: Command) -> Result<Response, HandlerError> {
    match command {
        Command::Create(request) => create_plan(engine, request).await.map(Response::plan),
        Command::Modify(request) => modify_plan(engine, request).await.map(Response::plan),
        Command::Mcqs(request) => get_mcqs(engine, request)
            .await
            .map(|mcqs| Response::Mcqs { success: true, mcqs }),
        Command::Complete(request) => mark_block_complete(request).map(Response::plan),
        Command::GenerateNext(request) => {
            let result = generate_next_period(engine, request).await;
            Ok(Response::NextPeriod {
                success: true,
                plan: result.plan,
                analysis: result.analysis,
            })
        }
    }
}
