use serde_json::Value;
use std::sync::Arc;

use crate::config::{EngineConfig, GenerationParams};
use crate::error::{EngineError, UpstreamError};
use crate::logging::prompt_fingerprint;
use crate::models::base::TextGenerator;
use crate::pipelines::json_extract::{extract_json_object, is_truncated};
use crate::pipelines::perf::PerfTimer;
use crate::pipelines::prompts::{
    build_modification_prompt, build_next_schedule_prompt, build_quiz_prompt,
    build_schedule_prompt, PromptKind,
};
use crate::pipelines::retry::{classify, with_retry, FailureKind, RetryPolicy};
use crate::quiz::{fallback_questions, shape_question_set, QuestionSet, QuizFallback};
use crate::schedule::analysis::CompletionAnalysis;
use crate::schedule::fallback::fallback_schedule;
use crate::schedule::normalizer::normalize;
use crate::schedule::{GenerationRequest, LearningPath, Period, WeekSchedule};

/// Map a raw generator failure onto the engine taxonomy
fn to_engine_error(err: UpstreamError) -> EngineError {
    match classify(&err) {
        FailureKind::RateLimited => EngineError::RateLimited {
            message: err.message,
            retry_after_secs: err.retry_after_secs,
        },
        FailureKind::Empty => EngineError::EmptyResponse,
        FailureKind::Other => EngineError::Upstream(err.to_string()),
    }
}

/// Extract, check for a `schedule` array, then normalize
fn parse_schedule(text: &str) -> Result<WeekSchedule, EngineError> {
    let obj = match extract_json_object(text) {
        Ok(obj) => obj,
        Err(e) => {
            tracing::warn!(
                response_len = text.len(),
                truncated = is_truncated(text),
                "Generated schedule is not parseable JSON"
            );
            return Err(e);
        }
    };

    if !matches!(obj.get("schedule"), Some(Value::Array(_))) {
        return Err(EngineError::Parse(
            "Response JSON has no schedule array".to_string(),
        ));
    }
    Ok(normalize(&Value::Object(obj)))
}

/// Drives the generative service for every entry point.
///
/// Holds nothing but immutable settings and a shared generator, so one
/// engine can serve any number of concurrent requests.
#[derive(Clone)]
pub struct PlanEngine {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    schedule_params: GenerationParams,
    quiz_params: GenerationParams,
}

impl PlanEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &EngineConfig) -> Self {
        PlanEngine {
            generator,
            policy: RetryPolicy::from(&config.retry),
            schedule_params: config.schedule_params.clone(),
            quiz_params: config.quiz_params.clone(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// One logical generation: bounded attempts with backoff on retryable failures.
    /// Empty output counts as a retryable failure.
    async fn generate(
        &self,
        kind: PromptKind,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        let _perf = PerfTimer::new("generation");
        let fingerprint = prompt_fingerprint(prompt);
        let generator = &self.generator;
        let fingerprint_ref = fingerprint.as_str();

        with_retry(&self.policy, EngineError::is_retryable, move |attempt| async move {
            tracing::debug!(
                kind = kind.as_str(),
                attempt = attempt,
                generator = generator.name(),
                prompt = %fingerprint_ref,
                "Requesting generation"
            );
            match generator.generate_text(prompt, params).await {
                Ok(text) if text.trim().is_empty() => Err(EngineError::EmptyResponse),
                Ok(text) => Ok(text),
                Err(e) => Err(to_engine_error(e)),
            }
        })
        .await
    }

    async fn schedule_or_fallback(
        &self,
        kind: PromptKind,
        prompt: &str,
        request: &GenerationRequest,
    ) -> WeekSchedule {
        let result = match self.generate(kind, prompt, &self.schedule_params).await {
            Ok(text) => parse_schedule(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(schedule) => {
                tracing::info!(
                    kind = kind.as_str(),
                    total_minutes = schedule.total_minutes(),
                    "Generated schedule"
                );
                schedule
            }
            Err(e) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    code = %e.code(),
                    error = %e,
                    "Generation failed, using deterministic fallback schedule"
                );
                fallback_schedule(request)
            }
        }
    }

    /// Initial weekly schedule. Never fails; degrades to the deterministic synthesizer.
    pub async fn generate_schedule(&self, request: &GenerationRequest) -> WeekSchedule {
        if !self.is_configured() {
            tracing::warn!(
                learning_path = %request.learning_path,
                "Generative service not configured, using fallback schedule"
            );
            return fallback_schedule(request);
        }

        let prompt = build_schedule_prompt(request);
        self.schedule_or_fallback(PromptKind::Initial, &prompt, request)
            .await
    }

    /// Apply a free-text modification. Unlike generation this surfaces errors to the caller.
    pub async fn modify_schedule(
        &self,
        current: &WeekSchedule,
        modification_request: &str,
        learning_path: &LearningPath,
    ) -> Result<WeekSchedule, EngineError> {
        if !self.is_configured() {
            return Err(EngineError::Misconfigured);
        }

        let prompt = build_modification_prompt(current, modification_request, learning_path)?;
        let text = self
            .generate(PromptKind::Modification, &prompt, &self.schedule_params)
            .await?;
        let schedule = parse_schedule(&text)?;

        tracing::info!(
            learning_path = %learning_path,
            total_minutes = schedule.total_minutes(),
            "Modified schedule"
        );
        Ok(schedule)
    }

    /// Four multiple-choice questions for a topic; failures yield a fixed set
    pub async fn generate_mcqs(&self, topic: &str, subject: &str) -> QuestionSet {
        if !self.is_configured() {
            tracing::warn!(topic = topic, "Generative service not configured, using concept questions");
            return fallback_questions(topic, subject, QuizFallback::NotConfigured);
        }

        let prompt = build_quiz_prompt(topic, subject);
        let text = match self.generate(PromptKind::Quiz, &prompt, &self.quiz_params).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(topic = topic, code = %e.code(), error = %e, "Quiz generation failed");
                let reason = match e {
                    EngineError::RateLimited { .. } => QuizFallback::RateLimited,
                    _ => QuizFallback::Failed,
                };
                return fallback_questions(topic, subject, reason);
            }
        };

        let shaped = extract_json_object(&text)
            .ok()
            .and_then(|obj| shape_question_set(&obj, topic));
        match shaped {
            Some(set) => set,
            None => {
                tracing::warn!(
                    topic = topic,
                    truncated = is_truncated(&text),
                    "Quiz response has no usable questions"
                );
                fallback_questions(topic, subject, QuizFallback::Failed)
            }
        }
    }

    /// Schedule for the next period, informed by how the last one went.
    /// Falls back to the synthesizer (ignoring the analysis) on any failure.
    pub async fn generate_next_schedule(
        &self,
        request: &GenerationRequest,
        analysis: &CompletionAnalysis,
        period: Period,
    ) -> WeekSchedule {
        if !self.is_configured() {
            tracing::warn!(
                period = period.as_str(),
                "Generative service not configured, using fallback schedule"
            );
            return fallback_schedule(request);
        }

        let prompt = build_next_schedule_prompt(request, analysis, period);
        self.schedule_or_fallback(PromptKind::NextPeriod, &prompt, request)
            .await
    }
}
