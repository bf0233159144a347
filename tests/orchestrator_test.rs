#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use studyplan_lib::config::{BackoffStrategy, EngineConfig, RetryConfig};
    use studyplan_lib::models::ScriptedGenerator;
    use studyplan_lib::schedule::analysis::analyze;
    use studyplan_lib::schedule::fallback::fallback_schedule;
    use studyplan_lib::{
        EngineError, ErrorCode, GenerationRequest, LearningPath, Period, PlanEngine, Subject,
        UpstreamError, Weekday,
    };

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            LearningPath::new("DSA + Web Development"),
            14.0,
            &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        )
    }

    fn rate_limited() -> UpstreamError {
        UpstreamError::new("Too Many Requests").with_status(429)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_then_fallback() {
        let generator = Arc::new(ScriptedGenerator::always(Err(rate_limited())));
        let engine = PlanEngine::new(generator.clone(), &EngineConfig::default());

        let schedule = engine.generate_schedule(&request()).await;

        let calls = generator.calls();
        assert_eq!(calls.len(), 3);
        let first_gap = calls[1].at - calls[0].at;
        let second_gap = calls[2].at - calls[1].at;
        assert!(first_gap >= Duration::from_millis(2000) && first_gap < Duration::from_millis(2050));
        assert!(second_gap >= Duration::from_millis(4000) && second_gap < Duration::from_millis(4050));
        assert_eq!(schedule, fallback_schedule(&request()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_backoff_from_config() {
        let config = EngineConfig {
            retry: RetryConfig {
                max_attempts: 4,
                base_delay_ms: 100,
                max_delay_ms: 250,
                strategy: BackoffStrategy::Exponential,
            },
            ..EngineConfig::default()
        };
        let generator = Arc::new(ScriptedGenerator::always(Err(rate_limited())));
        let engine = PlanEngine::new(generator.clone(), &config);

        engine.generate_schedule(&request()).await;

        let calls = generator.calls();
        assert_eq!(calls.len(), 4);
        let expected = [100u64, 200, 250];
        for (pair, expected_ms) in calls.windows(2).zip(expected) {
            let gap = pair[1].at - pair[0].at;
            assert!(gap >= Duration::from_millis(expected_ms));
            assert!(gap < Duration::from_millis(expected_ms + 50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_rate_limit() {
        let reply = json!({ "schedule": [
            { "day": "Monday", "studyBlocks": [{ "subject": "Web Development", "topic": "CSS", "duration": "45" }] }
        ]});
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(rate_limited()),
            Ok(reply.to_string()),
        ]));
        let engine = PlanEngine::new(generator.clone(), &EngineConfig::default());

        let schedule = engine.generate_schedule(&request()).await;

        assert_eq!(generator.call_count(), 2);
        // Monday gets a DSA block injected ahead of the generated one
        let monday = schedule.day(Weekday::Monday);
        assert_eq!(monday.study_blocks()[0].subject, Subject::Dsa);
        assert_eq!(monday.total_minutes(), 75);
        // Days the model left out are filled in
        assert_eq!(schedule.day(Weekday::Sunday).total_minutes(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modification_surfaces_rate_limit() {
        let generator = Arc::new(ScriptedGenerator::always(Err(
            rate_limited().with_retry_after(42),
        )));
        let engine = PlanEngine::new(generator.clone(), &EngineConfig::default());
        let current = fallback_schedule(&request());

        let err = engine
            .modify_schedule(&current, "Move Friday to Saturday", &request().learning_path)
            .await
            .unwrap_err();

        assert_eq!(generator.call_count(), 3);
        assert_eq!(err.code(), ErrorCode::GeminiRateLimit);
        assert_eq!(err.retry_after_secs(), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_modification_surfaces_upstream_error_without_retry() {
        let generator = Arc::new(ScriptedGenerator::always(Err(
            UpstreamError::new("Internal error").with_status(500),
        )));
        let engine = PlanEngine::new(generator.clone(), &EngineConfig::default());
        let current = fallback_schedule(&request());

        let err = engine
            .modify_schedule(&current, "more breaks", &request().learning_path)
            .await
            .unwrap_err();

        assert_eq!(generator.call_count(), 1);
        assert!(matches!(err, EngineError::Upstream(_)));
        assert_eq!(err.code(), ErrorCode::GeminiError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_period_prompt_reflects_analysis() {
        let generator = Arc::new(ScriptedGenerator::always(Ok("not json".to_string())));
        let engine = PlanEngine::new(generator.clone(), &EngineConfig::default());
        let previous = fallback_schedule(&request());
        let analysis = analyze(&previous);

        let next = engine
            .generate_next_schedule(&request(), &analysis, Period::Month)
            .await;

        let prompt = &generator.calls()[0].prompt;
        assert!(prompt.contains("Completion Rate: 0%"));
        assert!(prompt.contains("Reduce workload"));
        assert_eq!(next, fallback_schedule(&request()));
    }
}
