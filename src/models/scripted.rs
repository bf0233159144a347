use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::config::GenerationParams;
use crate::error::UpstreamError;
use crate::models::base::TextGenerator;

/// One canned generator outcome
pub type ScriptedReply = Result<String, UpstreamError>;

/// A call observed by [`ScriptedGenerator`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub params: GenerationParams,
    pub at: tokio::time::Instant,
}

/// Deterministic stand-in for the generative service.
///
/// Replies are served in order; once the script runs out the last reply
/// repeats. Every call is recorded with its (tokio) timestamp so backoff gaps
/// can be checked under a paused clock.
pub struct ScriptedGenerator {
    configured: bool,
    replies: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        ScriptedGenerator {
            configured: true,
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `reply`
    pub fn always(reply: ScriptedReply) -> Self {
        Self::new(vec![reply])
    }

    /// Reports a missing credential; any call is a test failure signal
    pub fn unconfigured() -> Self {
        ScriptedGenerator {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        self.calls.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            params: params.clone(),
            at: tokio::time::Instant::now(),
        });

        let next = self.replies.lock().pop_front();
        let mut last = self.last.lock();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(UpstreamError::new("scripted generator has no replies"))),
        }
    }
}
