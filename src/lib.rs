pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod pipelines;
pub mod quiz;
pub mod schedule;

pub use error::{EngineError, ErrorCode, UpstreamError};
pub use pipelines::orchestrator::PlanEngine;
pub use schedule::{GenerationRequest, LearningPath, Period, Subject, WeekSchedule, Weekday};
