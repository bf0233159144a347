pub mod models;

pub use models::{
    load_engine_config, BackoffStrategy, EngineConfig, GenerationParams, RetryConfig,
};
