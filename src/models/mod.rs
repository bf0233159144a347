pub mod base;
pub mod gemini;
pub mod scripted;

pub use base::TextGenerator;
pub use gemini::GeminiClient;
pub use scripted::ScriptedGenerator;
