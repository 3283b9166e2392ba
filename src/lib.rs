pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod generator;
pub mod models;
pub mod prompts;
pub mod request;
pub mod response;
pub mod service;
pub mod transport;

pub use crate::config::Config;
pub use crate::error::{AssistError, Result};
pub use crate::fallback::{FallbackStrategy, HeuristicFallback};
pub use crate::generator::GeneratedPrompt;
pub use crate::request::{
    AssistRequest, DocumentAnalysis, HandwritingAction, Mode, QuizOptions, ToneStyle,
    TutorOptions,
};
pub use crate::response::Response;
pub use crate::service::AssistService;
