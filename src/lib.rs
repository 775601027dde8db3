//! Ebook factory: turns a niche into a sales-ready ebook package.
//!
//! [`services::pipeline::Pipeline`] drives a [`services::llm::TextGenerator`]
//! through every generation stage and returns a [`models::Document`]. The
//! [`render`] module turns that document into a PDF, an EPUB, a sales page and
//! a zip bundle; [`services::pricing`] suggests a price for it.

pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod services;

pub use config::{Config, EnvSecrets, LlmConfig, PipelineConfig, SecretSource};
pub use error::{ChapterFailures, ConfigurationError, GenerationError, LlmError, PipelineError, RenderError};
pub use models::{AddOn, Bonus, Chapter, Document, GenerationRequest, Metadata, PricingQuote, Stage};
pub use services::llm::{LLMClient, SamplingParams, TextGenerator};
pub use services::pipeline::Pipeline;
