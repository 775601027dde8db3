//! Error types for configuration, generation and rendering.

use crate::models::Stage;
use std::fmt;
use thiserror::Error;

/// Raised at startup, before any generation call is attempted.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure reported by a generative text backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),
    #[error("quota or rate limit exceeded")]
    Quota,
    #[error("model unavailable (HTTP {0})")]
    Unavailable(u16),
    #[error("unexpected HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("model returned no usable text")]
    Empty,
}

/// A generation call that failed, tagged with where it happened.
///
/// Only the prompt's purpose is recorded, never the prompt text.
#[derive(Debug, Error)]
#[error("{stage} stage failed{}: {purpose}", chapter_suffix(.chapter))]
pub struct GenerationError {
    pub stage: Stage,
    pub purpose: String,
    pub chapter: Option<usize>,
    #[source]
    pub source: LlmError,
}

fn chapter_suffix(chapter: &Option<usize>) -> String {
    chapter.map(|i| format!(" (chapter {i})")).unwrap_or_default()
}

/// Every chapter that failed in the parallel chapter stage.
#[derive(Debug)]
pub struct ChapterFailures(pub Vec<GenerationError>);

impl ChapterFailures {
    pub fn indices(&self) -> Vec<usize> {
        self.0.iter().filter_map(|e| e.chapter).collect()
    }
}

impl fmt::Display for ChapterFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chapter(s) failed", self.0.len())?;
        // no `source()` here, so each cause is part of the message
        for failure in &self.0 {
            write!(f, "; {failure}: {}", failure.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChapterFailures {}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Chapters(#[from] ChapterFailures),
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidRequest(_) => None,
            PipelineError::Generation(e) => Some(e.stage),
            PipelineError::Chapters(_) => Some(Stage::Chapter),
        }
    }
}

/// The renderer could not produce an artifact. The document itself is still usable.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document has no chapters")]
    EmptyDocument,
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("EPUB generation failed: {0}")]
    Epub(String),
    #[error("bundle archive failed: {0}")]
    Bundle(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
