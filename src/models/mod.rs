use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Supplementary material a buyer can get alongside the ebook.
///
/// Each selected add-on becomes one [`Bonus`] and raises the quoted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOn {
    Workbook,
    Checklist,
    Templates,
    AudioScript,
    EmailSwipeFile,
    ResourceGuide,
}

impl AddOn {
    pub const ALL: [AddOn; 6] = [
        AddOn::Workbook,
        AddOn::Checklist,
        AddOn::Templates,
        AddOn::AudioScript,
        AddOn::EmailSwipeFile,
        AddOn::ResourceGuide,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AddOn::Workbook => "Companion Workbook",
            AddOn::Checklist => "Quick-Start Checklist",
            AddOn::Templates => "Done-For-You Templates",
            AddOn::AudioScript => "Audio Companion Script",
            AddOn::EmailSwipeFile => "Email Swipe File",
            AddOn::ResourceGuide => "Resource Guide",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            AddOn::Workbook => "workbook",
            AddOn::Checklist => "checklist",
            AddOn::Templates => "templates",
            AddOn::AudioScript => "audio_script",
            AddOn::EmailSwipeFile => "email_swipe_file",
            AddOn::ResourceGuide => "resource_guide",
        }
    }
}

/// What the caller asks the pipeline to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub niche: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default = "default_book_type")]
    pub book_type: String,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub chapter_count: Option<usize>,
    #[serde(default)]
    pub add_ons: BTreeSet<AddOn>,
}

fn default_audience() -> String {
    "beginners".to_string()
}

fn default_book_type() -> String {
    "Guide".to_string()
}

impl GenerationRequest {
    pub fn new(niche: impl Into<String>) -> Self {
        Self {
            niche: niche.into(),
            target_audience: default_audience(),
            book_type: default_book_type(),
            chapter_count: None,
            add_ons: BTreeSet::new(),
        }
    }

    pub fn with_chapters(mut self, count: usize) -> Self {
        self.chapter_count = Some(count);
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    pub fn with_add_on(mut self, add_on: AddOn) -> Self {
        self.add_ons.insert(add_on);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based position in the book.
    pub index: usize,
    pub title: String,
    /// Sanitized prose, paragraphs separated by blank lines. Case studies live here.
    pub body: String,
    pub action_plan: Option<String>,
}

impl Chapter {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub label: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub niche: String,
    pub target_audience: String,
    pub book_type: String,
    pub add_ons: BTreeSet<String>,
    pub generated_at: DateTime<Utc>,
    pub word_count: usize,
}

/// One generated ebook package. Only ever handed out once every stage has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    /// Numbered chapter-title list every chapter prompt was given.
    pub outline: String,
    pub chapters: Vec<Chapter>,
    pub bonuses: Vec<Bonus>,
    pub sales_copy: String,
    pub ad_hooks: Vec<String>,
    pub cover_prompt: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn quote(&self) -> PricingQuote {
        crate::services::pricing::quote(
            self.metadata.word_count,
            &self.metadata.niche,
            &self.metadata.add_ons,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricingQuote {
    pub base_price: f64,
    pub adjusted_price: f64,
}

impl fmt::Display for PricingQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.adjusted_price)
    }
}

/// A single generation step, used for progress reporting and error tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Title,
    Subtitle,
    Introduction,
    Outline,
    Chapter,
    Bonuses,
    SalesCopy,
    AdHooks,
    CoverPrompt,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Title => "title",
            Stage::Subtitle => "subtitle",
            Stage::Introduction => "introduction",
            Stage::Outline => "outline",
            Stage::Chapter => "chapter",
            Stage::Bonuses => "bonuses",
            Stage::SalesCopy => "sales_copy",
            Stage::AdHooks => "ad_hooks",
            Stage::CoverPrompt => "cover_prompt",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
