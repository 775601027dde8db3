//! Drives one ebook from an empty draft to a finished [`Document`].
//!
//! Stages run strictly forward:
//! `Empty -> Titled -> Subtitled -> Introduced -> Chaptered -> Bonused ->
//! SalesCopied -> CoverPrompted -> Complete`.
//! Only the chapter stage fans out; every other stage depends on the one before it.

use crate::config::PipelineConfig;
use crate::error::{ChapterFailures, GenerationError, LlmError, PipelineError};
use crate::models::{Bonus, Chapter, Document, GenerationRequest, Metadata, Stage};
use crate::services::llm::{SamplingParams, TextGenerator};
use crate::services::outline::{format_outline, parse_items};
use crate::services::prompts;
use crate::services::sanitizer::{sanitize, sanitize_optional};
use chrono::Utc;
use futures::future::join_all;
use regex::Regex;
use std::sync::{Arc, LazyLock};

pub const MAX_CHAPTERS: usize = 20;

const SHORT_MAX_TOKENS: u32 = 120;
const LIST_MAX_TOKENS: u32 = 400;

/// Called with each stage as it starts.
pub type ProgressFn = Box<dyn Fn(Stage) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Empty,
    Titled,
    Subtitled,
    Introduced,
    Chaptered,
    Bonused,
    SalesCopied,
    CoverPrompted,
    Complete,
}

// A heading line: "Action Plan" alone, or followed by a colon and the steps
static ACTION_PLAN_HEADING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t#*_>]*action[ \t]+plan[ \t*_]*(?::[ \t*_]*|$)").ok()
});

/// Document under construction. Never leaves this module.
struct Draft {
    state: PipelineState,
    request: GenerationRequest,
    chapter_count: usize,
    title: String,
    subtitle: String,
    introduction: String,
    chapter_titles: Vec<String>,
    outline: String,
    chapters: Vec<Chapter>,
    bonuses: Vec<Bonus>,
    sales_copy: String,
    ad_hooks: Vec<String>,
    cover_prompt: String,
}

impl Draft {
    fn new(request: GenerationRequest, chapter_count: usize) -> Self {
        Draft {
            state: PipelineState::Empty,
            request,
            chapter_count,
            title: String::new(),
            subtitle: String::new(),
            introduction: String::new(),
            chapter_titles: Vec::new(),
            outline: String::new(),
            chapters: Vec::new(),
            bonuses: Vec::new(),
            sales_copy: String::new(),
            ad_hooks: Vec::new(),
            cover_prompt: String::new(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "{:?} -> {:?} goes backwards", self.state, next);
        tracing::debug!("pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn finish(mut self) -> Document {
        self.advance(PipelineState::Complete);
        let word_count = self.chapters.iter().map(Chapter::word_count).sum();
        let add_ons = self
            .request
            .add_ons
            .iter()
            .map(|add_on| add_on.key().to_string())
            .collect();

        Document {
            title: self.title,
            subtitle: self.subtitle,
            introduction: self.introduction,
            outline: self.outline,
            chapters: self.chapters,
            bonuses: self.bonuses,
            sales_copy: self.sales_copy,
            ad_hooks: self.ad_hooks,
            cover_prompt: self.cover_prompt,
            metadata: Metadata {
                niche: self.request.niche.trim().to_string(),
                target_audience: self.request.target_audience,
                book_type: self.request.book_type,
                add_ons,
                generated_at: Utc::now(),
                word_count,
            },
        }
    }
}

pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    progress: Option<ProgressFn>,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Self {
        Pipeline {
            generator,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: impl Fn(Stage) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Runs every stage and returns the finished document.
    ///
    /// Stops at the first failing sequential stage. In the chapter stage every
    /// chapter is awaited and all failures are reported together.
    pub async fn run(&self, request: GenerationRequest) -> Result<Document, PipelineError> {
        let chapter_count = self.validate(&request)?;
        tracing::info!(
            niche = %request.niche,
            chapters = chapter_count,
            add_ons = request.add_ons.len(),
            "starting ebook generation"
        );

        let mut draft = Draft::new(request, chapter_count);

        // Step 1: framing
        self.write_title(&mut draft).await?;
        self.write_subtitle(&mut draft).await?;
        self.write_introduction(&mut draft).await?;

        // Step 2: chapters, in parallel
        self.write_chapters(&mut draft).await?;

        // Step 3: derived material
        self.write_bonuses(&mut draft).await?;
        self.write_sales_copy(&mut draft).await?;
        self.write_cover_prompt(&mut draft).await?;

        let document = draft.finish();
        tracing::info!(
            title = %document.title,
            words = document.metadata.word_count,
            "ebook generation complete"
        );
        Ok(document)
    }

    fn validate(&self, request: &GenerationRequest) -> Result<usize, PipelineError> {
        if request.niche.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("niche must not be empty".to_string()));
        }
        let count = request.chapter_count.unwrap_or(self.config.default_chapters);
        if !(1..=MAX_CHAPTERS).contains(&count) {
            return Err(PipelineError::InvalidRequest(format!(
                "chapter count must be between 1 and {MAX_CHAPTERS}, got {count}"
            )));
        }
        Ok(count)
    }

    fn report(&self, stage: Stage) {
        tracing::info!(stage = %stage, "stage started");
        if let Some(progress) = &self.progress {
            progress(stage);
        }
    }

    fn params(&self, cap: Option<u32>) -> SamplingParams {
        SamplingParams {
            temperature: self.config.temperature,
            max_output_tokens: cap
                .map(|cap| cap.min(self.config.max_output_tokens))
                .unwrap_or(self.config.max_output_tokens),
        }
    }

    async fn call_raw(
        &self,
        stage: Stage,
        purpose: &str,
        chapter: Option<usize>,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, GenerationError> {
        tracing::debug!(stage = %stage, purpose, chapter, "calling generator");
        self.generator
            .generate(prompt, &self.config.system_instruction, params)
            .await
            .map_err(|source| {
                tracing::warn!(stage = %stage, purpose, chapter, "generation failed: {}", source);
                GenerationError {
                    stage,
                    purpose: purpose.to_string(),
                    chapter,
                    source,
                }
            })
    }

    /// Generates, sanitizes, and rejects text that sanitizes to nothing.
    async fn call(
        &self,
        stage: Stage,
        purpose: &str,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, GenerationError> {
        let raw = self.call_raw(stage, purpose, None, prompt, params).await?;
        non_empty(sanitize(&raw), stage, purpose, None)
    }

    async fn write_title(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        self.report(Stage::Title);
        let request = &draft.request;
        let prompt = prompts::title(&request.niche, &request.target_audience, &request.book_type);
        let text = self
            .call(Stage::Title, "ebook title", &prompt, self.params(Some(SHORT_MAX_TOKENS)))
            .await?;
        draft.title = single_line(&text);
        draft.advance(PipelineState::Titled);
        Ok(())
    }

    async fn write_subtitle(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        self.report(Stage::Subtitle);
        let prompt = prompts::subtitle(&draft.title, &draft.request.niche);
        let text = self
            .call(Stage::Subtitle, "ebook subtitle", &prompt, self.params(Some(SHORT_MAX_TOKENS)))
            .await?;
        draft.subtitle = single_line(&text);
        draft.advance(PipelineState::Subtitled);
        Ok(())
    }

    /// Introduction plus the chapter plan every chapter prompt will share.
    async fn write_introduction(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        self.report(Stage::Introduction);
        let prompt =
            prompts::introduction(&draft.title, &draft.subtitle, &draft.request.target_audience);
        draft.introduction = self
            .call(Stage::Introduction, "introduction", &prompt, self.params(None))
            .await?;

        let count = draft.chapter_count;
        let request = &draft.request;
        let mut titles = match prompts::predefined_chapter_titles(
            &request.niche,
            &request.target_audience,
            count,
        ) {
            Some(titles) => titles,
            None => {
                self.report(Stage::Outline);
                let prompt =
                    prompts::outline(&draft.title, &request.niche, &request.target_audience, count);
                let reply = self
                    .call(Stage::Outline, "chapter titles", &prompt, self.params(Some(LIST_MAX_TOKENS)))
                    .await?;
                parse_items(&reply, count)
            }
        };

        if titles.len() < count {
            tracing::warn!(
                "model suggested {} of {} chapter titles, numbering the rest",
                titles.len(),
                count
            );
            titles.extend((titles.len() + 1..=count).map(|i| format!("Chapter {i}")));
        }

        draft.outline = format_outline(&titles);
        draft.chapter_titles = titles;
        draft.advance(PipelineState::Introduced);
        Ok(())
    }

    async fn write_chapters(&self, draft: &mut Draft) -> Result<(), ChapterFailures> {
        self.report(Stage::Chapter);
        let title = draft.title.as_str();
        let outline = draft.outline.as_str();
        let audience = draft.request.target_audience.as_str();

        let pending = draft
            .chapter_titles
            .iter()
            .enumerate()
            .map(|(i, chapter_title)| self.write_chapter(title, outline, audience, i + 1, chapter_title));
        let results = join_all(pending).await;

        // One slot per chapter; each result lands in its own slot by index
        let mut slots: Vec<Option<Chapter>> = (0..results.len()).map(|_| None).collect();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(chapter) => {
                    let slot = chapter.index - 1;
                    slots[slot] = Some(chapter);
                }
                Err(e) => failures.push(e),
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|e| e.chapter);
            return Err(ChapterFailures(failures));
        }

        draft.chapters = slots.into_iter().flatten().collect();
        draft.advance(PipelineState::Chaptered);
        Ok(())
    }

    async fn write_chapter(
        &self,
        title: &str,
        outline: &str,
        audience: &str,
        index: usize,
        chapter_title: &str,
    ) -> Result<Chapter, GenerationError> {
        let prompt = prompts::chapter(title, index, chapter_title, outline, audience);
        let raw = self
            .call_raw(Stage::Chapter, "chapter body", Some(index), &prompt, self.params(None))
            .await?;

        let (body, action_plan) = split_action_plan(&raw);
        let body = non_empty(sanitize(body), Stage::Chapter, "chapter body", Some(index))?;
        let action_plan = sanitize_optional(action_plan);
        tracing::debug!(chapter = index, words = body.split_whitespace().count(), "chapter written");

        Ok(Chapter {
            index,
            title: chapter_title.to_string(),
            body,
            action_plan,
        })
    }

    async fn write_bonuses(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        if !draft.request.add_ons.is_empty() {
            self.report(Stage::Bonuses);
        }
        for add_on in &draft.request.add_ons {
            let prompt = prompts::bonus(&draft.title, *add_on, &draft.outline);
            let body = self
                .call(Stage::Bonuses, add_on.label(), &prompt, self.params(None))
                .await?;
            draft.bonuses.push(Bonus {
                label: add_on.label().to_string(),
                body,
            });
        }
        draft.advance(PipelineState::Bonused);
        Ok(())
    }

    async fn write_sales_copy(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        self.report(Stage::SalesCopy);
        let request = &draft.request;
        let prompt = prompts::sales_copy(
            &draft.title,
            &draft.subtitle,
            &request.niche,
            &request.target_audience,
        );
        draft.sales_copy = self
            .call(Stage::SalesCopy, "sales copy", &prompt, self.params(None))
            .await?;

        self.report(Stage::AdHooks);
        let count = self.config.ad_hook_count;
        let prompt = prompts::ad_hooks(&draft.title, &draft.request.target_audience, count);
        let reply = self
            .call(Stage::AdHooks, "ad hooks", &prompt, self.params(Some(LIST_MAX_TOKENS)))
            .await?;
        let hooks = parse_items(&reply, count);
        if hooks.is_empty() {
            return Err(GenerationError {
                stage: Stage::AdHooks,
                purpose: "ad hooks".to_string(),
                chapter: None,
                source: LlmError::Empty,
            });
        }
        draft.ad_hooks = hooks;
        draft.advance(PipelineState::SalesCopied);
        Ok(())
    }

    async fn write_cover_prompt(&self, draft: &mut Draft) -> Result<(), GenerationError> {
        self.report(Stage::CoverPrompt);
        let prompt = prompts::cover_prompt(&draft.title, &draft.request.niche);
        draft.cover_prompt = self
            .call(Stage::CoverPrompt, "cover prompt", &prompt, self.params(Some(LIST_MAX_TOKENS)))
            .await?;
        draft.advance(PipelineState::CoverPrompted);
        Ok(())
    }
}

fn non_empty(
    text: String,
    stage: Stage,
    purpose: &str,
    chapter: Option<usize>,
) -> Result<String, GenerationError> {
    if text.is_empty() {
        return Err(GenerationError {
            stage,
            purpose: purpose.to_string(),
            chapter,
            source: LlmError::Empty,
        });
    }
    Ok(text)
}

/// First line, without wrapping quotes.
fn single_line(text: &str) -> String {
    text.lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}

/// Splits a raw chapter reply at its last "Action Plan" heading.
fn split_action_plan(raw: &str) -> (&str, Option<&str>) {
    match ACTION_PLAN_HEADING
        .as_ref()
        .and_then(|heading| heading.find_iter(raw).last())
    {
        Some(m) => (&raw[..m.start()], Some(&raw[m.end()..])),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_action_plan_heading() {
        let raw = "Body one.\n\nBody two.\n\n**Action Plan:**\n1. Do it\n2. Again";
        let (body, plan) = split_action_plan(raw);
        assert_eq!(sanitize(body), "Body one.\n\nBody two.");
        assert_eq!(sanitize(plan.unwrap()), "1. Do it\n2. Again");
    }

    #[test]
    fn inline_action_plan_mention_is_body() {
        let raw = "Make an action plan today.\nThen rest.";
        assert_eq!(split_action_plan(raw), (raw, None));
    }

    #[test]
    fn prose_opening_with_action_plan_stays_in_body() {
        let raw = "Maria had no savings.\n\nAction plan in hand, Maria cut her spending.\n\nAction Plan:\n1. Track spending";
        let (body, plan) = split_action_plan(raw);
        assert_eq!(
            sanitize(body),
            "Maria had no savings.\n\nAction plan in hand, Maria cut her spending."
        );
        assert_eq!(sanitize(plan.unwrap()), "1. Track spending");
    }

    #[test]
    fn steps_on_the_heading_line_are_kept() {
        let (body, plan) = split_action_plan("Body.\n### Action Plan: track every expense");
        assert_eq!(sanitize(body), "Body.");
        assert_eq!(sanitize(plan.unwrap()), "track every expense");
    }

    #[test]
    fn last_heading_wins() {
        let raw = "Intro.\nAction Plan\nWhy plans fail.\n\n**Action Plan**\n1. Start";
        let (body, plan) = split_action_plan(raw);
        assert_eq!(sanitize(body), "Intro.\nAction Plan\nWhy plans fail.");
        assert_eq!(sanitize(plan.unwrap()), "1. Start");
    }

    #[test]
    fn action_planning_prose_is_not_a_heading() {
        let raw = "Action planning is a skill.";
        assert_eq!(split_action_plan(raw), (raw, None));
    }

    #[test]
    fn single_line_strips_quotes() {
        assert_eq!(single_line("\"Rich Habits\"\nextra"), "Rich Habits");
        assert_eq!(single_line(""), "");
    }

    #[test]
    fn states_are_ordered() {
        assert!(PipelineState::Empty < PipelineState::Titled);
        assert!(PipelineState::Chaptered < PipelineState::Bonused);
        assert!(PipelineState::CoverPrompted < PipelineState::Complete);
    }
}
