#![allow(dead_code)]

use async_trait::async_trait;
use autobook::{
    Bonus, Chapter, Document, LlmError, Metadata, PipelineConfig, SamplingParams, TextGenerator,
};
use chrono::{TimeZone, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Answers by prompt shape, the way the tests need it.
///
/// Title prompts echo as `TITLE: <prompt>`, chapter prompts as
/// `Chapter body for <prompt>`, everything else with a chatty preamble.
#[derive(Default)]
pub struct StubGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub completed_chapters: Mutex<Vec<usize>>,
    pub failing_chapters: Vec<usize>,
    pub failing_prefix: Option<&'static str>,
    pub empty_prefix: Option<&'static str>,
    /// Later chapters finish first.
    pub stagger_chapters: Option<usize>,
    pub with_action_plan: bool,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.prompts().iter().filter(|p| p.starts_with(prefix)).count()
    }
}

fn chapter_index(prompt: &str) -> Option<usize> {
    let rest = prompt.strip_prefix("Write chapter ")?;
    rest.split_whitespace().next()?.parse().ok()
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _system_instruction: &str,
        _params: SamplingParams,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.failing_prefix.is_some_and(|prefix| prompt.starts_with(prefix)) {
            return Err(LlmError::Quota);
        }
        if self.empty_prefix.is_some_and(|prefix| prompt.starts_with(prefix)) {
            return Ok("**  **".to_string());
        }

        if prompt.starts_with("Generate a short, powerful ebook title") {
            return Ok(format!("TITLE: {prompt}"));
        }

        if let Some(index) = chapter_index(prompt) {
            if let Some(total) = self.stagger_chapters {
                let delay = (total + 1 - index) as u64 * 25;
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            self.completed_chapters.lock().unwrap().push(index);
            if self.failing_chapters.contains(&index) {
                return Err(LlmError::Unavailable(503));
            }
            let mut body = format!("Chapter body for {prompt}");
            if self.with_action_plan {
                body.push_str("\n\n**Action Plan:**\n1. Start small\n2. Review weekly");
            }
            return Ok(body);
        }

        Ok(format!("Here is the result:\n{prompt}"))
    }
}

pub fn config() -> PipelineConfig {
    PipelineConfig {
        default_chapters: 3,
        ..PipelineConfig::default()
    }
}

/// A hand-built document for renderer tests.
pub fn sample_document(chapters: usize) -> Document {
    let chapters: Vec<Chapter> = (1..=chapters)
        .map(|index| Chapter {
            index,
            title: format!("Step {index}: Build the habit"),
            body: format!(
                "Opening paragraph for chapter {index}. {}\n\nCase study: Maria saved \u{2018}20%\u{2019} of her income.\n\nClosing thoughts.",
                "Practical advice keeps the reader moving. ".repeat(20)
            ),
            action_plan: (index % 2 == 1).then(|| "1. Write it down\n2. Do it daily".to_string()),
        })
        .collect();
    let word_count = chapters.iter().map(Chapter::word_count).sum();

    Document {
        title: "Rich Habits (Second Edition)".to_string(),
        subtitle: "Small steps \u{2014} big results".to_string(),
        introduction: "Welcome.\n\nThis book is organized in short chapters.".to_string(),
        outline: "1. Step 1".to_string(),
        chapters,
        bonuses: vec![Bonus {
            label: "Quick-Start Checklist".to_string(),
            body: "1. Read chapter one\n2. Pick a habit".to_string(),
        }],
        sales_copy: "Change your money habits.\n\nStart today.".to_string(),
        ad_hooks: vec!["Save more without trying".to_string()],
        cover_prompt: "Minimalist navy cover with gold type".to_string(),
        metadata: Metadata {
            niche: "Personal Finance".to_string(),
            target_audience: "young professionals".to_string(),
            book_type: "Guide".to_string(),
            add_ons: ["checklist".to_string()].into_iter().collect(),
            generated_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            word_count,
        },
    }
}
