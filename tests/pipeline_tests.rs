mod common;

use autobook::services::sanitizer::has_boilerplate_prefix;
use autobook::{
    AddOn, GenerationRequest, LlmError, Pipeline, PipelineError, Stage, TextGenerator, render,
};
use common::{StubGenerator, config};
use std::sync::{Arc, Mutex};

fn pipeline(stub: &Arc<StubGenerator>) -> Pipeline {
    let generator: Arc<dyn TextGenerator> = stub.clone();
    Pipeline::new(generator, config())
}

#[tokio::test]
async fn three_chapter_testing_ebook_renders() {
    let stub = Arc::new(StubGenerator::new());
    let request = GenerationRequest::new("Testing").with_chapters(3);

    let document = pipeline(&stub).run(request).await.unwrap();

    assert_eq!(document.chapters.len(), 3);
    let indices: Vec<usize> = document.chapters.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(document.title.starts_with("TITLE:"));
    assert!(!document.title.contains('\n'));

    let artifacts = render::render(&document).unwrap();
    assert!(!artifacts.pdf.is_empty());
    assert!(artifacts.pdf.starts_with(b"%PDF"));
    assert!(!artifacts.sales_page.is_empty());
}

#[tokio::test]
async fn chapters_are_ordered_even_when_they_finish_out_of_order() {
    let stub = Arc::new(StubGenerator {
        stagger_chapters: Some(4),
        ..StubGenerator::default()
    });
    let request = GenerationRequest::new("Testing").with_chapters(4);

    let document = pipeline(&stub).run(request).await.unwrap();

    let completed = stub.completed_chapters.lock().unwrap().clone();
    assert_eq!(completed, vec![4, 3, 2, 1]);
    let indices: Vec<usize> = document.chapters.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    for chapter in &document.chapters {
        assert!(chapter.body.contains(&format!("\"{}\".", chapter.title)));
    }
}

#[tokio::test]
async fn failing_chapter_is_reported_and_no_document_is_returned() {
    let stub = Arc::new(StubGenerator {
        failing_chapters: vec![2],
        ..StubGenerator::default()
    });
    let request = GenerationRequest::new("Testing").with_chapters(3);

    let err = pipeline(&stub).run(request).await.unwrap_err();

    match &err {
        PipelineError::Chapters(failures) => {
            assert_eq!(failures.indices(), vec![2]);
            assert!(matches!(failures.0[0].source, LlmError::Unavailable(503)));
        }
        other => panic!("expected chapter failures, got {other:?}"),
    }
    assert_eq!(err.stage(), Some(Stage::Chapter));
    // every chapter was still attempted, later stages never ran
    assert_eq!(stub.completed_chapters.lock().unwrap().len(), 3);
    assert_eq!(stub.count_starting_with("Write a high-converting"), 0);
}

#[tokio::test]
async fn all_chapter_failures_are_aggregated() {
    let stub = Arc::new(StubGenerator {
        failing_chapters: vec![3, 1],
        stagger_chapters: Some(3),
        ..StubGenerator::default()
    });
    let request = GenerationRequest::new("Testing").with_chapters(3);

    let err = pipeline(&stub).run(request).await.unwrap_err();

    match err {
        PipelineError::Chapters(failures) => assert_eq!(failures.indices(), vec![1, 3]),
        other => panic!("expected chapter failures, got {other:?}"),
    }
}

#[tokio::test]
async fn sequential_failure_halts_with_stage_name() {
    let stub = Arc::new(StubGenerator {
        failing_prefix: Some("Generate a catchy subtitle"),
        ..StubGenerator::default()
    });

    let err = pipeline(&stub)
        .run(GenerationRequest::new("Testing").with_chapters(2))
        .await
        .unwrap_err();

    match &err {
        PipelineError::Generation(e) => {
            assert_eq!(e.stage, Stage::Subtitle);
            assert!(matches!(e.source, LlmError::Quota));
        }
        other => panic!("expected generation error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("subtitle stage failed"));
    assert_eq!(stub.prompts().len(), 2);
}

#[tokio::test]
async fn reply_that_sanitizes_to_nothing_is_an_error() {
    let stub = Arc::new(StubGenerator {
        empty_prefix: Some("Write the introduction"),
        ..StubGenerator::default()
    });

    let err = pipeline(&stub)
        .run(GenerationRequest::new("Testing").with_chapters(2))
        .await
        .unwrap_err();

    match err {
        PipelineError::Generation(e) => {
            assert_eq!(e.stage, Stage::Introduction);
            assert!(matches!(e.source, LlmError::Empty));
        }
        other => panic!("expected generation error, got {other:?}"),
    }
    assert_eq!(stub.count_starting_with("Write chapter "), 0);
}

#[tokio::test]
async fn invalid_requests_make_no_calls() {
    let stub = Arc::new(StubGenerator::new());

    let zero = pipeline(&stub)
        .run(GenerationRequest::new("Testing").with_chapters(0))
        .await;
    assert!(matches!(zero, Err(PipelineError::InvalidRequest(_))));

    let too_many = pipeline(&stub)
        .run(GenerationRequest::new("Testing").with_chapters(21))
        .await;
    assert!(matches!(too_many, Err(PipelineError::InvalidRequest(_))));

    let blank = pipeline(&stub).run(GenerationRequest::new("   ")).await;
    assert!(matches!(blank, Err(PipelineError::InvalidRequest(_))));

    assert!(stub.prompts().is_empty());
}

#[tokio::test]
async fn completed_document_is_clean_and_counted() {
    let stub = Arc::new(StubGenerator {
        with_action_plan: true,
        ..StubGenerator::default()
    });
    let request = GenerationRequest::new("Testing")
        .with_chapters(3)
        .with_audience("busy parents");

    let document = pipeline(&stub).run(request).await.unwrap();

    for text in [
        &document.title,
        &document.subtitle,
        &document.introduction,
        &document.sales_copy,
        &document.cover_prompt,
    ] {
        assert!(!text.is_empty());
        assert!(!text.contains("**"));
        assert!(!has_boilerplate_prefix(text), "boilerplate left in {text:?}");
    }
    for chapter in &document.chapters {
        assert!(!chapter.body.is_empty());
        assert!(!has_boilerplate_prefix(&chapter.body));
        assert!(!chapter.body.contains("Review weekly"));
        assert_eq!(
            chapter.action_plan.as_deref(),
            Some("1. Start small\n2. Review weekly")
        );
    }
    assert!(!document.ad_hooks.is_empty());

    let words: usize = document
        .chapters
        .iter()
        .map(|c| c.body.split_whitespace().count())
        .sum();
    assert_eq!(document.metadata.word_count, words);
    assert_eq!(document.metadata.target_audience, "busy parents");
    assert_eq!(document.metadata.niche, "Testing");
}

#[tokio::test]
async fn unknown_niche_asks_for_titles_and_numbers_missing_ones() {
    let stub = Arc::new(StubGenerator::new());

    let document = pipeline(&stub)
        .run(GenerationRequest::new("Testing").with_chapters(5))
        .await
        .unwrap();

    assert_eq!(stub.count_starting_with("List exactly 5 chapter titles"), 1);
    assert_eq!(document.chapters.len(), 5);
    assert_eq!(document.chapters[4].title, "Chapter 5");
    assert_eq!(document.outline.lines().count(), 5);
}

#[tokio::test]
async fn known_niche_uses_curated_titles() {
    let stub = Arc::new(StubGenerator::new());
    let request = GenerationRequest::new("Real Estate").with_chapters(3);

    let document = pipeline(&stub).run(request).await.unwrap();

    assert_eq!(stub.count_starting_with("List exactly"), 0);
    let titles: Vec<&str> = document.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Reading the Market Like a Pro",
            "Financing Your First Deal",
            "Finding Undervalued Properties"
        ]
    );
    assert!(document.outline.starts_with("1. Reading the Market Like a Pro\n"));
}

#[tokio::test]
async fn one_bonus_per_add_on() {
    let stub = Arc::new(StubGenerator::new());
    let request = GenerationRequest::new("Testing")
        .with_chapters(1)
        .with_add_on(AddOn::Checklist)
        .with_add_on(AddOn::Workbook);

    let document = pipeline(&stub).run(request).await.unwrap();

    let labels: Vec<&str> = document.bonuses.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec![AddOn::Workbook.label(), AddOn::Checklist.label()]);
    assert!(document.bonuses.iter().all(|b| !b.body.is_empty()));
    assert_eq!(document.metadata.add_ons.len(), 2);
    assert_eq!(stub.count_starting_with("Write the bonus"), 2);
}

#[tokio::test]
async fn progress_reports_each_stage_in_order() {
    let stub = Arc::new(StubGenerator::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let generator: Arc<dyn TextGenerator> = stub.clone();
    Pipeline::new(generator, config())
        .with_progress(move |stage| sink.lock().unwrap().push(stage))
        .run(GenerationRequest::new("Testing").with_chapters(2))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Stage::Title,
            Stage::Subtitle,
            Stage::Introduction,
            Stage::Outline,
            Stage::Chapter,
            Stage::SalesCopy,
            Stage::AdHooks,
            Stage::CoverPrompt,
        ]
    );
}
