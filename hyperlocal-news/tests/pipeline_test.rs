mod common;

use chrono::{Duration, Utc};
use common::{area, init_tracing, memory_store, post, FlakyStore, RecordingImageSearch};
use hyperlocal_news::{
    AppConfig, AppContext,     GeneratedArticle, MemoryStore, MockLlmAdapter, MockReply, NewsError, NewsGenerationPipeline,
    NewsStore, RegenerateOptions, RetryPolicy,
};
use std::sync::Arc;
use tokio_test::assert_ok;

fn pipeline(
    store: &Arc<MemoryStore>,
    llm: &Arc<MockLlmAdapter>,
    images: &Arc<RecordingImageSearch>,
) -> NewsGenerationPipeline {
    NewsGenerationPipeline::new(store.clone(), llm.clone(), images.clone())
        .with_retry_policy(RetryPolicy::immediate(3))
}

fn two_articles() -> MockReply {
    MockReply::Articles(vec![
        GeneratedArticle::new("Power outage hits Main St", "Residents on Main St lost power.")
            .with_category("utilities")
            .with_image_keywords("power lines")
            .with_reporter("Dana"),
        GeneratedArticle::new("New park opens downtown", "A new park opened downtown this week."),
    ])
}

#[tokio::test]
async fn test_generates_articles_and_advances_watermark() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", Some("Dana"), 10).await;
    post(&store, &sf, "New park opens downtown", None, 5).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let images = Arc::new(RecordingImageSearch::returning("https://images.example/cover.jpg"));
    let before = Utc::now();

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 2);
    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(outcome.skipped, 0);
    for article in &outcome.articles {
        assert_eq!(article.area_id, sf.id);
        assert_eq!(article.cover_image.as_deref(), Some("https://images.example/cover.jpg"));
    }
    assert_eq!(outcome.articles[0].category, "utilities");
    assert_eq!(outcome.articles[0].reporter_name.as_deref(), Some("Dana"));
    assert_eq!(outcome.articles[1].category, "news");

    let stored = store.get_area(sf.id).await.unwrap().unwrap();
    let watermark = outcome.watermark.expect("watermark advanced");
    assert_eq!(stored.last_generated_at, Some(watermark));
    assert!(watermark >= before);

    // posts rendered oldest first with reporter credit
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    let first = prompt.find("\"Power outage on Main St\" (reported by Dana)").unwrap();
    let second = prompt.find("\"New park opens downtown\"").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_second_run_without_new_posts_is_noop() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;
    post(&store, &sf, "New park opens downtown", None, 5).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let images = Arc::new(RecordingImageSearch::empty());
    let pipeline = pipeline(&store, &llm, &images);

    let first = pipeline.generate("sanfrancisco").await.unwrap();
    assert_eq!(first.created_count, 2);
    let watermark = store.get_area(sf.id).await.unwrap().unwrap().last_generated_at;

    let second = pipeline.generate("sanfrancisco").await.unwrap();
    assert_eq!(second.created_count, 0);
    assert!(second.watermark.is_none());
    assert_eq!(llm.call_count(), 1);
    assert_eq!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at, watermark);
    assert_eq!(store.find_articles(sf.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_watermark_strictly_increases_with_new_posts() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Street fair on Saturday", None, 30).await;

    let llm = Arc::new(MockLlmAdapter::new("roundup"));
    let images = Arc::new(RecordingImageSearch::empty());
    let pipeline = pipeline(&store, &llm, &images);

    let first = pipeline.generate("sanfrancisco").await.unwrap();
    let first_mark = first.watermark.unwrap();

    store
        .create_post(hyperlocal_news::NewPost {
            area_id: sf.id,
            content: "Library hours extended".to_string(),
            reporter_name: None,
            posted_at: None,
        })
        .await
        .unwrap();

    let second = pipeline.generate("sanfrancisco").await.unwrap();
    assert_eq!(second.created_count, 1);
    let second_mark = second.watermark.unwrap();
    assert!(second_mark > first_mark);

    // only the new post went into the second prompt
    let prompts = llm.prompts();
    assert!(prompts[1].contains("Library hours extended"));
    assert!(!prompts[1].contains("Street fair"));
}

#[tokio::test]
async fn test_no_posts_leaves_watermark_unset() {
    init_tracing();
    let store = memory_store();
    let quiet = area(&store, "quiet town").await;

    let llm = Arc::new(MockLlmAdapter::new("test"));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("Quiet Town").await.unwrap();

    assert_eq!(outcome.created_count, 0);
    assert!(outcome.articles.is_empty());
    assert_eq!(llm.call_count(), 0);
    assert!(store.get_area(quiet.id).await.unwrap().unwrap().last_generated_at.is_none());
}

#[tokio::test]
async fn test_posts_before_watermark_are_ignored() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Old news", None, 60).await;
    let watermark = Utc::now() - Duration::minutes(30);
    store.set_last_generated_at(sf.id, watermark).await.unwrap();

    let llm = Arc::new(MockLlmAdapter::new("test"));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 0);
    assert_eq!(llm.call_count(), 0);
    assert_eq!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at, Some(watermark));
}

#[tokio::test]
async fn test_exhausted_retries_leave_watermark_and_can_be_retried() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let llm = Arc::new(
        MockLlmAdapter::new("flaky")
            .with_reply(MockReply::Fail("timeout".to_string()))
            .with_reply(MockReply::Fail("HTTP 503".to_string()))
            .with_reply(MockReply::Fail("malformed JSON".to_string())),
    );
    let images = Arc::new(RecordingImageSearch::empty());
    let pipeline = pipeline(&store, &llm, &images);

    let outcome = pipeline.generate("sanfrancisco").await.unwrap();
    assert_eq!(outcome.created_count, 0);
    assert!(outcome.watermark.is_none());
    assert_eq!(llm.call_count(), 3);
    assert!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at.is_none());
    assert!(store.find_articles(sf.id).await.unwrap().is_empty());

    // same posts are picked up again on the next run
    llm.push_reply(two_articles());
    let retried = pipeline.generate("sanfrancisco").await.unwrap();
    assert_eq!(retried.created_count, 2);
    let prompts = llm.prompts();
    assert_eq!(prompts[0], prompts[3]);
}

#[tokio::test]
async fn test_transient_failure_recovers_within_budget() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let llm = Arc::new(
        MockLlmAdapter::new("flaky")
            .with_reply(MockReply::Fail("timeout".to_string()))
            .with_reply(two_articles()),
    );
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 2);
    assert_eq!(llm.call_count(), 2);
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_empty_article_list_does_not_advance() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Nothing much happened", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(MockReply::Articles(Vec::new())));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 0);
    assert_eq!(llm.call_count(), 1);
    assert!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at.is_none());
}

#[tokio::test]
async fn test_records_without_title_or_content_are_skipped() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Farmers market returns", None, 10).await;

    let no_title = GeneratedArticle {
        content: Some("Body without a headline".to_string()),
        ..Default::default()
    };
    let blank_content = GeneratedArticle::new("Headline only", "   ");
    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(MockReply::Articles(vec![
        no_title,
        GeneratedArticle::new("Farmers market returns", "The market is back on Sundays."),
        blank_content,
    ])));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(outcome.articles[0].title, "Farmers market returns");
    assert_eq!(images.calls().len(), 1);
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_persistence_failure_skips_only_that_article() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Council meeting recap", None, 10).await;

    let long_title = "x".repeat(300);
    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(MockReply::Articles(vec![
        GeneratedArticle::new(&long_title, "Too long to store."),
        GeneratedArticle::new("Council meeting recap", "The council met on Tuesday."),
    ])));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 1);
    assert_eq!(outcome.articles[0].title, "Council meeting recap");
    assert_eq!(store.find_articles(sf.id).await.unwrap().len(), 1);
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_only_failed_persistence_keeps_watermark() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Council meeting recap", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(MockReply::Articles(vec![
        GeneratedArticle::new(&"y".repeat(256), "Too long to store."),
    ])));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 0);
    assert!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at.is_none());
}

#[tokio::test]
async fn test_image_failure_yields_no_cover() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let images = Arc::new(RecordingImageSearch::failing());

    let outcome = pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    assert_eq!(outcome.created_count, 2);
    assert!(outcome.articles.iter().all(|a| a.cover_image.is_none()));
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_image_query_prefers_keywords_over_title() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let images = Arc::new(RecordingImageSearch::empty());

    pipeline(&store, &llm, &images).generate("sanfrancisco").await.unwrap();

    let calls = images.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("power lines".to_string(), Some("utilities".to_string())));
    assert_eq!(calls[1], ("New park opens downtown".to_string(), Some("news".to_string())));
}

#[tokio::test]
async fn test_category_over_column_limit_skips_only_that_article() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Council meeting recap", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(MockReply::Articles(vec![
        GeneratedArticle::new("Council meeting recap", "The council met on Tuesday.")
            .with_category(&"c".repeat(150)),
        GeneratedArticle::new("Library hours extended", "The branch now opens at 8.")
            .with_category(&"d".repeat(100)),
    ])));
    let images = Arc::new(RecordingImageSearch::empty());

    let outcome = assert_ok!(pipeline(&store, &llm, &images).generate("sanfrancisco").await);

    assert_eq!(outcome.created_count, 1);
    assert_eq!(outcome.articles[0].title, "Library hours extended");
    assert_eq!(store.find_articles(sf.id).await.unwrap().len(), 1);
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_missing_api_key_generates_nothing() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let config = assert_ok!(AppConfig::from_lookup(|_| None));
    let ctx = assert_ok!(AppContext::with_store(&config, store.clone()));

    // a configuration error is not retried, so the default delays never apply
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        ctx.pipeline().generate("sanfrancisco"),
    )
    .await
    .expect("no retry delay for a missing key");
    let outcome = assert_ok!(outcome);

    assert_eq!(outcome.created_count, 0);
    assert!(outcome.articles.is_empty());
    assert!(outcome.watermark.is_none());
    assert!(store.find_articles(sf.id).await.unwrap().is_empty());
    assert!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at.is_none());
}

#[tokio::test]
async fn test_post_read_failure_is_soft() {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let sf = area(&store.inner, "sanfrancisco").await;
    post(&store.inner, &sf, "Power outage on Main St", None, 10).await;
    store.fail_post_reads(true);

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let images = Arc::new(RecordingImageSearch::empty());
    let pipeline = NewsGenerationPipeline::new(store.clone(), llm.clone(), images.clone())
        .with_retry_policy(RetryPolicy::immediate(3));

    let outcome = assert_ok!(pipeline.generate("sanfrancisco").await);

    assert_eq!(outcome.created_count, 0);
    assert!(outcome.watermark.is_none());
    assert!(llm.prompts().is_empty());
    assert!(store.inner.get_area(sf.id).await.unwrap().unwrap().last_generated_at.is_none());

    store.fail_post_reads(false);
    let outcome = assert_ok!(pipeline.generate("sanfrancisco").await);
    assert_eq!(outcome.created_count, 2);
    assert!(outcome.watermark.is_some());
}

#[tokio::test]
async fn test_unknown_area_is_an_error() {
    init_tracing();
    let store = memory_store();
    let llm = Arc::new(MockLlmAdapter::new("test"));
    let images = Arc::new(RecordingImageSearch::empty());

    let result = pipeline(&store, &llm, &images).generate("atlantis").await;

    assert!(matches!(result, Err(NewsError::AreaNotFound { .. })));
    assert!(store.list_areas().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_regenerate_ignores_watermark_and_existing_articles() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    let oakland = area(&store, "oakland").await;
    let empty = area(&store, "empty town").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;
    post(&store, &oakland, "Ferry schedule changes", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("roundup"));
    let images = Arc::new(RecordingImageSearch::empty());
    let pipeline = pipeline(&store, &llm, &images);

    let generated = pipeline.generate("sanfrancisco").await.unwrap();
    let sf_mark = generated.watermark;

    let report = pipeline.regenerate(&RegenerateOptions::default()).await.unwrap();
    // sanfrancisco already has articles, empty town has no posts
    assert_eq!(report.areas_processed, 1);
    assert_eq!(report.areas_skipped, 2);
    assert_eq!(report.articles_created, 1);
    assert!(store.get_area(oakland.id).await.unwrap().unwrap().last_generated_at.is_none());
    assert!(store.get_area(empty.id).await.unwrap().unwrap().last_generated_at.is_none());

    let forced = pipeline
        .regenerate(&RegenerateOptions {
            area_names: vec!["SanFrancisco".to_string(), "nowhere".to_string()],
            skip_existing_check: true,
        })
        .await
        .unwrap();
    assert_eq!(forced.areas_processed, 1);
    assert_eq!(forced.areas_skipped, 1);
    assert_eq!(forced.articles_created, 1);
    assert_eq!(store.find_articles(sf.id).await.unwrap().len(), 2);
    assert_eq!(store.get_area(sf.id).await.unwrap().unwrap().last_generated_at, sf_mark);
}

#[tokio::test]
async fn test_update_cover_images_report() {
    init_tracing();
    let store = memory_store();
    let sf = area(&store, "sanfrancisco").await;
    post(&store, &sf, "Power outage on Main St", None, 10).await;

    let llm = Arc::new(MockLlmAdapter::new("test").with_reply(two_articles()));
    let no_images = Arc::new(RecordingImageSearch::empty());
    pipeline(&store, &llm, &no_images).generate("sanfrancisco").await.unwrap();

    let images = Arc::new(RecordingImageSearch::returning("https://images.example/new.jpg"));
    let refresh = pipeline(&store, &llm, &images);
    let report = refresh.update_cover_images().await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 0);

    // refresh searches by title, not by stored keywords
    assert_eq!(images.calls()[0].0, "Power outage hits Main St");

    let again = refresh.update_cover_images().await.unwrap();
    assert_eq!(again.updated, 0);
    assert_eq!(again.unchanged, 2);

    let failing = Arc::new(RecordingImageSearch::failing());
    let failed = pipeline(&store, &llm, &failing).update_cover_images().await.unwrap();
    assert_eq!(failed.failed, 2);
    for article in store.list_articles().await.unwrap() {
        assert_eq!(article.cover_image.as_deref(), Some("https://images.example/new.jpg"));
    }
}
