mod common;

use anyhow::Result;
use common::{chain, term, terms, BrokenStore, MockProvider, LANGUAGES};
use std::sync::Arc;
use std::time::Duration;
use term_enhancer::core::cache::EnhancementCache;
use term_enhancer::{
    EnhanceError, EnhanceOptions, EnhancementService, LanguageCode, MemoryCacheStore, TermInfo,
    TierKind,
};

fn options(batch_size: usize, concurrent_batches: usize) -> EnhanceOptions {
    EnhanceOptions {
        use_cache: true,
        batch_size,
        concurrent_batches,
    }
}

fn memory_cache() -> Arc<EnhancementCache> {
    Arc::new(EnhancementCache::new(Arc::new(MemoryCacheStore::new())))
}

fn names(outcome: &term_enhancer::core::service::EnhancementOutcome) -> Vec<String> {
    outcome.terms.iter().map(|t| t.term().to_string()).collect()
}

#[tokio::test]
async fn test_fallback_for_single_batch_keeps_order() -> Result<()> {
    // 12 個用語、batch 5、同時 3 個：3 個 batch、1 回合；只有第 2 個 batch 的主要 tier 失敗
    let primary = Arc::new(MockProvider::new("primary").failing_on(&["term-7"]));
    let secondary = Arc::new(MockProvider::new("secondary"));
    let service = EnhancementService::new(
        chain(vec![
            ("primary", TierKind::WebSearch, primary.clone()),
            ("secondary", TierKind::WebSearch, secondary.clone()),
        ]),
        None,
    );

    let input = terms(12);
    let outcome = service.enhance(&input, &LANGUAGES, options(5, 3)).await?;

    assert_eq!(outcome.total_batches, 3);
    assert_eq!(outcome.fallback_count, 1);
    assert!(outcome.errors.is_empty());
    assert!(outcome.failed_terms.is_empty());

    let expected: Vec<String> = (0..12).map(|i| format!("term-{}", i)).collect();
    assert_eq!(names(&outcome), expected);

    for (i, enhanced) in outcome.terms.iter().enumerate() {
        let source = if (5..10).contains(&i) { "secondary" } else { "primary" };
        assert_eq!(enhanced.source(), source, "term {}", i);
    }
    assert_eq!(primary.calls(), 3);
    assert_eq!(secondary.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_validation_failure_moves_to_next_tier() -> Result<()> {
    let primary = Arc::new(MockProvider::new("primary").incomplete_on(&["term-1"]));
    let secondary = Arc::new(MockProvider::new("secondary"));
    let service = EnhancementService::new(
        chain(vec![
            ("primary", TierKind::WebSearch, primary),
            ("secondary", TierKind::WebSearch, secondary),
        ]),
        None,
    );

    let outcome = service.enhance(&terms(3), &LANGUAGES, options(5, 1)).await?;
    assert_eq!(outcome.fallback_count, 1);
    assert!(outcome.terms.iter().all(|t| t.source() == "secondary"));
    Ok(())
}

#[tokio::test]
async fn test_exhausted_batch_is_isolated() -> Result<()> {
    let primary = Arc::new(MockProvider::new("primary").failing_on(&["term-2"]));
    let backup = Arc::new(MockProvider::new("backup").failing_on(&["term-2"]));
    let service = EnhancementService::new(
        chain(vec![
            ("primary", TierKind::WebSearch, primary),
            ("backup", TierKind::Translation, backup),
        ]),
        None,
    );

    let outcome = service.enhance(&terms(6), &LANGUAGES, options(2, 2)).await?;

    assert_eq!(outcome.total_batches, 3);
    assert_eq!(names(&outcome), ["term-0", "term-1", "term-4", "term-5"]);
    assert_eq!(outcome.failed_terms, ["term-2", "term-3"]);
    assert_eq!(outcome.errors.len(), 1);

    let error = &outcome.errors[0];
    assert!(error.contains("term-2, term-3"));
    let primary_at = error.find("primary: ").unwrap();
    let backup_at = error.find("backup: ").unwrap();
    assert!(primary_at < backup_at);
    assert_eq!(outcome.fallback_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_output_order_ignores_completion_order() -> Result<()> {
    // 第一個 batch 最慢完成
    let provider = Arc::new(
        MockProvider::new("primary")
            .delayed_on("term-0", Duration::from_millis(80))
            .delayed_on("term-3", Duration::from_millis(40)),
    );
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider)]),
        None,
    );

    let outcome = service.enhance(&terms(9), &LANGUAGES, options(3, 3)).await?;
    let expected: Vec<String> = (0..9).map(|i| format!("term-{}", i)).collect();
    assert_eq!(names(&outcome), expected);
    Ok(())
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() -> Result<()> {
    let provider = Arc::new(MockProvider::new("primary"));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider.clone())]),
        Some(memory_cache()),
    );
    let input = terms(7);

    let first = service.enhance(&input, &LANGUAGES, options(5, 3)).await?;
    assert_eq!(first.cache_hits, 0);
    assert_eq!(provider.calls(), 2);

    // 語言順序不同也應命中
    let reordered = [LanguageCode::English, LanguageCode::Korean, LanguageCode::Japanese];
    let second = service.enhance(&input, &reordered, options(5, 3)).await?;
    assert_eq!(second.cache_hits, 7);
    assert_eq!(second.total_batches, 0);
    assert_eq!(provider.calls(), 2);
    assert_eq!(names(&second), names(&first));

    let stats = service.cache().unwrap().stats().await?;
    assert_eq!(stats.hits, 7);
    assert_eq!(stats.misses, 7);
    assert_eq!(stats.total_keys, 7);
    Ok(())
}

#[tokio::test]
async fn test_partial_hits_only_send_misses_to_providers() -> Result<()> {
    let provider = Arc::new(MockProvider::new("primary"));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider.clone())]),
        Some(memory_cache()),
    );

    let warm = vec![term("term-1"), term("term-3")];
    service.enhance(&warm, &LANGUAGES, options(5, 3)).await?;

    let outcome = service.enhance(&terms(5), &LANGUAGES, options(5, 3)).await?;
    assert_eq!(outcome.cache_hits, 2);
    assert_eq!(
        names(&outcome),
        ["term-0", "term-1", "term-2", "term-3", "term-4"]
    );
    assert_eq!(
        provider.seen(),
        ["term-1", "term-3", "term-0", "term-2", "term-4"]
    );
    Ok(())
}

#[tokio::test]
async fn test_cache_hit_carries_current_request_fields() -> Result<()> {
    let provider = Arc::new(MockProvider::new("primary"));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider.clone())]),
        Some(memory_cache()),
    );

    let fruit = TermInfo::create("Apple", "fruit", "food", Some("a fruit"), vec!["#snack".into()])?;
    service.enhance(&[fruit], &LANGUAGES, options(5, 3)).await?;

    // 快取鍵不分大小寫，同一筆翻譯會命中
    let company = TermInfo::create(
        "APPLE",
        "company",
        "technology",
        Some("iPhone maker"),
        vec!["#AAPL".into()],
    )?;
    let outcome = service.enhance(&[company], &LANGUAGES, options(5, 3)).await?;
    assert_eq!(outcome.cache_hits, 1);
    assert_eq!(provider.calls(), 1);

    let hit = &outcome.terms[0];
    assert_eq!(hit.term(), "APPLE");
    assert_eq!(hit.term_type(), "company");
    assert_eq!(hit.primary_domain(), "technology");
    assert_eq!(hit.context(), Some("iPhone maker"));
    assert_eq!(hit.tags(), ["#AAPL"]);
    // 翻譯與出處沿用快取內容
    assert_eq!(hit.translation(LanguageCode::Korean), Some("Apple@ko"));
    assert_eq!(hit.web_sources(), ["https://example.com/Apple"]);
    Ok(())
}

#[tokio::test]
async fn test_translation_tier_results_are_not_cached() -> Result<()> {
    let primary = Arc::new(MockProvider::new("primary").failing_on(&["term-0"]));
    let translation = Arc::new(MockProvider::new("translation").without_sources());
    let cache = memory_cache();
    let service = EnhancementService::new(
        chain(vec![
            ("primary", TierKind::WebSearch, primary),
            ("translation", TierKind::Translation, translation.clone()),
        ]),
        Some(cache.clone()),
    );
    let input = terms(3);

    let first = service.enhance(&input, &LANGUAGES, options(5, 1)).await?;
    assert_eq!(first.terms.len(), 3);
    assert_eq!(first.fallback_count, 1);
    assert!(first.terms.iter().all(|t| t.web_sources().is_empty()));

    for info in &input {
        assert!(!cache.contains(info.term(), &LANGUAGES).await?);
    }

    let second = service.enhance(&input, &LANGUAGES, options(5, 1)).await?;
    assert_eq!(second.cache_hits, 0);
    assert_eq!(translation.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_use_cache_false_bypasses_cache() -> Result<()> {
    let provider = Arc::new(MockProvider::new("primary"));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider.clone())]),
        Some(memory_cache()),
    );
    let input = terms(2);
    service.enhance(&input, &LANGUAGES, options(5, 1)).await?;

    let no_cache = EnhanceOptions {
        use_cache: false,
        ..options(5, 1)
    };
    let outcome = service.enhance(&input, &LANGUAGES, no_cache).await?;
    assert_eq!(outcome.cache_hits, 0);
    assert_eq!(provider.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_broken_cache_degrades_to_misses() -> Result<()> {
    let provider = Arc::new(MockProvider::new("primary"));
    let cache = Arc::new(EnhancementCache::new(Arc::new(BrokenStore)));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider)]),
        Some(cache.clone()),
    );

    let outcome = service.enhance(&terms(4), &LANGUAGES, options(2, 2)).await?;
    assert_eq!(outcome.terms.len(), 4);
    assert_eq!(outcome.cache_hits, 0);
    assert!(cache.stats().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_provider_calls() {
    let provider = Arc::new(MockProvider::new("primary"));
    let service = EnhancementService::new(
        chain(vec![("primary", TierKind::WebSearch, provider.clone())]),
        None,
    );
    let input = terms(3);

    let cases = [
        service.enhance(&[], &LANGUAGES, options(5, 3)).await,
        service.enhance(&input, &[], options(5, 3)).await,
        service.enhance(&input, &LANGUAGES, options(0, 3)).await,
        service.enhance(&input, &LANGUAGES, options(21, 3)).await,
        service.enhance(&input, &LANGUAGES, options(5, 0)).await,
        service.enhance(&input, &LANGUAGES, options(5, 16)).await,
    ];

    for result in cases {
        assert!(matches!(result, Err(EnhanceError::InputValidation { .. })));
    }
    assert_eq!(provider.calls(), 0);
}
