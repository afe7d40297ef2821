//! Reranker tests.

use super::*;
use crate::inference::MockInference;
use crate::scoring::DEFAULT_MAX_QUERY_TERMS;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn engine() -> MathReranker {
    MathReranker::new().with_reference_year(2026)
}

fn items(pairs: &[(&str, &str)]) -> Vec<Item> {
    pairs.iter().map(|(id, content)| Item::new(*id, *content)).collect()
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

fn sample() -> Vec<Item> {
    items(&[
        ("a", "A 2023 paper on machine learning techniques."),
        ("b", "An unrelated essay on gardening."),
    ])
}

fn exclusion_subsets() -> Vec<ExcludeSet> {
    (0u32..32)
        .map(|mask| {
            ExcludeFactor::ALL
                .into_iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, f)| f)
                .collect()
        })
        .collect()
}

// =========== Math Reranker Tests ===========

#[test]
fn test_math_ranks_relevant_item_first() {
    let ranked = engine().rank("machine learning 2023", &sample(), &ExcludeSet::none());
    assert_eq!(ids(&ranked), vec!["a", "b"]);
    assert!(ranked[0].score() > ranked[1].score());
}

#[test]
fn test_math_is_deterministic() {
    let engine = engine();
    let input = items(&[
        ("1", "Rust async runtimes compared in 2024"),
        ("2", "Tokio internals and the async executor"),
        ("3", "A recipe for sourdough bread"),
        ("4", "Async Rust: pinning, futures and wakers explained"),
    ]);
    let first = engine.rank("async rust runtime", &input, &ExcludeSet::none());
    let second = engine.rank("async rust runtime", &input, &ExcludeSet::none());
    assert_eq!(first, second);
}

#[test]
fn test_math_sets_engine_fields_and_ignores_caller_values() {
    let mut input = sample();
    input[1].final_score = Some(100.0);
    input[1].length = Some(1);

    let ranked = engine().rank("machine learning", &input, &ExcludeSet::none());
    let b = ranked.iter().find(|i| i.id == "b").unwrap();
    assert_eq!(b.length, Some("An unrelated essay on gardening.".chars().count()));
    assert!(b.score() < 1.0);
    assert!(ranked.iter().all(|i| i.scores.is_some()));
}

#[test]
fn test_math_all_excluded_uses_fallback_formula() {
    let ranked = engine().rank("machine learning", &sample(), &ExcludeSet::all());
    for item in &ranked {
        let trace = item.scores.as_ref().unwrap();
        assert!(trace.fallback_formula);
        assert_eq!(trace.active_factors, 0);
        assert_eq!(trace.vector_score, 0.0);
        assert_eq!(trace.recency, 0.0);
        let expected = 0.6 * trace.string_score + 0.4 * trace.fuzzy_score;
        assert!((item.score() - expected).abs() < 1e-12);
    }
    assert_eq!(ranked[0].id, "a");
}

#[test]
fn test_math_exact_match_first_under_every_exclusion() {
    let engine = engine();
    let input = items(&[
        ("miss", "An unrelated essay on gardening."),
        ("hit", "Notes on machine learning"),
    ]);
    for exclude in exclusion_subsets() {
        let ranked = engine.rank("machine learning", &input, &exclude);
        assert_eq!(ranked[0].id, "hit", "exclusions: {:?}", exclude.sorted_names());
    }
}

#[test]
fn test_math_excluded_factors_are_zero_in_trace() {
    let exclude: ExcludeSet = [ExcludeFactor::Recency, ExcludeFactor::Length]
        .into_iter()
        .collect();
    let ranked = engine().rank("machine learning 2023", &sample(), &exclude);
    let trace = ranked[0].scores.as_ref().unwrap();
    assert_eq!(trace.recency, 0.0);
    assert_eq!(trace.length, 0.0);
    assert_eq!(trace.excluded, vec!["length", "recency"]);
    assert!(trace.query_term_match > 0.0);
}

#[test]
fn test_math_keyword_score_is_trace_only() {
    let ranked = engine().rank("machine learning", &sample(), &ExcludeSet::none());
    let trace = ranked[0].scores.as_ref().unwrap();
    assert!(trace.keyword_score > 0.0);

    let recomputed = 0.25 * trace.vector_score
        + 0.25 * trace.semantic_score
        + 0.20 * trace.query_term_match
        + 0.15 * trace.string_score
        + 0.10 * trace.fuzzy_score
        + 0.03 * trace.recency
        + 0.02 * trace.length;
    assert!((trace.final_score - recomputed).abs() < 1e-12);
}

#[test]
fn test_math_ties_keep_input_order() {
    let input = items(&[
        ("x", "identical content here"),
        ("y", "identical content here"),
        ("z", "identical content here"),
    ]);
    let ranked = engine().rank("something else entirely", &input, &ExcludeSet::none());
    assert_eq!(ids(&ranked), vec!["x", "y", "z"]);
}

#[test]
fn test_math_empty_items() {
    assert!(engine().rank("query", &[], &ExcludeSet::none()).is_empty());
}

#[test]
fn test_math_recency_uses_reference_year() {
    let input = items(&[("old", "report from 2005"), ("new", "report from 2025")]);
    let ranked = engine().rank("report", &input, &ExcludeSet::none());
    let recency = |id: &str| {
        ranked
            .iter()
            .find(|i| i.id == id)
            .and_then(|i| i.scores.as_ref())
            .map(|s| s.recency)
            .unwrap()
    };
    assert_eq!(recency("new"), 1.0);
    assert_eq!(recency("old"), 0.5);
    assert_eq!(ranked[0].id, "new");
}

#[tokio::test]
async fn test_math_through_trait() {
    let reranker: Arc<dyn Reranker> = Arc::new(engine());
    let result = reranker
        .rerank("machine learning", &sample(), &ExcludeSet::none())
        .await
        .unwrap();
    assert_eq!(reranker.name(), "math");
    assert_eq!(result.method, RerankMode::Math);
    assert!(!result.cached);
    assert_eq!(result.items.len(), 2);
}

#[test]
fn test_math_large_batch_is_bounded() {
    let query_words: Vec<String> = (0..3000).map(|i| format!("q{i:05}x")).collect();
    let query = query_words.join(" ");

    // Holds exactly the first fuzzy-matched query terms
    let mut input = vec![Item::new("hit", query_words[..DEFAULT_MAX_QUERY_TERMS].join(" "))];
    for k in 0..9 {
        let content: Vec<String> = (0..3000).map(|i| format!("d{k}{i:05}")).collect();
        input.push(Item::new(format!("filler-{k}"), content.join(" ")));
    }

    let started = std::time::Instant::now();
    let ranked = engine().rank(&query, &input, &ExcludeSet::none());
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(60), "rank took {elapsed:?}");
    assert_eq!(ranked.len(), 10);
    assert!(ranked.iter().all(|i| i.score().is_finite()));

    let hit = ranked.iter().find(|i| i.id == "hit").unwrap();
    assert_eq!(hit.scores.as_ref().unwrap().fuzzy_score, 1.0);
}

#[tokio::test]
async fn test_rank_blocking_matches_rank() {
    let math = Arc::new(engine());
    let expected = math.rank("machine learning", &sample(), &ExcludeSet::none());
    let ranked = Arc::clone(&math)
        .rank_blocking("machine learning".to_string(), sample(), ExcludeSet::none())
        .await
        .unwrap();
    assert_eq!(ranked, expected);
}

// =========== AI Reranker Tests ===========

fn ai(mock: &MockInference) -> (AiReranker, Arc<MathReranker>) {
    let math = Arc::new(engine());
    let ai = AiReranker::new(Arc::new(mock.clone()), Arc::clone(&math))
        .with_model("test-model")
        .with_timeout(Duration::from_millis(200));
    (ai, math)
}

#[tokio::test]
async fn test_ai_orders_by_model_scores() {
    let mock = MockInference::new();
    mock.add_scores(&[(0, 0.1), (1, 0.9), (2, 0.5)]).await;
    let (ai, _) = ai(&mock);

    let input = items(&[("a", "first"), ("b", "second"), ("c", "third")]);
    let result = ai.rerank_top_k("query", &input, None).await.unwrap();

    assert_eq!(result.method, RerankMode::Ai);
    assert_eq!(ids(&result.items), vec!["b", "c", "a"]);
    assert_eq!(result.items[0].final_score, Some(0.9));
    assert_eq!(result.items[0].length, Some(6));
    assert!(result.items[0].scores.is_none());

    let request = mock.last_request().await.unwrap();
    assert_eq!(request.contexts.len(), 3);
    assert_eq!(request.contexts[1].text, "second");
    assert_eq!(request.top_k, None);
}

#[tokio::test]
async fn test_ai_ties_keep_input_order() {
    let mock = MockInference::new();
    mock.add_scores(&[(2, 0.5), (1, 0.5), (0, 0.5)]).await;
    let (ai, _) = ai(&mock);

    let input = items(&[("a", "x"), ("b", "y"), ("c", "z")]);
    let result = ai.rerank_top_k("q", &input, None).await.unwrap();
    assert_eq!(ids(&result.items), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_ai_top_k_is_clamped_and_partial_allowed() {
    let mock = MockInference::new();
    mock.add_scores(&[(1, 0.8)]).await;
    let (ai, _) = ai(&mock);

    let input = items(&[("a", "x"), ("b", "y")]);
    let result = ai.rerank_top_k("q", &input, Some(50)).await.unwrap();

    assert_eq!(mock.last_request().await.unwrap().top_k, Some(2));
    assert_eq!(result.method, RerankMode::Ai);
    assert_eq!(ids(&result.items), vec!["b"]);
}

#[tokio::test]
async fn test_ai_failure_falls_back_to_math() {
    let mock = MockInference::new();
    mock.add_failure("model unavailable").await;
    let (ai, math) = ai(&mock);

    let input = sample();
    let result = ai.rerank_top_k("machine learning 2023", &input, None).await.unwrap();

    assert_eq!(result.method, RerankMode::Math);
    assert_eq!(
        result.items,
        math.rank("machine learning 2023", &input, &ExcludeSet::none())
    );
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_ai_malformed_responses_fall_back() {
    let malformed = vec![
        json!(null),
        json!({"response": "nope"}),
        json!({"response": []}),
        json!({"response": [{"id": 0, "score": 0.5}]}),
        json!({"response": [{"id": 0, "score": 0.5}, {"id": 5, "score": 0.1}]}),
        json!({"response": [{"id": 0, "score": 0.5}, {"id": 0, "score": 0.1}]}),
        json!({"response": [{"id": -1, "score": 0.5}, {"id": 1, "score": 0.1}]}),
        json!({"response": [{"id": 0}, {"id": 1, "score": 0.1}]}),
        json!({"result": {"response": [{"id": 0, "score": 1.0}, {"id": 1, "score": 0.0}]}}),
    ];

    let input = sample();
    for body in malformed {
        let mock = MockInference::new();
        mock.add_response(body.clone()).await;
        let (ai, math) = ai(&mock);

        let result = ai.rerank_top_k("machine learning", &input, None).await.unwrap();
        assert_eq!(result.method, RerankMode::Math, "body: {body}");
        assert_eq!(
            result.items,
            math.rank("machine learning", &input, &ExcludeSet::none())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_ai_timeout_falls_back() {
    let mock = MockInference::new();
    mock.add_hang(Duration::from_secs(60)).await;
    let (ai, _) = ai(&mock);

    let result = ai.rerank_top_k("machine learning", &sample(), None).await.unwrap();
    assert_eq!(result.method, RerankMode::Math);
    assert_eq!(result.items[0].id, "a");
}

#[tokio::test]
async fn test_ai_fallback_ignores_exclusions() {
    let mock = MockInference::new();
    let (ai, math) = ai(&mock);
    let reranker: &dyn Reranker = &ai;

    let input = sample();
    let result = reranker
        .rerank("machine learning", &input, &ExcludeSet::all())
        .await
        .unwrap();
    assert_eq!(reranker.name(), "ai");
    assert_eq!(
        result.items,
        math.rank("machine learning", &input, &ExcludeSet::none())
    );
}

#[tokio::test]
async fn test_ai_empty_items_skips_model() {
    let mock = MockInference::new();
    let (ai, _) = ai(&mock);
    let result = ai.rerank_top_k("q", &[], None).await.unwrap();
    assert!(result.items.is_empty());
    assert_eq!(mock.call_count(), 0);
}
