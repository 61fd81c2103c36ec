//! End-to-end pipeline tests: generation, indexing, application, scoring

use seedling::index::{new_shared_store, open_index};
use seedling::{
    ApplyOptions, Corpus, EngineConfig, F1PatternScorer, IndexBackendKind, IndexConfig,
    MatcherContext, PatternApplier, PatternBank, PatternBuilder, PatternConfig, PatternScorer,
    PhraseBank, SentenceId, SurfacePattern, SurfacePatternFactory, Token,
};
use seedling::matcher::CompiledPattern;
use seedling::pattern::restriction::Restriction;
use seedling::pattern::token::PatternToken;
use seedling::types::PhraseRef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn stop_words() -> Arc<HashSet<String>> {
    Arc::new(["the".to_string(), "of".to_string()].into_iter().collect())
}

fn animal_corpus() -> (Arc<Corpus>, Vec<SentenceId>) {
    let sentence = |words: &[(&str, &str)]| -> Vec<Token> {
        words
            .iter()
            .map(|(w, t)| Token::new(*w, *w, *t, "O").with_label("animal", "O"))
            .collect()
    };
    let mut corpus = Corpus::new();
    corpus.insert(
        SentenceId::from("s1"),
        sentence(&[("the", "DT"), ("cat", "NN"), ("sat", "VBD")]),
    );
    corpus.insert(
        SentenceId::from("s2"),
        sentence(&[("the", "DT"), ("dog", "NN"), ("ran", "VBD")]),
    );
    corpus.insert(
        SentenceId::from("s3"),
        sentence(&[("the", "DT"), ("table", "NN"), ("broke", "VBD")]),
    );
    let ids = vec![
        SentenceId::from("s1"),
        SentenceId::from("s2"),
        SentenceId::from("s3"),
    ];
    (Arc::new(corpus), ids)
}

fn bare_factory_config() -> PatternConfig {
    // No glue wildcards so generated contexts are exact literals.
    PatternConfig {
        min_window: 1,
        max_window: 1,
        use_fillers: false,
        use_stop_wildcard: false,
        min_stopwords: 0,
        ..Default::default()
    }
}

fn factory() -> Arc<SurfacePatternFactory> {
    Arc::new(
        SurfacePatternFactory::new(
            bare_factory_config(),
            vec!["animal".to_string()],
            stop_words(),
            Arc::new(HashSet::new()),
        )
        .unwrap(),
    )
}

/// The pattern "the <NN target>" as the factory generates it
fn the_nn_pattern() -> SurfacePattern {
    SurfacePattern::new(
        Some(vec![Restriction::attribute("word", "the")]),
        PatternToken::new(Some("NN".into()), None, None, 2, true),
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn test_mine_apply_and_score() {
    init_tracing();
    let (corpus, ids) = animal_corpus();
    let factory = factory();
    let bank = Arc::new(PatternBank::new());
    let index = open_index(&IndexConfig::default(), new_shared_store())
        .await
        .unwrap();

    // Construction populates every token position.
    let builder = PatternBuilder::new(
        Arc::clone(&factory),
        Arc::clone(&bank),
        Arc::clone(&index),
        2,
        1000,
        true,
    );
    builder.build(Arc::clone(&corpus), ids.clone()).await.unwrap();

    // The determiner context pattern was generated for the noun position.
    let expected = the_nn_pattern();
    let by_token = factory
        .patterns_for_sentence(corpus.get(&ids[0]).unwrap())
        .unwrap();
    assert!(by_token.get(&1).unwrap().contains(&expected));
    let stored = index.patterns_for_all_tokens(&ids[0]).await.unwrap();
    assert!(stored.get(&1).unwrap().contains(&bank.id_for(&expected)));

    // Application extracts one candidate per sentence.
    let compiled = CompiledPattern::compile(
        &expected,
        MatcherContext {
            stop_words: stop_words(),
            fill_words: Arc::new(HashSet::new()),
            match_lowercase: true,
        },
    );
    let phrase_bank = Arc::new(PhraseBank::new());
    let applier = PatternApplier::new(
        ApplyOptions::for_label("animal"),
        stop_words(),
        Arc::clone(&phrase_bank),
        Arc::clone(&bank),
    );
    let outcome = applier
        .apply(&[(compiled, expected.clone())], &corpus, &ids)
        .unwrap();
    let counter = outcome.counts.get(&expected).unwrap();
    assert_eq!(counter.len(), 3);

    // Scoring against the seed set {cat, dog}: specificity 2/3, full recall.
    let seeds: HashSet<PhraseRef> = [
        phrase_bank.intern("cat", "cat"),
        phrase_bank.intern("dog", "dog"),
    ]
    .into_iter()
    .collect();
    let scores = F1PatternScorer::new().score(&outcome.counts, &seeds).unwrap();
    let score = scores.get(&expected).unwrap();
    assert!((score.specificity - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(score.sensitivity, 1.0);
    assert!((score.f1 - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_backends_store_identical_maps() {
    init_tracing();
    let (corpus, ids) = animal_corpus();
    let tmp = tempfile::tempdir().unwrap();

    let configs = vec![
        IndexConfig::default(),
        IndexConfig {
            backend: IndexBackendKind::Sqlite,
            db_path: Some(tmp.path().join("patterns.db")),
            ..Default::default()
        },
        IndexConfig {
            backend: IndexBackendKind::Tantivy,
            index_dir: Some(tmp.path().join("tantivy")),
            ..Default::default()
        },
    ];

    // One shared bank keeps pattern ids aligned across backends.
    let bank = Arc::new(PatternBank::new());
    let mut indexes = Vec::new();
    for config in &configs {
        let index = open_index(config, new_shared_store()).await.unwrap();
        let builder = PatternBuilder::new(
            factory(),
            Arc::clone(&bank),
            Arc::clone(&index),
            2,
            2, // small flush interval to exercise buffered batches
            config.backend == IndexBackendKind::Memory,
        );
        builder.build(Arc::clone(&corpus), ids.clone()).await.unwrap();
        index.setup_search().await.unwrap();
        index.create_lookup_index().await.unwrap();
        indexes.push(index);
    }

    for id in &ids {
        let reference = indexes[0].patterns_for_all_tokens(id).await.unwrap();
        assert_eq!(reference.len(), 3);
        for index in &indexes[1..] {
            assert_eq!(index.patterns_for_all_tokens(id).await.unwrap(), reference);
        }
    }

    for index in &indexes {
        index.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_config_driven_pipeline() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seedling.toml");
    std::fs::write(
        &path,
        "num_workers = 2\n\
         flush_every = 2\n\
         [pattern]\n\
         min_window = 1\n\
         max_window = 1\n\
         use_fillers = false\n\
         use_stop_wildcard = false\n\
         min_stopwords = 0\n\
         [index]\n\
         backend = \"sqlite\"\n\
         db_path = \"{db}\"\n"
            .replace("{db}", &tmp.path().join("patterns.db").display().to_string()),
    )
    .unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.index.backend, IndexBackendKind::Sqlite);

    let (corpus, ids) = animal_corpus();
    let factory = Arc::new(
        SurfacePatternFactory::new(
            config.pattern.clone(),
            vec!["animal".to_string()],
            stop_words(),
            Arc::new(HashSet::new()),
        )
        .unwrap(),
    );
    let bank = Arc::new(PatternBank::new());
    let index = open_index(&config.index, new_shared_store()).await.unwrap();
    let builder = PatternBuilder::from_config(&config, factory, Arc::clone(&bank), Arc::clone(&index));
    builder.build(corpus, ids.clone()).await.unwrap();

    let stored: HashMap<_, _> = index.patterns_for_sentences(&ids).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.values().all(|map| map.len() == 3));
    index.close().await.unwrap();
}
