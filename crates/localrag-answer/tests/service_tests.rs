use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use localrag_answer::{build_from_settings, ChatError, RagService};
use localrag_core::config::Settings;
use localrag_core::error::Error;
use localrag_core::traits::{EmbeddingProvider, LlmProvider, VectorIndex};
use localrag_core::types::{ChatQuery, Chunk, Health, ScoredChunk};
use localrag_embed::HashEmbedder;
use localrag_vector::IndexHandle;
use tempfile::TempDir;

/// Records prompts and replies with a fixed, padded answer.
#[derive(Default)]
struct StubLlm {
    prompts: Mutex<Vec<String>>,
    fail: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            anyhow::bail!("model exploded: secret detail");
        }
        Ok("  The sky is blue.\n".to_string())
    }
}

/// Returns the first `k` chunks in order, one distinct source each.
struct MemoryIndex {
    chunks: Vec<Chunk>,
    seen_k: Mutex<Vec<usize>>,
}

impl MemoryIndex {
    fn with_sources(sources: &[&str]) -> Self {
        let chunks = sources
            .iter()
            .enumerate()
            .map(|(i, s)| Chunk {
                id: format!("{s}#{i}"),
                text: format!("text {i}"),
                source: s.to_string(),
                offset: 0,
                chunk_index: i,
            })
            .collect();
        Self { chunks, seen_k: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(&self, _query_vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredChunk>> {
        self.seen_k.lock().unwrap().push(k);
        Ok(self
            .chunks
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, c)| ScoredChunk { chunk: c.clone(), score: 1.0 - i as f32 * 0.01 })
            .collect())
    }
}

fn service(llm: Arc<StubLlm>, index: Arc<MemoryIndex>, default_k: usize) -> RagService {
    RagService::new(Arc::new(HashEmbedder::default()), llm, index, default_k, Duration::from_secs(5))
}

#[tokio::test]
async fn non_positive_k_uses_the_default() -> anyhow::Result<()> {
    let index = Arc::new(MemoryIndex::with_sources(&["a", "b", "c", "d", "e", "f", "g"]));
    let svc = service(Arc::new(StubLlm::default()), index.clone(), 5);

    for k in [None, Some(0), Some(-3)] {
        let q = ChatQuery { query: "anything".into(), k };
        assert_eq!(svc.answer(&q).await?.sources.len(), 5);
    }
    assert_eq!(svc.answer(&ChatQuery::new("x").with_k(2)).await?.sources, vec!["a", "b"]);
    assert_eq!(*index.seen_k.lock().unwrap(), vec![5, 5, 5, 2]);
    Ok(())
}

#[tokio::test]
async fn answer_is_trimmed_and_sources_deduplicated() -> anyhow::Result<()> {
    let llm = Arc::new(StubLlm::default());
    let index = Arc::new(MemoryIndex::with_sources(&["b.md", "a.txt", "b.md", "c.csv"]));
    let svc = service(llm.clone(), index, 4);

    let answer = svc.answer(&ChatQuery::new("What color is the sky?")).await?;

    assert_eq!(answer.answer, "The sky is blue.");
    assert_eq!(answer.sources, vec!["b.md", "a.txt", "c.csv"]);
    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("text 0\n\ntext 1"));
    assert!(prompts[0].contains("Question: What color is the sky?"));
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_k() -> anyhow::Result<()> {
    let sources: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
    let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
    let svc = Arc::new(service(Arc::new(StubLlm::default()), Arc::new(MemoryIndex::with_sources(&refs)), 5));

    let mut tasks = Vec::new();
    for k in [1i64, 7, 3, 12, 1, 7, 20, 2] {
        let svc = svc.clone();
        tasks.push(tokio::spawn(async move { (k, svc.answer(&ChatQuery::new("q").with_k(k)).await) }));
    }
    for task in tasks {
        let (k, result) = task.await?;
        assert_eq!(result?.sources.len(), k as usize);
    }
    Ok(())
}

#[tokio::test]
async fn failures_surface_only_as_internal_error() {
    let llm = Arc::new(StubLlm { fail: true, ..StubLlm::default() });
    let svc = service(llm, Arc::new(MemoryIndex::with_sources(&["a"])), 3);

    let err = svc.chat(&ChatQuery::new("hi")).await.unwrap_err();
    assert_eq!(err, ChatError::Internal);
    assert_eq!(err.to_string(), "Internal error");
}

#[tokio::test]
async fn slow_answers_time_out() {
    let llm = Arc::new(StubLlm { delay: Some(Duration::from_millis(500)), ..StubLlm::default() });
    let svc = RagService::new(
        Arc::new(HashEmbedder::default()),
        llm,
        Arc::new(MemoryIndex::with_sources(&["a"])),
        1,
        Duration::from_millis(20),
    );
    let err = svc.answer(&ChatQuery::new("hi")).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Timeout(_))), "got {err}");
}

#[tokio::test]
async fn health_is_ok() {
    let svc = service(Arc::new(StubLlm::default()), Arc::new(MemoryIndex::with_sources(&[])), 5);
    assert_eq!(svc.health(), Health::ok());
    assert_eq!(svc.default_k(), 5);
}

fn settings_for(tmp: &TempDir) -> Settings {
    Settings::from_toml_str(&format!(
        "use_fake_embeddings = true\ndata_dir = \"{}\"\nindex_dir = \"{}\"\nk_neighbors = 4",
        tmp.path().join("data").display(),
        tmp.path().join("index").display()
    ))
    .expect("settings")
}

#[tokio::test]
async fn build_then_ask_returns_the_matching_source() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let settings = settings_for(&tmp);
    fs::create_dir_all(settings.data_path())?;
    fs::write(settings.data_path().join("a.txt"), "The sky is blue.")?;
    fs::write(settings.data_path().join("b.txt"), "Grass is green.")?;

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::default());
    let report = build_from_settings(&settings, embedder.as_ref()).await?;
    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks, 2);
    assert_eq!(report.index_dir.as_deref(), Some(settings.active_index_dir().as_path()));

    let index = IndexHandle::open(&settings.active_index_dir(), embedder.embedder_id()).await?;
    let llm = Arc::new(StubLlm::default());
    let svc = RagService::new(embedder, llm.clone(), Arc::new(index), settings.k_neighbors, settings.request_timeout());

    let answer = svc.chat(&ChatQuery::new("What color is the sky?").with_k(1)).await.expect("chat");
    assert_eq!(answer.sources, vec!["a.txt"]);
    assert_eq!(answer.answer, "The sky is blue.");
    assert!(!llm.prompts.lock().unwrap()[0].contains("Grass"));
    Ok(())
}

#[tokio::test]
async fn empty_data_dir_builds_nothing() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let settings = settings_for(&tmp);
    fs::create_dir_all(settings.data_path())?;

    let report = build_from_settings(&settings, &HashEmbedder::default()).await?;

    assert_eq!(report, localrag_answer::BuildReport { documents: 0, chunks: 0, index_dir: None });
    assert!(!tmp.path().join("index").exists());
    Ok(())
}
