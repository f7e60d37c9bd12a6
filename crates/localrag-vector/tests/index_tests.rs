use localrag_core::error::Error;
use localrag_core::traits::{EmbeddingProvider, VectorIndex};
use localrag_core::types::Chunk;
use localrag_embed::HashEmbedder;
use localrag_vector::{IndexHandle, IndexWriter};
use tempfile::TempDir;

fn chunk(source: &str, idx: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{source}#{idx}"),
        text: text.to_string(),
        source: source.to_string(),
        offset: 0,
        chunk_index: idx,
    }
}

fn sky_and_grass() -> Vec<Chunk> {
    vec![chunk("a.txt", 0, "The sky is blue."), chunk("b.txt", 0, "Grass is green.")]
}

#[tokio::test]
async fn nearest_chunk_wins() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embedder = HashEmbedder::default();
    let handle = IndexWriter::new(tmp.path().join("hashed")).build(&sky_and_grass(), &embedder).await?;

    let q = embedder.embed_query("What color is the sky?").await?;
    let hits = handle.query(&q, 1).await?;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source, "a.txt");
    assert_eq!(hits[0].chunk.text, "The sky is blue.");

    let both = handle.query(&q, 5).await?;
    assert_eq!(both.len(), 2, "never more results than rows");
    assert!(both[0].score >= both[1].score);
    Ok(())
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embedder = HashEmbedder::default();
    let chunks = vec![
        chunk("z.txt", 0, "river stone"),
        chunk("m.txt", 0, "unrelated words entirely"),
        chunk("a.txt", 0, "river stone"),
        chunk("k.txt", 0, "river stone"),
    ];
    let handle = IndexWriter::new(tmp.path().join("c")).build(&chunks, &embedder).await?;

    let q = embedder.embed_query("river stone").await?;
    let hits = handle.query(&q, 3).await?;
    let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["z.txt#0", "a.txt#0", "k.txt#0"]);
    Ok(())
}

#[tokio::test]
async fn results_are_bounded_and_descending() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embedder = HashEmbedder::default();
    let words = ["apple", "banana", "cherry", "delta", "echo", "fox", "golf", "hotel"];
    let chunks: Vec<Chunk> = (0..40)
        .map(|i| chunk("gen.txt", i, &format!("{} {} {}", words[i % 8], words[(i / 8) % 8], words[(i * 3) % 8])))
        .collect();
    let handle = IndexWriter::new(tmp.path().join("c")).with_batch_size(7).build(&chunks, &embedder).await?;
    assert_eq!(handle.manifest().chunk_count, 40);

    let q = embedder.embed_query("apple cherry").await?;
    for k in [1, 3, 10] {
        let hits = handle.query(&q, k).await?;
        assert!(hits.len() <= k);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }
    Ok(())
}

#[tokio::test]
async fn k_zero_and_wrong_dimension_are_rejected() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embedder = HashEmbedder::default();
    let handle = IndexWriter::new(tmp.path().join("c")).build(&sky_and_grass(), &embedder).await?;

    let q = embedder.embed_query("sky").await?;
    let err = handle.query(&q, 0).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidConfig(_))), "got {err}");

    let err = handle.query(&[0.5, 0.5], 1).await.unwrap_err();
    assert!(
        matches!(err.downcast_ref::<Error>(), Some(Error::DimensionMismatch { expected: 384, found: 2 })),
        "got {err}"
    );
    Ok(())
}

#[tokio::test]
async fn switching_embedder_is_rejected() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    IndexWriter::new(&dir).build(&sky_and_grass(), &HashEmbedder::default()).await?;

    let other = HashEmbedder::new(128);
    let err = IndexHandle::open(&dir, other.embedder_id()).await.err().expect("mismatch");
    match err.downcast_ref::<Error>() {
        Some(Error::BackendMismatch { expected, found }) => {
            assert_eq!(expected, "hashed:d128");
            assert_eq!(found, "hashed:d384");
        }
        other => panic!("expected BackendMismatch, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_collection_is_not_found() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let err = IndexHandle::open(&tmp.path().join("nothing"), "hashed:d384").await.err().expect("not found");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))), "got {err}");
    Ok(())
}

#[tokio::test]
async fn empty_build_writes_nothing() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    let err = IndexWriter::new(&dir).build(&[], &HashEmbedder::default()).await.err().expect("empty");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyIndex)), "got {err}");
    assert!(!dir.exists());
    Ok(())
}

#[tokio::test]
async fn rebuild_replaces_previous_contents() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    let embedder = HashEmbedder::default();
    IndexWriter::new(&dir).build(&sky_and_grass(), &embedder).await?;
    let handle = IndexWriter::new(&dir).build(&[chunk("c.txt", 0, "Snow is white.")], &embedder).await?;

    assert_eq!(handle.manifest().chunk_count, 1);
    let reopened = IndexHandle::open(&dir, embedder.embedder_id()).await?;
    let hits = reopened.query(&embedder.embed_query("sky").await?, 5).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source, "c.txt");
    assert!(!tmp.path().join("c.staging").exists());
    assert!(!tmp.path().join("c.previous").exists());
    Ok(())
}

#[tokio::test]
async fn manifest_and_trait_object_round_trip() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    let embedder = HashEmbedder::default();
    let chunks = vec![Chunk { offset: 17, ..chunk("notes/d.md", 2, "offsets survive storage") }];
    IndexWriter::new(&dir).build(&chunks, &embedder).await?;

    let handle = IndexHandle::open(&dir, "hashed:d384").await?;
    assert_eq!(handle.manifest().dim, 384);
    assert!(!handle.manifest().built_at.is_empty());

    let index: &dyn VectorIndex = &handle;
    let hits = index.query(&embedder.embed_query("offsets").await?, 1).await?;
    assert_eq!(hits[0].chunk, chunks[0]);
    Ok(())
}

fn generated(n: usize) -> Vec<Chunk> {
    let words = ["apple", "banana", "cherry", "delta", "echo", "fox", "golf", "hotel", "india", "juliet", "kilo"];
    (0..n)
        .map(|i| {
            let text = format!("{} {} {} item{i}", words[i % 11], words[(i / 11) % 11], words[(i * 7) % 11]);
            chunk("gen.txt", i, &text)
        })
        .collect()
}

#[tokio::test]
async fn large_collections_are_served_through_the_ann_index() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    let embedder = HashEmbedder::default();
    let handle = IndexWriter::new(&dir)
        .with_ann_index_min_rows(256)
        .build(&generated(300), &embedder)
        .await?;
    assert_eq!(handle.manifest().chunk_count, 300);

    let q = embedder.embed_query("apple banana cherry").await?;
    for k in [1, 5, 20] {
        let hits = handle.query(&q, k).await?;
        assert!(!hits.is_empty());
        assert!(hits.len() <= k);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }
    assert!(!tmp.path().join("c.staging").exists());
    Ok(())
}

#[tokio::test]
async fn untrainable_ann_threshold_keeps_the_previous_collection() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("c");
    let embedder = HashEmbedder::default();
    IndexWriter::new(&dir).build(&sky_and_grass(), &embedder).await?;

    let err = IndexWriter::new(&dir)
        .with_ann_index_min_rows(10)
        .build(&generated(20), &embedder)
        .await
        .err()
        .expect("threshold below PQ training size");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidConfig(_))), "got {err}");

    let reopened = IndexHandle::open(&dir, embedder.embedder_id()).await?;
    assert_eq!(reopened.manifest().chunk_count, 2);
    let hits = reopened.query(&embedder.embed_query("What color is the sky?").await?, 1).await?;
    assert_eq!(hits[0].chunk.source, "a.txt");
    assert!(!tmp.path().join("c.staging").exists());
    Ok(())
}
