use std::sync::Arc;

use crate::domain::{Chunk, ScoredChunk};
use crate::error::{RepoRagError, Result};
use crate::ports::EmbeddingGenerator;

pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// In-memory vector store scoped to a single pipeline run.
///
/// Every vector, stored or query, comes from the one embedder the index was
/// built with, and all of them must share the dimension of the first.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingGenerator>,
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
            dimension: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Embeds and stores `chunks`. Either every chunk is stored or none is.
    pub async fn add(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(RepoRagError::embedding(format!(
                    "{} returned {} embeddings for {} inputs",
                    self.embedder.model_name(),
                    embedded.len(),
                    texts.len()
                )));
            }
            tracing::debug!(batch = batch_no, size = texts.len(), "embedded batch");
            vectors.extend(embedded);
        }

        let mut dimension = self.dimension;
        for vector in &vectors {
            check_dimension(&mut dimension, vector)?;
        }

        self.dimension = dimension;
        self.entries.extend(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry { chunk, vector }),
        );
        Ok(())
    }

    /// Returns up to `k` chunks, most similar first. Equal scores keep insertion order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut dimension = self.dimension;
        check_dimension(&mut dimension, &query_vector)?;

        Ok(self.search_by_vector(&query_vector, k))
    }

    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(query, &entry.vector)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                chunk: self.entries[idx].chunk.clone(),
                score,
            })
            .collect()
    }
}

fn check_dimension(expected: &mut Option<usize>, vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(RepoRagError::embedding("embedding vector is empty"));
    }
    match *expected {
        Some(dim) if dim != vector.len() => Err(RepoRagError::embedding(format!(
            "embedding dimension mismatch: expected {dim}, got {}",
            vector.len()
        ))),
        Some(_) => Ok(()),
        None => {
            *expected = Some(vector.len());
            Ok(())
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() { 0.0 } else { similarity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;
    use crate::services::Chunker;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Embeds by table lookup; unknown text fails.
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        batch_calls: Mutex<Vec<usize>>,
    }

    impl TableEmbedder {
        fn new(pairs: &[(&str, Vec<f32>)]) -> Arc<Self> {
            Arc::new(Self {
                vectors: pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
                batch_calls: Mutex::new(Vec::new()),
            })
        }

        fn lookup(&self, text: &str) -> Result<Vec<f32>> {
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| RepoRagError::embedding(format!("no vector for {text:?}")))
        }
    }

    #[async_trait]
    impl EmbeddingGenerator for TableEmbedder {
        fn model_name(&self) -> &str {
            "table"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.lookup(text)
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.lock().unwrap().push(texts.len());
            texts.iter().map(|t| self.lookup(t)).collect()
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        let chunker = Chunker::new(100, 0).unwrap();
        texts
            .iter()
            .flat_map(|t| chunker.split_document(&Document::new(format!("{t}.md"), *t)))
            .collect()
    }

    fn contents(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.content.as_str()).collect()
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn identical_query_vector_ranks_first_with_score_one() {
        let embedder = TableEmbedder::new(&[
            ("alpha", vec![1.0, 0.0, 0.0]),
            ("beta", vec![0.0, 1.0, 0.0]),
            ("gamma", vec![0.6, 0.8, 0.0]),
            ("what is beta", vec![0.0, 1.0, 0.0]),
        ]);
        let mut index = VectorIndex::new(embedder);
        index.add(chunks(&["alpha", "beta", "gamma"])).await.unwrap();

        let results = index.search("what is beta", 3).await.unwrap();
        assert_eq!(contents(&results), ["beta", "gamma", "alpha"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn returns_at_most_k_and_at_most_len() {
        let embedder = TableEmbedder::new(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("q", vec![1.0, 1.0]),
        ]);
        let mut index = VectorIndex::new(embedder);
        index.add(chunks(&["a", "b"])).await.unwrap();

        assert_eq!(index.search("q", 1).await.unwrap().len(), 1);
        assert_eq!(index.search("q", 10).await.unwrap().len(), 2);
        assert!(index.search("q", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let embedder = TableEmbedder::new(&[
            ("first", vec![1.0, 0.0]),
            ("second", vec![2.0, 0.0]),
            ("third", vec![3.0, 0.0]),
            ("q", vec![5.0, 0.0]),
        ]);
        let mut index = VectorIndex::new(embedder);
        index
            .add(chunks(&["first", "second", "third"]))
            .await
            .unwrap();

        let results = index.search("q", 3).await.unwrap();
        assert_eq!(contents(&results), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn nan_vectors_rank_as_unrelated() {
        let embedder = TableEmbedder::new(&[
            ("broken", vec![f32::NAN, 0.0]),
            ("close", vec![1.0, 0.1]),
            ("opposite", vec![-1.0, 0.0]),
            ("q", vec![1.0, 0.0]),
        ]);
        let mut index = VectorIndex::new(embedder);
        index
            .add(chunks(&["broken", "close", "opposite"]))
            .await
            .unwrap();

        let results = index.search("q", 3).await.unwrap();
        assert_eq!(contents(&results), ["close", "broken", "opposite"]);
        assert!(results.iter().all(|r| r.score.is_finite()));
    }

    #[tokio::test]
    async fn failed_add_stores_nothing() {
        let embedder = TableEmbedder::new(&[("known", vec![1.0, 0.0])]);
        let mut index = VectorIndex::new(embedder).with_batch_size(1);

        let err = index.add(chunks(&["known", "unknown"])).await.unwrap_err();
        assert!(matches!(err, RepoRagError::Embedding(_)));
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[tokio::test]
    async fn embeds_in_batches() {
        let embedder = TableEmbedder::new(&[
            ("a", vec![1.0]),
            ("b", vec![1.0]),
            ("c", vec![1.0]),
            ("d", vec![1.0]),
            ("e", vec![1.0]),
        ]);
        let mut index = VectorIndex::new(embedder.clone()).with_batch_size(2);
        index.add(chunks(&["a", "b", "c", "d", "e"])).await.unwrap();

        assert_eq!(*embedder.batch_calls.lock().unwrap(), [2, 2, 1]);
        assert_eq!(index.len(), 5);
    }

    #[tokio::test]
    async fn rejects_mixed_dimensions() {
        let embedder = TableEmbedder::new(&[
            ("short", vec![1.0, 0.0]),
            ("long", vec![1.0, 0.0, 0.0]),
        ]);
        let mut index = VectorIndex::new(embedder);
        index.add(chunks(&["short"])).await.unwrap();

        assert!(matches!(
            index.add(chunks(&["long"])).await,
            Err(RepoRagError::Embedding(_))
        ));
        assert!(matches!(
            index.search("long", 1).await,
            Err(RepoRagError::Embedding(_))
        ));
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn search_only_returns_added_chunks() {
        let embedder = TableEmbedder::new(&[
            ("x", vec![0.3, 0.7]),
            ("y", vec![0.9, 0.1]),
            ("q", vec![0.5, 0.5]),
        ]);
        let added = chunks(&["x", "y"]);
        let mut index = VectorIndex::new(embedder);
        index.add(added.clone()).await.unwrap();

        for result in index.search("q", 5).await.unwrap() {
            assert!(added.contains(&result.chunk));
        }
    }
}
