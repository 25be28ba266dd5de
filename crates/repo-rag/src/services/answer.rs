use std::sync::Arc;

use futures_util::StreamExt;

use crate::domain::ScoredChunk;
use crate::error::{RepoRagError, Result};
use crate::ports::ChatModel;

/// Renders retrieved chunks as `Source {n}: {source}` blocks separated by a blank line.
pub fn render_context(matches: &[ScoredChunk]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| format!("Source {}: {}\n{}", i + 1, m.chunk.source(), m.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an expert assistant answering questions related to the repository data pulled from a GitHub repository.
Use the following context to answer the query:

Context:
{context}

Query:
{query}

Provide a detailed, accurate response based on the context provided.
If you're unsure about something, please say so.

Answer:
"
    )
}

pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    pub async fn answer(&self, context: &str, query: &str) -> Result<String> {
        self.answer_with(context, query, |_| {}).await
    }

    /// Drains the model's fragment stream into one answer, handing each fragment
    /// to `on_fragment` as it arrives. A failure mid-stream discards the partial text.
    pub async fn answer_with<F>(&self, context: &str, query: &str, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let prompt = build_prompt(context, query);
        let mut stream = self.chat.stream(&prompt).await.map_err(into_generation)?;

        let mut answer = String::new();
        let mut fragments = 0usize;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.map_err(into_generation)?;
            on_fragment(&fragment);
            answer.push_str(&fragment);
            fragments += 1;
        }

        tracing::debug!(
            model = %self.chat.settings().model,
            fragments,
            chars = answer.len(),
            "answer assembled"
        );
        Ok(answer)
    }
}

fn into_generation(err: RepoRagError) -> RepoRagError {
    match err {
        RepoRagError::Generation(_) | RepoRagError::Configuration(_) => err,
        other => RepoRagError::generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chunk, ChunkPosition, Document, GenerationMode, GenerationSettings};
    use crate::ports::TokenStream;
    use async_trait::async_trait;
    use futures_util::stream;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct EchoModel {
        settings: GenerationSettings,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                settings: GenerationSettings {
                    model: "echo".to_string(),
                    temperature: Some(0.0),
                    max_tokens: None,
                },
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        fn settings(&self) -> &GenerationSettings {
            &self.settings
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("the answer".to_string())
        }
    }

    /// Streams fixed fragments, optionally failing after them.
    struct FragmentModel {
        settings: GenerationSettings,
        fragments: Vec<&'static str>,
        fail_at_end: bool,
    }

    #[async_trait]
    impl ChatModel for FragmentModel {
        fn settings(&self) -> &GenerationSettings {
            &self.settings
        }

        fn mode(&self) -> GenerationMode {
            GenerationMode::Streaming
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.fragments.concat())
        }

        async fn stream(&self, _prompt: &str) -> Result<TokenStream> {
            let mut items: Vec<Result<String>> =
                self.fragments.iter().map(|f| Ok((*f).to_string())).collect();
            if self.fail_at_end {
                items.push(Err(RepoRagError::generation("connection reset")));
            }
            Ok(stream::iter(items).boxed())
        }
    }

    fn fragment_model(fragments: Vec<&'static str>, fail_at_end: bool) -> Arc<FragmentModel> {
        Arc::new(FragmentModel {
            settings: GenerationSettings {
                model: "fragments".to_string(),
                temperature: None,
                max_tokens: Some(250),
            },
            fragments,
            fail_at_end,
        })
    }

    fn scored(source: &str, content: &str) -> ScoredChunk {
        let doc = Document::new(source, content);
        ScoredChunk {
            chunk: Chunk::new(
                doc.id.clone(),
                content.to_string(),
                ChunkPosition::default(),
                doc.metadata,
            ),
            score: 0.5,
        }
    }

    #[test]
    fn context_labels_sources_and_separates_with_blank_lines() {
        let context = render_context(&[
            scored("src/main.rs", "fn main() {}"),
            scored("README.md", "# Title"),
        ]);
        assert_eq!(
            context,
            "Source 1: src/main.rs\nfn main() {}\n\nSource 2: README.md\n# Title"
        );
        assert_eq!(render_context(&[]), "");
    }

    #[test]
    fn prompt_embeds_context_and_query_verbatim() {
        let prompt = build_prompt("CTX {query} body", "How does {context} work?");
        assert!(prompt.contains("Context:\nCTX {query} body\n\nQuery:\nHow does {context} work?\n"));
        assert!(prompt.starts_with("You are an expert assistant"));
        assert!(prompt.ends_with("Answer:\n"));
    }

    #[tokio::test]
    async fn single_shot_answer_is_returned_unmodified() {
        let model = EchoModel::new();
        let generator = AnswerGenerator::new(model.clone());

        let answer = generator.answer("ctx", "q?").await.unwrap();
        assert_eq!(answer, "the answer");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_prompt("ctx", "q?"));
    }

    #[tokio::test]
    async fn streamed_fragments_are_concatenated_and_observed() {
        let generator = AnswerGenerator::new(fragment_model(vec!["Hel", "lo ", "world"], false));
        let mut seen = Vec::new();

        let answer = generator
            .answer_with("ctx", "q", |f| seen.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(answer, "Hello world");
        assert_eq!(seen, ["Hel", "lo ", "world"]);
    }

    #[tokio::test]
    async fn stream_interruption_is_a_generation_error() {
        let generator = AnswerGenerator::new(fragment_model(vec!["partial"], true));
        let err = generator.answer("ctx", "q").await.unwrap_err();
        assert!(matches!(err, RepoRagError::Generation(_)));
    }
}
