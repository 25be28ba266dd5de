use serde::Serialize;

use repo_rag::Result;
use repo_rag::domain::{DEFAULT_EMBEDDING_MODEL, EmbeddingSupport, GenerationMode, ProviderKind};

#[derive(Serialize)]
struct ProviderRow {
    id: &'static str,
    name: &'static str,
    chat_model: &'static str,
    embedding_model: &'static str,
    requires_secondary_key: bool,
    mode: GenerationMode,
}

pub fn run(json: bool) -> Result<()> {
    let rows: Vec<ProviderRow> = ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let spec = kind.spec();
            ProviderRow {
                id: kind.id(),
                name: kind.display_name(),
                chat_model: spec.chat_model,
                embedding_model: match spec.embeddings {
                    EmbeddingSupport::Native { model } => model,
                    EmbeddingSupport::Secondary => DEFAULT_EMBEDDING_MODEL,
                },
                requires_secondary_key: spec.requires_secondary_key(),
                mode: spec.mode,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<12} {:<50} {:<24} SECONDARY KEY", "PROVIDER", "CHAT MODEL", "EMBEDDINGS");
    for row in &rows {
        let streaming = if row.mode == GenerationMode::Streaming {
            " (streaming)"
        } else {
            ""
        };
        println!(
            "{:<12} {:<50} {:<24} {}",
            row.id,
            format!("{}{streaming}", row.chat_model),
            row.embedding_model,
            if row.requires_secondary_key { "yes" } else { "no" }
        );
    }
    Ok(())
}
