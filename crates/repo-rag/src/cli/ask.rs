use std::io::Write;
use std::sync::Arc;

use repo_rag::Result;
use repo_rag::adapters::GitHubFetcher;
use repo_rag::config::Config;
use repo_rag::domain::{ProviderKind, SourceType};
use repo_rag::ports::ProviderSelection;
use repo_rag::services::{PipelineSettings, ProviderRegistry, RagAnswer, RagPipeline, RagRequest};

pub struct AskOptions {
    pub query: String,
    pub repo: String,
    pub source_type: SourceType,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub secondary_api_key: Option<String>,
    pub top_k: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub show_sources: bool,
}

pub async fn run(opts: AskOptions, json: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(top_k) = opts.top_k {
        config.retrieval.top_k = top_k;
    }
    if let Some(size) = opts.chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = opts.chunk_overlap {
        config.chunking.overlap = overlap;
    }

    let provider = opts
        .provider
        .or_else(|| config.provider.default.clone())
        .unwrap_or_else(|| ProviderKind::OpenAi.id().to_string());
    let mut selection = ProviderSelection::new(
        provider,
        opts.api_key
            .or_else(|| config.provider.api_key.clone())
            .unwrap_or_default(),
    );
    if let Some(key) = opts
        .secondary_api_key
        .or_else(|| config.provider.secondary_api_key.clone())
    {
        selection = selection.with_secondary_api_key(key);
    }

    let token = config.github_token.clone().or_else(Config::detect_github_token);
    let pipeline = RagPipeline::new(
        Arc::new(ProviderRegistry::from_config(&config)),
        Arc::new(GitHubFetcher::new(config.fetch.clone(), token)?),
        PipelineSettings::from(&config),
    );
    let request = RagRequest {
        selection,
        repo_url: opts.repo,
        source_type: opts.source_type,
        query: opts.query,
    };

    let mut stdout = (!json).then(std::io::stdout);
    let outcome = pipeline
        .run_with(&request, move |fragment| {
            let Some(out) = stdout.as_mut() else {
                return;
            };
            if let Err(err) = write_fragment(out, fragment) {
                tracing::debug!(%err, "stdout closed; discarding the rest of the answer");
                stdout = None;
            }
        })
        .await;

    let answer = match outcome {
        Ok(answer) => answer,
        Err(failure) => {
            if let Some(stage) = failure.failed_at() {
                eprintln!("repo-rag: stopped while {stage}");
            }
            return Err(failure.error);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!();
        if opts.show_sources {
            print_sources(&answer);
        }
    }
    Ok(())
}

fn write_fragment(out: &mut impl Write, fragment: &str) -> std::io::Result<()> {
    out.write_all(fragment.as_bytes())?;
    out.flush()
}

fn print_sources(answer: &RagAnswer) {
    println!();
    println!(
        "Sources ({} of {} chunks from {} files):",
        answer.matches.len(),
        answer.chunks,
        answer.documents
    );
    for (i, m) in answer.matches.iter().enumerate() {
        println!("  [{}] {} (score {:.3})", i + 1, m.chunk.source(), m.score);
    }
}
