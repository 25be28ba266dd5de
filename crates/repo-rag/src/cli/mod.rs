use clap::{Parser, Subcommand};

use repo_rag::Result;
use repo_rag::domain::SourceType;

mod ask;
mod providers;

#[derive(Parser)]
#[command(name = "repo-rag")]
#[command(about = "Ask questions about a GitHub repository")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Answer a question from repository content")]
    Ask {
        #[arg(help = "Question to answer")]
        query: String,

        #[arg(long, help = "GitHub URL (repository, tree or blob)")]
        repo: String,

        #[arg(
            long,
            default_value = "repository",
            help = "What the URL points at: repository, directory, file"
        )]
        source_type: SourceType,

        #[arg(long, help = "Model provider (e.g. openai, groq, huggingface)")]
        provider: Option<String>,

        #[arg(long, help = "Provider API key [default: REPO_RAG_API_KEY]")]
        api_key: Option<String>,

        #[arg(
            long,
            help = "OpenAI key for embeddings when the provider has none [default: REPO_RAG_SECONDARY_API_KEY]"
        )]
        secondary_api_key: Option<String>,

        #[arg(long, help = "Number of chunks to retrieve")]
        top_k: Option<usize>,

        #[arg(long, help = "Chunk size in characters")]
        chunk_size: Option<usize>,

        #[arg(long, help = "Overlap between chunks in characters")]
        chunk_overlap: Option<usize>,

        #[arg(long, help = "Print the retrieved sources after the answer")]
        show_sources: bool,
    },

    #[command(about = "List supported providers")]
    Providers,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            query,
            repo,
            source_type,
            provider,
            api_key,
            secondary_api_key,
            top_k,
            chunk_size,
            chunk_overlap,
            show_sources,
        } => {
            ask::run(
                ask::AskOptions {
                    query,
                    repo,
                    source_type,
                    provider,
                    api_key,
                    secondary_api_key,
                    top_k,
                    chunk_size,
                    chunk_overlap,
                    show_sources,
                },
                cli.json,
            )
            .await
        }
        Commands::Providers => providers::run(cli.json),
    }
}
