//! # Ragify CLI (`ragify`)
//!
//! Command-line front end for the resilient retrieval client. It drives
//! authentication, corpus and document management, and search against a
//! RAG backend, degrading to locally persisted state when the service is
//! unreachable.
//!
//! ## Usage
//!
//! ```bash
//! ragify --config ./config/ragify.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragify login <email> <password>` | Authenticate and persist the session |
//! | `ragify register <username> <email> <password>` | Create an account |
//! | `ragify logout` | Clear the persisted session |
//! | `ragify whoami` | Show the authenticated identity |
//! | `ragify corpus list` | List corpora visible to the current user |
//! | `ragify corpus create <name>` | Create a corpus |
//! | `ragify docs list <corpus-key>` | List the documents of a corpus |
//! | `ragify docs upload <corpus-key> --file <path>` | Upload a file |
//! | `ragify docs upload <corpus-key> --url <url>` | Ingest a URL |
//! | `ragify docs delete <corpus-key> <document-id>` | Delete a document |
//! | `ragify search "<query>" --corpus <key>` | Query a corpus |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragify_client::config;
use ragify_client::corpus::CorpusResolver;
use ragify_client::document::DocumentResolver;
use ragify_client::export::{self, ExportFormat};
use ragify_client::rank::{rank_chunks, ChunkPager, RelevanceTier};
use ragify_client::search::SearchClient;
use ragify_client::session::SessionStore;
use ragify_client::shadow::ShadowStore;
use ragify_client::storage::Storage;
use ragify_client::transport::HttpTransport;
use ragify_client::upload::{UploadPipeline, UploadSource};

/// Ragify — a resilient client for RAG-style corpus, document, and
/// search services.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file carrying the API endpoint, API key, and storage root.
#[derive(Parser)]
#[command(
    name = "ragify",
    about = "Resilient client for RAG-style corpus, document, and search services",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragify.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the service and persist the session.
    Login { email: String, password: String },

    /// Create an account and persist the session.
    Register {
        username: String,
        email: String,
        password: String,
    },

    /// Clear the persisted session. Safe to run when logged out.
    Logout,

    /// Show the currently authenticated identity.
    Whoami,

    /// Manage corpora.
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Manage documents inside a corpus.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Query a corpus and print the answer with its supporting evidence.
    Search {
        /// The natural-language question.
        query: String,

        /// Corpus key to search in.
        #[arg(long)]
        corpus: String,

        /// Maximum number of ranked chunks the backend may return.
        #[arg(long)]
        top_k: Option<u32>,

        /// Minimum similarity hint passed to the backend, in [0, 1].
        #[arg(long)]
        threshold: Option<f64>,

        /// Show every ranked chunk instead of the first page.
        #[arg(long)]
        all_chunks: bool,

        /// Export the answer and sources: text, pdf, docx, csv, or json.
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Output path for --export. Defaults to ragify-results.<ext>.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// List corpora visible to the current user, with document counts.
    List {
        /// Override the owner filter; defaults to the session user.
        #[arg(long)]
        owner: Option<String>,
    },

    /// Create a corpus. The key is derived from the name.
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List the documents of a corpus.
    List { corpus_key: String },

    /// Upload a file or ingest a URL into a corpus.
    Upload {
        corpus_key: String,

        /// Path to a local file to upload.
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// URL to ingest instead of a file.
        #[arg(long)]
        url: Option<String>,
    },

    /// Delete a document and its evidence chunks.
    Delete {
        corpus_key: String,
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let transport = HttpTransport::new(&cfg.api)?;
    let storage = Storage::open(&cfg.storage.root)?;
    let shadow = ShadowStore::open(storage.clone());
    let mut session = SessionStore::open(&transport, storage, cfg.api.is_secure());

    match cli.command {
        Commands::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.username, user.email);
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let user = session.register(&username, &email, &password).await?;
            println!("Registered {} <{}>", user.username, user.email);
        }
        Commands::Logout => {
            session.logout();
            println!("Logged out.");
        }
        Commands::Whoami => match session.user() {
            Some(user) => println!("{} <{}> (id: {})", user.username, user.email, user.user_id),
            None => println!("Not logged in."),
        },
        Commands::Corpus { action } => match action {
            CorpusAction::List { owner } => {
                let resolver = CorpusResolver::new(&transport, &shadow);
                let owner = owner.as_deref().or_else(|| session.user_id());
                let corpora = resolver.list_corpora(owner).await;
                if corpora.is_empty() {
                    println!("No corpora.");
                } else {
                    println!("{:<24} {:<28} {:>6}  CREATED", "KEY", "NAME", "DOCS");
                    for corpus in corpora {
                        println!(
                            "{:<24} {:<28} {:>6}  {}",
                            corpus.key,
                            corpus.name,
                            corpus.document_count,
                            corpus.created_at.format("%Y-%m-%d")
                        );
                    }
                }
            }
            CorpusAction::Create { name, description } => {
                let resolver = CorpusResolver::new(&transport, &shadow);
                let corpus = resolver
                    .create_corpus(&name, session.user_id(), description.as_deref())
                    .await;
                println!("Created corpus '{}' (key: {})", corpus.name, corpus.key);
            }
        },
        Commands::Docs { action } => match action {
            DocsAction::List { corpus_key } => {
                let resolver = DocumentResolver::new(&transport);
                let documents = resolver.list_documents(&corpus_key).await;
                if documents.is_empty() {
                    println!("No documents in corpus '{}'.", corpus_key);
                } else {
                    println!("{:<28} {:<32} {:<8} {:>10}", "ID", "NAME", "TYPE", "SIZE");
                    for doc in documents {
                        println!(
                            "{:<28} {:<32} {:<8} {:>10}",
                            doc.id, doc.file_name, doc.file_type, doc.size
                        );
                    }
                }
            }
            DocsAction::Upload {
                corpus_key,
                file,
                url,
            } => {
                let source = match (file, url) {
                    (Some(path), None) => UploadSource::from_path(&path)?,
                    (None, Some(url)) => UploadSource::Url(url),
                    _ => anyhow::bail!("Provide exactly one of --file or --url."),
                };
                let pipeline = UploadPipeline::new(&transport);
                let document = pipeline
                    .upload_document(&corpus_key, source, session.user_id())
                    .await?;
                println!(
                    "Uploaded '{}' ({}) as {}",
                    document.file_name, document.file_type, document.id
                );
            }
            DocsAction::Delete {
                corpus_key,
                document_id,
            } => {
                let resolver = DocumentResolver::new(&transport);
                resolver.delete_document(&document_id, &corpus_key).await?;
                println!("Deleted document {}.", document_id);
            }
        },
        Commands::Search {
            query,
            corpus,
            top_k,
            threshold,
            all_chunks,
            export,
            output,
        } => {
            let client = SearchClient::new(&transport, &cfg.retrieval);
            let response = client
                .search(
                    &corpus,
                    &query,
                    top_k.unwrap_or(cfg.retrieval.top_k),
                    threshold.unwrap_or(cfg.retrieval.threshold),
                )
                .await?;

            println!("{}", response.answer);
            println!();
            println!("Sources:");
            for source in &response.source_documents {
                println!("  - {}", source);
            }

            if let Some(chunks) = &response.chunks {
                let ranked = rank_chunks(chunks);
                let mut pager = ChunkPager::new();
                if all_chunks {
                    while pager.has_more(&ranked) {
                        pager.show_more();
                    }
                }
                if !ranked.is_empty() {
                    println!();
                    println!("Evidence ({} chunks):", ranked.len());
                    for chunk in pager.visible(&ranked) {
                        let tier = RelevanceTier::of(chunk.similarity());
                        println!(
                            "  [{:.2} {}] {}",
                            chunk.similarity(),
                            tier.label(),
                            chunk.text().replace('\n', " ")
                        );
                    }
                    if pager.has_more(&ranked) {
                        println!("  ... rerun with --all-chunks to see the rest");
                    }
                }
            }

            if let Some(export_format) = export {
                let content = format!(
                    "{}\n\nSources:\n{}",
                    response.answer,
                    response.source_documents.join("\n")
                );
                let bytes = export::render(export_format, &content);
                let path = output.unwrap_or_else(|| {
                    PathBuf::from(format!("ragify-results.{}", export_format.extension()))
                });
                std::fs::write(&path, bytes)?;
                println!();
                println!("Exported results to {}", path.display());
            }
        }
    }

    Ok(())
}
