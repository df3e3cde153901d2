use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use newsdex_core::builder::IndexBuilder;
use newsdex_core::corpus::{corpus_files, open_corpus, CorpusReader};
use newsdex_core::persist::{create_fresh_root, save_document, save_index, IndexPaths};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "newsdex-indexer")]
#[command(about = "Build the inverted index for a tagged news corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file (plain or .gz) or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory; must not exist yet
        #[arg(long)]
        output: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => build_index(&input, &output),
    }
}

fn build_index(input: &str, output: &str) -> Result<()> {
    let input_path = Path::new(input);
    if !input_path.exists() {
        bail!("corpus path {input} does not exist");
    }
    let out_paths = IndexPaths::new(output);
    create_fresh_root(&out_paths)?;
    tracing::info!(output = %output, "created index directory");

    let files = corpus_files(input_path);
    if files.is_empty() {
        bail!("no corpus files under {input}");
    }

    let mut builder = IndexBuilder::new();
    for file in files {
        tracing::info!(file = %file.display(), "reading corpus");
        let reader = open_corpus(&file).with_context(|| format!("opening {}", file.display()))?;
        for doc in CorpusReader::new(reader) {
            // a skipped record would shift every later document id
            let doc = doc.with_context(|| format!("aborting build: bad record in {}", file.display()))?;
            let doc_id = builder.add_document(&doc)?;
            save_document(&out_paths, &doc, doc_id)?;
        }
    }

    let index = builder.finish();
    save_index(&out_paths, &index)?;
    tracing::info!(output = %output, num_docs = index.num_docs(), num_terms = index.num_terms(), "index build complete");
    Ok(())
}
