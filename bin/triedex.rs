use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;
use triedex::segment::IndexWriter;
use triedex::{Document, IndexSettings, Searcher};

#[derive(Parser)]
#[command(name = "triedex")]
#[command(about = "Full-text search over an on-disk trie term dictionary", long_about = None)]
struct Args {
    /// Index directory
    #[arg(long, env = "TRIEDEX_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index JSON lines documents (`{"id": 1, "fields": {"title": "..."}}`) as one generation
    Index {
        /// Input file; reads stdin when omitted
        input: Option<PathBuf>,

        /// Index settings JSON, used only when the index is created
        #[arg(long, env = "TRIEDEX_SETTINGS")]
        settings: Option<PathBuf>,
    },
    /// Run a query and print the ranked hits as JSON
    Search {
        query: String,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(long, default_value = "10")]
        take: usize,
    },
    /// Summarize generations, or list the words of one field
    Inspect {
        #[arg(long)]
        field: Option<String>,

        /// Only list words starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!("triedex v{} on {:?}", triedex::VERSION, args.data_dir);

    match args.command {
        Command::Index { input, settings } => index(args.data_dir, input, settings),
        Command::Search { query, skip, take } => search(args.data_dir, &query, skip, take),
        Command::Inspect { field, prefix } => inspect(args.data_dir, field, &prefix),
    }
}

fn index(data_dir: PathBuf, input: Option<PathBuf>, settings: Option<PathBuf>) -> Result<()> {
    let settings = match settings {
        Some(path) => IndexSettings::from_json_file(&path)
            .with_context(|| format!("loading settings from {:?}", path))?,
        None => IndexSettings::default(),
    };

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("opening {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut writer = IndexWriter::open(&data_dir, settings)?;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid document", number + 1))?;
        writer
            .add_document(&document)
            .with_context(|| format!("line {}: document {}", number + 1, document.id))?;
    }

    let documents = writer.pending_documents();
    let generation = writer.commit()?;
    println!("committed {} documents as {}", documents, generation);
    Ok(())
}

fn search(data_dir: PathBuf, query: &str, skip: usize, take: usize) -> Result<()> {
    let searcher = Searcher::open(&data_dir)?;
    let response = searcher.search_str(query, skip, take)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &response)?;
    writeln!(out)?;
    Ok(())
}

fn inspect(data_dir: PathBuf, field: Option<String>, prefix: &str) -> Result<()> {
    let searcher = Searcher::open(&data_dir)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let field = match field {
        Some(field) => field,
        None => {
            let settings = searcher.settings();
            writeln!(
                out,
                "{} generations, {} documents (buckets: {}, prefix length: {})",
                searcher.generations().len(),
                searcher.total_docs(),
                settings.bucket_count,
                settings.bucket_prefix_len
            )?;
            for generation in searcher.generations() {
                let meta = generation.meta();
                writeln!(
                    out,
                    "  {}: {} documents, {} terms, fields [{}]",
                    meta.id,
                    meta.doc_count,
                    meta.term_count,
                    meta.fields.join(", ")
                )?;
            }
            return Ok(());
        }
    };

    for generation in searcher.generations() {
        let words = generation.starts_with(&field, prefix)?;
        writeln!(out, "{} ({} words)", generation.id(), words.len())?;
        for word in words {
            match word.address {
                Some(address) => writeln!(
                    out,
                    "  {} @{}+{}",
                    word.value, address.position, address.length
                )?,
                None => writeln!(out, "  {}", word.value)?,
            }
        }
    }
    Ok(())
}
