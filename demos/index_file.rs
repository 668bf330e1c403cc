/// Index one text file and search it.
///
/// The file is re-indexed only when its modification time or size changed
/// since the last run. Set `RUST_LOG=lumendex=debug` to watch commits.
///
/// ```text
/// cargo run --example index_file -- data/sample.txt lucene
/// ```

use std::env;
use std::fs;
use std::path::Path;
use chrono::{DateTime, Utc};
use lumendex::schema::schema::{CONTENT_FIELD, PATH_FIELD};
use lumendex::{Config, Fingerprint, Index};
use tracing_subscriber::EnvFilter;

const PREVIEW_LEN: usize = 160;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: index_file <path-to-text-file> <query>");
        println!("Example: index_file data/sample.txt lucene");
        return Ok(());
    }
    let file_path = Path::new(&args[1]);
    let query_text = &args[2];

    if !file_path.is_file() {
        eprintln!("File not found: {}", file_path.display());
        return Ok(());
    }

    let index_path = env::current_dir()?.join("index");
    let index = Index::open(Config::new(&index_path))?;

    let key = file_path.to_string_lossy().into_owned();
    let fingerprint = fingerprint(file_path)?;

    if index.needs_reindex(&key, fingerprint)? {
        println!("Indexing file: {}", file_path.display());
        let content = fs::read_to_string(file_path)?;
        let info = index.upsert(&key, &content, Some(fingerprint))?;
        println!("Committed generation {} ({} segment(s))", info.generation, info.segments);
        print_diagnostics(&index, &index_path)?;
    } else {
        println!("Index is up to date for file; using existing index at: {}", index_path.display());
    }

    println!("Analyzer tokens for query:");
    for token in index.analyze(CONTENT_FIELD, query_text) {
        println!("  {}", token.text);
    }

    let query = index.parse_query(query_text, CONTENT_FIELD)?;
    println!("Parsed query: {}", query);

    let results = index.search(query_text, CONTENT_FIELD, index.config().default_top_k)?;
    println!("Total hits: {}", results.total_hits);
    for hit in &results.hits {
        let Some(doc) = &hit.document else { continue };
        println!("Hit: {} (score={})", doc.get_text(PATH_FIELD).unwrap_or_default(), hit.score);
        println!("  {}", preview(doc.get_text(CONTENT_FIELD).unwrap_or_default(), PREVIEW_LEN));
    }
    Ok(())
}

fn fingerprint(path: &Path) -> std::io::Result<Fingerprint> {
    let metadata = fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(Fingerprint::new(modified.timestamp_millis(), metadata.len()))
}

fn print_diagnostics(index: &Index, index_path: &Path) -> lumendex::Result<()> {
    println!("Index directory: {}", index_path.display());
    let files = index.list_files()?;
    println!("Index files ({}):", files.len());
    for file in &files {
        println!("  {} ({} bytes)", file.name, file.size_bytes);
    }

    let stats = index.stats()?;
    println!(
        "Generation {}: {} live docs, {:.1}% deleted",
        stats.generation,
        stats.total_documents,
        stats.deleted_ratio() * 100.0
    );
    for segment in index.list_segments()? {
        println!(
            "  segment {}: {} docs, {} deleted, {} bytes",
            segment.name, segment.doc_count, segment.deleted_docs, segment.size_bytes
        );
    }
    Ok(())
}

/// Collapse whitespace and cut to `max_len` chars
fn preview(content: &str, max_len: usize) -> String {
    let cleaned = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= max_len {
        return cleaned;
    }
    let cut: String = cleaned.chars().take(max_len).collect();
    format!("{}...", cut)
}
