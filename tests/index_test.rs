use std::fs;
use lumendex::schema::schema::{CONTENT_FIELD, PATH_FIELD};
use lumendex::writer::batch::BatchWriter;
use lumendex::{Config, Document, ErrorKind, Fingerprint, Index, SearchResults};
use tempfile::{tempdir, TempDir};

const ORPHAN_ID: &str = "00000000-0000-4000-8000-000000000000";

fn open() -> (TempDir, Index) {
    let dir = tempdir().unwrap();
    let index = Index::open(Config::new(dir.path())).unwrap();
    (dir, index)
}

fn paths(results: &SearchResults) -> Vec<String> {
    results.hits
        .iter()
        .map(|hit| {
            hit.document
                .as_ref()
                .and_then(|doc| doc.get_text(PATH_FIELD))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[test]
fn test_single_word_query_finds_document() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();

    let results = index.search("lucene", CONTENT_FIELD, 10).unwrap();
    assert_eq!(results.total_hits, 1);
    assert_eq!(paths(&results), vec!["a.txt"]);
    assert!(results.max_score > 0.0);
}

#[test]
fn test_fielded_boolean_query() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    index.upsert("b.txt", "Rust in Action", None).unwrap();

    let results = index.search("path:a.txt AND content:action", CONTENT_FIELD, 10).unwrap();
    assert_eq!(paths(&results), vec!["a.txt"]);

    let results = index.search("content:zzzzz", CONTENT_FIELD, 10).unwrap();
    assert_eq!(results.total_hits, 0);
    assert!(results.hits.is_empty());
}

#[test]
fn test_freshness_compares_both_components() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", Some(Fingerprint::new(100, 50))).unwrap();

    assert!(!index.needs_reindex("a.txt", Fingerprint::new(100, 50)).unwrap());
    assert!(index.needs_reindex("a.txt", Fingerprint::new(100, 51)).unwrap());
    assert!(index.needs_reindex("a.txt", Fingerprint::new(101, 50)).unwrap());
    assert!(index.needs_reindex("b.txt", Fingerprint::new(100, 50)).unwrap());
}

#[test]
fn test_document_without_fingerprint_needs_reindex() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    assert!(index.needs_reindex("a.txt", Fingerprint::new(100, 50)).unwrap());
}

#[test]
fn test_stored_fields_round_trip() {
    let (_dir, index) = open();
    let content = "Lucene in Action\nsecond line, with punctuation!";
    index.upsert("docs/a.txt", content, Some(Fingerprint::new(7, 42))).unwrap();

    let reader = index.reader().unwrap();
    let doc = reader.document_by_key("docs/a.txt").unwrap().unwrap();
    assert_eq!(doc.get_text(PATH_FIELD), Some("docs/a.txt"));
    assert_eq!(doc.get_text(CONTENT_FIELD), Some(content));
    assert!(reader.document_by_key("docs/b.txt").unwrap().is_none());
}

#[test]
fn test_upsert_is_idempotent() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    let first = index.search("lucene", CONTENT_FIELD, 10).unwrap();

    let info = index.upsert("a.txt", "Lucene in Action", None).unwrap();
    assert_eq!(info.removed, 1);
    let second = index.search("lucene", CONTENT_FIELD, 10).unwrap();

    assert_eq!(index.reader().unwrap().num_docs(), 1);
    assert_eq!(second.total_hits, 1);
    assert_eq!(paths(&first), paths(&second));
    assert_eq!(first.max_score, second.max_score);
}

#[test]
fn test_replaced_content_leaves_no_stale_postings() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    index.upsert("a.txt", "Rust programming", None).unwrap();

    assert_eq!(index.search("content:lucene", CONTENT_FIELD, 10).unwrap().total_hits, 0);
    assert_eq!(index.search("content:rust", CONTENT_FIELD, 10).unwrap().total_hits, 1);
    assert!(index.reader().unwrap().postings(CONTENT_FIELD, "lucene").is_empty());
}

#[test]
fn test_delete_removes_document() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    index.upsert("b.txt", "Rust in Action", None).unwrap();

    let info = index.delete("a.txt").unwrap();
    assert_eq!(info.removed, 1);
    assert_eq!(paths(&index.search("action", CONTENT_FIELD, 10).unwrap()), vec!["b.txt"]);
    assert!(index.reader().unwrap().document_by_key("a.txt").unwrap().is_none());

    // absent key
    let info = index.delete("missing.txt").unwrap();
    assert_eq!(info.removed, 0);
}

#[test]
fn test_case_variants_retrieve_term() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();

    for query in ["lucene", "LUCENE", "LuCeNe", "content:LUCENE", "ACTION"] {
        assert_eq!(index.search(query, CONTENT_FIELD, 10).unwrap().total_hits, 1, "{}", query);
    }
}

#[test]
fn test_ties_break_by_document_order() {
    let (_dir, index) = open();
    let mut writer = index.writer().unwrap();
    for path in ["c.txt", "a.txt", "b.txt"] {
        writer.upsert(
            Document::new().with_field(PATH_FIELD, path).with_field(CONTENT_FIELD, "same words"),
            None,
        ).unwrap();
    }
    writer.commit().unwrap();
    drop(writer);

    let first = index.search("same", CONTENT_FIELD, 10).unwrap();
    let second = index.search("same", CONTENT_FIELD, 10).unwrap();
    assert_eq!(paths(&first), vec!["a.txt", "b.txt", "c.txt"]);
    assert_eq!(paths(&first), paths(&second));
    assert!(first.hits.windows(2).all(|w| w[0].score == w[1].score && w[0].doc_id < w[1].doc_id));
}

#[test]
fn test_more_frequent_term_ranks_higher() {
    let (_dir, index) = open();
    index.upsert("a.txt", "lucene rust rust", None).unwrap();
    index.upsert("b.txt", "lucene lucene lucene rust", None).unwrap();
    index.upsert("c.txt", "unrelated text", None).unwrap();

    let results = index.search("content:lucene", CONTENT_FIELD, 10).unwrap();
    assert_eq!(paths(&results), vec!["b.txt", "a.txt"]);
}

#[test]
fn test_top_k_limits_hits_not_total() {
    let (_dir, index) = open();
    let mut writer = index.writer().unwrap();
    for i in 0..20 {
        writer.upsert(
            Document::new()
                .with_field(PATH_FIELD, format!("{}.txt", i))
                .with_field(CONTENT_FIELD, "lucene"),
            None,
        ).unwrap();
    }
    writer.commit().unwrap();
    drop(writer);

    let results = index.search("content:lucene", CONTENT_FIELD, 5).unwrap();
    assert_eq!(results.total_hits, 20);
    assert_eq!(results.hits.len(), 5);
}

#[test]
fn test_phrase_prefix_fuzzy_and_exclusion() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    index.upsert("b.txt", "Action in Lucene", None).unwrap();
    index.upsert("c.txt", "Lucid dreams", None).unwrap();

    let search = |q: &str| paths(&index.search(q, CONTENT_FIELD, 10).unwrap());

    assert_eq!(search("\"lucene in action\""), vec!["a.txt"]);
    assert_eq!(search("\"lucene action\""), Vec::<String>::new());

    let mut prefixed = search("luc*");
    prefixed.sort();
    assert_eq!(prefixed, vec!["a.txt", "b.txt", "c.txt"]);

    let mut fuzzy = search("lucane~1");
    fuzzy.sort();
    assert_eq!(fuzzy, vec!["a.txt", "b.txt"]);

    assert_eq!(search("luc* -action"), vec!["c.txt"]);
    assert_eq!(search("-action"), Vec::<String>::new());
}

#[test]
fn test_syntax_errors_are_reported() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();

    for query in ["content:[a TO b]", "lucene AND", "(lucene", "\"lucene", "lucene~5"] {
        let err = index.search(query, CONTENT_FIELD, 10).unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuerySyntax, "{}", query);
        assert!(err.fragment.is_some(), "{}", query);
        assert!(!err.is_retryable());
    }
}

#[test]
fn test_second_writer_fails_with_write_failure() {
    let (_dir, index) = open();
    let writer = index.writer().unwrap();

    let err = index.writer().err().unwrap();
    assert_eq!(err.kind, ErrorKind::WriteFailure);
    assert!(err.is_retryable());

    drop(writer);
    index.writer().unwrap();
}

#[test]
fn test_readers_keep_their_snapshot() {
    let (_dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    let before = index.reader().unwrap();

    index.upsert("b.txt", "Lucene for beginners", None).unwrap();
    index.delete("a.txt").unwrap();

    assert_eq!(before.num_docs(), 1);
    assert!(before.document_by_key("a.txt").unwrap().is_some());
    assert_eq!(before.search_text("lucene", CONTENT_FIELD, 10).unwrap().total_hits, 1);

    let after = index.reader().unwrap();
    assert!(after.generation() > before.generation());
    assert_eq!(after.num_docs(), 1);
    assert!(after.document_by_key("b.txt").unwrap().is_some());
    assert!(after.document_by_key("a.txt").unwrap().is_none());
}

#[test]
fn test_writer_close_commits_pending() {
    let (_dir, index) = open();
    let mut writer = index.writer().unwrap();
    writer.upsert(Document::new().with_field(PATH_FIELD, "a.txt").with_field(CONTENT_FIELD, "hello"), None).unwrap();
    writer.delete("b.txt").unwrap();
    assert_eq!(writer.pending(), 2);
    writer.close().unwrap();

    assert_eq!(index.search("hello", CONTENT_FIELD, 10).unwrap().total_hits, 1);
}

#[test]
fn test_failed_commit_keeps_pending_changes() {
    let (dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();
    let generation = index.reader().unwrap().generation();

    let mut writer = index.writer().unwrap();
    writer.upsert(Document::new().with_field(PATH_FIELD, "b.txt").with_field(CONTENT_FIELD, "Lucene for beginners"), None).unwrap();

    // A plain file where the segment directory should be
    let segments = dir.path().join("segments");
    let moved = dir.path().join("segments.bak");
    fs::rename(&segments, &moved).unwrap();
    fs::write(&segments, b"not a directory").unwrap();

    let err = writer.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::WriteFailure);
    assert!(err.is_retryable());
    assert_eq!(writer.pending(), 1);

    fs::remove_file(&segments).unwrap();
    fs::rename(&moved, &segments).unwrap();

    let reader = index.reader().unwrap();
    assert_eq!(reader.generation(), generation);
    assert_eq!(reader.num_docs(), 1);
    assert!(reader.document_by_key("b.txt").unwrap().is_none());

    let info = writer.commit().unwrap();
    assert_eq!(info.added, 1);
    assert_eq!(writer.pending(), 0);
    drop(writer);
    assert_eq!(paths(&index.search("beginners", CONTENT_FIELD, 10).unwrap()), vec!["b.txt"]);
}

#[test]
fn test_batch_writer_commits_every_batch() {
    let (_dir, index) = open();
    let mut batch = BatchWriter::new(index.writer().unwrap(), 2);

    for i in 0..5 {
        let doc = Document::new()
            .with_field(PATH_FIELD, format!("{}.txt", i))
            .with_field(CONTENT_FIELD, format!("shared word{}", i));
        batch.add(doc, None).unwrap();
    }
    // Two full batches are visible before the last one is flushed
    assert_eq!(index.reader().unwrap().num_docs(), 4);

    let err = batch.add(Document::new().with_field(CONTENT_FIELD, "no key"), None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    batch.finish().unwrap();

    let reader = index.reader().unwrap();
    assert_eq!(reader.generation(), 3);
    assert_eq!(reader.num_docs(), 5);
    assert_eq!(reader.search_text("content:shared", CONTENT_FIELD, 10).unwrap().total_hits, 5);
}

#[test]
fn test_unknown_field_is_rejected() {
    let (_dir, index) = open();
    let mut writer = index.writer().unwrap();
    let doc = Document::new()
        .with_field(PATH_FIELD, "a.txt")
        .with_field("author", "someone");
    let err = writer.upsert(doc, None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn test_merges_keep_segment_count_bounded() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path()).with_merge_policy(2, 2);
    let index = Index::open(config).unwrap();

    for i in 0..6 {
        index.upsert(&format!("{}.txt", i), &format!("shared word{}", i), None).unwrap();
    }
    index.delete("0.txt").unwrap();

    let segments = index.list_segments().unwrap();
    assert!(segments.len() <= 2, "{} segments", segments.len());

    let on_disk = fs::read_dir(dir.path().join("segments")).unwrap().count();
    assert_eq!(on_disk, segments.len());

    let reader = index.reader().unwrap();
    assert_eq!(reader.num_docs(), 5);
    assert_eq!(reader.search_text("content:shared", CONTENT_FIELD, 10).unwrap().total_hits, 5);
    assert_eq!(reader.search_text("content:word3", CONTENT_FIELD, 10).unwrap().total_hits, 1);
}

#[test]
fn test_index_reopens_from_disk() {
    let dir = tempdir().unwrap();
    Index::open(Config::new(dir.path())).unwrap()
        .upsert("a.txt", "Lucene in Action", Some(Fingerprint::new(100, 50)))
        .unwrap();

    let reopened = Index::open(Config::new(dir.path())).unwrap();
    assert!(reopened.exists());
    assert_eq!(reopened.search("lucene", CONTENT_FIELD, 10).unwrap().total_hits, 1);
    assert!(!reopened.needs_reindex("a.txt", Fingerprint::new(100, 50)).unwrap());
}

#[test]
fn test_corrupt_segment_is_detected() {
    let dir = tempdir().unwrap();
    Index::open(Config::new(dir.path())).unwrap().upsert("a.txt", "Lucene in Action", None).unwrap();

    let segment = fs::read_dir(dir.path().join("segments")).unwrap().next().unwrap().unwrap().path();
    let mut bytes = fs::read(&segment).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&segment, bytes).unwrap();

    let index = Index::open(Config::new(dir.path())).unwrap();
    let err = index.search("lucene", CONTENT_FIELD, 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreCorruption);
}

#[test]
fn test_corrupt_manifest_is_detected() {
    let dir = tempdir().unwrap();
    Index::open(Config::new(dir.path())).unwrap().upsert("a.txt", "Lucene in Action", None).unwrap();

    fs::write(dir.path().join("MANIFEST"), b"not a manifest").unwrap();
    let err = Index::open(Config::new(dir.path())).err().unwrap();
    assert_eq!(err.kind, ErrorKind::StoreCorruption);
}

#[test]
fn test_orphan_segments_are_cleaned_when_writer_opens() {
    let (dir, index) = open();
    index.upsert("a.txt", "Lucene in Action", None).unwrap();

    let orphan = dir.path().join("segments").join(format!("{}.seg", ORPHAN_ID));
    fs::write(&orphan, b"left behind by a crash").unwrap();
    fs::write(dir.path().join(".tmpAbc123"), b"partial manifest").unwrap();

    drop(index.writer().unwrap());
    assert!(!orphan.exists());
    assert!(!dir.path().join(".tmpAbc123").exists());
    assert_eq!(index.search("lucene", CONTENT_FIELD, 10).unwrap().total_hits, 1);
}
