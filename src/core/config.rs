use std::path::PathBuf;
use crate::compression::compress::CompressionType;
use crate::scoring::scorer::Similarity;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,

    // Segment files
    pub compression: CompressionType,
    pub max_segments: usize,          // merge once more live segments than this
    pub merge_factor: usize,          // segments folded together per merge
    pub segment_cache_size: usize,    // decoded segments kept by readers

    // Writer
    pub parallel_analysis_threshold: usize,

    // Ranking
    pub similarity: Similarity,
    pub bm25_k1: f32,
    pub bm25_b: f32,

    // Query expansion
    pub fuzzy_max_edits: u8,
    pub fuzzy_max_expansions: usize,
    pub default_top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./index"),

            compression: CompressionType::Lz4,
            max_segments: 8,
            merge_factor: 4,
            segment_cache_size: 64,

            parallel_analysis_threshold: 64,

            similarity: Similarity::Bm25,
            bm25_k1: 1.2,
            bm25_b: 0.75,

            fuzzy_max_edits: 2,          // Lucene FuzzyQuery default
            fuzzy_max_expansions: 50,
            default_top_k: 10,
        }
    }
}

impl Config {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            ..Config::default()
        }
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_merge_policy(mut self, max_segments: usize, merge_factor: usize) -> Self {
        self.max_segments = max_segments.max(1);
        self.merge_factor = merge_factor.max(2);
        self
    }

    pub fn with_similarity(mut self, similarity: Similarity) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_bm25(mut self, k1: f32, b: f32) -> Self {
        self.bm25_k1 = k1;
        self.bm25_b = b;
        self
    }
}
