use serde::{Serialize, Deserialize};
use crate::core::config::Config;

/// Scorer trait
pub trait Scorer: Send + Sync {
    /// Inverse document frequency of a term matched by `doc_freq` of
    /// `total_docs` live documents.
    fn idf(&self, doc_freq: u32, total_docs: u32) -> f32;

    fn score(&self, term_freq: f32, idf: f32, doc_stats: &DocStats) -> f32;

    fn name(&self) -> &str;
}

/// Per-document statistics for one field
#[derive(Debug, Clone, Copy)]
pub struct DocStats {
    pub doc_length: u32,      // Tokens in this field of the document
    pub avg_doc_length: f32,  // Average over live documents
}

impl DocStats {
    fn length_ratio(&self) -> f32 {
        if self.avg_doc_length > 0.0 {
            self.doc_length as f32 / self.avg_doc_length
        } else {
            1.0
        }
    }
}

/// Ranking function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Similarity {
    Bm25,
    TfIdf,
}

impl Similarity {
    pub fn scorer(&self, config: &Config) -> Box<dyn Scorer> {
        match self {
            Similarity::Bm25 => Box::new(BM25Scorer {
                k1: config.bm25_k1,
                b: config.bm25_b,
            }),
            Similarity::TfIdf => Box::new(TfIdfScorer::new(true)),
        }
    }
}

/// TF-IDF Scorer
pub struct TfIdfScorer {
    pub normalize: bool,
}

impl TfIdfScorer {
    pub fn new(normalize: bool) -> Self {
        TfIdfScorer { normalize }
    }
}

impl Scorer for TfIdfScorer {
    fn idf(&self, doc_freq: u32, total_docs: u32) -> f32 {
        ((total_docs as f32 + 1.0) / (doc_freq as f32 + 1.0)).ln() + 1.0
    }

    fn score(&self, term_freq: f32, idf: f32, doc_stats: &DocStats) -> f32 {
        // sqrt(tf), optionally damped by field length
        let tf = term_freq.sqrt();
        let norm = if self.normalize && doc_stats.doc_length > 0 {
            1.0 / (doc_stats.doc_length as f32).sqrt()
        } else {
            1.0
        };

        tf * idf * idf * norm
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}

/// BM25 Scorer
pub struct BM25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl Scorer for BM25Scorer {
    fn idf(&self, doc_freq: u32, total_docs: u32) -> f32 {
        let n = total_docs as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, term_freq: f32, idf: f32, doc_stats: &DocStats) -> f32 {
        let numerator = idf * term_freq * (self.k1 + 1.0);
        let denominator = term_freq + self.k1 * (1.0 - self.b + self.b * doc_stats.length_ratio());

        numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bm25_idf_is_positive_and_decreasing() {
        let scorer = BM25Scorer::default();
        let rare = scorer.idf(1, 100);
        let common = scorer.idf(90, 100);
        assert!(rare > common);
        assert!(scorer.idf(100, 100) > 0.0);
    }

    #[test]
    fn test_bm25_prefers_higher_tf_and_shorter_fields() {
        let scorer = BM25Scorer::default();
        let idf = scorer.idf(1, 10);
        let stats = DocStats { doc_length: 10, avg_doc_length: 10.0 };
        assert!(scorer.score(3.0, idf, &stats) > scorer.score(1.0, idf, &stats));

        let short = DocStats { doc_length: 5, avg_doc_length: 10.0 };
        assert!(scorer.score(1.0, idf, &short) > scorer.score(1.0, idf, &stats));
    }

    #[test]
    fn test_zero_average_length() {
        let scorer = BM25Scorer::default();
        let stats = DocStats { doc_length: 0, avg_doc_length: 0.0 };
        assert!(scorer.score(1.0, scorer.idf(1, 1), &stats).is_finite());
    }

    #[test]
    fn test_similarity_selects_scorer() {
        let config = Config::default();
        assert_eq!(Similarity::Bm25.scorer(&config).name(), "bm25");
        assert_eq!(Similarity::TfIdf.scorer(&config).name(), "tfidf");
    }
}
