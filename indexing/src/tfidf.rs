//! TF-IDF lexical index.
//!
//! The index chunks files into line windows, weights each chunk's terms by
//! smoothed inverse document frequency, and ranks chunks by the dot product
//! of the query vector and the chunk vector. Scores are only compared
//! against each other for one query, so no vector normalization is applied.

use std::collections::{HashMap, HashSet};

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DEFAULT_LINES_PER_CHUNK;
use crate::chunking::{IndexedDocument, chunk_by_lines};
use crate::tokenize::{term_frequency, tokenize};

/// A file handed to the index builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_id: String,
    pub content: String,
}

/// Search behavior flags.
///
/// With `match_whole_word` unset, each query token also matches every
/// vocabulary term containing it as a substring ("log" ranks chunks that
/// mention "logger"). Setting `match_case` or `match_whole_word` additionally
/// post-filters scored chunks by a literal match against the raw chunk text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub match_case: bool,
    pub match_whole_word: bool,
}

/// A scored chunk returned from a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc: IndexedDocument,
    pub score: f32,
}

/// An immutable TF-IDF index over a chunked corpus.
///
/// Rebuilding is a full O(corpus) pass; there is no incremental update path.
pub struct TfIdfIndex {
    docs: Vec<IndexedDocument>,
    doc_vecs: Vec<HashMap<String, f32>>,
    df: HashMap<String, usize>,
    n: usize,
}

impl TfIdfIndex {
    /// Build an index from file contents using the default line window.
    pub fn build(files: &[SourceFile]) -> Self {
        Self::build_with_chunk_size(files, DEFAULT_LINES_PER_CHUNK)
    }

    /// Build an index with an explicit lines-per-chunk window.
    pub fn build_with_chunk_size(files: &[SourceFile], max_lines_per_chunk: usize) -> Self {
        let mut docs = Vec::new();
        for f in files {
            docs.extend(chunk_by_lines(&f.file_id, &f.content, max_lines_per_chunk));
        }

        let doc_tfs: Vec<HashMap<String, usize>> = docs
            .iter()
            .map(|d| term_frequency(&tokenize(&d.text)))
            .collect();

        let mut df: HashMap<String, usize> = HashMap::new();
        for tf in &doc_tfs {
            for term in tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
        }

        // Guard against the empty corpus: N stays >= 1 so the IDF never
        // divides by zero.
        let n = docs.len().max(1);
        let doc_vecs = doc_tfs
            .iter()
            .map(|tf| {
                tf.iter()
                    .map(|(term, freq)| (term.clone(), *freq as f32 * idf(n, &df, term)))
                    .collect()
            })
            .collect();

        debug!(files = files.len(), chunks = docs.len(), "built tf-idf index");

        Self {
            docs,
            doc_vecs,
            df,
            n,
        }
    }

    /// Number of chunks in the index.
    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    /// The indexed chunks, in corpus order.
    pub fn docs(&self) -> &[IndexedDocument] {
        &self.docs
    }

    /// Rank chunks against a query and return the `top_k` best.
    ///
    /// Only strictly positive scores are returned, sorted descending; ties
    /// keep their corpus order. Exact-match filtering (when requested via
    /// `options`) runs after scoring and before truncation.
    pub fn search(&self, query: &str, top_k: usize, options: SearchOptions) -> Vec<SearchHit> {
        let q_tokens = tokenize(query);
        if q_tokens.is_empty() {
            return Vec::new();
        }

        let effective = if options.match_whole_word {
            q_tokens
        } else {
            self.expand_tokens(q_tokens)
        };

        let q_tf = term_frequency(&effective);
        let q_vec: HashMap<&str, f32> = q_tf
            .iter()
            .map(|(term, freq)| (term.as_str(), *freq as f32 * idf(self.n, &self.df, term)))
            .collect();

        let mut hits: Vec<SearchHit> = self
            .docs
            .iter()
            .zip(&self.doc_vecs)
            .filter_map(|(doc, vec)| {
                let score: f32 = q_vec
                    .iter()
                    .filter_map(|(term, qw)| vec.get(*term).map(|dw| qw * dw))
                    .sum();
                (score > 0.0).then(|| SearchHit {
                    doc: doc.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        if options.match_case || options.match_whole_word {
            if let Some(re) = literal_matcher(query, options) {
                hits.retain(|h| re.is_match(&h.doc.text));
            }
        }

        hits.truncate(top_k);
        hits
    }

    /// Substring query expansion: every vocabulary term containing a query
    /// token joins the effective query token set.
    fn expand_tokens(&self, q_tokens: Vec<String>) -> Vec<String> {
        let seen: HashSet<&String> = q_tokens.iter().collect();
        let mut expanded: Vec<String> = Vec::new();
        for term in self.df.keys() {
            if seen.contains(term) {
                continue;
            }
            if q_tokens.iter().any(|q| term.contains(q.as_str())) {
                expanded.push(term.clone());
            }
        }
        let mut out = q_tokens;
        out.extend(expanded);
        out
    }
}

/// Smoothed inverse document frequency.
fn idf(n: usize, df: &HashMap<String, usize>, term: &str) -> f32 {
    let df_t = df.get(term).copied().unwrap_or(0);
    (((n + 1) as f32) / ((df_t + 1) as f32)).ln() + 1.0
}

/// Compile the literal post-filter for exact/whole-word matching.
fn literal_matcher(query: &str, options: SearchOptions) -> Option<regex::Regex> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }
    let escaped = regex::escape(trimmed);
    let pattern = if options.match_whole_word {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!options.match_case)
        .build()
        .ok()
}
