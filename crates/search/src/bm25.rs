//! One-shot BM25 ranking over a dense-stage candidate set.
//!
//! Term statistics (document frequency, average length) are computed from the
//! candidates alone, never from the full corpus, and the scorer is dropped once
//! the request is answered.

use crate::error::{Result, SearchError};
use crate::tokenizer::tokenize;
use sift_vector_store::{Document, ScoredDocument};
use std::collections::{HashMap, HashSet};

/// Term-frequency saturation
pub const BM25_K1: f64 = 1.5;
/// Length normalization
pub const BM25_B: f64 = 0.75;

struct TermStats {
    freqs: HashMap<String, u32>,
    len: usize,
}

/// BM25 model built from a fixed, ordered list of candidate texts
pub struct LexicalScorer {
    docs: Vec<Option<TermStats>>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
    scored_docs: usize,
}

impl LexicalScorer {
    /// Tokenize every candidate and collect the candidate-local term statistics.
    /// Blank candidates take no part in the statistics; a candidate with text
    /// but no word token counts as a zero-length document.
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut docs = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for text in texts {
            if text.trim().is_empty() {
                docs.push(None);
                continue;
            }
            let tokens = tokenize(text);
            total_len += tokens.len();

            let mut seen = HashSet::new();
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.clone()).or_insert(0) += 1;
                }
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            docs.push(Some(TermStats {
                freqs,
                len: tokens.len(),
            }));
        }

        let scored_docs = docs.iter().filter(|doc| doc.is_some()).count();
        let avg_len = if scored_docs == 0 {
            0.0
        } else {
            total_len as f64 / scored_docs as f64
        };

        Self {
            docs,
            doc_freq,
            avg_len,
            scored_docs,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// BM25 score of candidate `idx`; `None` when the candidate is blank
    pub fn score(&self, idx: usize, query_tokens: &[String]) -> Option<f32> {
        let doc = self.docs.get(idx)?.as_ref()?;

        let total_docs = self.scored_docs as f64;
        let dl = doc.len as f64;
        let norm = 1.0 - BM25_B + BM25_B * dl / self.avg_len.max(f64::EPSILON);
        let mut score = 0.0f64;

        for token in query_tokens {
            let Some(&freq) = doc.freqs.get(token) else {
                continue;
            };
            let freq = f64::from(freq);
            let df = self.doc_freq.get(token).copied().unwrap_or(0) as f64;
            score += bm25_idf(total_docs, df) * (freq * (BM25_K1 + 1.0)) / (freq + BM25_K1 * norm);
        }

        Some(score as f32)
    }
}

/// Non-negative IDF; a term present in every candidate still carries weight.
fn bm25_idf(total_docs: f64, df: f64) -> f64 {
    ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score `candidates` against `query` and keep the best `top_k`.
///
/// Ordering is by descending score; equal scores keep the candidates' input
/// order. Blank candidates are dropped; candidates whose text has no word
/// token score zero. An empty candidate list yields an empty result.
pub fn rerank(query: &str, candidates: Vec<Document>, top_k: usize) -> Result<Vec<ScoredDocument>> {
    if top_k == 0 {
        return Err(SearchError::InvalidArgument(
            "top_k must be greater than zero".to_string(),
        ));
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let scorer = LexicalScorer::build(candidates.iter().map(|doc| doc.text.as_str()));
    let query_tokens = tokenize(query);

    let mut ranked: Vec<ScoredDocument> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(idx, doc)| {
            scorer
                .score(idx, &query_tokens)
                .map(|score| ScoredDocument::new(doc, score))
        })
        .collect();

    // `sort_by` is stable: ties stay in dense-stage order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);

    log::debug!(
        "BM25 rerank: {} candidates, {} query tokens, {} kept",
        scorer.len(),
        query_tokens.len(),
        ranked.len()
    );

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn doc(id: &str, text: &str) -> Document {
        Document::new(text).with_id(id)
    }

    fn ids(results: &[ScoredDocument]) -> Vec<&str> {
        results.iter().map(|r| r.document.id.as_str()).collect()
    }

    fn vector_db_candidates() -> Vec<Document> {
        vec![
            doc("d1", "MongoDB Atlas is a managed database"),
            doc("d2", "Vector databases enable semantic search"),
            doc("d3", "LangChain builds LLM apps"),
        ]
    }

    #[test]
    fn shorter_matching_document_ranks_first() {
        let ranked = rerank("vector database", vector_db_candidates(), 3).unwrap();

        assert_eq!(ids(&ranked), vec!["d2", "d1", "d3"]);
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked[1].score > 0.0);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn truncates_to_top_k() {
        let ranked = rerank("vector database", vector_db_candidates(), 2).unwrap();
        assert_eq!(ids(&ranked), vec!["d2", "d1"]);
    }

    #[test]
    fn fewer_candidates_than_top_k_returns_all() {
        let ranked = rerank("database", vec![doc("only", "a database")], 5).unwrap();
        assert_eq!(ids(&ranked), vec!["only"]);
    }

    #[test]
    fn empty_candidate_list_is_not_an_error() {
        assert!(rerank("anything", Vec::new(), 3).unwrap().is_empty());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err = rerank("q", vector_db_candidates(), 0).unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }

    #[test]
    fn empty_query_ties_and_keeps_input_order() {
        let ranked = rerank("", vector_db_candidates(), 3).unwrap();
        assert_eq!(ids(&ranked), vec!["d1", "d2", "d3"]);
        assert!(ranked.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn unmatched_query_keeps_input_order() {
        let candidates = vec![
            doc("c", "gamma delta"),
            doc("a", "alpha beta"),
            doc("b", "epsilon zeta eta theta"),
        ];
        let ranked = rerank("nowhere to be found", candidates, 3).unwrap();
        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
        assert!(ranked.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = vec![
            doc("first", "rust search"),
            doc("other", "python scripts"),
            doc("second", "rust search"),
        ];
        let ranked = rerank("rust", candidates, 3).unwrap();
        assert_eq!(ids(&ranked), vec!["first", "second", "other"]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn blank_candidates_are_dropped() {
        let candidates = vec![doc("blank", "   "), doc("empty", ""), doc("real", "vector")];
        let ranked = rerank("vector", candidates, 5).unwrap();
        assert_eq!(ids(&ranked), vec!["real"]);
    }

    #[test]
    fn symbol_only_candidates_are_kept_at_zero() {
        let candidates = vec![doc("symbols", "★ → ©"), doc("punct", "?!"), doc("v", "vector")];
        let ranked = rerank("vector", candidates, 3).unwrap();

        assert_eq!(ids(&ranked), vec!["v", "symbols", "punct"]);
        assert!(ranked[0].score > 0.0);
        assert_eq!(ranked[1].score, 0.0);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn symbol_only_candidate_fills_top_k() {
        let candidates = vec![doc("symbols", "★ → ©"), doc("v", "vector")];
        let ranked = rerank("vector", candidates, 2).unwrap();
        assert_eq!(ids(&ranked), vec!["v", "symbols"]);
    }

    #[test]
    fn term_frequency_saturates() {
        let scorer = LexicalScorer::build(["rust", "rust rust", "rust rust rust rust rust rust", "go"]);
        let query = tokenize("rust");
        let one = scorer.score(0, &query).unwrap();
        let six = scorer.score(2, &query).unwrap();

        assert!(six > 0.0 && one > 0.0);
        assert!(six < one * (BM25_K1 as f32 + 1.0));
    }

    #[test]
    fn term_in_every_candidate_still_scores_positive() {
        let scorer = LexicalScorer::build(["rust code", "rust docs"]);
        assert!(scorer.score(0, &tokenize("rust")).unwrap() > 0.0);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let scorer = LexicalScorer::build(["common rare", "common", "common", "common"]);
        let common = scorer.score(0, &tokenize("common")).unwrap();
        let rare = scorer.score(0, &tokenize("rare")).unwrap();
        assert!(rare > common);
    }

    #[test]
    fn score_matches_reference_formula() {
        let scorer = LexicalScorer::build(["a b", "b c d e"]);
        let score = f64::from(scorer.score(0, &tokenize("a")).unwrap());

        let idf = ((2.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0f64).ln();
        let norm = 1.0 - BM25_B + BM25_B * 2.0 / 3.0;
        let expected = idf * (BM25_K1 + 1.0) / (1.0 + BM25_K1 * norm);
        assert!((score - expected).abs() < 1e-6, "{score} vs {expected}");
    }

    #[test]
    fn repeated_query_terms_add_up() {
        let scorer = LexicalScorer::build(["vector store", "graph store"]);
        let once = scorer.score(0, &tokenize("vector")).unwrap();
        let twice = scorer.score(0, &tokenize("vector vector")).unwrap();
        assert!((twice - 2.0 * once).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_index_has_no_score() {
        let scorer = LexicalScorer::build(["one"]);
        assert_eq!(scorer.len(), 1);
        assert!(scorer.score(3, &tokenize("one")).is_none());
    }

    #[test]
    fn zero_length_documents_count_toward_statistics() {
        let scorer = LexicalScorer::build(["a", "--"]);
        let score = f64::from(scorer.score(0, &tokenize("a")).unwrap());

        let idf = ((2.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0f64).ln();
        let norm = 1.0 - BM25_B + BM25_B * 1.0 / 0.5;
        let expected = idf * (BM25_K1 + 1.0) / (1.0 + BM25_K1 * norm);
        assert!((score - expected).abs() < 1e-6, "{score} vs {expected}");
        assert_eq!(scorer.score(1, &tokenize("a")), Some(0.0));
    }

    proptest! {
        #[test]
        fn rerank_is_deterministic(
            query in "[a-d ]{0,12}",
            texts in proptest::collection::vec("[a-d ]{0,24}", 0..10),
            top_k in 1usize..12,
        ) {
            let candidates: Vec<Document> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| doc(&i.to_string(), t))
                .collect();

            let first = rerank(&query, candidates.clone(), top_k).unwrap();
            let second = rerank(&query, candidates, top_k).unwrap();

            prop_assert_eq!(ids(&first), ids(&second));
            let first_bits: Vec<u32> = first.iter().map(|r| r.score.to_bits()).collect();
            let second_bits: Vec<u32> = second.iter().map(|r| r.score.to_bits()).collect();
            prop_assert_eq!(first_bits, second_bits);
        }

        #[test]
        fn rerank_only_reorders_and_truncates(
            query in "[a-d ]{0,12}",
            texts in proptest::collection::vec("[a-d ]{0,24}", 0..10),
            top_k in 1usize..12,
        ) {
            let candidates: Vec<Document> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| doc(&i.to_string(), t))
                .collect();
            let non_empty = candidates.iter().filter(|d| !d.text.trim().is_empty()).count();

            let ranked = rerank(&query, candidates.clone(), top_k).unwrap();

            prop_assert_eq!(ranked.len(), top_k.min(non_empty));
            for result in &ranked {
                prop_assert!(candidates.contains(&result.document));
            }
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
