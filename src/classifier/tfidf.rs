use std::collections::{BTreeMap, HashMap, HashSet};
use serde::{Deserialize, Serialize};
use crate::tokeniser::{ngrams, tokenise};

/// Sorted by feature index
pub(crate) type SparseVector = Vec<(usize, f64)>;

/// TF-IDF encoder with a vocabulary fixed at fit time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct TfidfVectorizer {
    /// Term to feature index. Indexes follow the alphabetical order of terms.
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    ngram_min: usize,
    ngram_max: usize,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and idf weights. At most `max_features` terms are kept,
    /// the most frequent across the corpus first, ties by term.
    pub(crate) fn fit(documents: &[&str], max_features: usize, ngram_min: usize, ngram_max: usize) -> TfidfVectorizer {
        let mut term_frequency: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for document in documents {
            let terms = document_terms(document, ngram_min, ngram_max);
            let mut distinct = HashSet::new();
            for term in terms {
                *term_frequency.entry(term.clone()).or_insert(0) += 1;
                distinct.insert(term);
            }
            for term in distinct {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (i, term) in kept.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, i);
        }

        TfidfVectorizer { vocabulary, idf, ngram_min, ngram_max }
    }

    pub(crate) fn len(&self) -> usize {
        self.idf.len()
    }

    /// L2-normalised tf-idf vector. Terms outside the vocabulary are ignored.
    pub(crate) fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in document_terms(document, self.ngram_min, self.ngram_max) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts.into_iter().map(|(i, count)| (i, count * self.idf[i])).collect();
        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

fn document_terms(document: &str, ngram_min: usize, ngram_max: usize) -> Vec<String> {
    ngrams(&tokenise(document), ngram_min, ngram_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_and_weights() {
        let documents = ["PAGO PREVIRED", "PAGO ENEL", "COMPRA COPEC"];
        let vectorizer = TfidfVectorizer::fit(&documents, 100, 1, 1);
        assert_eq!(vectorizer.len(), 5);
        // compra copec enel pago previred
        assert_eq!(vectorizer.vocabulary.get("compra"), Some(&0));
        assert_eq!(vectorizer.vocabulary.get("previred"), Some(&4));

        let common = vectorizer.idf[vectorizer.vocabulary["pago"]];
        let rare = vectorizer.idf[vectorizer.vocabulary["enel"]];
        assert!(rare > common);
        assert!((rare - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_transform_is_normalised() {
        let vectorizer = TfidfVectorizer::fit(&["pago previred", "pago enel"], 100, 1, 2);
        let vector = vectorizer.transform("PAGO PREVIRED");
        assert_eq!(vector.len(), 3);
        let norm: f64 = vector.iter().map(|(_, v)| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);

        assert!(vectorizer.transform("desconocido total").is_empty());
    }

    #[test]
    fn test_max_features() {
        let vectorizer = TfidfVectorizer::fit(&["pago pago enel", "pago luz"], 2, 1, 1);
        assert_eq!(vectorizer.len(), 2);
        // pago(3) first, then enel and luz tie at 1, enel wins by name
        assert!(vectorizer.vocabulary.contains_key("pago"));
        assert!(vectorizer.vocabulary.contains_key("enel"));
    }
}
