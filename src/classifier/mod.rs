pub(crate) mod tfidf;
pub(crate) mod logistic;

use log::info;
use serde::{Deserialize, Serialize};
use crate::classifier::logistic::{SoftmaxRegression, TrainingParams};
use crate::classifier::tfidf::TfidfVectorizer;
use crate::common::{Error, ResultError};
use crate::config::ClassifierConfig;
use crate::labeller::LabeledDataset;
use crate::transaction::Transaction;

/// A fitted description classifier. Immutable once trained, retraining builds a new one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ClassificationModel {
    pub(crate) vectorizer: TfidfVectorizer,
    pub(crate) regression: SoftmaxRegression,
    /// Class list in first-seen order of the training set
    pub(crate) categories: Vec<String>,
    pub(crate) trained_rows: usize,
    pub(crate) training_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Prediction {
    pub(crate) category: String,
    pub(crate) confidence: f64,
}

/// Prediction for one row of the current batch
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassifiedRow {
    pub(crate) row: usize,
    pub(crate) description: String,
    pub(crate) prediction: Prediction,
    pub(crate) low_confidence: bool,
}

pub(crate) fn train(dataset: &LabeledDataset, config: &ClassifierConfig) -> ResultError<ClassificationModel> {
    if dataset.len() < config.min_training_rows {
        return Err(Error::InsufficientData(format!(
            "{} labeled rows, at least {} are needed to train", dataset.len(), config.min_training_rows)));
    }
    let categories = dataset.categories();
    let min_categories = config.min_categories.max(2);
    if categories.len() < min_categories {
        return Err(Error::InsufficientData(format!(
            "{} distinct categories, at least {} are needed to train", categories.len(), min_categories)));
    }

    let documents: Vec<&str> = dataset.examples.iter().map(|e| e.description.as_str()).collect();
    let vectorizer = TfidfVectorizer::fit(&documents, config.max_features, config.ngram_min, config.ngram_max);
    let samples: Vec<_> = documents.iter().map(|d| vectorizer.transform(d)).collect();
    let targets: Vec<usize> = dataset.examples.iter()
        .map(|e| categories.iter().position(|c| c == &e.category).unwrap_or(0))
        .collect();

    info!("Training on {} rows, {} categories, {} features", samples.len(), categories.len(), vectorizer.len());
    let params = TrainingParams {
        learning_rate: config.learning_rate,
        iterations: config.iterations,
        l2_penalty: config.l2_penalty,
    };
    let regression = SoftmaxRegression::fit(&samples, &targets, categories.len(), vectorizer.len(), &params);

    let correct = samples.iter().zip(&targets).filter(|(x, y)| regression.predict(x).0 == **y).count();
    let training_accuracy = correct as f64 / samples.len() as f64;
    info!("Training accuracy {:.1}%", training_accuracy * 100.0);

    Ok(ClassificationModel {
        vectorizer,
        regression,
        categories,
        trained_rows: samples.len(),
        training_accuracy,
    })
}

impl ClassificationModel {
    /// Unknown words are ignored. A description with no known word gets the class prior.
    pub(crate) fn predict(&self, description: &str) -> Prediction {
        let (class, confidence) = self.regression.predict(&self.vectorizer.transform(description));
        Prediction {
            category: self.categories.get(class).cloned().unwrap_or_default(),
            confidence,
        }
    }
}

/// Predict every row that has no user label. User labels are never replaced.
pub(crate) fn classify_table(model: &ClassificationModel, transactions: &[Transaction],
                             confidence_threshold: f64) -> Vec<ClassifiedRow> {
    transactions.iter()
        .filter(|t| t.category.is_none())
        .map(|t| {
            let prediction = model.predict(&t.description);
            ClassifiedRow {
                row: t.row,
                description: t.description.clone(),
                low_confidence: prediction.confidence < confidence_threshold,
                prediction,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use crate::labeller::LabeledExample;
    use crate::transaction::DebitCredit;
    use super::*;

    fn example(description: &str, category: &str) -> LabeledExample {
        let t = Transaction::new(0, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), description,
                                 Decimal::from_str("-1000").unwrap(), DebitCredit::Debit, "", "");
        LabeledExample::from_transaction(&t, category)
    }

    fn dataset() -> LabeledDataset {
        LabeledDataset::new(vec![
            example("COMPRA NAC COPEC LAS CONDES", "combustible"),
            example("PAGO PREVIRED", "imposiciones"),
            example("COMPRA NAC SHELL VITACURA", "combustible"),
            example("PAGO PREVIRED MARZO", "imposiciones"),
            example("COMPRA NAC COPEC", "combustible"),
        ])
    }

    #[test]
    fn test_train_and_predict_known_description() {
        let model = train(&dataset(), &ClassifierConfig::default()).unwrap();
        assert_eq!(model.categories, vec!["combustible", "imposiciones"]);
        assert_eq!(model.trained_rows, 5);
        assert_eq!(model.training_accuracy, 1.0);

        for e in &dataset().examples {
            let prediction = model.predict(&e.description);
            assert_eq!(prediction.category, e.category);
            assert!(prediction.confidence >= 0.5);
        }
    }

    #[test]
    fn test_unknown_words_are_ignored() {
        let model = train(&dataset(), &ClassifierConfig::default()).unwrap();
        assert_eq!(model.predict("copec autopista central").category, "combustible");
        let unknown = model.predict("zzz");
        assert!(unknown.confidence > 0.0 && unknown.confidence < 1.0);
    }

    #[test]
    fn test_insufficient_data() {
        let too_few = LabeledDataset::new(dataset().examples.into_iter().take(3).collect());
        assert!(matches!(train(&too_few, &ClassifierConfig::default()), Err(Error::InsufficientData(_))));

        let one_category = LabeledDataset::new(dataset().examples.into_iter()
            .filter(|e| e.category == "combustible").collect());
        let mut config = ClassifierConfig::default();
        config.min_training_rows = 2;
        assert!(matches!(train(&one_category, &config), Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_retraining_is_deterministic() {
        let config = ClassifierConfig::default();
        assert_eq!(train(&dataset(), &config).unwrap(), train(&dataset(), &config).unwrap());
    }

    #[test]
    fn test_classify_table_skips_labeled_rows() {
        let model = train(&dataset(), &ClassifierConfig::default()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let mut labeled = Transaction::new(0, date, "COMPRA NAC COPEC", Decimal::from_str("-9000").unwrap(), DebitCredit::Debit, "", "");
        labeled.category = Some("viajes".to_string());
        let unlabeled = Transaction::new(1, date, "PAGO PREVIRED ABRIL", Decimal::from_str("-300000").unwrap(), DebitCredit::Debit, "", "");

        let rows = classify_table(&model, &[labeled, unlabeled], 0.6);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].prediction.category, "imposiciones");
        assert_eq!(rows[0].low_confidence, rows[0].prediction.confidence < 0.6);
    }
}
