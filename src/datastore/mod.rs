pub(crate) mod canonical;
pub(crate) mod model_file;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use crate::classifier::{ClassificationModel, ClassifiedRow, Prediction};
use crate::common::{Error, ResultError};
use crate::datastore::canonical::{read_canonical, write_canonical};
use crate::datastore::model_file::{decode_model, encode_model};
use crate::kame::KameRecord;
use crate::kame::reconcile::{MatchResult, MatchStatus};
use crate::labeller::{LabeledDataset, LabeledExample};
use crate::transaction::{DebitCredit, Transaction};
use crate::util::format_amount;
use crate::workflow::WorkflowState;

const TRANSACTIONS_FILE: &str = "transactions.csv";
const LABELS_FILE: &str = "labels.csv";
const MODEL_FILE: &str = "model.bin";
const PREDICTIONS_FILE: &str = "predictions.csv";
const RECONCILIATION_FILE: &str = "reconciliation.csv";
const STATE_FILE: &str = "state.json";

const LABEL_HEADERS: [&str; 6] = ["key", "date", "description", "amount", "debit_credit", "category"];
const PREDICTION_HEADERS: [&str; 5] = ["row", "description", "category", "confidence", "low_confidence"];
const RECONCILIATION_HEADERS: [&str; 7] = ["kame_row", "date", "amount", "description", "status", "transaction_row", "day_distance"];

/// Write to a sibling temp file, fsync it, then rename over the target.
/// The target is either fully replaced or left as it was.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> ResultError<()> {
    let file_name = path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::IoError(format!("invalid file path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.flush()?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::IoError(format!("unable to write {}: {}", path.display(), e)));
    }
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Flat-file store under the data directory. Single user, single process.
pub(crate) struct Datastore {
    dir: PathBuf,
}

impl Datastore {
    pub(crate) fn open(dir: &Path) -> ResultError<Datastore> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::IoError(format!("unable to create data directory {}: {}", dir.display(), e)))?;
        Ok(Datastore { dir: dir.to_path_buf() })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_optional(&self, name: &str) -> ResultError<Option<Vec<u8>>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| Error::IoError(format!("unable to read {}: {}", path.display(), e)))
    }

    pub(crate) fn load_transactions(&self) -> ResultError<Vec<Transaction>> {
        match self.read_optional(TRANSACTIONS_FILE)? {
            Some(content) => read_canonical(&content),
            None => Ok(vec![]),
        }
    }

    pub(crate) fn save_transactions(&self, transactions: &[Transaction]) -> ResultError<()> {
        write_atomic(&self.path(TRANSACTIONS_FILE), &write_canonical(transactions, true)?)
    }

    pub(crate) fn load_labels(&self) -> ResultError<LabeledDataset> {
        let content = match self.read_optional(LABELS_FILE)? {
            Some(content) => content,
            None => return Ok(LabeledDataset::default()),
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        let mut examples = vec![];
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let field = |c: usize| record.get(c).unwrap_or("");
            let invalid = |what: &str| Error::ParseError(format!("{} line {}: invalid {}", LABELS_FILE, i + 2, what));

            examples.push(LabeledExample {
                key: field(0).to_string(),
                date: NaiveDate::parse_from_str(field(1), "%Y-%m-%d").map_err(|_| invalid("date"))?,
                description: field(2).to_string(),
                amount: Decimal::from_str(field(3)).map_err(|_| invalid("amount"))?,
                debit_credit: DebitCredit::from_str(field(4)).map_err(|_| invalid("debit_credit"))?,
                category: field(5).to_string(),
            });
        }
        Ok(LabeledDataset::new(examples))
    }

    pub(crate) fn save_labels(&self, dataset: &LabeledDataset) -> ResultError<()> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(LABEL_HEADERS)?;
        for e in &dataset.examples {
            let date = e.date.format("%Y-%m-%d").to_string();
            let amount = format_amount(&e.amount);
            writer.write_record([e.key.as_str(), date.as_str(), e.description.as_str(), amount.as_str(),
                e.debit_credit.as_str(), e.category.as_str()])?;
        }
        let content = writer.into_inner().map_err(|e| Error::IoError(e.to_string()))?;
        write_atomic(&self.path(LABELS_FILE), &content)
    }

    pub(crate) fn load_model(&self) -> ResultError<Option<ClassificationModel>> {
        match self.read_optional(MODEL_FILE)? {
            Some(content) => decode_model(&content).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn save_model(&self, model: &ClassificationModel) -> ResultError<()> {
        write_atomic(&self.path(MODEL_FILE), &encode_model(model)?)
    }

    pub(crate) fn load_predictions(&self) -> ResultError<Vec<ClassifiedRow>> {
        let content = match self.read_optional(PREDICTIONS_FILE)? {
            Some(content) => content,
            None => return Ok(vec![]),
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        let mut rows = vec![];
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let field = |c: usize| record.get(c).unwrap_or("");
            let invalid = || Error::ParseError(format!("{} line {} is invalid", PREDICTIONS_FILE, i + 2));
            rows.push(ClassifiedRow {
                row: field(0).parse().map_err(|_| invalid())?,
                description: field(1).to_string(),
                prediction: Prediction {
                    category: field(2).to_string(),
                    confidence: field(3).parse().map_err(|_| invalid())?,
                },
                low_confidence: field(4).parse().map_err(|_| invalid())?,
            });
        }
        Ok(rows)
    }

    pub(crate) fn save_predictions(&self, rows: &[ClassifiedRow]) -> ResultError<()> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(PREDICTION_HEADERS)?;
        for r in rows {
            writer.write_record([r.row.to_string(), r.description.clone(), r.prediction.category.clone(),
                format!("{:.4}", r.prediction.confidence), r.low_confidence.to_string()])?;
        }
        let content = writer.into_inner().map_err(|e| Error::IoError(e.to_string()))?;
        write_atomic(&self.path(PREDICTIONS_FILE), &content)
    }

    pub(crate) fn load_reconciliation(&self) -> ResultError<Vec<MatchResult>> {
        let content = match self.read_optional(RECONCILIATION_FILE)? {
            Some(content) => content,
            None => return Ok(vec![]),
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        let mut results = vec![];
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let field = |c: usize| record.get(c).unwrap_or("");
            let invalid = || Error::ParseError(format!("{} line {} is invalid", RECONCILIATION_FILE, i + 2));
            let optional = |c: usize| -> ResultError<Option<i64>> {
                if field(c).is_empty() { Ok(None) } else { field(c).parse().map(Some).map_err(|_| invalid()) }
            };

            let status = match field(4) {
                "matched" => MatchStatus::Matched,
                "unmatched" => MatchStatus::Unmatched,
                _ => return Err(invalid()),
            };
            results.push(MatchResult {
                record: KameRecord {
                    row: field(0).parse().map_err(|_| invalid())?,
                    date: NaiveDate::parse_from_str(field(1), "%Y-%m-%d").map_err(|_| invalid())?,
                    amount: Decimal::from_str(field(2)).map_err(|_| invalid())?,
                    description: field(3).to_string(),
                },
                transaction_row: optional(5)?.map(|r| r as usize),
                status,
                day_distance: optional(6)?,
            });
        }
        Ok(results)
    }

    pub(crate) fn save_reconciliation(&self, results: &[MatchResult]) -> ResultError<()> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(RECONCILIATION_HEADERS)?;
        for r in results {
            writer.write_record([
                r.record.row.to_string(),
                r.record.date.format("%Y-%m-%d").to_string(),
                format_amount(&r.record.amount),
                r.record.description.clone(),
                r.status.to_string(),
                r.transaction_row.map(|row| row.to_string()).unwrap_or_default(),
                r.day_distance.map(|d| d.to_string()).unwrap_or_default(),
            ])?;
        }
        let content = writer.into_inner().map_err(|e| Error::IoError(e.to_string()))?;
        write_atomic(&self.path(RECONCILIATION_FILE), &content)
    }

    pub(crate) fn load_state(&self) -> ResultError<WorkflowState> {
        match self.read_optional(STATE_FILE)? {
            Some(content) => Ok(serde_json::from_slice(&content)?),
            None => Ok(WorkflowState::default()),
        }
    }

    pub(crate) fn save_state(&self, state: &WorkflowState) -> ResultError<()> {
        write_atomic(&self.path(STATE_FILE), &serde_json::to_vec_pretty(state)?)
    }

    /// Remove the model, predictions and reconciliation results. The label history is kept.
    pub(crate) fn discard_derived(&self) -> ResultError<()> {
        for name in [MODEL_FILE, PREDICTIONS_FILE, RECONCILIATION_FILE] {
            let path = self.path(name);
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| Error::IoError(format!("unable to remove {}: {}", path.display(), e)))?;
                info!("Discarded {}", name);
            }
        }
        Ok(())
    }
}
