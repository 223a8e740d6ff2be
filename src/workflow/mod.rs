use std::fmt;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use crate::common::{Error, ResultError};
use crate::labeller::LabelStats;

/// Where the user is in the statement workflow. Every transition is triggered by a command.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub(crate) enum Stage {
    /// Nothing imported yet
    #[default]
    Empty,
    Imported,
    Labeled { complete: bool },
    Trained,
    Classified,
    Reconciled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Empty => f.write_str("empty"),
            Stage::Imported => f.write_str("imported"),
            Stage::Labeled { complete: false } => f.write_str("labeled (partial)"),
            Stage::Labeled { complete: true } => f.write_str("labeled (complete)"),
            Stage::Trained => f.write_str("trained"),
            Stage::Classified => f.write_str("classified"),
            Stage::Reconciled => f.write_str("reconciled"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ImportInfo {
    pub(crate) source: String,
    pub(crate) md5: String,
    pub(crate) rows: usize,
    pub(crate) imported_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ModelInfo {
    pub(crate) trained_at: NaiveDateTime,
    pub(crate) rows: usize,
    pub(crate) categories: usize,
    pub(crate) training_accuracy: f64,
}

/// Persisted in `state.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub(crate) struct WorkflowState {
    pub(crate) stage: Stage,
    pub(crate) import: Option<ImportInfo>,
    pub(crate) model: Option<ModelInfo>,
    pub(crate) classified_rows: Option<usize>,
    pub(crate) reconciled_with: Option<String>,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl WorkflowState {
    /// A new statement replaces the batch from any stage and discards everything derived from the old one
    pub(crate) fn on_import(&mut self, source: &str, md5: &str, rows: usize) {
        *self = WorkflowState {
            stage: Stage::Imported,
            import: Some(ImportInfo { source: source.to_string(), md5: md5.to_string(), rows, imported_at: now() }),
            model: None,
            classified_rows: None,
            reconciled_with: None,
        };
    }

    fn require_batch(&self, action: &str) -> ResultError<()> {
        if self.stage == Stage::Empty {
            Err(Error::ValidationError(format!("no statement imported, import one before you {}", action)))
        } else {
            Ok(())
        }
    }

    pub(crate) fn on_label(&mut self, stats: &LabelStats) -> ResultError<()> {
        self.require_batch("label")?;
        self.stage = Stage::Labeled { complete: stats.is_complete() };
        Ok(())
    }

    pub(crate) fn on_train(&mut self, rows: usize, categories: usize, training_accuracy: f64) -> ResultError<()> {
        self.require_batch("train")?;
        self.stage = Stage::Trained;
        self.model = Some(ModelInfo { trained_at: now(), rows, categories, training_accuracy });
        self.classified_rows = None;
        Ok(())
    }

    pub(crate) fn on_classify(&mut self, rows: usize) -> ResultError<()> {
        self.require_batch("classify")?;
        if self.model.is_none() {
            return Err(Error::ValidationError("no trained model, run train first".to_string()));
        }
        self.stage = Stage::Classified;
        self.classified_rows = Some(rows);
        Ok(())
    }

    pub(crate) fn on_reconcile(&mut self, kame_source: &str) -> ResultError<()> {
        self.require_batch("reconcile")?;
        self.stage = Stage::Reconciled;
        self.reconciled_with = Some(kame_source.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(labeled: usize, unlabeled: usize) -> LabelStats {
        LabelStats { labeled, unlabeled, per_category: vec![] }
    }

    #[test]
    fn test_full_workflow() {
        let mut state = WorkflowState::default();
        assert!(state.on_label(&stats(1, 1)).is_err());
        assert!(state.on_reconcile("kame.xlsx").is_err());

        state.on_import("cartola.xlsx", "abc", 2);
        assert_eq!(state.stage, Stage::Imported);
        state.on_label(&stats(1, 1)).unwrap();
        assert_eq!(state.stage, Stage::Labeled { complete: false });
        state.on_label(&stats(2, 0)).unwrap();
        assert_eq!(state.stage.to_string(), "labeled (complete)");

        assert!(state.on_classify(2).is_err());
        state.on_train(2, 2, 1.0).unwrap();
        state.on_classify(0).unwrap();
        state.on_reconcile("kame.xlsx").unwrap();
        assert_eq!(state.stage, Stage::Reconciled);
    }

    #[test]
    fn test_import_discards_derived_state() {
        let mut state = WorkflowState::default();
        state.on_import("marzo.xlsx", "abc", 10);
        state.on_train(10, 3, 0.9).unwrap();
        state.on_classify(4).unwrap();
        state.on_reconcile("kame.xlsx").unwrap();

        state.on_import("abril.xlsx", "def", 12);
        assert_eq!(state.stage, Stage::Imported);
        assert!(state.model.is_none());
        assert!(state.classified_rows.is_none());
        assert!(state.reconciled_with.is_none());
        assert_eq!(state.import.as_ref().map(|i| i.rows), Some(12));
    }

    #[test]
    fn test_json_shape() {
        let mut state = WorkflowState::default();
        state.on_import("marzo.xlsx", "abc", 10);
        state.on_label(&stats(3, 7)).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""stage":{"stage":"labeled","complete":false}"#));
        let read: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(read, state);

        let legacy: WorkflowState = serde_json::from_str(r#"{"stage":{"stage":"imported"}}"#).unwrap();
        assert_eq!(legacy.stage, Stage::Imported);
    }
}
