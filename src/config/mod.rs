use std::fs;
use std::path::{Path, PathBuf};
use log::info;
use serde::Deserialize;
use toml::value::Table;
use crate::common::ResultError;

const APP_DIR: &str = "cartola";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub(crate) struct Config {
    /// Where the datastore keeps its flat files. Defaults to the platform data dir.
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) statement: StatementConfig,
    pub(crate) classifier: ClassifierConfig,
    pub(crate) reconcile: ReconcileConfig,
    /// Keyword suggestion rules, category name to a regex or a list of regexes
    pub(crate) labels: Table,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct StatementConfig {
    pub(crate) decimal_separator: char,
    pub(crate) thousands_separator: char,
    /// How many leading rows are searched for a header row
    pub(crate) header_scan_rows: usize,
    pub(crate) collapse_commissions: bool,
    pub(crate) drop_duplicates: bool,
    pub(crate) layout: ColumnLayout,
}

impl Default for StatementConfig {
    fn default() -> Self {
        StatementConfig {
            decimal_separator: ',',
            thousands_separator: '.',
            header_scan_rows: 50,
            collapse_commissions: true,
            drop_duplicates: true,
            layout: ColumnLayout::default(),
        }
    }
}

/// 0-based column positions used when the statement headers cannot be mapped by name.
/// Defaults follow the Santander cartola export:
/// monto, descripción movimiento, fecha, saldo, n° documento, sucursal, cargo/abono, canal.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct ColumnLayout {
    pub(crate) date: usize,
    pub(crate) description: usize,
    pub(crate) amount: Option<usize>,
    pub(crate) debit_credit: Option<usize>,
    pub(crate) document_number: Option<usize>,
    pub(crate) branch: Option<usize>,
    /// Separate debit and credit amount columns. Both must be set to be used.
    pub(crate) debit_amount: Option<usize>,
    pub(crate) credit_amount: Option<usize>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            date: 2,
            description: 1,
            amount: Some(0),
            debit_credit: Some(6),
            document_number: Some(4),
            branch: Some(5),
            debit_amount: None,
            credit_amount: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct ClassifierConfig {
    pub(crate) min_training_rows: usize,
    pub(crate) min_categories: usize,
    pub(crate) max_features: usize,
    pub(crate) ngram_min: usize,
    pub(crate) ngram_max: usize,
    pub(crate) learning_rate: f64,
    pub(crate) iterations: usize,
    pub(crate) l2_penalty: f64,
    /// Predictions below this probability are flagged for review
    pub(crate) confidence_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            min_training_rows: 4,
            min_categories: 2,
            max_features: 4000,
            ngram_min: 1,
            ngram_max: 2,
            learning_rate: 2.0,
            iterations: 400,
            l2_penalty: 0.0001,
            confidence_threshold: 0.6,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct ReconcileConfig {
    /// Maximum distance in days between a Kame document and its bank movement
    pub(crate) window_days: i64,
    /// Maximum absolute difference between amounts
    pub(crate) amount_tolerance: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            window_days: 3,
            amount_tolerance: 1.0,
        }
    }
}

impl Config {
    pub(crate) fn empty() -> Config {
        Config::default()
    }

    /// Load config from a toml file. A missing file yields the default config.
    pub(crate) fn load_from_file(path: &Path) -> ResultError<Config> {
        if path.exists() && path.is_file() {
            info!("Loading config from {}", path.display());
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::empty())
        }
    }

    /// `<config dir>/cartola/config.toml`
    pub(crate) fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub(crate) fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => match dirs::data_dir() {
                Some(dir) => dir.join(APP_DIR),
                None => PathBuf::from(".").join(APP_DIR),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(r#"
            data_dir = "/tmp/cartola"

            [reconcile]
            window_days = 5

            [statement.layout]
            branch = 7

            [labels]
            combustible = ["copec", "shell"]
            bancario = "comision"
        "#).unwrap();

        assert_eq!(config.data_dir(), PathBuf::from("/tmp/cartola"));
        assert_eq!(config.reconcile.window_days, 5);
        assert_eq!(config.reconcile.amount_tolerance, 1.0);
        assert_eq!(config.statement.layout.branch, Some(7));
        assert_eq!(config.statement.layout.amount, Some(0));
        assert_eq!(config.statement.decimal_separator, ',');
        assert_eq!(config.classifier.min_training_rows, 4);
        assert_eq!(config.labels.len(), 2);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_from_file(Path::new("/nonexistent/cartola.toml")).unwrap();
        assert!(config.labels.is_empty());
        assert_eq!(config.statement.layout, ColumnLayout::default());
    }
}
