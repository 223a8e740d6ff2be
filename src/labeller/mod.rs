use std::collections::{BTreeMap, HashMap};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use rust_decimal::Decimal;
use toml::Value;
use crate::common::{Error, ResultError};
use crate::config::Config;
use crate::transaction::{DebitCredit, Transaction};
use crate::util::collapse_whitespace;

/// Categories are free-form. `"  Gastos   Bancarios "` becomes `"gastos bancarios"`.
pub(crate) fn normalise_category(raw: &str) -> ResultError<String> {
    let category = collapse_whitespace(raw).to_lowercase();
    if category.is_empty() {
        Err(Error::ValidationError("category must not be empty".to_string()))
    } else {
        Ok(category)
    }
}

/// Keywords used when the config has no `[labels]` table. Matched as plain substrings, ignoring case.
const DEFAULT_RULES: [(&str, &[&str]); 8] = [
    ("bordados", &["bordado", "textil", "tela", "hilo", "aguja", "maquina", "costura"]),
    ("contabilidad", &["contabilidad", "contador", "contable", "tributario", "declaracion", "impuesto", "iva",
        "renta", "sii", "tesoreria", "previred", "honorarios", "asesor"]),
    ("servicios", &["servicio", "mantencion", "reparacion", "instalacion", "consultoria", "asesoria", "auditoria",
        "capacitacion", "entrenamiento"]),
    ("combustible", &["combustible", "bencina", "petroleo", "gasolina", "diesel", "copec", "shell", "esso",
        "petrobras", "estacion"]),
    ("alimentacion", &["almuerzo", "desayuno", "cena", "restaurant", "comida", "supermercado", "unimarc", "lider",
        "jumbo", "santa isabel"]),
    ("tecnologia", &["computador", "notebook", "software", "licencia", "microsoft", "google", "amazon", "hosting",
        "dominio", "internet", "wifi"]),
    ("bancario", &["comision", "mantencion", "cargo", "interes", "cuota", "banco", "santander", "bci", "scotia"]),
    ("impuestos", &["impuesto", "contribucion", "patente", "municipal", "sii", "tesoreria", "multa", "tag",
        "transito"]),
];

/// Keyword suggestion service, built from the `[labels]` config table.
/// Without one the built-in keywords are used, a configured table replaces them entirely.
pub(crate) struct Labeller {
    label_regex_map: BTreeMap<String, Vec<Regex>>,
}

impl Labeller {
    pub(crate) fn new(config: &Config) -> ResultError<Labeller> {
        if config.labels.is_empty() {
            debug!("No [labels] rules configured, using the built-in keywords");
            return Ok(Labeller::builtin());
        }

        let mut label_regex_map = BTreeMap::new();
        for (label, value) in &config.labels {
            let patterns: Vec<&str> = match value {
                Value::Array(regex_array) => regex_array.iter().filter_map(Value::as_str).collect(),
                Value::String(regex) => vec![regex.as_str()],
                _ => vec![],
            };

            let mut label_regex_vec = vec![];
            for pattern in patterns {
                let regex = Regex::new(&format!("(?i){}", pattern))
                    .map_err(|e| Error::ValidationError(format!("invalid rule for '{}': {}", label, e)))?;
                label_regex_vec.push(regex);
            }
            label_regex_map.insert(normalise_category(label)?, label_regex_vec);
        }

        Ok(Labeller { label_regex_map })
    }

    fn builtin() -> Labeller {
        let label_regex_map = DEFAULT_RULES.iter()
            .map(|(label, keywords)| {
                let regex_vec = keywords.iter()
                    .filter_map(|k| Regex::new(&format!("(?i){}", regex::escape(k))).ok())
                    .collect();
                (label.to_string(), regex_vec)
            })
            .collect();
        Labeller { label_regex_map }
    }

    /// Every category with at least one matching rule, with its number of matches
    pub(crate) fn label(&self, description: &str) -> Vec<(String, usize)> {
        let mut labels = vec![];
        for (label, regex_vec) in &self.label_regex_map {
            let matches = regex_vec.iter().filter(|r| r.is_match(description)).count();
            if matches > 0 {
                labels.push((label.clone(), matches));
            }
        }
        labels
    }

    /// The category with the most matching rules. Ties go to the first name in order.
    pub(crate) fn suggest(&self, description: &str) -> Option<String> {
        let mut best: Option<(String, usize)> = None;
        for (label, matches) in self.label(description) {
            match &best {
                Some((_, best_matches)) if *best_matches >= matches => {}
                _ => best = Some((label, matches)),
            }
        }
        best.map(|(label, _)| label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Suggestion {
    pub(crate) row: usize,
    pub(crate) description: String,
    pub(crate) category: String,
}

/// How well the keyword rules cover the rows still without a label
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnlabeledAnalysis {
    pub(crate) unlabeled: usize,
    pub(crate) suggestions: Vec<Suggestion>,
}

impl UnlabeledAnalysis {
    pub(crate) fn without_suggestion(&self) -> usize {
        self.unlabeled - self.suggestions.len()
    }

    /// Percentage of the unlabeled rows with a suggestion
    pub(crate) fn suggestion_rate(&self) -> f64 {
        if self.unlabeled == 0 {
            0.0
        } else {
            self.suggestions.len() as f64 * 100.0 / self.unlabeled as f64
        }
    }

    /// Most suggested first, ties by name
    pub(crate) fn per_category(&self) -> Vec<(String, usize)> {
        count_sorted(self.suggestions.iter().map(|s| s.category.as_str()))
    }
}

pub(crate) fn analyze_unlabeled(labeller: &Labeller, transactions: &[Transaction]) -> UnlabeledAnalysis {
    let mut unlabeled = 0;
    let mut suggestions = vec![];
    for t in transactions.iter().filter(|t| t.category.is_none()) {
        unlabeled += 1;
        if let Some(category) = labeller.suggest(&t.description) {
            suggestions.push(Suggestion { row: t.row, description: t.description.clone(), category });
        }
    }
    UnlabeledAnalysis { unlabeled, suggestions }
}

lazy_static! {
    static ref LEADING_NUMBERS: Regex = Regex::new(r"^[\d\s\-\.]+").unwrap();
}

/// Lowercase without leading document numbers: `"0012345 PAGO  ENEL"` becomes `"pago enel"`
pub(crate) fn clean_description(description: &str) -> String {
    let lower = description.to_lowercase();
    collapse_whitespace(&LEADING_NUMBERS.replace(&lower, ""))
}

/// Cleaned descriptions seen at least `min_frequency` times, most frequent first
pub(crate) fn frequent_descriptions<'a>(descriptions: impl IntoIterator<Item = &'a str>,
                                        min_frequency: usize) -> Vec<(String, usize)> {
    let cleaned: Vec<String> = descriptions.into_iter()
        .map(clean_description)
        .filter(|d| !d.is_empty())
        .collect();
    count_sorted(cleaned.iter().map(String::as_str)).into_iter()
        .filter(|(_, count)| *count >= min_frequency)
        .collect()
}

fn count_sorted<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut counted: Vec<(String, usize)> = counts.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
    counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counted
}

/// A labeled movement in the label history
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LabeledExample {
    pub(crate) key: String,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    pub(crate) debit_credit: DebitCredit,
    pub(crate) category: String,
}

impl LabeledExample {
    pub(crate) fn from_transaction(t: &Transaction, category: &str) -> LabeledExample {
        LabeledExample {
            key: t.key(),
            date: t.date,
            description: t.description.clone(),
            amount: t.amount,
            debit_credit: t.debit_credit,
            category: category.to_string(),
        }
    }
}

/// Label history across every imported batch. Only grows, an edited label replaces the previous one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LabeledDataset {
    pub(crate) examples: Vec<LabeledExample>,
}

impl LabeledDataset {
    pub(crate) fn new(examples: Vec<LabeledExample>) -> LabeledDataset {
        LabeledDataset { examples }
    }

    pub(crate) fn len(&self) -> usize {
        self.examples.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub(crate) fn upsert(&mut self, example: LabeledExample) {
        match self.examples.iter_mut().find(|e| e.key == example.key) {
            Some(existing) => existing.category = example.category,
            None => self.examples.push(example),
        }
    }

    /// Distinct categories in first-seen order
    pub(crate) fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = vec![];
        for e in &self.examples {
            if !categories.contains(&e.category) {
                categories.push(e.category.clone());
            }
        }
        categories
    }
}

/// Set the category of the given rows and record it in the label history.
/// Every row is checked before anything changes.
pub(crate) fn set_category(transactions: &mut [Transaction], dataset: &mut LabeledDataset, rows: &[usize],
                           raw_category: &str) -> ResultError<String> {
    let category = normalise_category(raw_category)?;
    if let Some(row) = rows.iter().find(|&&r| r >= transactions.len()) {
        return Err(Error::ValidationError(format!("unknown row {}, the batch has {} rows", row, transactions.len())));
    }

    for &row in rows {
        let t = &mut transactions[row];
        debug!("Labelling row {} '{}' as '{}'", row, t.description, category);
        t.category = Some(category.clone());
        dataset.upsert(LabeledExample::from_transaction(t, &category));
    }
    Ok(category)
}

/// Attach persisted labels to rows of a new batch describing the same movement. Returns how many were attached.
pub(crate) fn reattach_labels(transactions: &mut [Transaction], dataset: &LabeledDataset) -> usize {
    let by_key: HashMap<&str, &str> = dataset.examples.iter()
        .map(|e| (e.key.as_str(), e.category.as_str()))
        .collect();

    let mut attached = 0;
    for t in transactions.iter_mut() {
        if let Some(category) = by_key.get(t.key().as_str()) {
            t.category = Some(category.to_string());
            attached += 1;
        }
    }
    if attached > 0 {
        info!("{} labels re-attached from history", attached);
    }
    attached
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LabelStats {
    pub(crate) labeled: usize,
    pub(crate) unlabeled: usize,
    /// Most used first, ties by name
    pub(crate) per_category: Vec<(String, usize)>,
}

impl LabelStats {
    pub(crate) fn is_complete(&self) -> bool {
        self.unlabeled == 0 && self.labeled > 0
    }
}

pub(crate) fn stats(transactions: &[Transaction]) -> LabelStats {
    let per_category = count_sorted(transactions.iter().filter_map(|t| t.category.as_deref()));
    let labeled: usize = per_category.iter().map(|(_, n)| n).sum();

    LabelStats { labeled, unlabeled: transactions.len() - labeled, per_category }
}
