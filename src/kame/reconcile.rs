use std::collections::BTreeMap;
use std::fmt;
use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use crate::common::{Error, ResultError};
use crate::config::ReconcileConfig;
use crate::kame::KameRecord;
use crate::tokeniser::tokenise;
use crate::transaction::Transaction;
use crate::util::{days_between, decimal_from_f64, format_clp};

const HIGH_RISK_AMOUNT: i64 = 1_000_000;
const MEDIUM_RISK_AMOUNT: i64 = 500_000;
const FREQUENT_WORD_MIN_LEN: usize = 4;
const FREQUENT_WORD_MIN_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchStatus {
    Matched,
    Unmatched,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchStatus::Matched => f.write_str("matched"),
            MatchStatus::Unmatched => f.write_str("unmatched"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MatchResult {
    pub(crate) record: KameRecord,
    pub(crate) transaction_row: Option<usize>,
    pub(crate) status: MatchStatus,
    pub(crate) day_distance: Option<i64>,
}

/// A Kame record and a bank movement match when the absolute amounts differ by at most
/// `amount_tolerance` and the dates are at most `window_days` apart in either direction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MatchPolicy {
    pub(crate) window_days: i64,
    pub(crate) amount_tolerance: Decimal,
}

impl MatchPolicy {
    pub(crate) fn from_config(config: &ReconcileConfig) -> ResultError<MatchPolicy> {
        if config.window_days < 0 {
            return Err(Error::ValidationError(format!("window_days must not be negative, got {}", config.window_days)));
        }
        let amount_tolerance = decimal_from_f64(config.amount_tolerance)
            .filter(|t| !t.is_sign_negative())
            .ok_or_else(|| Error::ValidationError(format!("invalid amount_tolerance {}", config.amount_tolerance)))?;
        Ok(MatchPolicy { window_days: config.window_days, amount_tolerance })
    }
}

/// Greedy one-to-one matching of Kame records against debit movements.
/// Records are taken by date, then amount, then row. Each takes the closest debit still free:
/// fewest days apart, then smallest amount difference, then lowest row.
/// Results come out in that processing order.
pub(crate) fn reconcile(transactions: &[Transaction], records: &[KameRecord], policy: &MatchPolicy) -> Vec<MatchResult> {
    let mut order: Vec<&KameRecord> = records.iter().collect();
    order.sort_by(|a, b| a.date.cmp(&b.date)
        .then_with(|| a.amount.abs().cmp(&b.amount.abs()))
        .then_with(|| a.row.cmp(&b.row)));

    let debits: Vec<&Transaction> = transactions.iter().filter(|t| t.is_debit()).collect();
    let mut taken = vec![false; debits.len()];

    let mut results = Vec::with_capacity(records.len());
    for record in order {
        let target = record.amount.abs();
        let mut best: Option<(i64, Decimal, usize, usize)> = None;
        for (i, t) in debits.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let difference = (t.amount.abs() - target).abs();
            let days = days_between(t.date, record.date);
            if difference > policy.amount_tolerance || days > policy.window_days {
                continue;
            }
            let candidate = (days, difference, t.row, i);
            if best.map_or(true, |b| (candidate.0, candidate.1, candidate.2) < (b.0, b.1, b.2)) {
                best = Some(candidate);
            }
        }

        let result = match best {
            Some((days, _, row, i)) => {
                taken[i] = true;
                MatchResult { record: record.clone(), transaction_row: Some(row), status: MatchStatus::Matched, day_distance: Some(days) }
            }
            None => MatchResult { record: record.clone(), transaction_row: None, status: MatchStatus::Unmatched, day_distance: None },
        };
        results.push(result);
    }

    let matched = results.iter().filter(|r| r.status == MatchStatus::Matched).count();
    info!("{} of {} Kame records matched a bank movement", matched, results.len());
    results
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReconciliationSummary {
    pub(crate) total: usize,
    pub(crate) matched: usize,
    pub(crate) unmatched: usize,
    /// Percent of Kame records backed by a bank movement
    pub(crate) backing_rate: f64,
    pub(crate) unmatched_amount: Decimal,
    pub(crate) date_range: Option<(NaiveDate, NaiveDate)>,
    /// Bank debits no Kame record points at. Informational only.
    pub(crate) unreferenced_debits: usize,
    pub(crate) frequent_words: Vec<(String, usize)>,
    pub(crate) recommendations: Vec<String>,
}

pub(crate) fn summarize(results: &[MatchResult], transactions: &[Transaction]) -> ReconciliationSummary {
    let total = results.len();
    let unmatched: Vec<&MatchResult> = results.iter().filter(|r| r.status == MatchStatus::Unmatched).collect();
    let matched = total - unmatched.len();
    let backing_rate = if total > 0 { matched as f64 * 100.0 / total as f64 } else { 0.0 };
    let unmatched_amount: Decimal = unmatched.iter().map(|r| r.record.amount.abs()).sum();

    let date_range = results.iter().map(|r| r.record.date).min()
        .zip(results.iter().map(|r| r.record.date).max());

    let debits = transactions.iter().filter(|t| t.is_debit()).count();

    let frequent_words = frequent_words(unmatched.iter().map(|r| r.record.description.as_str()));
    let recommendations = recommendations(unmatched.len(), &unmatched_amount, &frequent_words);

    ReconciliationSummary {
        total,
        matched,
        unmatched: unmatched.len(),
        backing_rate,
        unmatched_amount,
        date_range,
        unreferenced_debits: debits.saturating_sub(matched),
        frequent_words,
        recommendations,
    }
}

/// Words of at least four letters seen at least twice, most frequent first
fn frequent_words<'a>(descriptions: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for description in descriptions {
        for word in tokenise(description) {
            if word.chars().count() >= FREQUENT_WORD_MIN_LEN {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }
    let mut words: Vec<(String, usize)> = counts.into_iter().filter(|(_, n)| *n >= FREQUENT_WORD_MIN_COUNT).collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words
}

fn recommendations(unmatched: usize, unmatched_amount: &Decimal, frequent_words: &[(String, usize)]) -> Vec<String> {
    if unmatched == 0 {
        return vec!["Every Kame record is backed by a bank movement".to_string()];
    }

    let mut recommendations = vec![format!("{} Kame records have no supporting bank movement", unmatched)];
    if *unmatched_amount > Decimal::from(HIGH_RISK_AMOUNT) {
        recommendations.push(format!("High risk: unsupported amount exceeds {}", format_clp(&Decimal::from(HIGH_RISK_AMOUNT))));
    } else if *unmatched_amount > Decimal::from(MEDIUM_RISK_AMOUNT) {
        recommendations.push(format!("Medium risk: unsupported amount exceeds {}", format_clp(&Decimal::from(MEDIUM_RISK_AMOUNT))));
    }
    if !frequent_words.is_empty() {
        let words: Vec<&str> = frequent_words.iter().take(3).map(|(w, _)| w.as_str()).collect();
        recommendations.push(format!("Frequent words in unsupported records: {}", words.join(", ")));
    }
    recommendations
}
