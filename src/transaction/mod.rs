use std::fmt;
use std::str::FromStr;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::util::{collapse_whitespace, format_amount};

/// Direction of a bank movement. Cargo takes money out of the account, abono puts money in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DebitCredit {
    Debit,
    Credit,
}

impl DebitCredit {
    /// Recognise the bank's own codes, e.g. `CARGO`, `C`, `ABONO`, `A`
    pub(crate) fn from_code(code: &str) -> Option<DebitCredit> {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "CARGO" | "CARGOS" | "C" | "DEBIT" | "DEBITO" | "DÉBITO" | "D" => Some(DebitCredit::Debit),
            "ABONO" | "ABONOS" | "A" | "CREDIT" | "CREDITO" | "CRÉDITO" => Some(DebitCredit::Credit),
            _ => None,
        }
    }

    /// Zero amounts carry no direction
    pub(crate) fn from_amount(amount: &Decimal) -> Option<DebitCredit> {
        if amount.is_zero() {
            None
        } else if amount.is_sign_negative() {
            Some(DebitCredit::Debit)
        } else {
            Some(DebitCredit::Credit)
        }
    }

    pub(crate) fn sign(&self) -> Decimal {
        match self {
            DebitCredit::Debit => Decimal::NEGATIVE_ONE,
            DebitCredit::Credit => Decimal::ONE,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            DebitCredit::Debit => "debit",
            DebitCredit::Credit => "credit",
        }
    }
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebitCredit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebitCredit::from_code(s).ok_or_else(|| format!("unknown debit/credit flag '{}'", s))
    }
}

/// A normalized bank movement. `row` is its position within the imported statement batch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Transaction {
    pub(crate) row: usize,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    pub(crate) debit_credit: DebitCredit,
    pub(crate) document_number: String,
    pub(crate) branch: String,
    pub(crate) category: Option<String>,
}

impl Transaction {
    pub(crate) fn new(row: usize, date: NaiveDate, description: &str, amount: Decimal, debit_credit: DebitCredit,
                      document_number: &str, branch: &str) -> Transaction {
        Transaction {
            row,
            date,
            description: collapse_whitespace(description),
            amount,
            debit_credit,
            document_number: document_number.trim().to_string(),
            branch: collapse_whitespace(branch),
            category: None,
        }
    }

    /// Content key of the movement, used to re-attach labels when a later batch contains the same row
    pub(crate) fn key(&self) -> String {
        transaction_key(self.date, &self.description, &self.amount, self.debit_credit, &self.document_number)
    }

    pub(crate) fn is_debit(&self) -> bool {
        self.debit_credit == DebitCredit::Debit
    }

    /// `amount < 0` exactly when the movement is a debit
    pub(crate) fn sign_consistent(&self) -> bool {
        self.amount.is_sign_negative() == self.is_debit() && !self.amount.is_zero()
    }
}

pub(crate) fn transaction_key(date: NaiveDate, description: &str, amount: &Decimal, debit_credit: DebitCredit,
                              document_number: &str) -> String {
    let key = format!("{}|{}|{}|{}|{}", date.format("%Y-%m-%d"), description.to_lowercase(), format_amount(amount),
                      debit_credit, document_number);
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Totals over a batch. Expense amounts are negative, `expense_total` is their signed sum.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FinancialSummary {
    pub(crate) transactions: usize,
    pub(crate) income: usize,
    pub(crate) expenses: usize,
    pub(crate) income_total: Decimal,
    pub(crate) expense_total: Decimal,
    pub(crate) min_amount: Decimal,
    pub(crate) max_amount: Decimal,
    pub(crate) mean_amount: Decimal,
    pub(crate) first_date: NaiveDate,
    pub(crate) last_date: NaiveDate,
}

/// `None` for an empty batch
pub(crate) fn financial_summary(transactions: &[Transaction]) -> Option<FinancialSummary> {
    let first = transactions.first()?;
    let mut summary = FinancialSummary {
        transactions: transactions.len(),
        income: 0,
        expenses: 0,
        income_total: Decimal::ZERO,
        expense_total: Decimal::ZERO,
        min_amount: first.amount,
        max_amount: first.amount,
        mean_amount: Decimal::ZERO,
        first_date: first.date,
        last_date: first.date,
    };
    for t in transactions {
        if t.is_debit() {
            summary.expenses += 1;
            summary.expense_total += t.amount;
        } else {
            summary.income += 1;
            summary.income_total += t.amount;
        }
        summary.min_amount = summary.min_amount.min(t.amount);
        summary.max_amount = summary.max_amount.max(t.amount);
        summary.first_date = summary.first_date.min(t.date);
        summary.last_date = summary.last_date.max(t.date);
    }
    summary.mean_amount = (summary.income_total + summary.expense_total) / Decimal::from(transactions.len());
    Some(summary)
}
