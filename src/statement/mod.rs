pub(crate) mod sheet;
pub(crate) mod cell;
pub(crate) mod column;

#[cfg(test)]
pub(crate) mod tests;

use std::collections::HashSet;
use std::path::Path;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use rust_decimal::Decimal;
use crate::common::{Error, ResultError};
use crate::config::StatementConfig;
use crate::statement::cell::{parse_amount, parse_date, NumberFormat};
use crate::statement::column::{detect_columns, looks_like_header, AmountColumns, ColumnInfo, MappingSource};
use crate::statement::sheet::{cell_at, read_grid, Cell, Grid};
use crate::tokeniser::normalise;
use crate::transaction::{DebitCredit, Transaction};
use crate::util::collapse_whitespace;

/// Row-level issues kept for display, the counters keep counting past it
const MAX_ISSUES: usize = 20;

lazy_static! {
    static ref SUMMARY_ROW: Regex = Regex::new(r"^((sub)?total(es)?|saldos?|resumen)\b").unwrap();

    static ref COMMISSION: Regex = Regex::new(r"\bcom\.?\s*manten|comision|gastos?\s+bancarios?|cargos?\s+por\s+servicio|mantencion").unwrap();
}

/// What happened to every row of an imported sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ImportReport {
    pub(crate) source: String,
    pub(crate) mapping: Option<MappingSource>,
    pub(crate) rows_scanned: usize,
    pub(crate) imported: usize,
    pub(crate) preamble: usize,
    pub(crate) blank: usize,
    pub(crate) summary: usize,
    pub(crate) header_repeats: usize,
    pub(crate) invalid_date: usize,
    pub(crate) invalid_amount: usize,
    pub(crate) missing_description: usize,
    pub(crate) missing_debit_credit: usize,
    pub(crate) zero_amount: usize,
    pub(crate) duplicates: usize,
    pub(crate) collapsed_commissions: usize,
    pub(crate) issues: Vec<String>,
}

impl ImportReport {
    fn new(source: &str) -> ImportReport {
        ImportReport { source: source.to_string(), ..Default::default() }
    }

    pub(crate) fn dropped(&self) -> usize {
        self.preamble + self.blank + self.summary + self.header_repeats + self.invalid_date + self.invalid_amount
            + self.missing_description + self.missing_debit_credit + self.zero_amount + self.duplicates
            + self.collapsed_commissions
    }

    /// Rows dropped because a required field could not be read
    pub(crate) fn invalid(&self) -> usize {
        self.invalid_date + self.invalid_amount + self.missing_description + self.missing_debit_credit + self.zero_amount
    }

    fn add_issue(&mut self, sheet_row: usize, reason: DropReason) {
        match reason {
            DropReason::InvalidDate => self.invalid_date += 1,
            DropReason::InvalidAmount => self.invalid_amount += 1,
            DropReason::MissingDescription => self.missing_description += 1,
            DropReason::MissingDebitCredit => self.missing_debit_credit += 1,
            DropReason::ZeroAmount => self.zero_amount += 1,
        }
        let message = format!("row {}: {}", sheet_row + 1, reason.message());
        debug!("Dropping {}", message);
        if self.issues.len() < MAX_ISSUES {
            self.issues.push(message);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    InvalidDate,
    InvalidAmount,
    MissingDescription,
    MissingDebitCredit,
    ZeroAmount,
}

impl DropReason {
    fn message(&self) -> &'static str {
        match self {
            DropReason::InvalidDate => "invalid date",
            DropReason::InvalidAmount => "invalid amount",
            DropReason::MissingDescription => "missing description",
            DropReason::MissingDebitCredit => "unrecognised cargo/abono flag",
            DropReason::ZeroAmount => "zero amount",
        }
    }
}

/// A normalized statement batch
#[derive(Debug, Clone)]
pub(crate) struct Statement {
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) report: ImportReport,
}

/// Parsed row before cleaning, keeps its sheet position for messages
#[derive(Debug, Clone)]
struct ParsedRow {
    sheet_row: usize,
    date: NaiveDate,
    description: String,
    amount: Decimal,
    debit_credit: DebitCredit,
    document_number: String,
    branch: String,
}

pub(crate) fn read_statement(path: &Path, config: &StatementConfig) -> ResultError<Statement> {
    let grid = read_grid(path)?;
    normalize_grid(&grid, config, &path.display().to_string())
}

/// Turn a sheet into the canonical transaction table.
/// Fails only when the layout cannot be detected or no valid transaction is left.
pub(crate) fn normalize_grid(grid: &Grid, config: &StatementConfig, source: &str) -> ResultError<Statement> {
    let mut report = ImportReport::new(source);
    report.rows_scanned = grid.len();

    let columns = detect_columns(grid, config)?;
    report.mapping = Some(columns.source);
    let format = NumberFormat::from_config(config);

    let start = columns.header_row.map(|r| r + 1).unwrap_or(0);
    report.preamble = start.min(grid.len());

    let mut parsed: Vec<ParsedRow> = vec![];
    let mut last_date: Option<NaiveDate> = None;
    for (i, row) in grid.iter().enumerate().skip(start) {
        if row.iter().all(Cell::is_empty) {
            report.blank += 1;
            continue;
        }
        if is_summary_row(row, columns.date_column) {
            report.summary += 1;
            continue;
        }
        if looks_like_header(row) {
            report.header_repeats += 1;
            continue;
        }

        match parse_row(i, row, &columns, &format, last_date) {
            Ok(p) => {
                last_date = Some(p.date);
                parsed.push(p);
            }
            // Without a header, the title block above the first movement is not data
            Err(_) if columns.header_row.is_none() && parsed.is_empty() => report.preamble += 1,
            Err(reason) => report.add_issue(i, reason),
        }
    }

    if config.collapse_commissions {
        parsed = collapse_commissions(parsed, &mut report);
    }
    if config.drop_duplicates {
        parsed = drop_duplicates(parsed, &mut report);
    }

    if parsed.is_empty() {
        return Err(Error::ParseError(format!("No valid transactions found in {}", source)));
    }

    let transactions: Vec<Transaction> = parsed.into_iter()
        .enumerate()
        .map(|(row, p)| Transaction::new(row, p.date, &p.description, p.amount, p.debit_credit, &p.document_number, &p.branch))
        .collect();
    report.imported = transactions.len();

    info!("{} transactions read from {}", report.imported, source);
    if report.invalid() > 0 {
        warn!("{} rows dropped from {} with invalid fields", report.invalid(), source);
    }

    Ok(Statement { transactions, report })
}

/// Totals and balance lines: a cell opening with a summary word and no readable date.
/// A dated row is a movement even when its description reads `SALDO A FAVOR`.
fn is_summary_row(row: &[Cell], date_column: usize) -> bool {
    if parse_date(cell_at(row, date_column)).is_some() {
        return false;
    }
    row.iter().any(|c| match c {
        Cell::Text(s) => SUMMARY_ROW.is_match(&normalise(s.trim())),
        _ => false,
    })
}

fn parse_row(sheet_row: usize, row: &[Cell], columns: &ColumnInfo, format: &NumberFormat,
             last_date: Option<NaiveDate>) -> Result<ParsedRow, DropReason> {
    let date_cell = cell_at(row, columns.date_column);
    let date = if date_cell.is_empty() {
        // Vertically merged date cell
        last_date.ok_or(DropReason::InvalidDate)?
    } else {
        parse_date(date_cell).ok_or(DropReason::InvalidDate)?
    };

    let description = collapse_whitespace(&cell_at(row, columns.description_column).text());
    if description.is_empty() {
        return Err(DropReason::MissingDescription);
    }

    let (amount, debit_credit) = match columns.amount {
        AmountColumns::Signed(column) => {
            let amount = parse_amount(cell_at(row, column), format).ok_or(DropReason::InvalidAmount)?;
            if amount.is_zero() {
                return Err(DropReason::ZeroAmount);
            }
            match columns.debit_credit_column {
                Some(flag_column) => {
                    let debit_credit = DebitCredit::from_code(&cell_at(row, flag_column).text())
                        .ok_or(DropReason::MissingDebitCredit)?;
                    (amount.abs() * debit_credit.sign(), debit_credit)
                }
                None => (amount, DebitCredit::from_amount(&amount).ok_or(DropReason::ZeroAmount)?),
            }
        }
        AmountColumns::Split { debit, credit } => split_amount(cell_at(row, debit), cell_at(row, credit), format)?,
    };

    Ok(ParsedRow {
        sheet_row,
        date,
        description,
        amount,
        debit_credit,
        document_number: optional_text(row, columns.document_number_column),
        branch: optional_text(row, columns.branch_column),
    })
}

/// The non-empty column decides the direction
fn split_amount(debit: &Cell, credit: &Cell, format: &NumberFormat) -> Result<(Decimal, DebitCredit), DropReason> {
    let read = |cell: &Cell| -> Result<Option<Decimal>, DropReason> {
        if cell.is_empty() {
            Ok(None)
        } else {
            parse_amount(cell, format).map(Some).ok_or(DropReason::InvalidAmount)
        }
    };
    let non_zero = |v: Option<Decimal>| v.filter(|d| !d.is_zero());

    let (debit_value, credit_value) = (read(debit)?, read(credit)?);
    match (non_zero(debit_value), non_zero(credit_value)) {
        (Some(d), None) => Ok((-d.abs(), DebitCredit::Debit)),
        (None, Some(c)) => Ok((c.abs(), DebitCredit::Credit)),
        (Some(_), Some(_)) => Err(DropReason::InvalidAmount),
        (None, None) if debit_value.is_some() || credit_value.is_some() => Err(DropReason::ZeroAmount),
        (None, None) => Err(DropReason::InvalidAmount),
    }
}

fn optional_text(row: &[Cell], column: Option<usize>) -> String {
    match column {
        Some(c) => match cell_at(row, c) {
            // Document numbers read from workbooks come back as floats
            Cell::Number(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            other => other.text(),
        },
        None => String::new(),
    }
}

pub(crate) fn is_commission(description: &str) -> bool {
    COMMISSION.is_match(&normalise(description))
}

/// Commission lines sharing a date and description collapse into the one with the largest amount
fn collapse_commissions(rows: Vec<ParsedRow>, report: &mut ImportReport) -> Vec<ParsedRow> {
    let group_key = |r: &ParsedRow| (r.date, collapse_whitespace(&normalise(&r.description)));

    let mut keep = vec![true; rows.len()];
    for (i, row) in rows.iter().enumerate() {
        if !keep[i] || !is_commission(&row.description) {
            continue;
        }
        let key = group_key(row);
        let group: Vec<usize> = (i..rows.len())
            .filter(|&j| keep[j] && is_commission(&rows[j].description) && group_key(&rows[j]) == key)
            .collect();
        if group.len() < 2 {
            continue;
        }
        let mut largest = group[0];
        for &j in &group[1..] {
            if rows[j].amount.abs() > rows[largest].amount.abs() {
                largest = j;
            }
        }
        for &j in &group {
            if j != largest {
                keep[j] = false;
                report.collapsed_commissions += 1;
                debug!("Collapsing commission on row {} into row {}", rows[j].sheet_row + 1, rows[largest].sheet_row + 1);
            }
        }
    }

    rows.into_iter().zip(keep).filter_map(|(r, k)| if k { Some(r) } else { None }).collect()
}

/// Same date, description, amount and direction. The first one is kept.
fn drop_duplicates(rows: Vec<ParsedRow>, report: &mut ImportReport) -> Vec<ParsedRow> {
    let mut seen = HashSet::new();
    let mut kept = vec![];
    for row in rows {
        let key = (row.date, row.description.clone(), row.amount.normalize(), row.debit_credit);
        if seen.insert(key) {
            kept.push(row);
        } else {
            debug!("Dropping duplicate on row {}", row.sheet_row + 1);
            report.duplicates += 1;
        }
    }
    kept
}
