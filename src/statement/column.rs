use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use crate::common::{Error, ResultError};
use crate::config::{ColumnLayout, StatementConfig};
use crate::statement::sheet::{Cell, Grid};
use crate::tokeniser::normalise;
use crate::util::collapse_whitespace;

/// Canonical meaning of a statement column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CanonicalColumn {
    Date,
    Description,
    Amount,
    DebitCredit,
    DocumentNumber,
    Branch,
    DebitAmount,
    CreditAmount,
    Balance,
    Channel,
}

lazy_static! {
    /// Header names seen on Chilean bank exports, matched against the normalised header text.
    /// The first matching pattern wins.
    static ref HEADER_PATTERNS: Vec<(Regex, CanonicalColumn)> = vec![
        (Regex::new(r"^(cargo\s*/\s*abono|cargo o abono|c\s*/\s*a|tipo( de)? movimiento|debe\s*/\s*haber|debit\s*/\s*credit)$").unwrap(), CanonicalColumn::DebitCredit),
        (Regex::new(r"^(cargos|debitos|giros|debe|debit amount)$").unwrap(), CanonicalColumn::DebitAmount),
        (Regex::new(r"^(abonos|creditos|depositos|haber|credit amount)$").unwrap(), CanonicalColumn::CreditAmount),
        (Regex::new(r"^(monto|importe|amount|valor)").unwrap(), CanonicalColumn::Amount),
        (Regex::new(r"descrip|glosa|detalle|concepto|narrative").unwrap(), CanonicalColumn::Description),
        (Regex::new(r"^(fecha|date)").unwrap(), CanonicalColumn::Date),
        (Regex::new(r"documento|^folio|^n\S* ?doc").unwrap(), CanonicalColumn::DocumentNumber),
        (Regex::new(r"sucursal|oficina|branch").unwrap(), CanonicalColumn::Branch),
        (Regex::new(r"saldo|balance").unwrap(), CanonicalColumn::Balance),
        (Regex::new(r"canal|channel").unwrap(), CanonicalColumn::Channel),
    ];

    /// `Cartola`, `Cartola.1`, `Cartola_2` all reduce to `cartola`
    static ref NUMBERED_SUFFIX: Regex = Regex::new(r"[\s._:-]*\d*$").unwrap();
}

pub(crate) fn canonical_column(header: &str) -> Option<CanonicalColumn> {
    let header = collapse_whitespace(&normalise(header));
    HEADER_PATTERNS.iter()
        .find(|(regex, _)| regex.is_match(&header))
        .map(|(_, column)| *column)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MappingSource {
    /// Columns were mapped by header name
    Header,
    /// Columns come from the configured positional layout
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AmountColumns {
    /// One amount column. Its sign, or the debit/credit flag, gives the direction.
    Signed(usize),
    /// Separate columns for money out and money in
    Split { debit: usize, credit: usize },
}

/// Column positions of a statement sheet, 0-based.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnInfo {
    /// Row holding the header. Data starts on the next row.
    pub(crate) header_row: Option<usize>,
    pub(crate) source: MappingSource,
    pub(crate) date_column: usize,
    pub(crate) description_column: usize,
    pub(crate) amount: AmountColumns,
    pub(crate) debit_credit_column: Option<usize>,
    pub(crate) document_number_column: Option<usize>,
    pub(crate) branch_column: Option<usize>,
}

pub(crate) fn detect_columns(grid: &Grid, config: &StatementConfig) -> ResultError<ColumnInfo> {
    let header_row = match find_header_row(grid, config.header_scan_rows) {
        None => {
            info!("No header row found, using positional layout");
            return columns_from_layout(&config.layout, None);
        }
        Some(row) => row,
    };

    if headers_share_prefix(&grid[header_row]) {
        info!("Ambiguous headers on row {}, using positional layout", header_row + 1);
        return columns_from_layout(&config.layout, Some(header_row));
    }

    match columns_from_header(&header_texts(&grid[header_row]), header_row) {
        Ok(columns) => {
            info!("Header row {} mapped by name", header_row + 1);
            Ok(columns)
        }
        Err(e) => {
            warn!("Unable to map headers on row {} by name ({}), using positional layout", header_row + 1, e);
            columns_from_layout(&config.layout, Some(header_row))
        }
    }
}

/// First row within `scan_rows` that reads like a header
pub(crate) fn find_header_row(grid: &Grid, scan_rows: usize) -> Option<usize> {
    grid.iter().take(scan_rows).position(|row| looks_like_header(row))
}

pub(crate) fn looks_like_header(row: &[Cell]) -> bool {
    has_header_keywords(row) || headers_share_prefix(row) || columns_from_header(&header_texts(row), 0).is_ok()
}

/// A row with both an amount and a description heading
fn has_header_keywords(row: &[Cell]) -> bool {
    let texts: Vec<String> = row.iter()
        .filter_map(|c| match c {
            Cell::Text(s) => Some(normalise(s)),
            _ => None,
        })
        .collect();
    texts.iter().any(|t| t.contains("monto") || t.contains("amount")) && texts.iter().any(|t| t.contains("descrip"))
}

/// True when every non-empty cell is text and all of them share one name apart from a numbered suffix.
/// Needs at least three cells, otherwise a title row would qualify.
pub(crate) fn headers_share_prefix(row: &[Cell]) -> bool {
    let mut prefixes = vec![];
    for cell in row.iter().filter(|c| !c.is_empty()) {
        match cell {
            Cell::Text(s) => {
                let lowered = s.trim().to_lowercase();
                prefixes.push(NUMBERED_SUFFIX.replace(&lowered, "").to_string());
            }
            _ => return false,
        }
    }

    prefixes.len() >= 3
        && prefixes[0].chars().any(char::is_alphabetic)
        && prefixes.iter().all(|p| p == &prefixes[0])
}

fn header_texts(row: &[Cell]) -> Vec<String> {
    row.iter().map(Cell::text).collect()
}

/// Map header names to columns. The first column matching a canonical name wins.
pub(crate) fn columns_from_header(headers: &[String], header_row: usize) -> ResultError<ColumnInfo> {
    let mut found: Vec<(CanonicalColumn, usize)> = vec![];
    for (i, header) in headers.iter().enumerate() {
        if header.trim().is_empty() {
            continue;
        }
        if let Some(column) = canonical_column(header) {
            if !found.iter().any(|(c, _)| *c == column) {
                debug!("Column {} '{}' is {:?}", i, header, column);
                found.push((column, i));
            }
        }
    }
    let position = |column: CanonicalColumn| found.iter().find(|(c, _)| *c == column).map(|(_, i)| *i);

    let date_column = position(CanonicalColumn::Date)
        .ok_or_else(|| Error::ParseError("Unable to locate 'fecha' column".to_string()))?;
    let description_column = position(CanonicalColumn::Description)
        .ok_or_else(|| Error::ParseError("Unable to locate 'descripción' column".to_string()))?;

    let amount = match (position(CanonicalColumn::Amount), position(CanonicalColumn::DebitAmount), position(CanonicalColumn::CreditAmount)) {
        (Some(amount), _, _) => AmountColumns::Signed(amount),
        (None, Some(debit), Some(credit)) => AmountColumns::Split { debit, credit },
        (None, Some(_), None) | (None, None, Some(_)) => {
            return Err(Error::ParseError("Unable to locate both 'cargos' and 'abonos' columns".to_string()));
        }
        (None, None, None) => return Err(Error::ParseError("Unable to locate 'monto' column".to_string())),
    };

    Ok(ColumnInfo {
        header_row: Some(header_row),
        source: MappingSource::Header,
        date_column,
        description_column,
        amount,
        debit_credit_column: position(CanonicalColumn::DebitCredit),
        document_number_column: position(CanonicalColumn::DocumentNumber),
        branch_column: position(CanonicalColumn::Branch),
    })
}

pub(crate) fn columns_from_layout(layout: &ColumnLayout, header_row: Option<usize>) -> ResultError<ColumnInfo> {
    let amount = match (layout.debit_amount, layout.credit_amount, layout.amount) {
        (Some(debit), Some(credit), _) => AmountColumns::Split { debit, credit },
        (Some(_), None, _) | (None, Some(_), _) => {
            return Err(Error::ValidationError("layout needs both debit_amount and credit_amount".to_string()));
        }
        (None, None, Some(amount)) => AmountColumns::Signed(amount),
        (None, None, None) => return Err(Error::ValidationError("layout has no amount column".to_string())),
    };

    Ok(ColumnInfo {
        header_row,
        source: MappingSource::Layout,
        date_column: layout.date,
        description_column: layout.description,
        amount,
        debit_credit_column: layout.debit_credit,
        document_number_column: layout.document_number,
        branch_column: layout.branch,
    })
}
