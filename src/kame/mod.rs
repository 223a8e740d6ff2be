pub(crate) mod reconcile;

use std::path::Path;
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use crate::common::{Error, ResultError};
use crate::statement::cell::{parse_amount, parse_date, NumberFormat};
use crate::statement::sheet::{cell_at, read_grid, Cell, Grid};
use crate::tokeniser::normalise;
use crate::util::collapse_whitespace;

/// Header keywords in priority order. `total` includes IVA, so it is preferred to `neto`.
const AMOUNT_KEYWORDS: [&str; 4] = ["total", "monto", "valor", "neto"];
const DATE_KEYWORDS: [&str; 2] = ["fecha", "date"];
const DESCRIPTION_KEYWORDS: [&str; 4] = ["glosa", "descrip", "detalle", "razon"];

/// How many leading rows may precede the header row
const HEADER_SCAN_ROWS: usize = 20;

/// A document from the Kame accounting report. Never modified after loading.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KameRecord {
    pub(crate) row: usize,
    pub(crate) date: NaiveDate,
    pub(crate) amount: Decimal,
    pub(crate) description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct KameReport {
    pub(crate) source: String,
    pub(crate) rows_scanned: usize,
    pub(crate) loaded: usize,
    pub(crate) blank: usize,
    pub(crate) missing_date: usize,
    pub(crate) missing_amount: usize,
    pub(crate) amount_column: String,
    pub(crate) date_column: String,
    pub(crate) description_column: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct KameFile {
    pub(crate) records: Vec<KameRecord>,
    pub(crate) report: KameReport,
}

pub(crate) fn read_kame(path: &Path) -> ResultError<KameFile> {
    let grid = read_grid(path)?;
    records_from_grid(&grid, &path.display().to_string())
}

/// `Razón Social` becomes `razon_social`
pub(crate) fn normalise_header(header: &str) -> String {
    collapse_whitespace(&normalise(header)).replace(' ', "_")
}

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    keywords.iter()
        .find_map(|keyword| headers.iter().position(|h| h.contains(keyword)))
}

struct KameColumns {
    header_row: usize,
    date: usize,
    amount: usize,
    description: Option<usize>,
}

fn find_columns(grid: &Grid) -> Option<KameColumns> {
    for (i, row) in grid.iter().enumerate().take(HEADER_SCAN_ROWS) {
        let headers: Vec<String> = row.iter().map(|c| normalise_header(&c.text())).collect();
        let date = find_column(&headers, &DATE_KEYWORDS);
        let amount = find_column(&headers, &AMOUNT_KEYWORDS);
        if let (Some(date), Some(amount)) = (date, amount) {
            return Some(KameColumns { header_row: i, date, amount, description: find_column(&headers, &DESCRIPTION_KEYWORDS) });
        }
    }
    None
}

pub(crate) fn records_from_grid(grid: &Grid, source: &str) -> ResultError<KameFile> {
    let columns = find_columns(grid)
        .ok_or_else(|| Error::ParseError(format!("Unable to locate fecha and total columns in {}", source)))?;

    let header = &grid[columns.header_row];
    let mut report = KameReport {
        source: source.to_string(),
        rows_scanned: grid.len(),
        amount_column: cell_at(header, columns.amount).text(),
        date_column: cell_at(header, columns.date).text(),
        description_column: columns.description.map(|c| cell_at(header, c).text()),
        ..Default::default()
    };
    debug!("Kame columns: date '{}', amount '{}', description {:?}",
           report.date_column, report.amount_column, report.description_column);

    let format = NumberFormat::chilean();
    let mut records = vec![];
    for (i, row) in grid.iter().enumerate().skip(columns.header_row + 1) {
        if row.iter().all(Cell::is_empty) {
            report.blank += 1;
            continue;
        }
        let date = match parse_date(cell_at(row, columns.date)) {
            Some(date) => date,
            None => {
                debug!("Kame row {} has no date", i + 1);
                report.missing_date += 1;
                continue;
            }
        };
        let amount = match parse_amount(cell_at(row, columns.amount), &format) {
            Some(amount) => amount,
            None => {
                debug!("Kame row {} has no amount", i + 1);
                report.missing_amount += 1;
                continue;
            }
        };
        let description = columns.description
            .map(|c| collapse_whitespace(&cell_at(row, c).text()))
            .unwrap_or_default();

        records.push(KameRecord { row: records.len(), date, amount, description });
    }

    report.loaded = records.len();
    info!("{} Kame records read from {}", report.loaded, source);
    let dropped = report.missing_date + report.missing_amount;
    if dropped > 0 {
        warn!("{} Kame rows dropped without date or amount", dropped);
    }

    Ok(KameFile { records, report })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use crate::statement::tests::fixture_filename;
    use super::*;

    #[test]
    fn test_read_kame_sample() {
        let kame = read_kame(&fixture_filename("kame_sample.csv")).unwrap();
        assert_eq!(kame.report.rows_scanned, 14);
        assert_eq!(kame.report.loaded, 12);
        assert_eq!(kame.report.missing_date, 1);
        assert_eq!(kame.report.amount_column, "Total");
        assert_eq!(kame.report.description_column.as_deref(), Some("Glosa"));

        let first = &kame.records[0];
        assert_eq!(first.row, 0);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(first.amount, Decimal::from_str("83320").unwrap());
        assert_eq!(first.description, "Pago En Linea Enel");
    }

    #[test]
    fn test_header_keywords() {
        assert_eq!(normalise_header(" Razón  Social "), "razon_social");
        let headers: Vec<String> = ["fecha_documento", "neto", "iva", "total"].iter().map(|s| s.to_string()).collect();
        assert_eq!(find_column(&headers, &AMOUNT_KEYWORDS), Some(3));
        assert_eq!(find_column(&headers, &DATE_KEYWORDS), Some(0));
        assert_eq!(find_column(&headers, &DESCRIPTION_KEYWORDS), None);
    }

    #[test]
    fn test_no_amount_column() {
        let grid: Grid = vec![vec![Cell::Text("Fecha".into()), Cell::Text("Glosa".into())]];
        assert!(records_from_grid(&grid, "memory").is_err());
    }
}
