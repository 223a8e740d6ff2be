use std::path::PathBuf;
use std::str::FromStr;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use crate::config::StatementConfig;
use crate::statement::{normalize_grid, read_statement};
use crate::statement::column::MappingSource;
use crate::statement::sheet::{Cell, Grid};
use crate::transaction::DebitCredit;

#[test]
fn test_read_santander_sample() {
    let statement = read_statement(&fixture_filename("santander_sample.csv"), &StatementConfig::default()).unwrap();
    let report = &statement.report;

    assert_eq!(report.rows_scanned, 109);
    assert_eq!(report.imported, 100);
    assert_eq!(statement.transactions.len(), 100);
    assert_eq!(report.mapping, Some(MappingSource::Layout));
    assert_eq!(report.preamble, 5);
    assert_eq!(report.blank, 2);
    assert_eq!(report.summary, 2);
    assert_eq!(report.invalid(), 0);
    assert_eq!(report.rows_scanned, report.imported + report.dropped());

    let first = &statement.transactions[0];
    assert_eq!(first.row, 0);
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    assert_eq!(first.description, "PAGO EN LINEA ENEL");
    assert_eq!(first.amount, Decimal::from_str("-83320").unwrap());
    assert_eq!(first.debit_credit, DebitCredit::Debit);
    assert_eq!(first.document_number, "0001000");
    assert_eq!(first.branch, "Providencia");

    let second = &statement.transactions[1];
    assert_eq!(second.amount, Decimal::from_str("318000").unwrap());
    assert_eq!(second.debit_credit, DebitCredit::Credit);
}

#[test]
fn test_sign_matches_debit_credit() {
    let statement = read_statement(&fixture_filename("santander_sample.csv"), &StatementConfig::default()).unwrap();
    for (i, t) in statement.transactions.iter().enumerate() {
        assert_eq!(t.row, i);
        assert!(t.sign_consistent(), "row {} has amount {} but is {}", t.row, t.amount, t.debit_credit);
        assert!(!t.description.is_empty());
    }
}

#[test]
fn test_missing_file() {
    let result = read_statement(&fixture_filename("does_not_exist.xlsx"), &StatementConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_named_headers_with_merged_dates() {
    let grid: Grid = vec![
        row(&["Banco de Chile"]),
        row(&["Fecha", "Descripción", "Cargos", "Abonos", "Saldo"]),
        row(&["01/03/2024", "COMPRA COPEC", "15.000", "", "985.000"]),
        row(&["", "PAGO PREVIRED", "250.000", "", "735.000"]),
        row(&["02/03/2024", "TRANSF DE CLIENTE", "", "1.200.000", "1.935.000"]),
        row(&["03/03/2024", "SIN MONTO", "", "", ""]),
        row(&["fecha mala", "COMPRA", "1.000", "", ""]),
        row(&["Total", "", "265.000", "1.200.000", ""]),
        row(&["Fecha", "Descripción", "Cargos", "Abonos", "Saldo"]),
        row(&["04/03/2024", "COMPRA LIDER", "8.990", "", ""]),
    ];

    let statement = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap();
    let report = &statement.report;
    assert_eq!(report.mapping, Some(MappingSource::Header));
    assert_eq!(report.preamble, 2);
    assert_eq!(report.summary, 1);
    assert_eq!(report.header_repeats, 1);
    assert_eq!(report.invalid_amount, 1);
    assert_eq!(report.invalid_date, 1);
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.rows_scanned, report.imported + report.dropped());

    let t = &statement.transactions;
    assert_eq!(t.len(), 4);
    assert_eq!(t[1].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(t[1].amount, Decimal::from_str("-250000").unwrap());
    assert_eq!(t[2].amount, Decimal::from_str("1200000").unwrap());
    assert_eq!(t[2].debit_credit, DebitCredit::Credit);
    assert_eq!(t[3].row, 3);
}

#[test]
fn test_signed_amounts_without_flag() {
    let grid: Grid = vec![
        row(&["Fecha", "Descripción movimiento", "Monto"]),
        vec![Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()), Cell::Text("COMPRA NAC".into()), Cell::Number(-15000.0)],
        row(&["06/03/2024", "ABONO REMUNERACION", "$ 1.500.000"]),
        row(&["07/03/2024", "REVERSA", "0"]),
    ];

    let statement = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap();
    assert_eq!(statement.transactions.len(), 2);
    assert_eq!(statement.transactions[0].debit_credit, DebitCredit::Debit);
    assert_eq!(statement.transactions[1].amount, Decimal::from_str("1500000").unwrap());
    assert_eq!(statement.report.zero_amount, 1);
}

#[test]
fn test_flag_column_overrides_sign() {
    let grid: Grid = vec![
        row(&["Monto", "Descripción movimiento", "Fecha", "Cargo/Abono"]),
        row(&["15.000", "COMPRA COPEC", "05/03/2024", "C"]),
        row(&["-20.000", "DEVOLUCION", "05/03/2024", "A"]),
        row(&["9.000", "DESCONOCIDO", "05/03/2024", "X"]),
    ];

    let statement = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap();
    let t = &statement.transactions;
    assert_eq!(t.len(), 2);
    assert_eq!(t[0].amount, Decimal::from_str("-15000").unwrap());
    assert_eq!(t[1].amount, Decimal::from_str("20000").unwrap());
    assert_eq!(statement.report.missing_debit_credit, 1);
}

#[test]
fn test_commissions_and_duplicates() {
    let grid: Grid = vec![
        row(&["Fecha", "Descripción", "Monto"]),
        row(&["05/03/2024", "COMISION MANTENCION", "-3.500"]),
        row(&["05/03/2024", "Comisión  Mantención", "-5.900"]),
        row(&["05/03/2024", "COMPRA COPEC", "-15.000"]),
        row(&["05/03/2024", "COMPRA COPEC", "-15.000"]),
        row(&["06/03/2024", "COMISION MANTENCION", "-3.500"]),
    ];

    let statement = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap();
    let t = &statement.transactions;
    assert_eq!(t.len(), 3);
    assert_eq!(t[0].amount, Decimal::from_str("-5900").unwrap());
    assert_eq!(t[1].description, "COMPRA COPEC");
    assert_eq!(t[2].date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    assert_eq!(statement.report.collapsed_commissions, 1);
    assert_eq!(statement.report.duplicates, 1);

    let mut keep_all = StatementConfig::default();
    keep_all.collapse_commissions = false;
    keep_all.drop_duplicates = false;
    assert_eq!(normalize_grid(&grid, &keep_all, "memory").unwrap().transactions.len(), 5);
}

#[test]
fn test_no_valid_rows_is_an_error() {
    let grid: Grid = vec![
        row(&["Fecha", "Descripción", "Monto"]),
        row(&["Total", "", "0"]),
    ];
    assert!(normalize_grid(&grid, &StatementConfig::default(), "memory").is_err());
}

#[test]
fn test_summary_words_inside_movements() {
    let grid: Grid = vec![
        row(&["Fecha", "Descripción", "Monto"]),
        row(&["05/03/2024", "TOTALPACK SPA", "-12.990"]),
        row(&["06/03/2024", "SALDO A FAVOR DEVOLUCION", "5.000"]),
        row(&["07/03/2024", "COMPRA COPEC", "-15.000"]),
        row(&["", "Saldo final", "", "977.010"]),
        row(&["Total movimientos", "", "-22.990"]),
    ];

    let statement = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap();
    let t = &statement.transactions;
    assert_eq!(t.len(), 3);
    assert_eq!(t[0].description, "TOTALPACK SPA");
    assert_eq!(t[1].description, "SALDO A FAVOR DEVOLUCION");
    assert_eq!(t[1].debit_credit, DebitCredit::Credit);
    assert_eq!(statement.report.summary, 2);
    assert_eq!(statement.report.invalid(), 0);
}

#[test]
fn test_configured_number_format() {
    let grid: Grid = vec![
        row(&["Date", "Description", "Amount"]),
        row(&["05/03/2024", "COMPRA COPEC", "-12,500"]),
        row(&["06/03/2024", "INTERESES", "1.500"]),
        row(&["07/03/2024", "TRANSF DE CLIENTE", "1,234,567.25"]),
    ];

    let mut us = StatementConfig::default();
    us.decimal_separator = '.';
    us.thousands_separator = ',';
    let t = normalize_grid(&grid, &us, "memory").unwrap().transactions;
    assert_eq!(t[0].amount, Decimal::from_str("-12500").unwrap());
    assert_eq!(t[1].amount, Decimal::from_str("1.5").unwrap());
    assert_eq!(t[2].amount, Decimal::from_str("1234567.25").unwrap());

    // The same sheet read with the Chilean defaults
    let t = normalize_grid(&grid, &StatementConfig::default(), "memory").unwrap().transactions;
    assert_eq!(t[0].amount, Decimal::from_str("-12.5").unwrap());
    assert_eq!(t[1].amount, Decimal::from_str("1500").unwrap());
}

fn row(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) }).collect()
}

/// Return the path to a file within the test data directory
pub(crate) fn fixture_filename(filename: &str) -> PathBuf {
    let mut dir = fixture_dir();
    dir.push(filename);
    dir
}

pub(crate) fn fixture_dir() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.push("fixture");
    dir
}
