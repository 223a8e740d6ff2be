use std::fs;
use std::path::Path;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use log::{debug, info};
use crate::common::{Error, ResultError};
use crate::statement::cell::excel_serial_to_date;

/// A single spreadsheet cell, independent of the file format it came from
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub(crate) fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(f) => f.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Rows of cells, as laid out in the sheet. Column positions are absolute: column A is index 0.
pub(crate) type Grid = Vec<Vec<Cell>>;

pub(crate) fn cell_at(row: &[Cell], column: usize) -> &Cell {
    row.get(column).unwrap_or(&Cell::Empty)
}

/// Read the first sheet of a workbook (xlsx, xls, xlsb, ods) or a CSV file into a grid
pub(crate) fn read_grid(path: &Path) -> ResultError<Grid> {
    if !path.exists() {
        return Err(Error::IoError(format!("File not found: {}", path.display())));
    }

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => read_csv_grid(path),
        _ => read_workbook_grid(path),
    }
}

fn read_workbook_grid(path: &Path) -> ResultError<Grid> {
    info!("Reading workbook {}", path.display());
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook.sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::ParseError(format!("No sheets found in {}", path.display())))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    // calamine starts the range at the first used cell, pad it back to absolute positions
    let (row_offset, column_offset) = range.start().map(|(r, c)| (r as usize, c as usize)).unwrap_or((0, 0));
    debug!("Sheet '{}' starts at row {}, column {}", sheet_name, row_offset, column_offset);

    let mut grid: Grid = vec![vec![]; row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; column_offset];
        cells.extend(row.iter().map(convert_cell));
        grid.push(cells);
    }

    Ok(grid)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::String(s) => text_cell(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => Cell::Date(date),
            None => Cell::Empty,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        // Empty and error cells
        _ => Cell::Empty,
    }
}

fn read_csv_grid(path: &Path) -> ResultError<Grid> {
    info!("Reading CSV {}", path.display());
    let bytes = fs::read(path)?;
    // Bank exports are often Latin-1 encoded
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };
    let content = content.trim_start_matches('\u{feff}');

    let delimiter = detect_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut grid: Grid = vec![];
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(text_cell).collect());
    }

    Ok(grid)
}

/// Semicolon separated exports are common where the comma is the decimal separator
fn detect_delimiter(content: &str) -> u8 {
    let sample = content.lines().filter(|l| !l.trim().is_empty()).take(10);
    let (mut commas, mut semicolons) = (0usize, 0usize);
    for line in sample {
        commas += line.matches(',').count();
        semicolons += line.matches(';').count();
    }
    if semicolons > commas { b';' } else { b',' }
}

fn text_cell(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}
