use std::str::FromStr;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use crate::config::StatementConfig;
use crate::statement::sheet::Cell;
use crate::util::decimal_from_f64;

const DATETIME_FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

// Day first, as printed on Chilean statements. Four digit years are tried before two digit ones.
const DATE_FORMATS: [&str; 7] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%y", "%d-%m-%y"];

/// Serial numbers outside this range are not treated as dates (roughly 1954 to 2119)
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 20000.0..=80000.0;

/// Locale of the amounts in a sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumberFormat {
    pub(crate) decimal: char,
    pub(crate) thousands: char,
}

impl NumberFormat {
    /// `1.234.567,89`
    pub(crate) fn chilean() -> NumberFormat {
        NumberFormat { decimal: ',', thousands: '.' }
    }

    pub(crate) fn from_config(config: &StatementConfig) -> NumberFormat {
        NumberFormat { decimal: config.decimal_separator, thousands: config.thousands_separator }
    }
}

pub(crate) fn parse_amount(cell: &Cell, format: &NumberFormat) -> Option<Decimal> {
    match cell {
        Cell::Number(f) => decimal_from_f64(*f),
        Cell::Text(s) => parse_amount_str(s, format),
        _ => None,
    }
}

/// Parse amounts such as `$ 15.000`, `-1.234,50`, `(2.000)` or `15000-`
pub(crate) fn parse_amount_str(raw: &str, format: &NumberFormat) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '$').collect();
    let mut s = cleaned.strip_prefix("CLP").unwrap_or(&cleaned);

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = &s[1..s.len() - 1];
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = true;
        s = rest;
    }

    if !s.chars().any(|c| c.is_ascii_digit()) || !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let value = Decimal::from_str(&normalise_separators(s, format)?).ok()?;
    Some(if negative { -value } else { value })
}

/// Rewrite the number with `.` as the only (decimal) separator
fn normalise_separators(s: &str, format: &NumberFormat) -> Option<String> {
    let decimal = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => decimal_if_single(s, '.', format),
        (None, Some(_)) => decimal_if_single(s, ',', format),
        (None, None) => None,
    };

    let strip = |part: &str| part.chars().filter(char::is_ascii_digit).collect::<String>();
    match decimal {
        None => Some(strip(s)),
        Some(sep) => {
            let pos = s.rfind(sep)?;
            let fraction = &s[pos + 1..];
            if s[..pos].contains(sep) || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let integer = strip(&s[..pos]);
            let integer = if integer.is_empty() { "0".to_string() } else { integer };
            if fraction.is_empty() {
                Some(integer)
            } else {
                Some(format!("{}.{}", integer, fraction))
            }
        }
    }
}

/// When only one kind of separator appears, decide whether it is the decimal separator.
/// Repeated separators group thousands. A single thousands separator followed by
/// exactly three digits is a thousands group, otherwise it is read as a decimal point.
fn decimal_if_single(s: &str, sep: char, format: &NumberFormat) -> Option<char> {
    if s.matches(sep).count() > 1 {
        return None;
    }
    let digits_after = s.len() - s.rfind(sep)? - 1;
    if sep == format.thousands && digits_after == 3 {
        None
    } else {
        Some(sep)
    }
}

pub(crate) fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(f) if EXCEL_SERIAL_RANGE.contains(f) => excel_serial_to_date(*f),
        Cell::Text(s) => parse_date_str(s),
        _ => None,
    }
}

pub(crate) fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    // `%Y` also accepts two digits, so `05/03/24` would otherwise read as year 24
    for format in DATE_FORMATS {
        match NaiveDate::parse_from_str(s, format) {
            Ok(d) if d.year() >= 1900 => return Some(d),
            _ => {}
        }
    }
    // 2024-03-05T00:00:00+00:00 and similar
    if s.len() > 10 && s.is_char_boundary(10) {
        if let Ok(d) = NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}

/// Excel serial date using the 1899-12-30 base
pub(crate) fn excel_serial_to_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(v.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_chilean_amounts() {
        let clp = NumberFormat::chilean();
        assert_eq!(parse_amount_str("15.000", &clp), Some(dec("15000")));
        assert_eq!(parse_amount_str("$ 1.234.567", &clp), Some(dec("1234567")));
        assert_eq!(parse_amount_str("-1.234,50", &clp), Some(dec("-1234.50")));
        assert_eq!(parse_amount_str("12,5", &clp), Some(dec("12.5")));
        assert_eq!(parse_amount_str("(2.000)", &clp), Some(dec("-2000")));
        assert_eq!(parse_amount_str("2.000-", &clp), Some(dec("-2000")));
        assert_eq!(parse_amount_str("\u{a0}950\u{a0}", &clp), Some(dec("950")));
    }

    #[test]
    fn test_us_amounts() {
        let us = NumberFormat { decimal: '.', thousands: ',' };
        assert_eq!(parse_amount_str("1,234.56", &us), Some(dec("1234.56")));
        assert_eq!(parse_amount_str("1,234", &us), Some(dec("1234")));
        assert_eq!(parse_amount_str("15.5", &us), Some(dec("15.5")));
        // Both separators present: the rightmost one is decimal whatever the locale
        assert_eq!(parse_amount_str("1.234,56", &us), Some(dec("1234.56")));
    }

    #[test]
    fn test_not_amounts() {
        let clp = NumberFormat::chilean();
        assert_eq!(parse_amount_str("TOTAL", &clp), None);
        assert_eq!(parse_amount_str("", &clp), None);
        assert_eq!(parse_amount_str("1,2,3,4.5,6", &clp), None);
        assert_eq!(parse_amount(&Cell::Empty, &clp), None);
        assert_eq!(parse_amount(&Cell::Number(-15000.0), &clp), Some(dec("-15000")));
    }

    #[test]
    fn test_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date_str("05/03/2024"), Some(d));
        assert_eq!(parse_date_str("05-03-2024"), Some(d));
        assert_eq!(parse_date_str("2024-03-05"), Some(d));
        assert_eq!(parse_date_str("05/03/24"), Some(d));
        assert_eq!(parse_date_str("2024-03-05 00:00:00"), Some(d));
        assert_eq!(parse_date_str("2024-03-05T10:11:12+00:00"), Some(d));
        assert_eq!(parse_date_str("Saldo"), None);
        assert_eq!(parse_date(&Cell::Number(45356.0)), Some(d));
        assert_eq!(parse_date(&Cell::Number(123.0)), None);
    }
}
