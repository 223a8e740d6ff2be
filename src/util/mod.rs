use std::str::FromStr;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Absolute distance in days between two dates
pub(crate) fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Trim and collapse runs of whitespace (including newlines from merged cells) into single spaces
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Convert through the shortest decimal representation, so 1234.56 stays 1234.56
pub(crate) fn decimal_from_f64(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    Decimal::from_str(&v.to_string()).ok()
}

/// Plain signed decimal without trailing zeros, e.g. `-15000` or `1234.5`
pub(crate) fn format_amount(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

/// Chilean display format, e.g. `-$15.000`
pub(crate) fn format_clp(amount: &Decimal) -> String {
    let rounded = amount.round().abs().to_string();
    let mut grouped = String::new();
    for (i, c) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount.is_sign_negative() && !amount.round().is_zero() {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_between() {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(days_between(d1, d2), 3);
        assert_eq!(days_between(d2, d1), 3);
    }

    #[test]
    fn test_amount_formats() {
        assert_eq!(format_amount(&Decimal::from_str("-15000.00").unwrap()), "-15000");
        assert_eq!(format_amount(&Decimal::from_str("1234.50").unwrap()), "1234.5");
        assert_eq!(format_clp(&Decimal::from_str("-1234567").unwrap()), "-$1.234.567");
        assert_eq!(format_clp(&Decimal::from_str("950").unwrap()), "$950");
        assert_eq!(decimal_from_f64(1234.56), Some(Decimal::from_str("1234.56").unwrap()));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  PAGO \n  PROVEEDOR   4CDC "), "PAGO PROVEEDOR 4CDC");
    }
}
