use std::str::FromStr;
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use crate::common::{Error, ResultError};
use crate::transaction::{DebitCredit, Transaction};
use crate::util::format_amount;

pub(crate) const CANONICAL_HEADERS: [&str; 6] = ["date", "description", "amount", "debit_credit", "document_number", "branch"];
pub(crate) const CATEGORY_HEADER: &str = "category";

/// Canonical CSV: `date, description, amount, debit_credit, document_number, branch[, category]`
pub(crate) fn write_canonical(transactions: &[Transaction], include_category: bool) -> ResultError<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(vec![]);
    let mut headers: Vec<&str> = CANONICAL_HEADERS.to_vec();
    if include_category {
        headers.push(CATEGORY_HEADER);
    }
    writer.write_record(&headers)?;

    for t in transactions {
        let date = t.date.format("%Y-%m-%d").to_string();
        let amount = format_amount(&t.amount);
        let mut record = vec![date.as_str(), t.description.as_str(), amount.as_str(), t.debit_credit.as_str(),
                              t.document_number.as_str(), t.branch.as_str()];
        if include_category {
            record.push(t.category.as_deref().unwrap_or(""));
        }
        writer.write_record(&record)?;
    }

    writer.into_inner().map_err(|e| Error::IoError(e.to_string()))
}

/// Read a canonical CSV. The `category` column is optional. Rows are numbered in file order.
pub(crate) fn read_canonical(content: &[u8]) -> ResultError<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new().from_reader(content);
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

    let mut columns = vec![];
    for name in CANONICAL_HEADERS {
        columns.push(position(name).ok_or_else(|| Error::ParseError(format!("missing '{}' column", name)))?);
    }
    let category_column = position(CATEGORY_HEADER);

    let mut transactions = vec![];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(columns[i]).unwrap_or("");
        let line = row + 2;

        let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d")
            .map_err(|e| Error::ParseError(format!("line {}: invalid date '{}': {}", line, field(0), e)))?;
        let amount = Decimal::from_str(field(2))
            .map_err(|e| Error::ParseError(format!("line {}: invalid amount '{}': {}", line, field(2), e)))?;
        let debit_credit = DebitCredit::from_str(field(3))
            .map_err(|e| Error::ParseError(format!("line {}: {}", line, e)))?;

        let mut t = Transaction::new(row, date, field(1), amount, debit_credit, field(4), field(5));
        t.category = category(&record, category_column);
        transactions.push(t);
    }

    Ok(transactions)
}

fn category(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column.and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
