use comfy_table::{Cell, CellAlignment, Color, Table, TableComponent};
use crate::classifier::ClassifiedRow;
use crate::kame::KameReport;
use crate::kame::reconcile::{MatchResult, MatchStatus, ReconciliationSummary};
use crate::labeller::{LabelStats, UnlabeledAnalysis};
use crate::statement::ImportReport;
use crate::transaction::{FinancialSummary, Transaction};
use crate::util::format_clp;
use crate::workflow::WorkflowState;

fn new_table() -> Table {
    let mut table = Table::new();
    table.remove_style(TableComponent::HorizontalLines);
    table.remove_style(TableComponent::MiddleIntersections);
    table.remove_style(TableComponent::LeftBorderIntersections);
    table.remove_style(TableComponent::RightBorderIntersections);
    table
}

fn right(content: String) -> Cell {
    Cell::new(content).set_alignment(CellAlignment::Right)
}

pub(crate) fn print_transactions<'a>(transactions: impl Iterator<Item = &'a Transaction>) {
    let mut table = new_table();
    table.set_header(vec!["Row", "Date", "Description", "Amount", "Cargo/Abono", "Document", "Branch", "Category"]);
    for t in transactions {
        let amount = if t.is_debit() { right(format_clp(&t.amount)).fg(Color::Red) } else { right(format_clp(&t.amount)) };
        table.add_row(vec![
            right(t.row.to_string()),
            Cell::new(t.date.format("%Y-%m-%d")),
            Cell::new(&t.description),
            amount,
            Cell::new(t.debit_credit),
            Cell::new(&t.document_number),
            Cell::new(&t.branch),
            Cell::new(t.category.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
}

pub(crate) fn print_import_report(report: &ImportReport) {
    let mut table = new_table();
    table.set_header(vec!["Rows", "Count"]);
    let counts = [
        ("scanned", report.rows_scanned),
        ("imported", report.imported),
        ("preamble", report.preamble),
        ("blank", report.blank),
        ("totals and balances", report.summary),
        ("repeated headers", report.header_repeats),
        ("invalid date", report.invalid_date),
        ("invalid amount", report.invalid_amount),
        ("missing description", report.missing_description),
        ("unknown cargo/abono", report.missing_debit_credit),
        ("zero amount", report.zero_amount),
        ("duplicates", report.duplicates),
        ("collapsed commissions", report.collapsed_commissions),
    ];
    for (name, count) in counts {
        // Always show the first two lines
        if count > 0 || name == "scanned" || name == "imported" {
            table.add_row(vec![Cell::new(name), right(count.to_string())]);
        }
    }
    println!("{}", report.source);
    println!("{table}");
    for issue in &report.issues {
        println!("  {}", issue);
    }
}

pub(crate) fn print_label_stats(stats: &LabelStats) {
    let mut table = new_table();
    table.set_header(vec!["Category", "Rows"]);
    for (category, count) in &stats.per_category {
        table.add_row(vec![Cell::new(category), right(count.to_string())]);
    }
    table.add_row(vec![Cell::new("(unlabeled)").fg(Color::Yellow), right(stats.unlabeled.to_string())]);
    println!("{table}");
}

/// Keyword suggestions for the unlabeled rows, with their coverage and the five most suggested categories
pub(crate) fn print_suggestions(analysis: &UnlabeledAnalysis) {
    if !analysis.suggestions.is_empty() {
        let mut table = new_table();
        table.set_header(vec!["Row", "Description", "Suggestion"]);
        for s in &analysis.suggestions {
            table.add_row(vec![right(s.row.to_string()), Cell::new(&s.description), Cell::new(&s.category)]);
        }
        println!("{table}");
    }

    println!("{} of {} unlabeled rows have a suggestion ({:.1}%), {} without",
             analysis.suggestions.len(), analysis.unlabeled, analysis.suggestion_rate(), analysis.without_suggestion());
    let per_category = analysis.per_category();
    if !per_category.is_empty() {
        let mut table = new_table();
        table.set_header(vec!["Suggested category", "Rows"]);
        for (category, count) in per_category.iter().take(5) {
            table.add_row(vec![Cell::new(category), right(count.to_string())]);
        }
        println!("{table}");
    }
}

pub(crate) fn print_frequent_descriptions(descriptions: &[(String, usize)]) {
    if descriptions.is_empty() {
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Recurring description without a rule", "Rows"]);
    for (description, count) in descriptions {
        table.add_row(vec![Cell::new(description), right(count.to_string())]);
    }
    println!("{table}");
}

pub(crate) fn print_predictions(rows: &[ClassifiedRow]) {
    let mut table = new_table();
    table.set_header(vec!["Row", "Description", "Category", "Confidence"]);
    for r in rows {
        let confidence = right(format!("{:.1}%", r.prediction.confidence * 100.0));
        table.add_row(vec![
            right(r.row.to_string()),
            Cell::new(&r.description),
            Cell::new(&r.prediction.category),
            if r.low_confidence { confidence.fg(Color::Yellow) } else { confidence },
        ]);
    }
    println!("{table}");
}

pub(crate) fn print_kame_report(report: &KameReport) {
    println!("{}: {} records (date '{}', amount '{}'), {} without date, {} without amount",
             report.source, report.loaded, report.date_column, report.amount_column,
             report.missing_date, report.missing_amount);
}

/// Only unmatched records are listed, they are the expenses without a supporting bank movement
pub(crate) fn print_reconciliation(results: &[MatchResult], summary: &ReconciliationSummary) {
    let mut table = new_table();
    table.set_header(vec!["Kame row", "Date", "Amount", "Description"]);
    for r in results.iter().filter(|r| r.status == MatchStatus::Unmatched) {
        table.add_row(vec![
            right(r.record.row.to_string()),
            Cell::new(r.record.date.format("%Y-%m-%d")),
            right(format_clp(&r.record.amount)),
            Cell::new(&r.record.description),
        ]);
    }
    if summary.unmatched > 0 {
        println!("Expenses without supporting bank transaction:");
        println!("{table}");
    }

    let mut totals = new_table();
    totals.set_header(vec!["Kame records", "Matched", "Unmatched", "Backing rate", "Unmatched amount"]);
    totals.add_row(vec![
        right(summary.total.to_string()),
        right(summary.matched.to_string()),
        right(summary.unmatched.to_string()),
        right(format!("{:.1}%", summary.backing_rate)),
        right(format_clp(&summary.unmatched_amount)),
    ]);
    println!("{totals}");
    if let Some((from, to)) = summary.date_range {
        println!("Kame documents from {} to {}", from, to);
    }
    println!("{} bank debits are not referenced by any Kame record", summary.unreferenced_debits);
    for recommendation in &summary.recommendations {
        println!("* {}", recommendation);
    }
}

pub(crate) fn print_status(state: &WorkflowState, stats: &LabelStats, history: usize,
                           summary: Option<&FinancialSummary>) {
    let mut table = new_table();
    table.set_header(vec!["", ""]);
    table.add_row(vec![Cell::new("stage"), Cell::new(state.stage)]);
    if let Some(import) = &state.import {
        table.add_row(vec![Cell::new("statement"), Cell::new(&import.source)]);
        table.add_row(vec![Cell::new("imported at"), Cell::new(import.imported_at.format("%Y-%m-%d %H:%M"))]);
        table.add_row(vec![Cell::new("rows"), Cell::new(import.rows)]);
    }
    if let Some(summary) = summary {
        table.add_row(vec![Cell::new("period"), Cell::new(format!("{} to {}, {} movements",
            summary.first_date, summary.last_date, summary.transactions))]);
        table.add_row(vec![Cell::new("income"), Cell::new(format!("{} rows, {}", summary.income, format_clp(&summary.income_total)))]);
        table.add_row(vec![Cell::new("expenses"), Cell::new(format!("{} rows, {}", summary.expenses, format_clp(&summary.expense_total)))]);
        table.add_row(vec![Cell::new("amounts"), Cell::new(format!("min {}, max {}, mean {}",
            format_clp(&summary.min_amount), format_clp(&summary.max_amount), format_clp(&summary.mean_amount)))]);
    }
    table.add_row(vec![Cell::new("labeled"), Cell::new(format!("{} ({} unlabeled)", stats.labeled, stats.unlabeled))]);
    for (category, count) in &stats.per_category {
        table.add_row(vec![Cell::new(format!("  {}", category)), Cell::new(count)]);
    }
    table.add_row(vec![Cell::new("label history"), Cell::new(history)]);
    if let Some(model) = &state.model {
        table.add_row(vec![Cell::new("model"), Cell::new(format!(
            "{} rows, {} categories, {:.1}% training accuracy, trained {}",
            model.rows, model.categories, model.training_accuracy * 100.0, model.trained_at.format("%Y-%m-%d %H:%M")))]);
    }
    if let Some(rows) = state.classified_rows {
        table.add_row(vec![Cell::new("classified"), Cell::new(rows)]);
    }
    if let Some(kame) = &state.reconciled_with {
        table.add_row(vec![Cell::new("reconciled with"), Cell::new(kame)]);
    }
    println!("{table}");
}
