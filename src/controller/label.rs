use std::collections::{BTreeMap, HashSet};
use anyhow::anyhow;
use log::{error, info};
use crate::controller::{display, Context};
use crate::labeller::{analyze_unlabeled, frequent_descriptions, set_category, stats, LabeledDataset, Labeller};
use crate::transaction::Transaction;

/// Descriptions seen this often without a matching rule are listed as rule candidates
const FREQUENT_MIN: usize = 2;
const FREQUENT_SHOWN: usize = 10;

pub(crate) fn execute_show(ctx: &Context, unlabeled_only: bool) -> anyhow::Result<()> {
    let transactions = ctx.store.load_transactions()?;
    if transactions.is_empty() {
        info!("No transactions imported yet");
        return Ok(());
    }
    display::print_transactions(transactions.iter().filter(|t| !unlabeled_only || t.category.is_none()));
    display::print_label_stats(&stats(&transactions));
    Ok(())
}

/// Label edits are persisted right away, there is no separate commit
pub(crate) fn execute_label(ctx: &mut Context, rows: &[usize], category: &str) -> anyhow::Result<()> {
    let mut transactions = ctx.store.load_transactions()?;
    if transactions.is_empty() {
        return Err(anyhow!("No transactions imported yet"));
    }
    let previous = ctx.store.load_labels()?;
    let mut labels = previous.clone();

    let category = set_category(&mut transactions, &mut labels, rows, category)?;
    save_labeled(ctx, &previous, &labels, &transactions)?;

    let stats = stats(&transactions);
    let mut state = ctx.store.load_state()?;
    state.on_label(&stats)?;
    ctx.store.save_state(&state)?;

    info!("{} rows labeled '{}', {} unlabeled left", rows.len(), category, stats.unlabeled);
    Ok(())
}

/// Suggest categories for unlabeled rows from the keyword rules, and optionally apply them
pub(crate) fn execute_suggest(ctx: &mut Context, apply: bool) -> anyhow::Result<()> {
    let labeller = Labeller::new(&ctx.config)?;
    let mut transactions = ctx.store.load_transactions()?;
    if transactions.is_empty() {
        return Err(anyhow!("No transactions imported yet"));
    }

    let analysis = analyze_unlabeled(&labeller, &transactions);
    display::print_suggestions(&analysis);

    let suggested: HashSet<usize> = analysis.suggestions.iter().map(|s| s.row).collect();
    let uncovered = transactions.iter()
        .filter(|t| t.category.is_none() && !suggested.contains(&t.row))
        .map(|t| t.description.as_str());
    let frequent = frequent_descriptions(uncovered, FREQUENT_MIN);
    display::print_frequent_descriptions(&frequent[..frequent.len().min(FREQUENT_SHOWN)]);

    if analysis.suggestions.is_empty() {
        info!("No suggestions for the unlabeled rows");
        return Ok(());
    }
    if !apply {
        info!("{} suggestions. Run `suggest --apply` to label them", analysis.suggestions.len());
        return Ok(());
    }

    let mut by_category: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for s in &analysis.suggestions {
        by_category.entry(s.category.as_str()).or_default().push(s.row);
    }
    let previous = ctx.store.load_labels()?;
    let mut labels = previous.clone();
    for (category, rows) in by_category {
        set_category(&mut transactions, &mut labels, &rows, category)?;
    }
    save_labeled(ctx, &previous, &labels, &transactions)?;

    let mut state = ctx.store.load_state()?;
    state.on_label(&stats(&transactions))?;
    ctx.store.save_state(&state)?;
    info!("{} suggestions applied", analysis.suggestions.len());
    Ok(())
}

/// Labels are written before the batch. When the batch write fails the previous label history is put back,
/// so `labels.csv` never holds a label missing from `transactions.csv`.
fn save_labeled(ctx: &Context, previous: &LabeledDataset, labels: &LabeledDataset,
                transactions: &[Transaction]) -> anyhow::Result<()> {
    ctx.store.save_labels(labels)?;
    if let Err(e) = ctx.store.save_transactions(transactions) {
        if let Err(restore) = ctx.store.save_labels(previous) {
            error!("Unable to restore the label history: {}", restore);
        }
        return Err(e.into());
    }
    Ok(())
}
