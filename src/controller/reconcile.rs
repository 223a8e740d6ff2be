use std::path::Path;
use anyhow::{anyhow, Context as _};
use crate::config::ReconcileConfig;
use crate::controller::{display, Context};
use crate::kame::read_kame;
use crate::kame::reconcile::{reconcile, summarize, MatchPolicy};

/// Cross-reference a Kame report against the debits of the current batch
pub(crate) fn execute_reconcile(ctx: &mut Context, kame_file: &Path, window_days: Option<i64>,
                                tolerance: Option<f64>) -> anyhow::Result<()> {
    let config = ReconcileConfig {
        window_days: window_days.unwrap_or(ctx.config.reconcile.window_days),
        amount_tolerance: tolerance.unwrap_or(ctx.config.reconcile.amount_tolerance),
    };
    let policy = MatchPolicy::from_config(&config)?;

    let transactions = ctx.store.load_transactions()?;
    if transactions.is_empty() {
        return Err(anyhow!("No transactions imported yet"));
    }
    let kame = read_kame(kame_file).with_context(|| format!("Unable to load Kame report {}", kame_file.display()))?;
    display::print_kame_report(&kame.report);

    let results = reconcile(&transactions, &kame.records, &policy);
    let summary = summarize(&results, &transactions);

    let mut state = ctx.store.load_state()?;
    state.on_reconcile(&kame_file.display().to_string())?;
    ctx.store.save_reconciliation(&results)?;
    ctx.store.save_state(&state)?;

    display::print_reconciliation(&results, &summary);
    Ok(())
}
