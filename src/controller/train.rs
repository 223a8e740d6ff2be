use anyhow::anyhow;
use log::{info, warn};
use crate::classifier::{classify_table, train};
use crate::controller::{display, Context};

pub(crate) fn execute_train(ctx: &mut Context) -> anyhow::Result<()> {
    let labels = ctx.store.load_labels()?;
    let model = train(&labels, &ctx.config.classifier)?;

    let mut state = ctx.store.load_state()?;
    state.on_train(model.trained_rows, model.categories.len(), model.training_accuracy)?;
    ctx.store.save_model(&model)?;
    ctx.store.save_state(&state)?;

    info!("Model trained on {} rows, categories: {}", model.trained_rows, model.categories.join(", "));
    Ok(())
}

/// Predict categories for the unlabeled rows of the current batch
pub(crate) fn execute_classify(ctx: &mut Context) -> anyhow::Result<()> {
    let model = ctx.store.load_model()?
        .ok_or_else(|| anyhow!("No trained model, run train first"))?;
    let transactions = ctx.store.load_transactions()?;

    let threshold = ctx.config.classifier.confidence_threshold;
    let rows = classify_table(&model, &transactions, threshold);

    let mut state = ctx.store.load_state()?;
    state.on_classify(rows.len())?;
    ctx.store.save_predictions(&rows)?;
    ctx.store.save_state(&state)?;

    display::print_predictions(&rows);
    let low = rows.iter().filter(|r| r.low_confidence).count();
    if low > 0 {
        warn!("{} predictions below {:.0}% confidence, review them before labelling", low, threshold * 100.0);
    }
    info!("{} rows classified", rows.len());
    Ok(())
}
