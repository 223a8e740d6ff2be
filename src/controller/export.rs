use std::path::Path;
use anyhow::anyhow;
use log::info;
use crate::controller::Context;
use crate::datastore::canonical::write_canonical;
use crate::datastore::write_atomic;

/// Export the current batch as canonical CSV
pub(crate) fn execute_export(ctx: &Context, file_path: &Path, include_category: bool) -> anyhow::Result<()> {
    let transactions = ctx.store.load_transactions()?;
    if transactions.is_empty() {
        return Err(anyhow!("No transactions imported yet"));
    }
    write_atomic(file_path, &write_canonical(&transactions, include_category)?)?;
    info!("{} transactions exported to {}", transactions.len(), file_path.display());
    Ok(())
}
