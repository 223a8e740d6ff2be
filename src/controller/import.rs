use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context as _};
use log::{info, warn};
use walkdir::{DirEntry, WalkDir};
use crate::controller::{display, Context};
use crate::labeller::{reattach_labels, stats};
use crate::statement::{read_statement, Statement};
use crate::transaction::Transaction;

const STATEMENT_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// Import a statement file, or every statement file under a directory, as the new batch
pub(crate) fn execute_import(ctx: &mut Context, path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let files = if path.is_dir() {
        scan_files(path)?
    } else {
        BTreeSet::from([path.to_path_buf()])
    };
    if files.is_empty() {
        return Err(anyhow!("No statement files found under {}", path.display()));
    }

    let mut transactions: Vec<Transaction> = vec![];
    let mut digests = vec![];
    let single_file = files.len() == 1;
    for f in files.iter() {
        let statement = match read_statement(f, &ctx.config.statement) {
            Ok(statement) => statement,
            Err(e) if !single_file => {
                warn!("Skipping {}: {}", f.display(), e);
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Unable to import {}", f.display())),
        };
        display::print_import_report(&statement.report);

        let content = fs::read(f).with_context(|| format!("Unable to read {}", f.display()))?;
        digests.push(format!("{:x}", md5::compute(content)));
        append_batch(&mut transactions, statement);
    }

    if transactions.is_empty() {
        return Err(anyhow!("No transactions imported from {}", path.display()));
    }

    if dry_run {
        display::print_transactions(transactions.iter());
        info!("This is a dry-run. Transactions are not imported");
        return Ok(());
    }

    let labels = ctx.store.load_labels()?;
    reattach_labels(&mut transactions, &labels);

    let digest = if digests.len() == 1 {
        digests.remove(0)
    } else {
        format!("{:x}", md5::compute(digests.join("|")))
    };
    let mut state = ctx.store.load_state()?;
    state.on_import(&path.display().to_string(), &digest, transactions.len());

    // Nothing derived is discarded until the new batch and its state are written
    ctx.store.save_transactions(&transactions)?;
    ctx.store.save_state(&state)?;
    // Model, predictions and reconciliation belong to the previous batch
    ctx.store.discard_derived()?;

    let stats = stats(&transactions);
    info!("{} transactions imported, {} already labeled", transactions.len(), stats.labeled);
    Ok(())
}

/// Rows are renumbered so the combined batch keeps `row` equal to the position
fn append_batch(batch: &mut Vec<Transaction>, statement: Statement) {
    let offset = batch.len();
    for mut t in statement.transactions {
        t.row += offset;
        batch.push(t);
    }
}

/// Statement files under the directory, in path order. Hidden files and directories are skipped.
pub(crate) fn scan_files(root_dir: &Path) -> anyhow::Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    let walker = WalkDir::new(root_dir).into_iter();
    for entry in walker.filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
        let entry = entry.with_context(|| format!("Unable to scan {}", root_dir.display()))?;
        if entry.file_type().is_file() && is_statement_file(entry.path()) {
            files.insert(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

fn is_statement_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| STATEMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
