use std::path::PathBuf;
use anyhow::anyhow;
use clap::{ArgAction, Subcommand};
use crate::config::Config;
use crate::datastore::Datastore;
use crate::labeller::stats;
use crate::transaction::financial_summary;

mod display;
mod export;
mod import;
mod label;
mod reconcile;
mod train;

/// What every command runs against
pub(crate) struct Context {
    pub(crate) config: Config,
    pub(crate) store: Datastore,
}

impl Context {
    pub(crate) fn new(config: Config, store: Datastore) -> Context {
        Context { config, store }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Import a bank statement file, or a directory of them, as the current batch
    Import {
        path: PathBuf,
        /// Parse and print the statement without saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the transactions of the current batch
    Show {
        #[arg(long)]
        unlabeled: bool,
    },
    /// Label one or more rows with a category
    Label {
        #[arg(required = true, num_args = 1..)]
        rows: Vec<usize>,
        #[arg(required = true)]
        category: String,
    },
    /// Suggest categories from the [labels] keyword rules, or the built-in ones without them
    Suggest {
        #[arg(long)]
        apply: bool,
    },
    /// Train the classifier on every labeled row
    Train,
    /// Predict categories for the unlabeled rows
    Classify,
    /// Reconcile a Kame report against the bank debits
    Reconcile {
        file: PathBuf,
        #[arg(long)]
        window_days: Option<i64>,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Export the current batch as CSV
    Export {
        file: PathBuf,
        /// Leave the category column out
        #[arg(long = "no-category", action = ArgAction::SetFalse)]
        include_category: bool,
    },
    /// Show where the workflow stands
    Status,
    /// Start the interactive shell, the default without a command
    Shell,
}

pub(crate) fn run_command(ctx: &mut Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Import { path, dry_run } => import::execute_import(ctx, &path, dry_run),
        Command::Show { unlabeled } => label::execute_show(ctx, unlabeled),
        Command::Label { rows, category } => label::execute_label(ctx, &rows, &category),
        Command::Suggest { apply } => label::execute_suggest(ctx, apply),
        Command::Train => train::execute_train(ctx),
        Command::Classify => train::execute_classify(ctx),
        Command::Reconcile { file, window_days, tolerance } => {
            reconcile::execute_reconcile(ctx, &file, window_days, tolerance)
        }
        Command::Export { file, include_category } => export::execute_export(ctx, &file, include_category),
        Command::Status => execute_status(ctx),
        Command::Shell => Err(anyhow!("Already in the shell")),
    }
}

fn execute_status(ctx: &Context) -> anyhow::Result<()> {
    let state = ctx.store.load_state()?;
    let transactions = ctx.store.load_transactions()?;
    let labels = ctx.store.load_labels()?;
    display::print_status(&state, &stats(&transactions), labels.len(), financial_summary(&transactions).as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use crate::datastore::tests::temp_store;
    use crate::statement::tests::fixture_filename;
    use crate::workflow::Stage;
    use super::*;

    fn context() -> Context {
        Context::new(Config::empty(), temp_store())
    }

    fn import_sample(ctx: &mut Context) {
        run_command(ctx, Command::Import { path: fixture_filename("santander_sample.csv"), dry_run: false }).unwrap();
    }

    /// A directory in place of the temp file makes the next transactions write fail
    fn block_transactions_write(ctx: &Context) {
        fs::create_dir_all(ctx.store.dir().join(".transactions.csv.tmp")).unwrap();
    }

    fn unblock_transactions_write(ctx: &Context) {
        fs::remove_dir(ctx.store.dir().join(".transactions.csv.tmp")).unwrap();
    }

    #[test]
    fn test_dry_run_saves_nothing() {
        let mut ctx = context();
        run_command(&mut ctx, Command::Import { path: fixture_filename("santander_sample.csv"), dry_run: true }).unwrap();
        assert!(ctx.store.load_transactions().unwrap().is_empty());
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Empty);
    }

    #[test]
    fn test_label_train_classify() {
        let mut ctx = context();
        import_sample(&mut ctx);
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Imported);

        let transactions = ctx.store.load_transactions().unwrap();
        assert_eq!(transactions.len(), 100);

        // Train before any label is refused
        assert!(run_command(&mut ctx, Command::Train).is_err());

        let mut credits = vec![];
        let mut debits = vec![];
        for t in transactions.iter() {
            if t.is_debit() { debits.push(t.row) } else { credits.push(t.row) }
        }
        run_command(&mut ctx, Command::Label { rows: debits[..3].to_vec(), category: "Gastos".into() }).unwrap();
        run_command(&mut ctx, Command::Label { rows: credits[..3].to_vec(), category: "Ingresos".into() }).unwrap();

        let state = ctx.store.load_state().unwrap();
        assert_eq!(state.stage, Stage::Labeled { complete: false });
        assert_eq!(ctx.store.load_labels().unwrap().len(), 6);

        run_command(&mut ctx, Command::Train).unwrap();
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Trained);
        assert!(ctx.store.load_model().unwrap().is_some());

        run_command(&mut ctx, Command::Classify).unwrap();
        let predictions = ctx.store.load_predictions().unwrap();
        assert_eq!(predictions.len(), 94);
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Classified);
    }

    #[test]
    fn test_label_unknown_row_changes_nothing() {
        let mut ctx = context();
        import_sample(&mut ctx);
        assert!(run_command(&mut ctx, Command::Label { rows: vec![1, 500], category: "Gastos".into() }).is_err());
        assert!(ctx.store.load_labels().unwrap().is_empty());
        assert!(ctx.store.load_transactions().unwrap()[1].category.is_none());
    }

    #[test]
    fn test_reimport_keeps_labels_and_drops_model() {
        let mut ctx = context();
        import_sample(&mut ctx);
        run_command(&mut ctx, Command::Label { rows: vec![0, 2], category: "servicios".into() }).unwrap();

        import_sample(&mut ctx);
        let transactions = ctx.store.load_transactions().unwrap();
        assert_eq!(transactions[0].category.as_deref(), Some("servicios"));
        assert_eq!(transactions[2].category.as_deref(), Some("servicios"));
        assert!(ctx.store.load_model().unwrap().is_none());
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Imported);
    }

    #[test]
    fn test_failed_reimport_keeps_model() {
        let mut ctx = context();
        import_sample(&mut ctx);
        run_command(&mut ctx, Command::Label { rows: vec![0, 1, 2], category: "gastos".into() }).unwrap();
        run_command(&mut ctx, Command::Label { rows: vec![3, 4, 5], category: "ingresos".into() }).unwrap();
        run_command(&mut ctx, Command::Train).unwrap();
        let before = ctx.store.load_transactions().unwrap();

        block_transactions_write(&ctx);
        assert!(run_command(&mut ctx, Command::Import {
            path: fixture_filename("santander_sample.csv"), dry_run: false,
        }).is_err());

        let state = ctx.store.load_state().unwrap();
        assert_eq!(state.stage, Stage::Trained);
        assert!(state.model.is_some());
        assert!(ctx.store.load_model().unwrap().is_some());
        assert_eq!(ctx.store.load_transactions().unwrap(), before);
    }

    #[test]
    fn test_import_directory() {
        let mut ctx = context();
        let dir = ctx.store.dir().join("statements");
        fs::create_dir_all(&dir).unwrap();
        fs::copy(fixture_filename("santander_sample.csv"), dir.join("a_marzo.csv")).unwrap();
        fs::write(dir.join("b_abril.csv"), "Fecha,Descripción,Monto\n\
            01/04/2024,COMPRA LIDER,-8.990\n\
            02/04/2024,PAGO ENEL,-30.000\n\
            03/04/2024,ABONO CLIENTE,150.000\n").unwrap();
        fs::write(dir.join("c_roto.csv"), "Cartola de prueba\nsin movimientos\n").unwrap();
        fs::copy(fixture_filename("santander_sample.csv"), dir.join(".oculto.csv")).unwrap();

        run_command(&mut ctx, Command::Import { path: dir, dry_run: false }).unwrap();

        let transactions = ctx.store.load_transactions().unwrap();
        assert_eq!(transactions.len(), 103);
        assert!(transactions.iter().enumerate().all(|(i, t)| t.row == i));
        assert_eq!(transactions[100].description, "COMPRA LIDER");
        assert_eq!(transactions[102].description, "ABONO CLIENTE");
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Imported);
    }

    #[test]
    fn test_failed_label_write_keeps_files_consistent() {
        let mut ctx = context();
        import_sample(&mut ctx);

        block_transactions_write(&ctx);
        assert!(run_command(&mut ctx, Command::Label { rows: vec![0, 1], category: "gastos".into() }).is_err());
        assert!(ctx.store.load_labels().unwrap().is_empty());
        assert!(ctx.store.load_transactions().unwrap().iter().all(|t| t.category.is_none()));
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Imported);

        unblock_transactions_write(&ctx);
        run_command(&mut ctx, Command::Label { rows: vec![0, 1], category: "gastos".into() }).unwrap();
        assert_eq!(ctx.store.load_labels().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_suggest_apply_keeps_files_consistent() {
        let config: Config = toml::from_str(r#"
            [labels]
            combustible = ["copec", "shell"]
        "#).unwrap();
        let mut ctx = Context::new(config, temp_store());
        import_sample(&mut ctx);

        block_transactions_write(&ctx);
        assert!(run_command(&mut ctx, Command::Suggest { apply: true }).is_err());
        assert!(ctx.store.load_labels().unwrap().is_empty());
        assert!(ctx.store.load_transactions().unwrap().iter().all(|t| t.category.is_none()));

        unblock_transactions_write(&ctx);
        run_command(&mut ctx, Command::Suggest { apply: true }).unwrap();
        let labeled: Vec<_> = ctx.store.load_transactions().unwrap().into_iter()
            .filter(|t| t.category.is_some())
            .collect();
        assert_eq!(labeled.len(), 10);
        assert_eq!(ctx.store.load_labels().unwrap().len(), 10);
        assert!(labeled.iter().all(|t| t.category.as_deref() == Some("combustible")));
    }

    #[test]
    fn test_suggest_with_builtin_keywords() {
        let mut ctx = context();
        assert!(run_command(&mut ctx, Command::Suggest { apply: false }).is_err());

        import_sample(&mut ctx);
        run_command(&mut ctx, Command::Suggest { apply: false }).unwrap();
        assert!(ctx.store.load_labels().unwrap().is_empty());

        run_command(&mut ctx, Command::Suggest { apply: true }).unwrap();
        let transactions = ctx.store.load_transactions().unwrap();
        let lider = transactions.iter().find(|t| t.description == "COMPRA NAC SUPERMERCADO LIDER").unwrap();
        assert_eq!(lider.category.as_deref(), Some("alimentacion"));
        let copec = transactions.iter().find(|t| t.description == "COMPRA NAC COPEC LAS CONDES").unwrap();
        assert_eq!(copec.category.as_deref(), Some("combustible"));
        run_command(&mut ctx, Command::Status).unwrap();
    }

    #[test]
    fn test_reconcile_and_export() {
        let mut ctx = context();
        run_command(&mut ctx, Command::Reconcile {
            file: fixture_filename("kame_sample.csv"), window_days: None, tolerance: None,
        }).unwrap_err();

        import_sample(&mut ctx);
        run_command(&mut ctx, Command::Reconcile {
            file: fixture_filename("kame_sample.csv"), window_days: None, tolerance: None,
        }).unwrap();
        let results = ctx.store.load_reconciliation().unwrap();
        assert_eq!(results.len(), 12);
        assert_eq!(results.iter().filter(|r| r.transaction_row.is_some()).count(), 10);
        assert_eq!(ctx.store.load_state().unwrap().stage, Stage::Reconciled);

        let out = ctx.store.dir().join("export.csv");
        run_command(&mut ctx, Command::Export { file: out.clone(), include_category: false }).unwrap();
        let content = std::fs::read(&out).unwrap();
        let exported = crate::datastore::canonical::read_canonical(&content).unwrap();
        assert_eq!(exported, ctx.store.load_transactions().unwrap());
    }

    #[test]
    fn test_negative_window_is_refused() {
        let mut ctx = context();
        import_sample(&mut ctx);
        assert!(run_command(&mut ctx, Command::Reconcile {
            file: fixture_filename("kame_sample.csv"), window_days: Some(-1), tolerance: None,
        }).is_err());
    }
}
