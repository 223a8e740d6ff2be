use std::path::{Path, PathBuf};
use std::process::ExitCode;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use crate::config::Config;
use crate::controller::{run_command, Command, Context};
use crate::datastore::Datastore;
use crate::editor::CartolaHelper;
use crate::parser::ShellCommand;

mod classifier;
mod common;
mod config;
mod controller;
mod datastore;
mod editor;
mod kame;
mod labeller;
mod parser;
mod statement;
mod tokeniser;
mod transaction;
mod util;
mod workflow;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Config file, defaults to <config dir>/cartola/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the datastore directory from the config file
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Runs one command and exits. Without it an interactive shell is started.
    #[command(subcommand)]
    command: Option<Command>,
}

static COMMAND_HISTORY_FILE: &str = ".cartola_history";
static PROMPT: &str = "cartola> ";

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();

    let mut ctx = match open_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        None | Some(Command::Shell) => run_shell(&mut ctx),
        Some(command) => run_command(&mut ctx, command),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_context(cli: &Cli) -> anyhow::Result<Context> {
    let config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load_from_file(&path)?,
        None => Config::empty(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let store = Datastore::open(&data_dir)?;
    info!("Using datastore {}", store.dir().display());
    Ok(Context::new(config, store))
}

fn run_shell(ctx: &mut Context) -> anyhow::Result<()> {
    let mut rl: Editor<CartolaHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CartolaHelper::new(PROMPT)));

    let history_file = ctx.store.dir().join(COMMAND_HISTORY_FILE);
    if rl.load_history(&history_file).is_err() {
        println!("No previous history.");
    }
    loop {
        let readline = rl.readline(PROMPT);
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                match parser::parse(line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(ShellCommand::Help) => println!("{}", parser::HELP),
                    Ok(ShellCommand::Run(command)) => {
                        if let Err(e) = run_command(ctx, command) {
                            error!("{:#}", e);
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break
            },
            Err(err) => {
                println!("Error: {:?}", err);
                break
            }
        }
    }
    save_history(&mut rl, &history_file)
}

fn save_history(rl: &mut Editor<CartolaHelper, DefaultHistory>, path: &Path) -> anyhow::Result<()> {
    rl.save_history(path)?;
    Ok(())
}
