use std::path::PathBuf;
use nom::branch::alt;
use nom::bytes::complete::{is_a, is_not, tag_no_case};
use nom::character::complete::{char, digit1, multispace0, multispace1};
use nom::combinator::{all_consuming, map, map_res, opt, value};
use nom::IResult;
use nom::sequence::{delimited, preceded};
use crate::controller::Command;

mod export;
mod import;
mod label;
mod reconcile;

/// A line typed into the interactive shell
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ShellCommand {
    Run(Command),
    Help,
    Quit,
}

pub(crate) const HELP: &str = "\
import <file or dir> [(dryrun)]      import a statement as the current batch
show [unlabeled]                     list the transactions
label <rows> <category>              label rows, e.g. `label 3, 7 12 gastos bancarios`
suggest [apply]                      suggest categories from the keyword rules
train                                train the classifier on the labeled rows
classify                             predict categories for the unlabeled rows
reconcile <kame file> [window <days>] [tolerance <amount>]
export to <file> [(nocategory)]      write the batch as CSV
status                               where the workflow stands
help, quit";

/// Parse one shell line. Keywords are case insensitive, a trailing `;` is ignored.
pub(crate) fn parse(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim().trim_end_matches(';').trim_end();
    match all_consuming(shell_command)(line) {
        Ok((_, command)) => Ok(command),
        Err(_) => Err(format!("Unable to parse `{}`, type `help` for the list of commands", line)),
    }
}

fn shell_command(input: &str) -> IResult<&str, ShellCommand> {
    alt((
        value(ShellCommand::Help, tag_no_case("HELP")),
        value(ShellCommand::Quit, alt((tag_no_case("QUIT"), tag_no_case("EXIT")))),
        map(command, ShellCommand::Run),
    ))(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        import::import,
        label::parse_label,
        export::export,
        reconcile::reconcile,
        show,
        suggest,
        value(Command::Train, tag_no_case("TRAIN")),
        value(Command::Classify, tag_no_case("CLASSIFY")),
        value(Command::Status, tag_no_case("STATUS")),
    ))(input)
}

fn show(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("SHOW")(input)?;
    let (input, unlabeled) = opt(preceded(multispace1, tag_no_case("UNLABELED")))(input)?;
    Ok((input, Command::Show { unlabeled: unlabeled.is_some() }))
}

fn suggest(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("SUGGEST")(input)?;
    let (input, apply) = opt(preceded(multispace1, tag_no_case("APPLY")))(input)?;
    Ok((input, Command::Suggest { apply: apply.is_some() }))
}

/// At least one space or comma
pub(crate) fn space_comma1(input: &str) -> IResult<&str, &str> {
    is_a(" \t,")(input)
}

pub(crate) fn row_number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

/// A file path, bare or quoted
pub(crate) fn path_arg(input: &str) -> IResult<&str, PathBuf> {
    let (input, _) = multispace0(input)?;
    let (input, path) = alt((
        delimited(char('\''), is_not("'"), char('\'')),
        delimited(char('"'), is_not("\""), char('"')),
        is_not(" \t("),
    ))(input)?;
    Ok((input, PathBuf::from(path)))
}

/// `(opt1, opt2)` style options
pub(crate) fn options(input: &str) -> IResult<&str, Vec<String>> {
    let (input, _) = multispace0(input)?;
    let (input, options) = opt(delimited(char('('), is_not(")"), char(')')))(input)?;
    let options = options
        .map(|o| o.split(&[' ', ',']).filter(|s| !s.is_empty()).map(|s| s.to_lowercase()).collect())
        .unwrap_or_default();
    Ok((input, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("train"), Ok(ShellCommand::Run(Command::Train)));
        assert_eq!(parse("Classify;"), Ok(ShellCommand::Run(Command::Classify)));
        assert_eq!(parse("  status  "), Ok(ShellCommand::Run(Command::Status)));
        assert_eq!(parse("help"), Ok(ShellCommand::Help));
        assert_eq!(parse("exit"), Ok(ShellCommand::Quit));
    }

    #[test]
    fn test_show_and_suggest() {
        assert_eq!(parse("show"), Ok(ShellCommand::Run(Command::Show { unlabeled: false })));
        assert_eq!(parse("show unlabeled"), Ok(ShellCommand::Run(Command::Show { unlabeled: true })));
        assert_eq!(parse("suggest apply"), Ok(ShellCommand::Run(Command::Suggest { apply: true })));
        assert!(parse("suggest everything").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse("select * from transactions").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_path_arg() {
        assert_eq!(path_arg(" 'mis cartolas/marzo.xlsx'"), Ok(("", PathBuf::from("mis cartolas/marzo.xlsx"))));
        assert_eq!(path_arg("marzo.csv (dryrun)"), Ok((" (dryrun)", PathBuf::from("marzo.csv"))));
    }
}
