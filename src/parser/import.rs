use nom::bytes::complete::tag_no_case;
use nom::character::complete::multispace1;
use nom::IResult;
use crate::controller::Command;
use crate::parser::{options, path_arg};

/// Parse `IMPORT path (dryrun)`
pub(crate) fn import(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("IMPORT")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, path) = path_arg(input)?;
    let (input, import_options) = options(input)?;

    let dry_run = import_options.iter().any(|o| o == "dryrun" || o == "dry_run");
    Ok((input, Command::Import { path, dry_run }))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use crate::controller::Command;
    use super::import;

    #[test]
    fn test() {
        assert_eq!(import("import cartola.xlsx"),
                   Ok(("", Command::Import { path: PathBuf::from("cartola.xlsx"), dry_run: false })));
        assert_eq!(import("IMPORT \"2024/marzo\" (dryrun)"),
                   Ok(("", Command::Import { path: PathBuf::from("2024/marzo"), dry_run: true })));
        assert!(import("import").is_err());
    }
}
