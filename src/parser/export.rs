use nom::bytes::complete::tag_no_case;
use nom::character::complete::multispace1;
use nom::combinator::opt;
use nom::IResult;
use nom::sequence::terminated;
use crate::controller::Command;
use crate::parser::{options, path_arg};

/// Parse `EXPORT TO file_path (nocategory)` pattern.
pub(crate) fn export(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("EXPORT")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = opt(terminated(tag_no_case("TO"), multispace1))(input)?;
    let (input, file) = path_arg(input)?;
    let (input, export_options) = options(input)?;
    let include_category = !export_options.iter().any(|o| o == "nocategory" || o == "no_category");
    Ok((input, Command::Export { file, include_category }))
}
