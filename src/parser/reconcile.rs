use nom::bytes::complete::tag_no_case;
use nom::character::complete::{i64 as parse_i64, multispace1};
use nom::combinator::opt;
use nom::IResult;
use nom::number::complete::double;
use nom::sequence::{preceded, tuple};
use crate::controller::Command;
use crate::parser::path_arg;

/// Parse `RECONCILE kame_file WINDOW days TOLERANCE amount`, both settings optional
pub(crate) fn reconcile(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("RECONCILE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, file) = path_arg(input)?;
    let (input, window_days) = opt(preceded(tuple((multispace1, tag_no_case("WINDOW"), multispace1)), parse_i64))(input)?;
    let (input, tolerance) = opt(preceded(tuple((multispace1, tag_no_case("TOLERANCE"), multispace1)), double))(input)?;
    Ok((input, Command::Reconcile { file, window_days, tolerance }))
}
