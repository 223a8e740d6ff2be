use nom::bytes::complete::tag_no_case;
use nom::character::complete::multispace1;
use nom::branch::alt;
use nom::combinator::{eof, peek, rest};
use nom::IResult;
use nom::multi::many1;
use crate::controller::Command;
use crate::parser::{row_number, space_comma1};

/// Parse `LABEL row, row category` pattern. The category is the rest of the line.
pub(crate) fn parse_label(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_no_case("LABEL")(input)?;
    let (input, rows) = parse_rows(input)?;
    let (input, _) = multispace1(input)?;
    let (input, category) = rest(input)?;
    let quotation_marks: &[_] = &['\'', '"'];
    Ok((input, Command::Label { rows, category: category.trim().trim_matches(quotation_marks).to_string() }))
}

fn parse_rows(input: &str) -> IResult<&str, Vec<usize>> {
    many1(parse_row)(input)
}

/// A row number must end at a separator, so `7eleven` stays part of the category
fn parse_row(input: &str) -> IResult<&str, usize> {
    let (input, _) = space_comma1(input)?;
    let (input, row) = row_number(input)?;
    let (input, _) = peek(alt((space_comma1, eof)))(input)?;
    Ok((input, row))
}
