//! Splits string literals into text and `{ $name }` placeholders.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, recognize},
    multi::many0,
    sequence::{delimited, pair},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    /// Symbol name including its `$`
    Placeholder(&'a str),
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        char('$'),
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn placeholder(input: &str) -> IResult<&str, Segment<'_>> {
    map(
        delimited(
            pair(char('{'), multispace0),
            identifier,
            pair(multispace0, char('}')),
        ),
        Segment::Placeholder,
    )
    .parse(input)
}

// A brace that does not open a placeholder is ordinary text
fn text(input: &str) -> IResult<&str, Segment<'_>> {
    alt((
        map(take_till1(|c: char| c == '{'), Segment::Text),
        map(recognize(char('{')), Segment::Text),
    ))
    .parse(input)
}

/// Split `input` into segments; concatenating them reproduces `input`.
pub(crate) fn parse_template(input: &str) -> Vec<Segment<'_>> {
    match many0(alt((placeholder, text))).parse(input) {
        Ok((_, segments)) => segments,
        Err(_) => vec![Segment::Text(input)],
    }
}

/// Whether any segment needs a value substituted
pub(crate) fn has_placeholders(segments: &[Segment<'_>]) -> bool {
    segments
        .iter()
        .any(|segment| matches!(segment, Segment::Placeholder(_)))
}
