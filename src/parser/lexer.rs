// Shared nom combinators

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::multispace0,
    combinator::recognize,
    sequence::{delimited, tuple},
    IResult,
};

/// Wrap a parser to consume surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A run of word characters (letters, digits, underscore)
pub fn word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char)(input)
}

/// A stat variable reference such as `..count..`
pub fn stat_variable(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag(".."), word, tag(".."))))(input)
}

/// A variable name as written after `@`: a stat variable or a plain word
pub fn identifier(input: &str) -> IResult<&str, &str> {
    alt((stat_variable, word))(input)
}
