//! Lenient JSON reader for `.rdlevel` files
//!
//! Level files are almost JSON: separators may be missing or repeated,
//! trailing commas are common and strings may hold literal newlines. This
//! reader accepts all of that and produces a plain [`serde_json::Value`].

use crate::error::{LevelError, LevelResult};
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while, take_while1, take_while_m_n},
    character::complete::{anychar, char, multispace0, one_of, satisfy},
    combinator::{cut, map, opt, recognize},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{fold_many0, many0_count},
    sequence::{pair, preceded},
    IResult,
};
use serde_json::{Map, Value};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn is_word_break(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '{' | '}' | '[' | ']' | ':' | ',' | '"')
}

fn fail<'a, T>(input: &'a str, message: &'static str) -> Res<'a, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(message))],
    }))
}

/// Any run of the given separator characters, with surrounding whitespace
fn separators<'a>(chars: &'static str) -> impl FnMut(&'a str) -> Res<'a, ()> {
    map(
        pair(many0_count(preceded(multispace0, one_of(chars))), multispace0),
        |_| (),
    )
}

fn word(input: &str) -> Res<'_, &str> {
    take_while1(|c| !is_word_break(c))(input)
}

enum Fragment<'a> {
    Literal(&'a str),
    Escaped(Option<char>),
}

fn unicode_escape(input: &str) -> Res<'_, Option<char>> {
    map(
        preceded(char('u'), take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit())),
        |hex: &str| {
            let code = u32::from_str_radix(hex, 16).unwrap_or(0);
            Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
        },
    )(input)
}

fn simple_escape(input: &str) -> Res<'_, Option<char>> {
    map(anychar, |c| match c {
        '"' | '\\' | '/' => Some(c),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        _ => None,
    })(input)
}

fn fragment(input: &str) -> Res<'_, Fragment<'_>> {
    alt((
        map(is_not("\"\\"), Fragment::Literal),
        map(
            preceded(char('\\'), opt(alt((unicode_escape, simple_escape)))),
            |c| Fragment::Escaped(c.flatten()),
        ),
    ))(input)
}

/// A quoted string; an unterminated one runs to the end of input
fn string(input: &str) -> Res<'_, String> {
    let (input, _) = char('"')(input)?;
    let (input, text) = fold_many0(fragment, String::new, |mut text, fragment| {
        match fragment {
            Fragment::Literal(s) => text.push_str(s),
            Fragment::Escaped(Some(c)) => text.push(c),
            Fragment::Escaped(None) => {}
        }
        text
    })(input)?;
    let (input, _) = opt(char('"'))(input)?;
    Ok((input, text))
}

fn number_value(text: &str) -> Value {
    if text.contains('.') {
        let number = text.parse::<f64>().ok().filter(|x| x.is_finite()).unwrap_or(0.0);
        Value::from(number)
    } else {
        Value::from(text.parse::<i64>().unwrap_or(0))
    }
}

fn number(input: &str) -> Res<'_, Value> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_digit() || c == '-'),
            take_while(|c| !is_word_break(c)),
        )),
        number_value,
    )(input)
}

fn keyword(input: &str) -> Res<'_, Value> {
    map(word, |w| match w {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Null,
    })(input)
}

fn object(input: &str) -> Res<'_, Value> {
    let (mut input, _) = char('{')(input)?;
    let mut entries = Map::new();
    loop {
        let (rest, _) = separators(",")(input)?;
        let (rest, close) = opt(char('}'))(rest)?;
        if close.is_some() {
            return Ok((rest, Value::Object(entries)));
        }
        if rest.is_empty() {
            return fail(rest, "unterminated object");
        }
        let (rest, key) = cut(context("expected a key", string))(rest)?;
        let (rest, _) = cut(context("expected ':'", preceded(multispace0, char(':'))))(rest)?;
        let (rest, value) = cut(json_value)(rest)?;
        entries.insert(key, value);
        input = rest;
    }
}

fn array(input: &str) -> Res<'_, Value> {
    let (mut input, _) = char('[')(input)?;
    let mut items = Vec::new();
    loop {
        let (rest, _) = separators(",:")(input)?;
        let (rest, close) = opt(char(']'))(rest)?;
        if close.is_some() {
            return Ok((rest, Value::Array(items)));
        }
        if rest.is_empty() {
            return fail(rest, "unterminated array");
        }
        let (rest, item) = cut(json_value)(rest)?;
        items.push(item);
        input = rest;
    }
}

fn json_value(input: &str) -> Res<'_, Value> {
    preceded(
        multispace0,
        context(
            "expected a value",
            alt((object, array, map(string, Value::String), number, keyword)),
        ),
    )(input)
}

fn to_level_error(input: &str, error: VerboseError<&str>) -> LevelError {
    let remaining = error.errors.first().map_or("", |(rest, _)| *rest);
    let message = error
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(message) => Some(message.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "unexpected input".to_string());
    LevelError::syntax_at(input, remaining, message)
}

/// Parse level text into a JSON value.
///
/// Empty input reads as `null`. Anything after the first complete value is
/// ignored.
pub fn parse_rd_json(text: &str) -> LevelResult<Value> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match json_value(text) {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_level_error(text, e)),
        Err(nom::Err::Incomplete(_)) => Err(LevelError::syntax_at(text, "", "unexpected end of input")),
    }
}
