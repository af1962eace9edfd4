use crate::{ByteSteps, Read, Write};
use itertools::Itertools;
use std::str::FromStr;
use thiserror::Error;

/// One request of the stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Ask for this many steps.
    Allocate(ByteSteps),
    /// Release whatever the query with this (0-based) index allocated.
    Free(usize),
}

impl Query {
    /// The integer this query is written as. `None` for sizes and
    /// targets beyond `i64::MAX`, which the text format cannot carry.
    pub fn to_raw(&self) -> Option<i64> {
        match *self {
            Query::Allocate(size)   => { i64::try_from(size).ok() },
            Query::Free(target)     => { i64::try_from(target).ok().map(|t| -t - 1) },
        }
    }
}

impl TryFrom<i64> for Query {
    type Error = DecodeError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        if raw >= 0 {
            usize::try_from(raw)
                .map(Query::Allocate)
                .map_err(|_| DecodeError::OutOfRange { raw })
        } else {
            // `raw + 1` cannot overflow, and its negation fits.
            usize::try_from(-(raw + 1))
                .map(Query::Free)
                .map_err(|_| DecodeError::OutOfRange { raw })
        }
    }
}

/// Appears while decoding a query stream. All of them are fatal:
/// the runner never sees a half-decoded input.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Input ended before the {what}")]
    Missing { what: &'static str },
    #[error("`{token}` is not a valid {what}")]
    BadToken { token: String, what: &'static str },
    #[error("Query value {raw} does not fit the address space")]
    OutOfRange { raw: i64 },
    #[error("Unexpected token `{token}` after the last query")]
    Trailing { token: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    pub memory_size:    ByteSteps,
    pub queries:        Vec<Query>,
}

pub fn read_input<R: Read>(mut reader: R) -> Result<Input, DecodeError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    parse_input(&text)
}

pub fn parse_input(text: &str) -> Result<Input, DecodeError> {
    let mut tokens = text.split_ascii_whitespace();
    let memory_size: ByteSteps = next_token(&mut tokens, "memory size")?;
    let count: usize = next_token(&mut tokens, "query count")?;
    let queries = (0..count)
        .map(|_| next_token::<i64>(&mut tokens, "query").and_then(Query::try_from))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(token) = tokens.next() {
        return Err(DecodeError::Trailing { token: token.to_string() });
    }

    Ok(Input { memory_size, queries })
}

/// Writes `input` in the format [`read_input`] expects.
pub fn write_input<W: Write>(w: &mut W, input: &Input) -> std::io::Result<()> {
    let raw = input.queries.iter()
        .map(|q| q.to_raw().ok_or_else(|| std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{:?} does not fit the text format", q),
        )))
        .collect::<std::io::Result<Vec<_>>>()?;
    writeln!(w, "{}", input.memory_size)?;
    writeln!(w, "{}", input.queries.len())?;
    writeln!(w, "{}", raw.iter().join(" "))
}

fn next_token<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what:   &'static str,
) -> Result<T, DecodeError> {
    let token = tokens.next()
        .ok_or(DecodeError::Missing { what })?;

    token.parse()
        .map_err(|_| DecodeError::BadToken { token: token.to_string(), what })
}
