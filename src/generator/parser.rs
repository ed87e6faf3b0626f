//! Generator program parser
//!
//! Grammar (EBNF):
//!
//! ```text
//! number     = digit, { digit } ;
//! identifier = letter, { letter | digit | "_" } ;
//! version    = "v", number, ".", number ;
//! arg list   = string, { ",", " ", string } ;
//! call       = "$", identifier, "(", [ arg list ], ")" ;
//! generator  = version, " ", { text | call } ;
//! ```
//!
//! Calls do not nest. The argument list ends at the first `)`, and any `$` or
//! `(` inside it is rejected.

use crate::generator::builtins::Builtins;
use crate::generator::program::{Call, Program, Segment};
use crate::util::{CamoError, Result};
use bytes::Bytes;

/// Major versions this parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
}

impl Version {
    pub fn from_major(major: u32) -> Option<Self> {
        match major {
            1 => Some(Version::V1),
            _ => None,
        }
    }
}

fn parse_error(msg: impl Into<String>) -> CamoError {
    CamoError::Parse(msg.into())
}

/// Split `v<major>.<minor> <rest>` into its parts.
fn split_version(text: &str) -> Result<(u32, u32, &str)> {
    let malformed = || parse_error("program must start with 'v<major>.<minor> '");

    let body = text.strip_prefix('v').ok_or_else(malformed)?;
    let (version, rest) = body.split_once(' ').ok_or_else(malformed)?;
    let (major, minor) = version.split_once('.').ok_or_else(malformed)?;

    let number = |s: &str| -> Result<u32> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        s.parse::<u32>()
            .map_err(|_| parse_error(format!("version number '{}' out of range", s)))
    };

    Ok((number(major)?, number(minor)?, rest))
}

/// Length of the identifier at the start of `s`, if any.
fn identifier_len(s: &[u8]) -> usize {
    match s.first() {
        Some(b) if b.is_ascii_alphabetic() => s
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count(),
        _ => 0,
    }
}

fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|arg| arg.trim().to_string()).collect()
}

/// Parse a generator program, resolving every call against `builtins`.
pub fn parse(text: &str, builtins: &Builtins) -> Result<Program> {
    let (major, minor, body) = split_version(text)?;

    match Version::from_major(major) {
        Some(Version::V1) => {}
        None => {
            return Err(parse_error(format!(
                "unsupported generator version v{}.{}",
                major, minor
            )));
        }
    }

    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'$' {
            pos += 1;
            continue;
        }

        let name_start = pos + 1;
        let name_len = identifier_len(&bytes[name_start..]);
        let open = name_start + name_len;
        if name_len == 0 || bytes.get(open) != Some(&b'(') {
            // a bare '$' is ordinary text
            pos += 1;
            continue;
        }

        let name = &body[name_start..open];
        let close = body[open + 1..]
            .find(')')
            .map(|i| open + 1 + i)
            .ok_or_else(|| parse_error(format!("unterminated call to ${}", name)))?;
        let raw_args = &body[open + 1..close];

        if raw_args.contains('$') || raw_args.contains('(') {
            return Err(parse_error(format!(
                "nested calls are not supported (in ${})",
                name
            )));
        }

        let func = builtins
            .get(name)
            .ok_or_else(|| parse_error(format!("unsupported builtin ${}", name)))?;

        if literal_start < pos {
            segments.push(Segment::Literal(Bytes::copy_from_slice(
                &bytes[literal_start..pos],
            )));
        }
        segments.push(Segment::Call(Call {
            name: name.to_string(),
            args: split_args(raw_args),
            func,
            len: builtins.length_of(name),
        }));

        pos = close + 1;
        literal_start = pos;
    }

    if literal_start < bytes.len() {
        segments.push(Segment::Literal(Bytes::copy_from_slice(
            &bytes[literal_start..],
        )));
    }

    tracing::trace!(
        "[Generator] Parsed v{}.{} program with {} segment(s)",
        major,
        minor,
        segments.len()
    );

    Ok(Program {
        major,
        minor,
        segments,
    })
}
