//! Label text as it appears between delimiters.
//!
//! Characters the line grammar cannot carry are written as Mermaid entity
//! codes (`#quot;`, `#37;`, `#10;`) and read back by [`unescape`].

use winnow::ascii::{alphanumeric1, digit1};
use winnow::combinator::{alt, delimited};
use winnow::prelude::*;

/// Characters that close or reshape a delimiter; labels holding any of them
/// are written quoted.
const RISKY: [char; 9] = ['[', ']', '(', ')', '{', '}', '|', '/', '\\'];

/// Label as written after a node id or inside `|…|`.
pub fn protect(label: &str) -> String {
    let escaped = escape(label);
    if escaped.contains(RISKY) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Replace quotes, line breaks, `%%` and entity-like `#` runs by entity codes.
pub fn escape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '"' => out.push_str("#quot;"),
            '\n' => out.push_str("#10;"),
            '\r' => out.push_str("#13;"),
            '%' if chars.peek().is_some_and(|&(_, next)| next == '%') => out.push_str("#37;"),
            '#' if entity(&mut &label[at..]).is_ok() => out.push_str("#35;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode entity codes. Unknown names and invalid code points stay as
/// written.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('#') {
        out.push_str(&rest[..at]);
        let mut input = &rest[at..];
        match entity(&mut input) {
            Ok(decoded) => {
                out.push(decoded);
                rest = input;
            }
            Err(_) => {
                out.push('#');
                rest = &rest[at + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(input: &mut &str) -> winnow::Result<char> {
    delimited('#', alt((numeric_entity, named_entity)), ';').parse_next(input)
}

fn numeric_entity(input: &mut &str) -> winnow::Result<char> {
    digit1
        .verify_map(|digits: &str| digits.parse::<u32>().ok().and_then(char::from_u32))
        .parse_next(input)
}

fn named_entity(input: &mut &str) -> winnow::Result<char> {
    alphanumeric1
        .verify_map(|name: &str| match name {
            "quot" => Some('"'),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        })
        .parse_next(input)
}
