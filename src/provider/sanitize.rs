//! Tool-call argument repair.
//!
//! Local models often emit tool arguments as single-quoted, dict-like
//! literals (`{'path': '.'}`) instead of JSON, and some endpoints reject a
//! history that replays them. Everything here is best effort: a repair that
//! fails leaves the input as it was and never errors.

use std::iter::Peekable;
use std::str::Chars;

use serde_json::{Map, Value};

use crate::types::ChatMessage;

/// Encode tool-call arguments as a JSON string.
///
/// Objects (and other structured values) are serialized; strings that are
/// already JSON pass through untouched; literal-syntax strings are repaired;
/// anything else is returned unchanged.
pub fn sanitize_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => sanitize_str(raw),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

/// String form of [`sanitize_arguments`].
pub fn sanitize_str(raw: &str) -> String {
    if serde_json::from_str::<Value>(raw).is_ok() {
        return raw.to_string();
    }
    repair_literal(raw).unwrap_or_else(|| raw.to_string())
}

/// Copy `messages`, re-encoding every prior tool call's arguments as a
/// sanitized JSON string.
pub fn sanitize_messages(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| {
            let mut message = message.clone();
            if let Some(calls) = message.tool_calls.as_mut() {
                for call in calls {
                    let encoded = sanitize_arguments(&call.function.arguments);
                    call.function.arguments = Value::String(encoded);
                }
            }
            message
        })
        .collect()
}

/// Decode arguments received from the endpoint.
///
/// Missing or blank arguments decode to `{}`. Undecodable input survives as
/// the original raw string rather than being dropped.
pub fn decode_arguments(raw: Option<&str>) -> Value {
    let original = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Value::Object(Map::new()),
    };

    if let Ok(value) = serde_json::from_str(original) {
        return value;
    }
    let repaired = sanitize_str(original);
    serde_json::from_str(&repaired).unwrap_or_else(|_| Value::String(original.to_string()))
}

/// Rewrite a literal-syntax structure as canonical JSON.
///
/// Handles single-quoted strings, `True`/`False`/`None`, tuples and trailing
/// commas. Returns `None` for anything outside that grammar.
fn repair_literal(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if !trimmed.starts_with(['{', '[', '(']) {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut chars = trimmed.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => read_string(c, &mut chars, &mut out)?,
            '{' => {
                closers.push('}');
                out.push('{');
            }
            '[' => {
                closers.push(']');
                out.push('[');
            }
            '(' => {
                closers.push(')');
                out.push('[');
            }
            '}' | ']' | ')' => {
                if closers.pop()? != c {
                    return None;
                }
                drop_trailing_comma(&mut out);
                out.push(if c == '}' { '}' } else { ']' });
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                out.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || matches!(next, '.' | '+' | '-' | '_') {
                        out.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    _ => return None,
                });
            }
            other => out.push(other),
        }
    }

    if !closers.is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(&out).ok()?;
    Some(value.to_string())
}

/// Copy one quoted string (opening quote already consumed) as a JSON string.
fn read_string(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Option<()> {
    out.push('"');
    loop {
        match chars.next()? {
            '\\' => match chars.next()? {
                '\'' => out.push('\''),
                '"' => out.push_str("\\\""),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            '"' if quote == '\'' => out.push_str("\\\""),
            c if c == quote => {
                out.push('"');
                return Some(());
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
}

fn drop_trailing_comma(out: &mut String) {
    let kept = out.trim_end().len();
    if out[..kept].ends_with(',') {
        out.truncate(kept - 1);
    } else {
        out.truncate(kept);
    }
}
