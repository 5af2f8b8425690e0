//! PostgreSQL statement splitter.
//!
//! Quote-aware lexical splitting: a `;` only terminates a statement when it
//! sits outside single-quoted literals, double-quoted identifiers, line and
//! (nested) block comments, and dollar-quoted blocks. This keeps function
//! bodies like `$$ ... ; ... $$` intact. It is still a lexer, not a parser:
//! malformed input never errors here, it surfaces at execution time.

use crate::dialect::{SqlStatement, StatementSplitter};

/// Quote-aware splitter for PostgreSQL scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSplitter;

impl StatementSplitter for PostgresSplitter {
    fn split(&self, script: &str, transaction_enabled: bool) -> Vec<SqlStatement> {
        let bytes = script.as_bytes();
        let len = bytes.len();
        let mut statements = Vec::new();
        let mut start = 0usize;
        let mut i = 0usize;

        // All sentinels are ASCII, so byte-wise scanning is UTF-8 safe:
        // continuation bytes are >= 0x80 and never match.
        while i < len {
            match bytes[i] {
                b'\'' => i = skip_single_quoted(bytes, i),
                b'"' => i = skip_double_quoted(bytes, i),
                b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'$' => match skip_dollar_quoted(script, i) {
                    Some(end) => i = end,
                    None => i += 1,
                },
                b';' => {
                    push_fragment(&mut statements, &script[start..i], transaction_enabled);
                    start = i + 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        push_fragment(&mut statements, &script[start..], transaction_enabled);
        statements
    }
}

fn push_fragment(out: &mut Vec<SqlStatement>, fragment: &str, transaction_enabled: bool) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(SqlStatement::new(trimmed, transaction_enabled));
    }
}

/// `i` points at the opening quote; returns the index just past the closing
/// quote. `''` inside the literal is an escaped quote. Unterminated literals
/// consume the rest of the input.
fn skip_single_quoted(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 1;
    while j < bytes.len() {
        if bytes[j] == b'\'' {
            if bytes.get(j + 1) == Some(&b'\'') {
                j += 2;
            } else {
                return j + 1;
            }
        } else {
            j += 1;
        }
    }
    bytes.len()
}

fn skip_double_quoted(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 1;
    while j < bytes.len() {
        if bytes[j] == b'"' {
            if bytes.get(j + 1) == Some(&b'"') {
                j += 2;
            } else {
                return j + 1;
            }
        } else {
            j += 1;
        }
    }
    bytes.len()
}

/// Skips to (but not past) the terminating newline.
fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 2;
    while j < bytes.len() && bytes[j] != b'\n' {
        j += 1;
    }
    j
}

/// Block comments nest in PostgreSQL.
fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 2;
    let mut depth = 1usize;
    while j + 1 < bytes.len() {
        if bytes[j] == b'/' && bytes[j + 1] == b'*' {
            depth += 1;
            j += 2;
        } else if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            depth -= 1;
            j += 2;
            if depth == 0 {
                return j;
            }
        } else {
            j += 1;
        }
    }
    bytes.len()
}

/// Try to read a dollar-quote opener (`$$` or `$tag$`) at byte `i`. Returns
/// the index just past the matching closer, or `None` if `i` does not start
/// a dollar quote (e.g. a `$1` parameter reference).
fn skip_dollar_quoted(script: &str, i: usize) -> Option<usize> {
    let bytes = script.as_bytes();
    let mut j = i + 1;
    while j < bytes.len() {
        let c = bytes[j];
        if c == b'$' {
            break;
        }
        if !(c.is_ascii_alphanumeric() || c == b'_') || c.is_ascii_digit() && j == i + 1 {
            return None;
        }
        j += 1;
    }
    if j >= bytes.len() {
        return None;
    }

    let tag = &script[i..=j];
    match script[j + 1..].find(tag) {
        Some(pos) => Some(j + 1 + pos + tag.len()),
        // Unterminated block consumes the rest of the script
        None => Some(script.len()),
    }
}
