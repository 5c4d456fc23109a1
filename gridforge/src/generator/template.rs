//! Placeholder templates
//!
//! Catalog fragments use `{{NAME}}` tokens where `NAME` starts with an
//! uppercase ASCII letter followed by uppercase letters, digits and
//! underscores. Anything else between braces, such as a C aggregate
//! initializer `{{0}}`, is left as literal text.

use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Token values for one module instance.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// A located `{{NAME}}` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn is_token_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn scan(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = source[cursor..].find(OPEN) {
        let start = cursor + offset;
        let name_start = start + OPEN.len();
        let Some(close) = source[name_start..].find(CLOSE) else {
            break;
        };
        let name = &source[name_start..name_start + close];
        if is_token_name(name) {
            let end = name_start + close + CLOSE.len();
            tokens.push(Token { start, end, name });
            cursor = end;
        } else {
            cursor = start + 1;
        }
    }

    tokens
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(source: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for token in scan(source) {
        if !names.contains(&token.name) {
            names.push(token.name);
        }
    }
    names
}

/// Replace every token from `subs`.
///
/// Returns the names of tokens with no value instead of emitting them as
/// literal text.
pub fn render(source: &str, subs: &Substitutions) -> Result<String, Vec<String>> {
    let mut out = String::with_capacity(source.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut cursor = 0;

    for token in scan(source) {
        out.push_str(&source[cursor..token.start]);
        match subs.get(token.name) {
            Some(value) => out.push_str(value),
            None => {
                if !unresolved.iter().any(|n| n == token.name) {
                    unresolved.push(token.name.to_string());
                }
            }
        }
        cursor = token.end;
    }
    out.push_str(&source[cursor..]);

    if unresolved.is_empty() {
        Ok(out)
    } else {
        Err(unresolved)
    }
}

/// Placeholder name for the i-th allocated pin.
pub fn pin_placeholder(index: usize) -> String {
    format!("PIN_{}", index)
}
