//! Formula tokenizer.
//!
//! Line-item names contain spaces and may share prefixes ("Net Income" vs
//! "Net Income Common Stockholders"), so names are matched greedily against
//! the vocabulary, longest first, and only at a word boundary. Text that
//! matches no vocabulary entry is read up to the next operator and kept as a
//! free-form name; the evaluator decides whether the table has it.

use crate::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Item(String),
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

fn operator(ch: char) -> Option<TokenKind> {
    match ch {
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '/' => Some(TokenKind::Slash),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        _ => None,
    }
}

fn is_boundary(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(ch) => ch.is_whitespace() || operator(ch).is_some(),
    }
}

/// Split a formula into tokens using `vocabulary` for multi-word names.
pub fn tokenize(src: &str, vocabulary: &[&str]) -> Result<Vec<Token>, FormulaError> {
    let mut names: Vec<&str> = vocabulary
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names.dedup();

    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(ch) = src[pos..].chars().next() {
        let rest = &src[pos..];

        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }

        if let Some(kind) = operator(ch) {
            tokens.push(Token { kind, start: pos, end: pos + 1 });
            pos += 1;
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let text = &rest[..len];
            let value: f64 = text.parse().map_err(|_| FormulaError::Lex {
                pos,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                start: pos,
                end: pos + len,
            });
            pos += len;
            continue;
        }

        let known = names
            .iter()
            .find(|name| rest.starts_with(**name) && is_boundary(&rest[name.len()..]));

        let (name, len) = match known {
            Some(name) => (name.to_string(), name.len()),
            None => {
                let len = rest
                    .find(|c: char| operator(c).is_some())
                    .unwrap_or(rest.len());
                (rest[..len].trim_end().to_string(), len)
            }
        };

        tokens.push(Token {
            kind: TokenKind::Item(name),
            start: pos,
            end: pos + len,
        });
        pos += len;
    }

    Ok(tokens)
}
