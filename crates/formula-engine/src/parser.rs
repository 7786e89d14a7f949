//! Recursive-descent parser for formula expressions.
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | atom
//! atom    := NUMBER | ITEM | "(" expr ")"
//! ```

use crate::lexer::{tokenize, Token, TokenKind};
use crate::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Item(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Line items referenced by the expression, first occurrence order.
    pub fn items(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Item(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
            Expr::Neg(inner) => inner.collect_items(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_items(out);
                rhs.collect_items(out);
            }
        }
    }
}

/// Tokenize and parse a formula string.
pub fn parse(src: &str, vocabulary: &[&str]) -> Result<Expr, FormulaError> {
    let tokens = tokenize(src, vocabulary)?;
    if tokens.is_empty() {
        return Err(FormulaError::EmptyExpression);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        src_len: src.len(),
    };
    let expr = parser.parse_expr()?;

    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(FormulaError::Parse {
            pos: tok.start,
            message: format!("unexpected {}", describe(&tok.kind)),
        }),
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Item(name) => format!("'{}'", name),
        TokenKind::Number(n) => format!("number {}", n),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    src_len: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_error(&self, what: &str) -> FormulaError {
        FormulaError::Parse {
            pos: self.src_len,
            message: format!("expected {}, found end of formula", what),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if let Some(TokenKind::Minus) = self.peek().map(|t| &t.kind) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, FormulaError> {
        let tok = self.advance().ok_or_else(|| self.eof_error("a line item or number"))?;

        match &tok.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Item(name) => Ok(Expr::Item(name.clone())),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(FormulaError::Parse {
                        pos: other.start,
                        message: format!("expected ')', found {}", describe(&other.kind)),
                    }),
                    None => Err(self.eof_error("')'")),
                }
            }
            other => Err(FormulaError::Parse {
                pos: tok.start,
                message: format!("expected a line item or number, found {}", describe(other)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &[&str] = &["Net Income", "Total Revenue", "Cost of Revenue"];

    fn item(name: &str) -> Box<Expr> {
        Box::new(Expr::Item(name.to_string()))
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = parse("Total Revenue - Cost of Revenue / 2", VOCAB).unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Sub,
                item("Total Revenue"),
                Box::new(Expr::Binary(
                    BinaryOp::Div,
                    item("Cost of Revenue"),
                    Box::new(Expr::Number(2.0)),
                )),
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("( Total Revenue - Cost of Revenue ) / Total Revenue", VOCAB).unwrap();
        match expr {
            Expr::Binary(BinaryOp::Div, lhs, _) => {
                assert!(matches!(*lhs, Expr::Binary(BinaryOp::Sub, _, _)))
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_operators_are_left_associative() {
        let expr = parse("Net Income - 1 - 2", VOCAB).unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(
                    BinaryOp::Sub,
                    item("Net Income"),
                    Box::new(Expr::Number(1.0)),
                )),
                Box::new(Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn test_unary_minus() {
        let expr = parse("- Net Income", VOCAB).unwrap();
        assert_eq!(expr, Expr::Neg(item("Net Income")));
    }

    #[test]
    fn test_items_are_deduplicated() {
        let expr = parse("Net Income / Total Revenue + Net Income", VOCAB).unwrap();
        assert_eq!(expr.items(), vec!["Net Income", "Total Revenue"]);
    }

    #[test]
    fn test_malformed_formulas_are_rejected() {
        assert!(matches!(
            parse("Net Income /", VOCAB),
            Err(FormulaError::Parse { .. })
        ));
        assert!(matches!(
            parse("( Net Income", VOCAB),
            Err(FormulaError::Parse { .. })
        ));
        assert!(matches!(
            parse("Net Income )", VOCAB),
            Err(FormulaError::Parse { .. })
        ));
        assert!(matches!(
            parse("Net Income Total Revenue", VOCAB),
            Err(FormulaError::Parse { .. })
        ));
        assert_eq!(parse("   ", VOCAB), Err(FormulaError::EmptyExpression));
    }

    #[test]
    fn test_call_syntax_is_not_an_expression() {
        // Anything resembling a function call is a parse error, never a lookup
        assert!(parse("abs(Net Income)", VOCAB).is_err());
        assert!(parse("__import__('os')", VOCAB).is_err());
    }
}
