//! Precedence-climbing recursive descent over a token slice, exactly the
//! grammar in spec.md §4.2. Grounded on
//! `examples/original_source/CHTL/CHTLExpr/ExprParser.cpp`'s
//! ternary -> logicalOr -> ... -> primary cascade.

use super::{BinaryOp, Expr, UnaryOp};
use crate::position::SourcePosition;
use crate::token::{Punct, Token, TokenKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprParseError {
    pub position: SourcePosition,
    pub message: String,
}

impl fmt::Display for ExprParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

impl std::error::Error for ExprParseError {}

pub struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

type PResult<T> = Result<T, ExprParseError>;

impl<'a> ExprParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a full expression, requiring every token in the slice to be
    /// consumed. This is the entry point the main parser calls with the
    /// token span between `:` and `;` (or a usage-body value span).
    pub fn parse(tokens: &'a [Token]) -> PResult<Expr> {
        let mut parser = Self::new(tokens);
        let expr = parser.parse_ternary()?;
        if let Some(tok) = parser.peek() {
            if !tok.is_eof() {
                return Err(parser.error_at(tok.start, format!("unexpected trailing token in expression")));
            }
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn current_pos(&self) -> SourcePosition {
        self.peek()
            .map(|t| t.start)
            .or_else(|| self.tokens.last().map(|t| t.end))
            .unwrap_or_default()
    }

    fn error_at(&self, position: SourcePosition, message: impl Into<String>) -> ExprParseError {
        ExprParseError {
            position,
            message: message.into(),
        }
    }

    fn expect_punct(&mut self, p: Punct) -> PResult<()> {
        if self.peek_punct() == Some(p) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_at(self.current_pos(), format!("expected '{}'", p.as_str())))
        }
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let cond = self.parse_logical_or()?;
        if self.peek_punct() == Some(Punct::Question) {
            self.advance();
            let then_branch = self.parse_ternary()?;
            self.expect_punct(Punct::Colon)?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        } else {
            Ok(cond)
        }
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_logical_and()?;
        while self.peek_punct() == Some(Punct::OrOr) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.peek_punct() == Some(Punct::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_compare()?;
        loop {
            let op = match self.peek_punct() {
                Some(Punct::EqEq) => BinaryOp::Eq,
                Some(Punct::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_compare()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> PResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_punct() {
                Some(Punct::Less) => BinaryOp::Lt,
                Some(Punct::LessEq) => BinaryOp::Le,
                Some(Punct::Greater) => BinaryOp::Gt,
                Some(Punct::GreaterEq) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_punct() {
                Some(Punct::Plus) => BinaryOp::Add,
                Some(Punct::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek_punct() {
                Some(Punct::Star) => BinaryOp::Mul,
                Some(Punct::Slash) => BinaryOp::Div,
                Some(Punct::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Right-associative: `a ** b ** c == a ** (b ** c)`.
    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_unary()?;
        if self.peek_punct() == Some(Punct::StarStar) {
            self.advance();
            let exponent = self.parse_power()?;
            Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
        } else {
            Ok(base)
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        match self.peek_punct() {
            Some(Punct::Minus) => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Some(Punct::Bang) => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let pos = self.current_pos();
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::NumberLiteral(text)) => {
                self.advance();
                let value: f64 = text
                    .parse()
                    .map_err(|_| self.error_at(pos, format!("invalid number '{}'", text)))?;
                let unit = match self.peek().map(|t| t.kind.clone()) {
                    Some(TokenKind::Identifier(u)) => {
                        self.advance();
                        Some(u)
                    }
                    _ => None,
                };
                Ok(Expr::Number { value, unit })
            }
            Some(TokenKind::StringLiteral(s)) | Some(TokenKind::UnquotedLiteral(s)) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                if self.peek_punct() == Some(Punct::LParen) {
                    self.advance();
                    let var = match self.peek().map(|t| t.kind.clone()) {
                        Some(TokenKind::Identifier(v)) => {
                            self.advance();
                            v
                        }
                        _ => {
                            return Err(self.error_at(self.current_pos(), "expected variable name inside '(...)'"));
                        }
                    };
                    self.expect_punct(Punct::RParen)?;
                    Ok(Expr::VarAccess { template: name, var })
                } else {
                    Ok(Expr::PropertyRef(name))
                }
            }
            Some(TokenKind::Punct(Punct::LParen)) => {
                self.advance();
                let inner = self.parse_ternary()?;
                self.expect_punct(Punct::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            _ => Err(self.error_at(pos, "expected a value, identifier, or '('")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Expr {
        let tokens = tokenize(src);
        ExprParser::parse(&tokens).expect("should parse")
    }

    #[test]
    fn parses_unit_arithmetic() {
        let expr = parse("100px + 50px");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number { value: 100.0, unit: Some("px".into()) }),
                Box::new(Expr::Number { value: 50.0, unit: Some("px".into()) }),
            )
        );
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2");
        match expr {
            Expr::Binary(BinaryOp::Pow, left, right) => {
                assert_eq!(*left, Expr::Number { value: 2.0, unit: None });
                assert_eq!(
                    *right,
                    Expr::Binary(
                        BinaryOp::Pow,
                        Box::new(Expr::Number { value: 3.0, unit: None }),
                        Box::new(Expr::Number { value: 2.0, unit: None }),
                    )
                );
            }
            _ => panic!("expected power node"),
        }
    }

    #[test]
    fn ternary_and_variable_access() {
        let expr = parse("flag ? ThemeVars(primary) : \"black\"");
        match expr {
            Expr::Ternary { then_branch, else_branch, .. } => {
                assert_eq!(
                    *then_branch,
                    Expr::VarAccess {
                        template: "ThemeVars".into(),
                        var: "primary".into()
                    }
                );
                assert_eq!(*else_branch, Expr::Str("black".into()));
            }
            _ => panic!("expected ternary"),
        }
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let tokens = tokenize("1px 2px");
        assert!(ExprParser::parse(&tokens).is_err());
    }
}
