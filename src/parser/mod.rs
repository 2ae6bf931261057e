//! Condition parsing
//!
//! Recursive-descent parser over the lexer's token stream. Precedence,
//! high to low: parentheses, `NOT`, `AND`, `OR`. Operators are bound
//! longest-match-first, so `NOT CONTAINS` is one operator rather than a
//! negation wrapping `CONTAINS`; the two differ on records where the
//! field is absent.

use crate::ast::{Expr, Literal, Op, Predicate};
use crate::error::EngineError;
use crate::event::FieldPath;
use crate::lexer::{self, Item, Token};
use crate::pattern::{LikePattern, WildcardPattern};

/// Validation of standalone condition strings
pub mod validate;

pub use validate::{validate_condition, ValidationResult};

/// Nesting bound; pathological inputs fail instead of blowing the stack
const MAX_DEPTH: usize = 64;

/// Parse failure with an optional source offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable failure description
    pub message: String,
    /// Byte offset in the condition string, when known
    pub pos: Option<usize>,
}

impl ParseError {
    fn new(message: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }

    fn at(message: impl Into<String>, item: &Item) -> Self {
        Self::new(message, Some(item.pos))
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{} at offset {}", self.message, pos),
            None => f.write_str(&self.message),
        }
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        EngineError::Syntax(err.to_string())
    }
}

/// Parse a condition string into an expression tree
pub fn parse_condition(input: &str) -> Result<Expr, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("condition cannot be empty", Some(0)));
    }

    let tokens = lexer::tokenize(input)
        .map_err(|e| ParseError::new(e.message, Some(e.pos)))?;

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or(0)?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Item>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Item {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Item {
        let item = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        let item = self.peek();
        if item.token == Token::Eof {
            Ok(())
        } else {
            Err(ParseError::at(
                format!("unexpected '{}' after expression", item.value),
                item,
            ))
        }
    }

    // or := and (OR and)*
    fn parse_or(&mut self, depth: usize) -> Result<Expr, ParseError> {
        let mut children = vec![self.parse_and(depth)?];
        while self.eat(Token::Or) {
            children.push(self.parse_and(depth)?);
        }
        Ok(Expr::or(children))
    }

    // and := unary (AND unary)*
    fn parse_and(&mut self, depth: usize) -> Result<Expr, ParseError> {
        let mut children = vec![self.parse_unary(depth)?];
        while self.eat(Token::And) {
            children.push(self.parse_unary(depth)?);
        }
        Ok(Expr::and(children))
    }

    // unary := NOT unary | primary
    fn parse_unary(&mut self, depth: usize) -> Result<Expr, ParseError> {
        self.check_depth(depth)?;
        if self.eat(Token::Not) {
            let inner = self.parse_unary(depth + 1)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary(depth)
    }

    // primary := '(' expr ')' | atom
    fn parse_primary(&mut self, depth: usize) -> Result<Expr, ParseError> {
        self.check_depth(depth)?;
        let item = self.peek().clone();
        match item.token {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or(depth + 1)?;
                if !self.eat(Token::RParen) {
                    let here = self.peek().clone();
                    return Err(ParseError::at("unbalanced parentheses", &here));
                }
                Ok(inner)
            }
            Token::Identifier => self.parse_atom(),
            Token::Eof => Err(ParseError::at("unexpected end of condition", &item)),
            Token::RParen => Err(ParseError::at("unbalanced parentheses", &item)),
            _ => Err(ParseError::at(
                format!("expected a field name, found '{}'", item.value),
                &item,
            )),
        }
    }

    // atom := path operator
    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let field = self.advance();
        let path = FieldPath::parse(&field.value)
            .ok_or_else(|| ParseError::at(format!("invalid field path '{}'", field.value), &field))?;

        let op = self.parse_operator(&field)?;
        Ok(Expr::Atom(Predicate { path, op }))
    }

    fn parse_operator(&mut self, field: &Item) -> Result<Op, ParseError> {
        let item = self.advance();
        match item.token {
            Token::Eq => Ok(Op::Eq(self.parse_literal()?)),
            Token::Neq => Ok(Op::Neq(self.parse_literal()?)),
            Token::Lt => Ok(Op::Lt(self.parse_literal()?)),
            Token::Lte => Ok(Op::Lte(self.parse_literal()?)),
            Token::Gt => Ok(Op::Gt(self.parse_literal()?)),
            Token::Gte => Ok(Op::Gte(self.parse_literal()?)),
            Token::In => Ok(Op::In(self.parse_in_list()?)),
            Token::Contains => Ok(Op::Contains(self.parse_string()?)),
            Token::StartsWith => Ok(Op::StartsWith(self.parse_string()?)),
            Token::EndsWith => Ok(Op::EndsWith(self.parse_string()?)),
            Token::Match => {
                let (pattern, at) = self.parse_string_at()?;
                WildcardPattern::new(&pattern)
                    .map(Op::Match)
                    .map_err(|e| ParseError::new(format!("invalid MATCH pattern: {}", e), Some(at)))
            }
            Token::Like => {
                let (pattern, at) = self.parse_string_at()?;
                LikePattern::new(&pattern)
                    .map(Op::Like)
                    .map_err(|e| ParseError::new(format!("invalid LIKE pattern: {}", e), Some(at)))
            }
            // NOT after a field starts a negated operator, longest match
            Token::Not => {
                let next = self.advance();
                match next.token {
                    Token::In => Ok(Op::NotIn(self.parse_in_list()?)),
                    Token::Contains => Ok(Op::NotContains(self.parse_string()?)),
                    Token::StartsWith => Ok(Op::NotStartsWith(self.parse_string()?)),
                    Token::EndsWith => Ok(Op::NotEndsWith(self.parse_string()?)),
                    _ => Err(ParseError::at(
                        format!(
                            "expected IN, CONTAINS, STARTSWITH or ENDSWITH after 'NOT', found '{}'",
                            next.value
                        ),
                        &next,
                    )),
                }
            }
            Token::Is => {
                if self.eat(Token::Not) {
                    let null = self.advance();
                    if null.token != Token::Null {
                        return Err(ParseError::at("expected NULL after 'IS NOT'", &null));
                    }
                    Ok(Op::IsNotNull)
                } else {
                    let null = self.advance();
                    if null.token != Token::Null {
                        return Err(ParseError::at("expected NULL after 'IS'", &null));
                    }
                    Ok(Op::IsNull)
                }
            }
            Token::Eof => Err(ParseError::at(
                format!("missing operator after field '{}'", field.value),
                &item,
            )),
            Token::LParen => Err(ParseError::at(
                "function calls are not supported in conditions",
                &item,
            )),
            _ => Err(ParseError::at(
                format!("unknown operator '{}'", item.value),
                &item,
            )),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let item = self.advance();
        match item.token {
            Token::Str => Ok(Literal::Str(item.value)),
            Token::Number => item
                .value
                .parse()
                .map(Literal::Num)
                .map_err(|_| ParseError::at(format!("invalid number '{}'", item.value), &item)),
            Token::Bool => Ok(Literal::Bool(item.value.eq_ignore_ascii_case("true"))),
            Token::Eof => Err(ParseError::at("missing value after operator", &item)),
            _ => Err(ParseError::at(
                format!("expected a literal value, found '{}'", item.value),
                &item,
            )),
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.parse_string_at().map(|(s, _)| s)
    }

    fn parse_string_at(&mut self) -> Result<(String, usize), ParseError> {
        let item = self.advance();
        match item.token {
            Token::Str => Ok((item.value, item.pos)),
            Token::Eof => Err(ParseError::at("missing string value after operator", &item)),
            _ => Err(ParseError::at(
                format!("expected a quoted string, found '{}'", item.value),
                &item,
            )),
        }
    }

    fn parse_in_list(&mut self) -> Result<Vec<Literal>, ParseError> {
        let open = self.advance();
        if open.token != Token::LParen {
            return Err(ParseError::at("expected '(' after IN", &open));
        }

        if self.peek().token == Token::RParen {
            let here = self.peek().clone();
            return Err(ParseError::at("IN list cannot be empty", &here));
        }

        let mut values = vec![self.parse_literal()?];
        while self.eat(Token::Comma) {
            values.push(self.parse_literal()?);
        }

        let close = self.advance();
        if close.token != Token::RParen {
            return Err(ParseError::at("expected ')' to close IN list", &close));
        }
        Ok(values)
    }

    fn check_depth(&self, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_DEPTH {
            Err(ParseError::new(
                format!("expression nesting exceeds {} levels", MAX_DEPTH),
                Some(self.peek().pos),
            ))
        } else {
            Ok(())
        }
    }
}
