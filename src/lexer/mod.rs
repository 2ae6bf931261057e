//! Lexical analysis for condition strings
//!
//! Converts a rule condition such as
//! `eventName = 'ConsoleLogin' AND (errorCode IS NOT NULL)` into a
//! token sequence. Keywords are case-insensitive; string literals use
//! single quotes with `''` as the escaped quote.

/// Token definitions and utilities
pub mod token;

pub use token::{check_keyword, Item, Token};

/// Lexer failure with the byte offset where it occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Human-readable failure description
    pub message: String,
    /// Byte offset of the failure in the input
    pub pos: usize,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.pos)
    }
}

/// Lexer for condition expressions.
/// Walks the input byte-wise and produces a flat token list.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over the given input
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Scan the whole input into tokens, ending with an `Eof` item
    pub fn tokenize(mut self) -> Result<Vec<Item>, LexError> {
        let mut items = Vec::new();
        loop {
            let item = self.next_item()?;
            let done = item.token == Token::Eof;
            items.push(item);
            if done {
                return Ok(items);
            }
        }
    }

    fn next_item(&mut self) -> Result<Item, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.peek() else {
            return Ok(Item::new(Token::Eof, "", start));
        };

        match c {
            '(' => {
                self.position += 1;
                Ok(Item::new(Token::LParen, "(", start))
            }
            ')' => {
                self.position += 1;
                Ok(Item::new(Token::RParen, ")", start))
            }
            ',' => {
                self.position += 1;
                Ok(Item::new(Token::Comma, ",", start))
            }
            '\'' => self.lex_string(start),
            '=' => {
                self.position += 1;
                Ok(Item::new(Token::Eq, "=", start))
            }
            '!' => {
                if self.rest().starts_with("!=") {
                    self.position += 2;
                    Ok(Item::new(Token::Neq, "!=", start))
                } else {
                    Err(self.error("unexpected '!'", start))
                }
            }
            '<' => {
                // Longest match first: <> and <= before <
                if self.rest().starts_with("<>") {
                    self.position += 2;
                    Ok(Item::new(Token::Neq, "<>", start))
                } else if self.rest().starts_with("<=") {
                    self.position += 2;
                    Ok(Item::new(Token::Lte, "<=", start))
                } else {
                    self.position += 1;
                    Ok(Item::new(Token::Lt, "<", start))
                }
            }
            '>' => {
                if self.rest().starts_with(">=") {
                    self.position += 2;
                    Ok(Item::new(Token::Gte, ">=", start))
                } else {
                    self.position += 1;
                    Ok(Item::new(Token::Gt, ">", start))
                }
            }
            c if c.is_ascii_digit() || c == '-' => self.lex_number(start),
            c if is_word_start(c) => self.lex_word(start),
            other => Err(self.error(&format!("unexpected character '{}'", other), start)),
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<Item, LexError> {
        // Opening quote
        self.position += 1;
        let mut value = String::new();

        loop {
            match self.peek() {
                Some('\'') => {
                    // A doubled quote is an escaped literal quote
                    if self.rest().starts_with("''") {
                        value.push('\'');
                        self.position += 2;
                    } else {
                        self.position += 1;
                        return Ok(Item::new(Token::Str, value, start));
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.position += c.len_utf8();
                }
                None => return Err(self.error("unterminated string literal", start)),
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Result<Item, LexError> {
        self.position += 1; // sign or first digit
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.position += 1;
        }
        let text = &self.input[start..self.position];
        if text.parse::<f64>().is_err() {
            return Err(self.error(&format!("invalid number '{}'", text), start));
        }
        Ok(Item::new(Token::Number, text, start))
    }

    fn lex_word(&mut self, start: usize) -> Result<Item, LexError> {
        while matches!(self.peek(), Some(c) if is_word_char(c)) {
            self.position += 1;
        }
        let word = &self.input[start..self.position];
        Ok(Item::new(check_keyword(word), word, start))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.position += self.peek().map(char::len_utf8).unwrap_or(1);
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.input[self.position..]
    }

    fn error(&self, message: &str, pos: usize) -> LexError {
        LexError {
            message: message.to_string(),
            pos,
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

// Identifiers carry full field paths, dots and index brackets included
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '-')
}

/// Tokenize a condition string
pub fn tokenize(input: &str) -> Result<Vec<Item>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|i| i.token).collect()
    }

    #[test]
    fn test_simple_equality() {
        let items = tokenize("eventName = 'ConsoleLogin'").unwrap();
        assert_eq!(items[0].token, Token::Identifier);
        assert_eq!(items[0].value, "eventName");
        assert_eq!(items[1].token, Token::Eq);
        assert_eq!(items[2].token, Token::Str);
        assert_eq!(items[2].value, "ConsoleLogin");
        assert_eq!(items[3].token, Token::Eof);
    }

    #[test]
    fn test_escaped_quote() {
        let items = tokenize("name = 'O''Brien'").unwrap();
        assert_eq!(items[2].value, "O'Brien");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("eventName = 'oops").unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.pos, 12);
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("a >= 1 AND b <= 2 OR c <> 'x' AND d != 3 AND e < 4 AND f > 5"),
            vec![
                Token::Identifier,
                Token::Gte,
                Token::Number,
                Token::And,
                Token::Identifier,
                Token::Lte,
                Token::Number,
                Token::Or,
                Token::Identifier,
                Token::Neq,
                Token::Str,
                Token::And,
                Token::Identifier,
                Token::Neq,
                Token::Number,
                Token::And,
                Token::Identifier,
                Token::Lt,
                Token::Number,
                Token::And,
                Token::Identifier,
                Token::Gt,
                Token::Number,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_in_list() {
        assert_eq!(
            kinds("region IN ('us-east-1', 'eu-west-1')"),
            vec![
                Token::Identifier,
                Token::In,
                Token::LParen,
                Token::Str,
                Token::Comma,
                Token::Str,
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_case_and_quoted_case_preserved() {
        let items = tokenize("userAgent contains 'Python'").unwrap();
        assert_eq!(items[1].token, Token::Contains);
        assert_eq!(items[2].value, "Python");
    }

    #[test]
    fn test_path_identifier_with_index() {
        let items = tokenize("resources[0].ARN = 'x'").unwrap();
        assert_eq!(items[0].token, Token::Identifier);
        assert_eq!(items[0].value, "resources[0].ARN");
    }

    #[test]
    fn test_negative_number() {
        let items = tokenize("delta > -5").unwrap();
        assert_eq!(items[2].token, Token::Number);
        assert_eq!(items[2].value, "-5");
    }

    #[test]
    fn test_keywords_inside_quotes_stay_literal() {
        let items = tokenize("msg = 'this AND that'").unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[2].value, "this AND that");
    }

    #[test]
    fn test_is_null_sequence() {
        assert_eq!(
            kinds("errorCode IS NOT NULL"),
            vec![
                Token::Identifier,
                Token::Is,
                Token::Not,
                Token::Null,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a = #").unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }
}
