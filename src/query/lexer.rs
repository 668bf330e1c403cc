//! Tokenizer for the Lucene classic query syntax

use crate::core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted word
    Term(String),
    /// Quoted string, escapes resolved
    Phrase(String),
    Colon,
    LeftParen,
    RightParen,
    /// `+` required clause
    Plus,
    /// `-` prohibited clause
    Minus,
    /// `AND` or `&&`
    And,
    /// `OR` or `||`
    Or,
    /// `NOT` or `!`
    Not,
    /// Trailing `*` of a prefix term
    Asterisk,
    /// `~` with optional edit distance
    Tilde(Option<u32>),
    Eof,
}

/// Token with its char span in the input
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Whole input as tokens, terminated by `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.position;
            let Some(ch) = self.current_char() else {
                tokens.push(Spanned { token: Token::Eof, start, end: start });
                return Ok(tokens);
            };

            let token = match ch {
                ':' => self.single(Token::Colon),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '!' => self.single(Token::Not),
                '&' if self.peek() == Some('&') => self.double(Token::And),
                '|' if self.peek() == Some('|') => self.double(Token::Or),
                '"' => self.read_phrase()?,
                '~' => {
                    // Errors cover the term or phrase the `~` is attached to
                    let attached = match tokens.last() {
                        Some(prev) if prev.end == start
                            && matches!(prev.token, Token::Term(_) | Token::Phrase(_)) => prev.start,
                        _ => start,
                    };
                    self.advance();
                    Token::Tilde(self.read_edit_distance(attached)?)
                }
                '*' | '?' => return Err(self.unsupported(start, "Leading wildcards are not supported")),
                '[' | ']' | '{' | '}' => return Err(self.unsupported(start, "Range queries are not supported")),
                '^' => return Err(self.unsupported(start, "Boosts are not supported")),
                '\\' => return Err(self.unsupported(start, "Escapes are not supported")),
                '/' => return Err(self.unsupported(start, "Regular expressions are not supported")),
                '&' | '|' => return Err(self.unsupported(start, "Unexpected character")),
                _ => self.read_term(),
            };
            tokens.push(Spanned { token, start, end: self.position });

            // A `*` glued to a term makes it a prefix term
            if matches!(tokens.last().map(|t| &t.token), Some(Token::Term(_)))
                && self.current_char() == Some('*')
            {
                self.advance();
                if self.current_char().is_some_and(Self::is_term_char) {
                    return Err(self.unsupported(start, "Wildcards inside terms are not supported"));
                }
                tokens.push(Spanned { token: Token::Asterisk, start: self.position - 1, end: self.position });
            }
            if self.current_char() == Some('?') {
                return Err(self.unsupported(start, "Single-character wildcards are not supported"));
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.position += 2;
        token
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_term_char(ch: char) -> bool {
        !ch.is_whitespace() && !matches!(
            ch,
            ':' | '(' | ')' | '"' | '~' | '*' | '?' | '[' | ']' | '{' | '}' | '^' | '\\' | '!'
        )
    }

    fn read_term(&mut self) -> Token {
        let start = self.position;
        while self.current_char().is_some_and(Self::is_term_char) {
            self.advance();
        }
        let term: String = self.input[start..self.position].iter().collect();

        // Operators are case sensitive, as in Lucene
        match term.as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Term(term),
        }
    }

    fn read_phrase(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance();
        let mut s = String::new();

        while let Some(ch) = self.current_char() {
            self.advance();
            match ch {
                '"' => return Ok(Token::Phrase(s)),
                '\\' => {
                    if let Some(escaped) = self.current_char() {
                        s.push(escaped);
                        self.advance();
                    }
                }
                _ => s.push(ch),
            }
        }

        Err(Error::query_syntax(self.fragment(start, self.input.len()), "Unterminated phrase"))
    }

    /// Optional integer after `~`. Anything glued to it (`~0.5`, `~2x`) or
    /// a number that does not fit is an error, never a default.
    fn read_edit_distance(&mut self, attached: usize) -> Result<Option<u32>> {
        let start = self.position;
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current_char().is_some_and(Self::is_term_char) {
            return Err(self.unsupported(attached, "Edit distance must be a whole number"));
        }
        if start == self.position {
            return Ok(None);
        }
        let digits: String = self.input[start..self.position].iter().collect();
        digits
            .parse()
            .map(Some)
            .map_err(|_| self.unsupported(attached, "Edit distance is out of range"))
    }

    /// Error covering the offending construct up to the next whitespace
    fn unsupported(&self, start: usize, reason: &str) -> Error {
        let mut end = self.position.max(start + 1);
        while end < self.input.len() && !self.input[end].is_whitespace() {
            end += 1;
        }
        Error::query_syntax(self.fragment(start, end), reason)
    }

    fn fragment(&self, start: usize, end: usize) -> String {
        self.input[start..end.min(self.input.len())].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators_and_fields() {
        assert_eq!(
            tokens("path:a.txt AND content:action"),
            vec![
                Token::Term("path".into()), Token::Colon, Token::Term("a.txt".into()),
                Token::And,
                Token::Term("content".into()), Token::Colon, Token::Term("action".into()),
                Token::Eof,
            ]
        );
        assert_eq!(
            tokens("+a -b !c && d || e"),
            vec![
                Token::Plus, Token::Term("a".into()), Token::Minus, Token::Term("b".into()),
                Token::Not, Token::Term("c".into()), Token::And, Token::Term("d".into()),
                Token::Or, Token::Term("e".into()), Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lowercase_operators_are_terms() {
        assert_eq!(tokens("and"), vec![Token::Term("and".into()), Token::Eof]);
    }

    #[test]
    fn test_prefix_fuzzy_phrase() {
        assert_eq!(
            tokens("luc* lucene~1 \"in \\\"action\\\"\" docs/a-b.txt"),
            vec![
                Token::Term("luc".into()), Token::Asterisk,
                Token::Term("lucene".into()), Token::Tilde(Some(1)),
                Token::Phrase("in \"action\"".into()),
                Token::Term("docs/a-b.txt".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unsupported_syntax_reports_fragment() {
        let err = Lexer::new("size:[1 TO 5]").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("[1"));

        let err = Lexer::new("lucene^2").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("^2"));

        let err = Lexer::new("lu*ne").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("lu*ne"));

        let err = Lexer::new("lucene~0.5 action").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("lucene~0.5"));

        let err = Lexer::new("lucene~99999999999").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("lucene~99999999999"));

        let err = Lexer::new("a \"open phrase").tokenize().unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("\"open phrase"));
    }
}
