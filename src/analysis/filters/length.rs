use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Drops tokens longer than `max_length` bytes
pub struct LengthFilter {
    pub max_length: usize,
}

impl Default for LengthFilter {
    fn default() -> Self {
        LengthFilter { max_length: 255 }
    }
}

impl TokenFilter for LengthFilter {
    fn filter(&self, token: Token) -> Option<Token> {
        (token.text.len() <= self.max_length).then_some(token)
    }

    fn name(&self) -> &str {
        "length"
    }
}
