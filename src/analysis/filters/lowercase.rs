use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, mut token: Token) -> Option<Token> {
        if token.text.chars().any(char::is_uppercase) {
            token.text = token.text.to_lowercase();
        }
        Some(token)
    }

    fn normalize(&self, text: String) -> String {
        text.to_lowercase()
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}
