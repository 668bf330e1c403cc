use crate::analysis::token::Token;

/// Per-token filter. Returning `None` drops the token; its position is not
/// reused, so phrase positions stay aligned with the original text.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, token: Token) -> Option<Token>;

    /// Applied to prefix and fuzzy query terms, which bypass tokenization.
    /// Only case-style normalizers override this; dropping filters do not.
    fn normalize(&self, text: String) -> String {
        text
    }

    fn name(&self) -> &str;
}
