use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    /// Lazily split `text`. Calling again on the same text restarts the
    /// sequence from the beginning.
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = Token> + 'a>;

    fn name(&self) -> &str;
}

/// Unicode word segmentation, further split on every non-alphanumeric char.
#[derive(Clone, Default)]
pub struct StandardTokenizer;

impl Tokenizer for StandardTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = Token> + 'a> {
        let pieces = text
            .unicode_word_indices()
            .flat_map(|(word_offset, word)| {
                word.split(|c: char| !c.is_alphanumeric())
                    .filter(|piece| !piece.is_empty())
                    .map(move |piece| {
                        // piece is a subslice of word
                        let inner = piece.as_ptr() as usize - word.as_ptr() as usize;
                        (word_offset + inner, piece)
                    })
            });

        Box::new(
            pieces
                .enumerate()
                .map(|(position, (offset, piece))| {
                    Token::new(piece.to_string(), position as u32, offset)
                }),
        )
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Emits the whole input as a single token. Used for keyed fields.
#[derive(Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = Token> + 'a> {
        if text.is_empty() {
            return Box::new(std::iter::empty());
        }
        Box::new(std::iter::once(Token::new(text.to_string(), 0, 0)))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
