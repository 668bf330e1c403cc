use fst::{IntoStreamer, Map, Streamer};
use crate::index::inverted::Term;

/// Terms of `field` starting with `prefix`, in dictionary order, with their
/// ordinals. An empty prefix enumerates the whole field.
pub fn prefix_terms(dictionary: &Map<Vec<u8>>, field: &str, prefix: &str) -> Vec<(String, u32)> {
    let mut key_prefix = Term::field_prefix(field);
    let text_start = key_prefix.len();
    key_prefix.extend_from_slice(prefix.as_bytes());

    let mut results = Vec::new();
    let mut stream = dictionary.range().ge(&key_prefix).into_stream();

    while let Some((key, ordinal)) = stream.next() {
        if !key.starts_with(&key_prefix) {
            break;
        }

        if let Ok(text) = std::str::from_utf8(&key[text_start..]) {
            results.push((text.to_string(), ordinal as u32));
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst::MapBuilder;

    fn dictionary(terms: &[(&str, &str)]) -> Map<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = terms.iter().map(|(f, t)| Term::new(f, t).key()).collect();
        keys.sort();
        let mut builder = MapBuilder::memory();
        for (i, key) in keys.iter().enumerate() {
            builder.insert(key, i as u64).unwrap();
        }
        builder.into_map()
    }

    #[test]
    fn test_prefix_stays_within_field() {
        let dict = dictionary(&[
            ("content", "luc"),
            ("content", "lucene"),
            ("content", "lucky"),
            ("content", "lumen"),
            ("title", "lucene"),
        ]);
        let terms: Vec<String> = prefix_terms(&dict, "content", "luc")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(terms, vec!["luc", "lucene", "lucky"]);
    }

    #[test]
    fn test_empty_prefix_lists_field() {
        let dict = dictionary(&[("a", "x"), ("ab", "y"), ("a", "z")]);
        let terms: Vec<String> = prefix_terms(&dict, "a", "")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(terms, vec!["x", "z"]);
    }
}
