//! Placeholder sources
//!
//! The engine checks a cache against the source it is loaded with, but only
//! by length. A string of the declared length made of invisible filler is
//! enough, so the real source never has to ship.

/// Filler character (ZERO WIDTH SPACE)
pub const FILLER: char = '\u{200B}';

/// Build a placeholder whose engine length is exactly `len`.
///
/// The result is a string literal, `"` + filler × (len − 2) + `"`, so it also
/// parses if the engine ever falls back to it. Lengths 0 and 1 yield the
/// empty string.
pub fn placeholder_source(len: u32) -> String {
    if len <= 1 {
        return String::new();
    }

    let fill = (len - 2) as usize;
    let mut source = String::with_capacity(2 + fill * FILLER.len_utf8());
    source.push('"');
    source.extend(std::iter::repeat_n(FILLER, fill));
    source.push('"');
    source
}

/// UTF-8 size of [`placeholder_source`]`(len)`, without building it.
pub fn placeholder_utf8_len(len: u32) -> u64 {
    if len <= 1 {
        return 0;
    }
    2 + u64::from(len - 2) * FILLER.len_utf8() as u64
}

/// Length of a string as the engine measures it (UTF-16 code units).
///
/// Equals the byte length for ASCII sources.
pub fn engine_len(source: &str) -> usize {
    source.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tiny_lengths_are_empty() {
        assert_eq!(placeholder_source(0), "");
        assert_eq!(placeholder_source(1), "");
    }

    #[test]
    fn test_two_is_empty_literal() {
        assert_eq!(placeholder_source(2), "\"\"");
    }

    #[test]
    fn test_filler_only_inside_quotes() {
        let source = placeholder_source(6);
        let chars: Vec<char> = source.chars().collect();
        assert_eq!(chars.len(), 6);
        assert_eq!(chars[0], '"');
        assert_eq!(chars[5], '"');
        assert!(chars[1..5].iter().all(|c| *c == FILLER));
    }

    #[test]
    fn test_engine_len() {
        assert_eq!(engine_len("console.log('hi')"), 17);
        assert_eq!(engine_len("\"ಠ_ಠ\""), 5);
        assert_eq!(engine_len("😀"), 2);
    }

    #[test]
    fn test_utf8_len_without_allocating() {
        assert_eq!(placeholder_utf8_len(0), 0);
        assert_eq!(placeholder_utf8_len(1), 0);
        assert_eq!(placeholder_utf8_len(2), 2);
        assert_eq!(placeholder_utf8_len(u32::MAX), 2 + 3 * (u32::MAX as u64 - 2));
    }

    proptest! {
        #[test]
        fn prop_utf8_len_matches_built_placeholder(len in 0u32..4096) {
            prop_assert_eq!(placeholder_utf8_len(len), placeholder_source(len).len() as u64);
        }

        #[test]
        fn prop_placeholder_matches_length(len in 2u32..4096) {
            prop_assert_eq!(engine_len(&placeholder_source(len)), len as usize);
        }
    }
}
