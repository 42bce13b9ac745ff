//! Text normalization and boundary fingerprints.
//!
//! Every comparison the validator makes runs over text that went through
//! `TextNormalizer::normalize` — label and model outputs alike. The
//! fingerprint comparison is only meaningful if both sides were normalized
//! by the same instance, so the normalizer is cloned into each client
//! rather than re-derived ad hoc.

/// Canonicalizes text for a target language/script.
///
/// The cleanup keeps letters, digits, `_`, and whitespace, drops everything
/// else (punctuation, combining diacritics, symbols), and collapses
/// whitespace runs to single spaces. For Persian targets, Arabic-presentation
/// letters are first unified to their Persian forms so the same word spelled
/// either way compares equal.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    unify_persian: bool,
}

impl TextNormalizer {
    /// Build a normalizer for the given language code (e.g. `"fa"`).
    pub fn for_language(language: &str) -> Self {
        Self {
            unify_persian: language.eq_ignore_ascii_case("fa"),
        }
    }

    /// Normalize text. Deterministic and idempotent: normalizing twice
    /// yields the same result as normalizing once.
    pub fn normalize(&self, text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());

        for ch in text.chars() {
            let ch = if self.unify_persian {
                unify_persian_char(ch)
            } else {
                ch
            };

            // Tatweel counts as alphabetic but carries no lexical content.
            if ch == '\u{0640}' {
                continue;
            }

            if ch.is_alphanumeric() || ch == '_' || ch.is_whitespace() {
                cleaned.push(ch);
            }
        }

        // Collapse whitespace runs and trim in one pass.
        let mut out = String::with_capacity(cleaned.len());
        for word in cleaned.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
        out
    }
}

/// Map Arabic-presentation letters to their Persian equivalents.
fn unify_persian_char(ch: char) -> char {
    match ch {
        'ي' => 'ی',
        'ى' => 'ی',
        'ك' => 'ک',
        'ة' => 'ه',
        'ۀ' => 'ه',
        _ => ch,
    }
}

/// Reduce a normalized utterance to its first-`window` and last-`window`
/// word spans.
///
/// Texts of `2 * window` words or fewer return the whole word sequence for
/// both spans, so very short utterances are compared exactly.
pub fn boundary_words(text: &str, window: usize) -> (Vec<&str>, Vec<&str>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= window * 2 {
        return (words.clone(), words);
    }
    (
        words[..window].to_vec(),
        words[words.len() - window..].to_vec(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fa() -> TextNormalizer {
        TextNormalizer::for_language("fa")
    }

    #[test]
    fn strips_punctuation_and_collapses_whitespace() {
        let norm = fa();
        assert_eq!(norm.normalize("  hello,   world!  "), "hello world");
        assert_eq!(norm.normalize("چطوری؟"), "چطوری");
        assert_eq!(norm.normalize("a\tb\nc"), "a b c");
    }

    #[test]
    fn unifies_arabic_presentation_letters_for_persian() {
        let norm = fa();
        // Arabic yeh/kaf vs Persian yeh/kaf spell the same word.
        assert_eq!(norm.normalize("علي"), norm.normalize("علی"));
        assert_eq!(norm.normalize("كتاب"), norm.normalize("کتاب"));
    }

    #[test]
    fn strips_diacritics_and_tatweel() {
        let norm = fa();
        // Fatha/kasra are combining marks; tatweel stretches letterforms.
        assert_eq!(norm.normalize("سَلام"), "سلام");
        assert_eq!(norm.normalize("سـلام"), "سلام");
    }

    #[test]
    fn non_persian_targets_skip_unification() {
        let norm = TextNormalizer::for_language("en");
        assert_ne!(norm.normalize("علي"), norm.normalize("علی"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let norm = fa();
        for input in ["  Hello, world!  ", "سَلام... چطوری؟", "", "a|b|c"] {
            let once = norm.normalize(input);
            assert_eq!(norm.normalize(&once), once);
        }
    }

    #[test]
    fn empty_and_symbol_only_input_normalizes_to_empty() {
        let norm = fa();
        assert_eq!(norm.normalize(""), "");
        assert_eq!(norm.normalize("!!! ... ؟؟"), "");
    }

    #[test]
    fn boundaries_of_long_text_are_disjoint_windows() {
        let (start, end) = boundary_words("one two three four five six", 2);
        assert_eq!(start, vec!["one", "two"]);
        assert_eq!(end, vec!["five", "six"]);
    }

    #[test]
    fn boundaries_of_short_text_are_the_whole_sequence() {
        let (start, end) = boundary_words("one two three four", 2);
        assert_eq!(start, vec!["one", "two", "three", "four"]);
        assert_eq!(start, end);

        let (start, end) = boundary_words("", 2);
        assert!(start.is_empty());
        assert!(end.is_empty());
    }
}
