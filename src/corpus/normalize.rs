// Text normalization shared by documents, topic terms and lexica.
//
// Term matching downstream is plain substring/token comparison, so every
// piece of text that is ever compared must pass through the same normalizer:
// headline fields, topic term lists, sentiment lexica and stop words.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::headline::Headline;

/// Possessive suffix after a word character, straight or curly apostrophe.
static POSSESSIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)['’]s\b").expect("possessive regex is valid"));

/// What to do with characters that are neither alphanumeric nor whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonAlphanumeric {
    /// Replace with a space, so "u.s.-led" becomes "u s led".
    #[default]
    Replace,
    /// Drop entirely, so "u.s.-led" becomes "usled".
    Delete,
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNormalizer {
    pub lowercase: bool,
    pub non_alphanumeric: NonAlphanumeric,
    /// Strip `'s` so "trump's" matches the topic term "trump".
    pub drop_possessives: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            lowercase: true,
            non_alphanumeric: NonAlphanumeric::Replace,
            drop_possessives: true,
        }
    }
}

impl TextNormalizer {
    /// Normalize one string. Whitespace runs always collapse to single spaces
    /// and the result is trimmed.
    pub fn normalize(&self, text: &str) -> String {
        let text = if self.drop_possessives {
            POSSESSIVE.replace_all(text, "$1").into_owned()
        } else {
            text.to_string()
        };

        let filtered: String = match self.non_alphanumeric {
            NonAlphanumeric::Keep => text,
            NonAlphanumeric::Replace => text
                .chars()
                .map(|c| {
                    if c.is_alphanumeric() || c.is_whitespace() {
                        c
                    } else {
                        ' '
                    }
                })
                .collect(),
            NonAlphanumeric::Delete => text
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect(),
        };

        let cased = if self.lowercase {
            filtered.to_lowercase()
        } else {
            filtered
        };
        cased.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Normalize a list of terms, dropping any that normalize to nothing.
    pub fn normalize_terms<S: AsRef<str>>(&self, terms: &[S]) -> Vec<String> {
        terms
            .iter()
            .map(|t| self.normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Normalize the three text fields of a headline in place.
    pub fn normalize_headline(&self, headline: &mut Headline) {
        headline.headline = self.normalize(&headline.headline);
        headline.description = self.normalize(&headline.description);
        headline.aux_text = self.normalize(&headline.aux_text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_replaces_punctuation() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("U.S.-led  Strikes!"), "u s led strikes");
    }

    #[test]
    fn test_delete_mode_joins_fragments() {
        let n = TextNormalizer {
            non_alphanumeric: NonAlphanumeric::Delete,
            ..Default::default()
        };
        assert_eq!(n.normalize("U.S.-led"), "usled");
    }

    #[test]
    fn test_possessives_dropped() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("Trump's plan, Clinton’s reply"), "trump plan clinton reply");
    }

    #[test]
    fn test_keep_mode_only_collapses_whitespace() {
        let n = TextNormalizer {
            lowercase: false,
            non_alphanumeric: NonAlphanumeric::Keep,
            drop_possessives: false,
        };
        assert_eq!(n.normalize("  A-b \t c's "), "A-b c's");
    }

    #[test]
    fn test_normalize_terms_drops_empty() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize_terms(&["North Korea", "--", "Kim"]), vec!["north korea", "kim"]);
    }
}
