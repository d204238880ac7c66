//! Keyword classification of post text

/// Keywords used when none are configured
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "sale",
    "discount",
    "offer",
    "special",
    "promotion",
    "deal",
];

/// Case-insensitive substring match of `text` against any keyword
///
/// An empty keyword list never matches.
pub fn is_match<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let lower_text = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lower_text.contains(&keyword.as_ref().to_lowercase()))
}

/// Split a comma-separated keyword list, trimming each entry
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',').map(|k| k.trim().to_string()).collect()
}

/// Classifier holding a pre-lowercased keyword list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Build a classifier, dropping blank keywords (they would match every post)
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, text: &str) -> bool {
        let lower_text = text.to_lowercase();
        self.keywords.iter().any(|k| lower_text.contains(k.as_str()))
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_match_case_insensitive() {
        assert!(is_match("Big SALE this week", &["sale"]));
        assert!(is_match("big sale this week", &["SALE"]));
    }

    #[test]
    fn test_is_match_no_keyword_present() {
        assert!(!is_match("no promos here", &["sale", "discount"]));
    }

    #[test]
    fn test_is_match_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(!is_match("", &none));
        assert!(!is_match("Huge sale", &none));
    }

    #[test]
    fn test_is_match_substring_inside_word() {
        // Plain substring semantics: "wholesale" contains "sale"
        assert!(is_match("wholesale pricing", &["sale"]));
    }

    #[test]
    fn test_parse_keywords_trims_entries() {
        assert_eq!(
            parse_keywords(" sale, 50% off ,bundle"),
            vec!["sale".to_string(), "50% off".to_string(), "bundle".to_string()]
        );
    }

    #[test]
    fn test_classifier_default_keywords() {
        let classifier = KeywordClassifier::default();

        assert_eq!(classifier.keywords().len(), 6);
        assert!(classifier.matches("30% DISCOUNT on all titles"));
        assert!(classifier.matches("Limited-time Promotion"));
        assert!(!classifier.matches("New catalogue out now"));
    }

    #[test]
    fn test_classifier_drops_blank_keywords() {
        let classifier = KeywordClassifier::new(["", "  ", "Sale"]);

        assert_eq!(classifier.keywords(), &["sale".to_string()]);
        assert!(!classifier.matches("Anything at all"));
    }

    #[test]
    fn test_classifier_agrees_with_is_match() {
        let keywords = ["Offer", "deal"];
        let classifier = KeywordClassifier::new(keywords);

        for text in ["Special OFFER", "a great Deal", "nothing here", ""] {
            assert_eq!(classifier.matches(text), is_match(text, &keywords));
        }
    }
}
