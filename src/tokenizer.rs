//! Tokenizer handles
//!
//! A [`Tokenizer`] wraps one of the three analyzer configurations that are
//! registered with Tantivy for text fields. The same handle is used on the
//! query side to split free text into the terms the index actually contains.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tantivy::tokenizer::{
    Language, LowerCaser, NgramTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer,
    TextAnalyzer, TokenStream,
};

use crate::error::{SearchError, SearchResult};

/// Tokens longer than this are dropped by the simple and stemmer analyzers
const MAX_TOKEN_LENGTH: usize = 40;

/// Stemmer language, parsed from a two-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemmerLanguage(Language);

impl StemmerLanguage {
    pub fn language(&self) -> Language {
        self.0
    }
}

impl FromStr for StemmerLanguage {
    type Err = SearchError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let language = match code {
            "en" => Language::English,
            "ar" => Language::Arabic,
            "da" => Language::Danish,
            "nl" => Language::Dutch,
            "fi" => Language::Finnish,
            "fr" => Language::French,
            "de" => Language::German,
            "el" => Language::Greek,
            "hu" => Language::Hungarian,
            "it" => Language::Italian,
            "no" => Language::Norwegian,
            "pt" => Language::Portuguese,
            "ro" => Language::Romanian,
            "ru" => Language::Russian,
            "es" => Language::Spanish,
            "sv" => Language::Swedish,
            "ta" => Language::Tamil,
            "tr" => Language::Turkish,
            other => return Err(SearchError::UnsupportedLanguage(other.to_string())),
        };
        Ok(Self(language))
    }
}

impl Default for StemmerLanguage {
    fn default() -> Self {
        Self(Language::English)
    }
}

/// Declarative tokenizer configuration, as found in schema files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// One of `simple`, `stemmer` or `ngram`
    pub kind: String,

    /// Stemmer language code (default: `en`)
    #[serde(default)]
    pub language: Option<String>,

    /// Minimum n-gram length
    #[serde(default)]
    pub min: Option<usize>,

    /// Maximum n-gram length
    #[serde(default)]
    pub max: Option<usize>,

    /// Only emit n-grams anchored at the start of the text
    #[serde(default)]
    pub prefix_only: bool,
}

impl TokenizerConfig {
    pub fn simple() -> Self {
        Self::of_kind("simple")
    }

    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            language: None,
            min: None,
            max: None,
            prefix_only: false,
        }
    }
}

/// The analyzer variant a [`Tokenizer`] was built from
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizerKind {
    Simple,
    Stemmer(StemmerLanguage),
    Ngram {
        min: usize,
        max: usize,
        prefix_only: bool,
    },
}

/// Handle to a configured Tantivy text analyzer
#[derive(Clone)]
pub struct Tokenizer {
    kind: TokenizerKind,
    analyzer: TextAnalyzer,
}

impl Tokenizer {
    /// Simple segmentation, long-token removal and lowercasing
    pub fn simple() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
            .filter(LowerCaser)
            .build();

        Self {
            kind: TokenizerKind::Simple,
            analyzer,
        }
    }

    /// Simple analyzer followed by a language-specific stemmer
    pub fn stemmer(language: StemmerLanguage) -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
            .filter(LowerCaser)
            .filter(Stemmer::new(language.language()))
            .build();

        Self {
            kind: TokenizerKind::Stemmer(language),
            analyzer,
        }
    }

    /// Character n-grams of `min..=max` length, without case folding
    pub fn ngram(min: usize, max: usize, prefix_only: bool) -> SearchResult<Self> {
        let tokenizer = NgramTokenizer::new(min, max, prefix_only)?;

        Ok(Self {
            kind: TokenizerKind::Ngram {
                min,
                max,
                prefix_only,
            },
            analyzer: TextAnalyzer::from(tokenizer),
        })
    }

    /// Build a tokenizer from its declarative configuration
    pub fn from_config(config: &TokenizerConfig) -> SearchResult<Self> {
        match config.kind.as_str() {
            "simple" => Ok(Self::simple()),
            "stemmer" => {
                let language = match config.language.as_deref() {
                    Some(code) => code.parse()?,
                    None => StemmerLanguage::default(),
                };
                Ok(Self::stemmer(language))
            }
            "ngram" => {
                let min = config.min.ok_or_else(|| {
                    SearchError::Configuration("ngram tokenizer requires `min`".to_string())
                })?;
                let max = config.max.ok_or_else(|| {
                    SearchError::Configuration("ngram tokenizer requires `max`".to_string())
                })?;
                Self::ngram(min, max, config.prefix_only)
            }
            other => Err(SearchError::UnknownTokenizer(other.to_string())),
        }
    }

    pub fn kind(&self) -> &TokenizerKind {
        &self.kind
    }

    /// Split `text` into the ordered sequence of normalized terms
    pub fn terms(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();

        while stream.advance() {
            terms.push(stream.token().text.clone());
        }

        terms
    }

    pub(crate) fn analyzer(&self) -> TextAnalyzer {
        self.analyzer.clone()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::simple()
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_terms() {
        let tokenizer = Tokenizer::simple();
        let terms = tokenizer.terms("Well, not even last night's storm could wake you.");

        assert_eq!(
            terms,
            vec!["well", "not", "even", "last", "night", "s", "storm", "could", "wake", "you"]
        );
    }

    #[test]
    fn test_stemmer_terms() {
        let tokenizer = Tokenizer::stemmer("ru".parse().unwrap());
        let terms = tokenizer.terms("Ну ты и соня, тебя даже вчерашний шторм не разбудил!");

        assert_eq!(
            terms,
            vec!["ну", "ты", "и", "сон", "теб", "даж", "вчерашн", "шторм", "не", "разбуд"]
        );
    }

    #[test]
    fn test_ngram_terms() {
        let tokenizer = Tokenizer::ngram(3, 10, true).unwrap();
        let terms = tokenizer.terms("Morrowind");

        assert_eq!(
            terms,
            vec!["Mor", "Morr", "Morro", "Morrow", "Morrowi", "Morrowin", "Morrowind"]
        );
    }

    #[test]
    fn test_ngram_rejects_inverted_bounds() {
        assert!(matches!(
            Tokenizer::ngram(5, 2, false),
            Err(SearchError::Tantivy(_))
        ));
    }

    #[test]
    fn test_long_tokens_are_dropped() {
        let long = "a".repeat(MAX_TOKEN_LENGTH + 1);
        let terms = Tokenizer::simple().terms(&format!("short {long}"));
        assert_eq!(terms, vec!["short"]);
    }

    #[test]
    fn test_empty_text_has_no_terms() {
        assert!(Tokenizer::default().terms("").is_empty());
        assert!(Tokenizer::default().terms("?! ...").is_empty());
    }

    #[test]
    fn test_unknown_tokenizer_kind() {
        let err = Tokenizer::from_config(&TokenizerConfig::of_kind("whatever")).unwrap_err();
        assert!(matches!(err, SearchError::UnknownTokenizer(kind) if kind == "whatever"));
    }

    #[test]
    fn test_unknown_language() {
        let config = TokenizerConfig {
            language: Some("xx".to_string()),
            ..TokenizerConfig::of_kind("stemmer")
        };
        let err = Tokenizer::from_config(&config).unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedLanguage(code) if code == "xx"));
    }

    #[test]
    fn test_config_round_trip_from_toml() {
        let config: TokenizerConfig =
            toml::from_str("kind = \"ngram\"\nmin = 2\nmax = 4\nprefix_only = true").unwrap();
        let tokenizer = Tokenizer::from_config(&config).unwrap();

        assert_eq!(
            tokenizer.kind(),
            &TokenizerKind::Ngram {
                min: 2,
                max: 4,
                prefix_only: true
            }
        );
    }
}
