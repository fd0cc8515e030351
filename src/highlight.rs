//! Emphasis markup for matched words
//!
//! Independent of any index: the query string is split with a caller-chosen
//! tokenizer and every word of the text that matches one of its terms, either
//! case-insensitively or within a Levenshtein distance, is wrapped in
//! `<b>`/`</b>`. Everything between matched words is copied unchanged.

use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};
use tracing::debug;

use crate::tokenizer::Tokenizer;

/// Largest edit distance honoured, matching Tantivy's fuzzy term queries
pub const MAX_FUZZY_DISTANCE: u8 = 2;

const OPEN_TAG: &str = "<b>";
const CLOSE_TAG: &str = "</b>";

/// Options for [`highlight`]
#[derive(Debug, Clone, Default)]
pub struct HighlightOptions {
    /// Maximum edit distance for a word to count as a match; transpositions cost one.
    /// Values above [`MAX_FUZZY_DISTANCE`] are clamped to it.
    pub fuzzy_distance: u8,

    /// Tokenizer applied to the query string
    pub tokenizer: Tokenizer,
}

impl HighlightOptions {
    pub fn fuzzy(distance: u8) -> Self {
        Self {
            fuzzy_distance: distance,
            ..Self::default()
        }
    }
}

struct TermMatcher {
    term: String,
    dfa: DFA,
}

impl TermMatcher {
    fn matches(&self, word: &str) -> bool {
        word.eq_ignore_ascii_case(&self.term) || matches!(self.dfa.eval(word), Distance::Exact(_))
    }
}

/// Wrap words of `text` matching the terms of `query` in `<b>…</b>`
pub fn highlight(text: &str, query: &str, options: &HighlightOptions) -> String {
    let distance = options.fuzzy_distance.min(MAX_FUZZY_DISTANCE);
    if distance < options.fuzzy_distance {
        debug!(
            requested = options.fuzzy_distance,
            distance, "Highlight fuzzy distance clamped"
        );
    }
    let builder = LevenshteinAutomatonBuilder::new(distance, true);
    let matchers: Vec<TermMatcher> = options
        .tokenizer
        .terms(query)
        .into_iter()
        .map(|term| TermMatcher {
            dfa: builder.build_dfa(&term),
            term,
        })
        .collect();

    let mut analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    let mut stream = analyzer.token_stream(text);

    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    while stream.advance() {
        let token = stream.token();
        let (start, end) = (token.offset_from, token.offset_to);

        result.push_str(&text[last..start]);
        if matchers.iter().any(|matcher| matcher.matches(&token.text)) {
            result.push_str(OPEN_TAG);
            result.push_str(&text[start..end]);
            result.push_str(CLOSE_TAG);
        } else {
            result.push_str(&text[start..end]);
        }
        last = end;
    }

    result.push_str(&text[last..]);
    result
}
