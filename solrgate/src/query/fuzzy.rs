//! Fuzzy term query construction
//!
//! The search term is run through a standard English analyzer and each
//! surviving token becomes a Lucene fuzzy clause (`field:token~N`).

use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, Token,
    TokenStream,
};

use super::types::FuzzyQuerySpec;
use crate::{Error, Result};

/// Lucene's `EnglishAnalyzer.ENGLISH_STOP_WORDS_SET`
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Lucene's standard maximum token length
const MAX_TOKEN_LENGTH: usize = 255;

/// Analyzer used for fuzzy terms: split on non-alphanumerics, lowercase,
/// drop overlong tokens and English stop words
pub fn standard_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()),
        ))
        .build()
}

pub fn analyze(text: &str) -> Vec<String> {
    let mut analyzer = standard_analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    let mut add_token = |token: &Token| {
        tokens.push(token.text.clone());
    };
    stream.process(&mut add_token);
    tokens
}

/// Render fuzzy match parameters as a raw Lucene query string.
///
/// The field prefix is omitted when `field` equals `default_field`, matching
/// `FuzzyQuery.toString(defaultField)`. Prefix length, expansions and
/// transpositions are validated but have no textual form in the standard
/// query syntax.
pub fn build_fuzzy_query(spec: &FuzzyQuerySpec) -> Result<String> {
    spec.validate()?;

    let tokens = analyze(&spec.term);
    if tokens.is_empty() {
        return Err(Error::Analysis(format!(
            "term '{}' contains no searchable tokens",
            spec.term
        )));
    }

    let prefix = if spec.field == spec.default_field {
        String::new()
    } else {
        format!("{}:", spec.field)
    };

    let clauses: Vec<String> = tokens
        .iter()
        .map(|token| format!("{}{}~{}", prefix, escape_term(token), spec.max_edits))
        .collect();

    Ok(clauses.join(" "))
}

fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(
            c,
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~'
                | '*' | '?' | ':' | '\\' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
