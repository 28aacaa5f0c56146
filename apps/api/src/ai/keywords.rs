//! Deterministic keyword extraction from a job description.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const MAX_KEYWORDS: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub keyword: String,
    pub frequency: u32,
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "all", "also", "an", "and", "any", "are", "as", "at",
    "be", "been", "being", "both", "but", "by", "can", "candidate", "company", "could", "day",
    "do", "does", "each", "either", "etc", "every", "experience", "for", "from", "get", "good",
    "great", "has", "have", "help", "how", "i", "if", "in", "including", "into", "is", "it",
    "its", "job", "join", "just", "like", "looking", "make", "may", "more", "most", "must", "new",
    "nice", "no", "not", "of", "on", "one", "or", "other", "our", "out", "over", "per", "plus",
    "preferred", "required", "requirements", "responsibilities", "role", "should", "so", "some",
    "strong", "such", "team", "teams", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "up", "us", "use", "using", "very", "we",
    "well", "what", "when", "where", "which", "while", "who", "will", "with", "within", "work",
    "working", "would", "year", "years", "you", "your",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Splits text into lower-cased tokens. `+`, `#` and inner `.` stay part of a
/// token so `c++`, `c#` and `node.js` survive.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '-')))
        .map(|raw| raw.trim_matches(|c: char| c == '.' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// The most frequent meaningful terms of `text`, at most `MAX_KEYWORDS`.
/// Ties keep first-appearance order, so the result is stable for a given input.
pub fn extract_keywords(text: &str) -> Vec<Keyword> {
    let mut counts: HashMap<String, (u32, usize)> = HashMap::new();
    for (position, token) in tokenize(text).enumerate() {
        if token.chars().count() < 2
            || !token.chars().any(char::is_alphabetic)
            || is_stop_word(&token)
        {
            continue;
        }
        counts
            .entry(token)
            .and_modify(|(n, _)| *n += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, u32, usize)> = counts
        .into_iter()
        .map(|(keyword, (frequency, first))| (keyword, frequency, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(keyword, frequency, _)| Keyword { keyword, frequency })
        .collect()
}
