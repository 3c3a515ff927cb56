//! Field-pattern extraction.
//!
//! Generic mode understands `field: value`, `field = value`, `field is value`
//! and inline comparisons (`price > 100`). When a [`FieldSet`] describes the
//! collection, its natural phrasings ("written by", "named", "genre") are
//! recognised first.

use std::sync::LazyLock;

use parley_query::{Comparison, FilterClause, FilterValue, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coerce::{coerce, coerce_filter, unquote};
use crate::terms::is_stop_word;

/// One generic pair per match. Quoted values may contain spaces and commas;
/// bare values end at whitespace or a comma.
static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b([a-z_][\w.]*)\s*(?:(>=|<=|>|<|:|=)\s*|\s+(is)\s+)("[^"]*"|'[^']*'|[^,\s]+)"#,
    )
    .unwrap()
});

/// Subjects of `X is Y` that are never field names.
const FILLER_SUBJECTS: &[&str] = &[
    "what", "who", "which", "how", "when", "why", "this", "that", "it", "there", "here", "he",
    "she", "they",
];

/// Words that end a phrase value.
const CONNECTORS: &[&str] = &[
    "and", "or", "with", "in", "from", "where", "that", "which", "whose", "who", "of", "on",
    "at", "for", "about", "published", "released", "sorted", "ordered", "limit",
];

/// A field the collection is known to have, with the phrasings that name it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownField {
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Whether free-text search covers this field.
    #[serde(default = "default_true")]
    pub text: bool,
}

fn default_true() -> bool {
    true
}

impl KnownField {
    pub fn new(name: &str, phrases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            text: true,
        }
    }
}

/// Collection-specific vocabulary for field extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    pub fields: Vec<KnownField>,
    /// Field constrained by bare leftover words in a counting request.
    #[serde(default)]
    pub default_field: Option<String>,
    /// Words naming the collection's documents ("book", "books").
    #[serde(default)]
    pub nouns: Vec<String>,
}

impl FieldSet {
    pub fn books() -> Self {
        Self {
            fields: vec![
                KnownField::new("title", &["titled", "called", "title"]),
                KnownField::new("author", &["written by", "author", "by"]),
                KnownField::new("genre", &["genre", "category"]),
                KnownField::new("isbn", &["isbn"]),
            ],
            default_field: Some("genre".into()),
            nouns: vec!["book".into(), "books".into()],
        }
    }

    pub fn members() -> Self {
        Self {
            fields: vec![
                KnownField::new("name", &["named", "called", "name", "member"]),
                KnownField::new("email", &["e-mail", "email"]),
                KnownField::new("member_id", &["member id", "member_id"]),
                KnownField::new("phone", &["phone number", "phone"]),
            ],
            default_field: Some("name".into()),
            nouns: vec!["member".into(), "members".into()],
        }
    }

    /// Fields covered by free-text search, in declaration order.
    pub fn text_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.text)
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn is_noun(&self, word: &str) -> bool {
        self.nouns.iter().any(|n| n.eq_ignore_ascii_case(word))
    }

    /// Every (phrase words, field) pair, longest phrase first.
    fn phrases(&self) -> Vec<(Vec<String>, &str)> {
        let mut phrases: Vec<(Vec<String>, &str)> = self
            .fields
            .iter()
            .flat_map(|field| {
                field.phrases.iter().map(move |phrase| {
                    let words = phrase
                        .split_whitespace()
                        .map(|w| w.to_lowercase())
                        .collect::<Vec<_>>();
                    (words, field.name.as_str())
                })
            })
            .filter(|(words, _)| !words.is_empty())
            .collect();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        phrases
    }
}

/// Extract a filter clause from free text.
///
/// With a field set, phrasings are scanned first and generic pairs are merged
/// underneath them (a phrasing wins when both name the same field). Returns an
/// empty clause when nothing matches.
pub fn extract_fields(text: &str, fields: Option<&FieldSet>) -> FilterClause {
    let mut clause = FilterClause::new();
    for pair in generic_pairs(text) {
        clause.insert(pair.field, pair.value);
    }

    if let Some(set) = fields {
        for (field, value) in phrase_pairs(text, set) {
            clause.insert(field, value);
        }
    }

    clause
}

struct Pair {
    field: String,
    value: FilterValue,
}

fn generic_pairs(text: &str) -> Vec<Pair> {
    let mut pairs = Vec::new();
    let mut from = 0;
    while let Some(caps) = PAIR.captures_at(text, from) {
        from = caps.get(0).map_or(text.len(), |m| m.end());
        let field = &caps[1];
        let raw = unquote(&caps[4]);
        if raw.is_empty() {
            continue;
        }

        let value = match caps.get(2).map(|m| m.as_str()) {
            Some(symbol @ (">" | ">=" | "<" | "<=")) => {
                let op = Comparison::from_symbol(symbol).unwrap_or(Comparison::Gt);
                FilterValue::Compare(op, coerce(raw))
            }
            Some(_) => coerce_filter(raw),
            None => {
                let subject = field.to_lowercase();
                if FILLER_SUBJECTS.contains(&subject.as_str()) || is_stop_word(&subject) {
                    // the value may itself start a real pair
                    from = caps.get(3).map_or(from, |m| m.end());
                    continue;
                }
                coerce_filter(raw)
            }
        };

        pairs.push(Pair {
            field: field.to_string(),
            value,
        });
    }
    pairs
}

#[derive(Debug)]
enum Token {
    Word(String),
    Separator,
    Comma,
}

/// Split text into tokens. A quoted span opening a word stays one token,
/// spaces and commas included.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if let Some((quoted, after)) = quoted_span(rest) {
            tokens.push(Token::Word(quoted.to_string()));
            rest = after.trim_start();
            continue;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        push_chunk(&rest[..end], &mut tokens);
        rest = rest[end..].trim_start();
    }
    tokens
}

/// A closed `'...'` or `"..."` span at the start of `text`, and what follows.
fn quoted_span(text: &str) -> Option<(&str, &str)> {
    let quote = text.chars().next().filter(|c| matches!(*c, '\'' | '"'))?;
    let close = text[1..].find(quote)? + 2;
    Some(text.split_at(close))
}

fn push_chunk(chunk: &str, tokens: &mut Vec<Token>) {
    let mut rest = chunk;
    while let Some(stripped) = rest.strip_prefix(',') {
        tokens.push(Token::Comma);
        rest = stripped;
    }
    let mut trailing_commas = 0;
    while let Some(stripped) = rest.strip_suffix(',') {
        trailing_commas += 1;
        rest = stripped;
    }

    match rest.find([':', '=']) {
        Some(pos) => {
            let (head, tail) = (&rest[..pos], &rest[pos + 1..]);
            if !head.is_empty() {
                tokens.push(Token::Word(head.to_string()));
            }
            tokens.push(Token::Separator);
            if !tail.is_empty() {
                tokens.push(Token::Word(tail.to_string()));
            }
        }
        None if !rest.is_empty() => tokens.push(Token::Word(rest.to_string())),
        None => {}
    }

    tokens.extend((0..trailing_commas).map(|_| Token::Comma));
}

fn word_at(tokens: &[Token], i: usize) -> Option<String> {
    match tokens.get(i) {
        Some(Token::Word(w)) => Some(w.to_lowercase()),
        _ => None,
    }
}

/// Longest phrasing starting at token `i`: (field, tokens consumed).
fn phrase_at<'a>(
    tokens: &[Token],
    i: usize,
    phrases: &[(Vec<String>, &'a str)],
) -> Option<(&'a str, usize)> {
    phrases.iter().find_map(|(words, field)| {
        let matched = words
            .iter()
            .enumerate()
            .all(|(k, w)| word_at(tokens, i + k).as_deref() == Some(w.as_str()));
        matched.then_some((*field, words.len()))
    })
}

fn phrase_pairs(text: &str, set: &FieldSet) -> Vec<(String, FilterValue)> {
    let phrases = set.phrases();
    let tokens = tokenize(text);
    let mut pairs = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let Some((field, consumed)) = phrase_at(&tokens, i, &phrases) else {
            i += 1;
            continue;
        };

        let mut j = i + consumed;
        while let Some(token) = tokens.get(j) {
            match token {
                Token::Separator => j += 1,
                Token::Word(w) if matches!(w.to_lowercase().as_str(), "is" | "are") => j += 1,
                _ => break,
            }
        }

        let (value, end) = phrase_value(&tokens, j, set, &phrases);
        if !value.is_empty() {
            pairs.push((field.to_string(), coerce_filter(&value)));
        }
        i = end.max(i + 1);
    }
    pairs
}

/// Collect the value following a phrasing. Returns the value and the index of
/// the first token not consumed.
fn phrase_value(
    tokens: &[Token],
    start: usize,
    set: &FieldSet,
    phrases: &[(Vec<String>, &str)],
) -> (String, usize) {
    let mut words: Vec<&str> = Vec::new();
    let mut j = start;

    if let Some(Token::Word(first)) = tokens.get(j) {
        if let Some(quote) = first.chars().next().filter(|c| *c == '\'' || *c == '"') {
            while let Some(Token::Word(w)) = tokens.get(j) {
                words.push(w);
                j += 1;
                if (words.len() > 1 || w.len() > 1) && w.ends_with(quote) {
                    break;
                }
            }
            return (unquote(&words.join(" ")).to_string(), j);
        }
    }

    while let Some(Token::Word(w)) = tokens.get(j) {
        let lower = w.to_lowercase();
        if CONNECTORS.contains(&lower.as_str())
            || set.is_noun(&lower)
            || phrase_at(tokens, j, phrases).is_some()
        {
            break;
        }
        words.push(w);
        j += 1;
    }

    let value = words
        .join(" ")
        .trim_end_matches(['?', '!', '.', ';'])
        .to_string();
    (unquote(&value).to_string(), j)
}

/// Leftover content words of a request, constraining the set's default field.
///
/// `ignore` holds extra filler words for the caller's context.
pub fn default_constraint(
    text: &str,
    set: &FieldSet,
    ignore: &[&str],
) -> Option<(String, FilterValue)> {
    let field = set.default_field.as_ref()?;
    let residual: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_'))
        .filter(|w| {
            let lower = w.to_lowercase();
            !w.is_empty()
                && !is_stop_word(&lower)
                && !ignore.contains(&lower.as_str())
                && !set.is_noun(&lower)
        })
        .collect();

    if residual.is_empty() {
        return None;
    }
    let term = residual.join(" ");
    Some((
        field.clone(),
        FilterValue::Matches(Pattern::substring(term)),
    ))
}
