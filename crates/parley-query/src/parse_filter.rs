use std::fmt;

use bson::{Bson, Document};
use regex::Regex;

use crate::expression::{Expression, FieldTest};
use crate::operator::Comparison;

/// Why a filter document was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterParseError {
    UnknownOperator(String),
    /// An operator was given a value of the wrong shape.
    BadOperand {
        operator: String,
        expected: &'static str,
    },
    InvalidRegex(String),
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterParseError::UnknownOperator(op) => write!(f, "unsupported operator {op}"),
            FilterParseError::BadOperand { operator, expected } => {
                write!(f, "{operator} expects {expected}")
            }
            FilterParseError::InvalidRegex(msg) => write!(f, "invalid regex: {msg}"),
        }
    }
}

impl std::error::Error for FilterParseError {}

fn bad(operator: &str, expected: &'static str) -> FilterParseError {
    FilterParseError::BadOperand {
        operator: operator.to_string(),
        expected,
    }
}

/// Compile a Mongo-style filter document.
///
/// Top-level keys are ANDed. `$and`, `$or` and `$text` are accepted at the
/// top level; any other key is a field path whose value is either a literal
/// to compare against or a document of `$` operators.
pub fn parse_filter(doc: &Document) -> Result<Expression, FilterParseError> {
    let clauses = doc
        .iter()
        .map(|(key, value)| top_level(key, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expression::conjunction(clauses))
}

fn top_level(key: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    match key {
        "$and" => branches(key, value).map(Expression::And),
        "$or" => branches(key, value).map(Expression::Or),
        "$text" => text_search(value),
        op if op.starts_with('$') => Err(FilterParseError::UnknownOperator(op.to_string())),
        path => match value {
            Bson::Document(ops) if is_operator_document(ops) => field_operators(path, ops),
            literal => Ok(Expression::field(path, FieldTest::Equals(literal.clone()))),
        },
    }
}

/// Embedded documents without a leading `$` key are literal values.
fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn branches(op: &str, value: &Bson) -> Result<Vec<Expression>, FilterParseError> {
    const EXPECTED: &str = "a non-empty array of filter documents";
    let Bson::Array(items) = value else {
        return Err(bad(op, EXPECTED));
    };
    if items.is_empty() {
        return Err(bad(op, EXPECTED));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => parse_filter(doc),
            _ => Err(bad(op, EXPECTED)),
        })
        .collect()
}

fn text_search(value: &Bson) -> Result<Expression, FilterParseError> {
    match value {
        Bson::Document(spec) => match spec.get("$search") {
            Some(Bson::String(terms)) => Ok(Expression::Text(terms.clone())),
            _ => Err(bad("$text", "a $search string")),
        },
        _ => Err(bad("$text", "a document with a $search string")),
    }
}

fn field_operators(path: &str, ops: &Document) -> Result<Expression, FilterParseError> {
    if ops.contains_key("$regex") {
        return regex_condition(path, ops);
    }
    let mut tests = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let test = match op.as_str() {
            "$eq" => FieldTest::Equals(operand.clone()),
            "$ne" => FieldTest::NotEquals(operand.clone()),
            "$in" => match operand {
                Bson::Array(values) => FieldTest::OneOf(values.clone()),
                _ => return Err(bad(op, "an array")),
            },
            "$exists" => match operand {
                Bson::Boolean(present) => FieldTest::Present(*present),
                _ => return Err(bad(op, "a boolean")),
            },
            "$options" => return Err(bad(op, "a sibling $regex")),
            other => match Comparison::from_operator(other) {
                Some(cmp) => FieldTest::Compare(cmp, operand.clone()),
                None => return Err(FilterParseError::UnknownOperator(other.to_string())),
            },
        };
        tests.push(Expression::field(path, test));
    }
    Ok(Expression::conjunction(tests))
}

const REGEX_FLAGS: &str = "imsx";

fn regex_condition(path: &str, ops: &Document) -> Result<Expression, FilterParseError> {
    if let Some(extra) = ops.keys().find(|key| *key != "$regex" && *key != "$options") {
        return Err(bad(extra, "no sibling operators besides $regex and $options"));
    }
    let Some(Bson::String(pattern)) = ops.get("$regex") else {
        return Err(bad("$regex", "a string pattern"));
    };
    let flags = match ops.get("$options") {
        None => "",
        Some(Bson::String(flags)) => flags.as_str(),
        Some(_) => return Err(bad("$options", "a string of flags")),
    };
    if !flags.chars().all(|flag| REGEX_FLAGS.contains(flag)) {
        return Err(bad("$options", "flags drawn from i, m, s and x"));
    }
    let source = if flags.is_empty() {
        pattern.clone()
    } else {
        format!("(?{flags}){pattern}")
    };
    Regex::new(&source)
        .map(|re| Expression::field(path, FieldTest::Matches(re)))
        .map_err(|e| FilterParseError::InvalidRegex(e.to_string()))
}
