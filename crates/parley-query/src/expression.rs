use bson::Bson;
use regex::Regex;

use crate::operator::Comparison;

/// Compiled form of a Mongo-style filter document, ready to be evaluated
/// against stored documents.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Matches every document.
    All,
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// A test applied to the value found at a dotted field path.
    Field { path: String, test: FieldTest },
    /// Case-insensitive search across every string value.
    Text(String),
}

/// What a single field must satisfy.
#[derive(Debug, Clone)]
pub enum FieldTest {
    Equals(Bson),
    NotEquals(Bson),
    OneOf(Vec<Bson>),
    Compare(Comparison, Bson),
    Matches(Regex),
    Present(bool),
}

impl Expression {
    pub fn field(path: impl Into<String>, test: FieldTest) -> Self {
        Expression::Field {
            path: path.into(),
            test,
        }
    }

    /// Collapse a clause list: nothing matches all, one clause stands alone.
    pub(crate) fn conjunction(mut clauses: Vec<Expression>) -> Self {
        match clauses.len() {
            0 => Expression::All,
            1 => clauses.remove(0),
            _ => Expression::And(clauses),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::All, Expression::All) => true,
            (Expression::And(a), Expression::And(b)) | (Expression::Or(a), Expression::Or(b)) => {
                a == b
            }
            (
                Expression::Field { path, test },
                Expression::Field {
                    path: other_path,
                    test: other_test,
                },
            ) => path == other_path && test == other_test,
            (Expression::Text(a), Expression::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for FieldTest {
    fn eq(&self, other: &Self) -> bool {
        use FieldTest::*;
        match (self, other) {
            (Equals(a), Equals(b)) | (NotEquals(a), NotEquals(b)) => a == b,
            (OneOf(a), OneOf(b)) => a == b,
            (Compare(op, a), Compare(other_op, b)) => op == other_op && a == b,
            // regexes compare by source
            (Matches(a), Matches(b)) => a.as_str() == b.as_str(),
            (Present(a), Present(b)) => a == b,
            _ => false,
        }
    }
}
