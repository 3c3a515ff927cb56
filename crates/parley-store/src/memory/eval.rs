use std::cmp::Ordering;

use bson::{Bson, Document};
use parley_query::{Expression, FieldTest};

/// Resolve a dotted path against a document.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Evaluate whether a document matches the given expression.
pub(crate) fn matches(doc: &Document, expr: &Expression) -> bool {
    match expr {
        Expression::All => true,
        Expression::And(children) => children.iter().all(|child| matches(doc, child)),
        Expression::Or(children) => children.iter().any(|child| matches(doc, child)),
        Expression::Field { path, test } => field_matches(lookup(doc, path), test),
        Expression::Text(search) => text_matches(doc, search),
    }
}

fn field_matches(found: Option<&Bson>, test: &FieldTest) -> bool {
    match test {
        FieldTest::Equals(expected) => equals(found, expected),
        // $ne also selects documents missing the field
        FieldTest::NotEquals(expected) => !equals(found, expected),
        FieldTest::OneOf(candidates) => candidates.iter().any(|c| equals(found, c)),
        FieldTest::Compare(op, bound) => any_element(found, |value| {
            value_cmp(value, bound).is_some_and(|ordering| op.accepts(ordering))
        }),
        FieldTest::Matches(re) => {
            any_element(found, |value| std::matches!(value, Bson::String(s) if re.is_match(s)))
        }
        FieldTest::Present(expected) => found.is_some() == *expected,
    }
}

/// Apply `check` to a scalar, or to each element of an array.
fn any_element(found: Option<&Bson>, check: impl Fn(&Bson) -> bool) -> bool {
    match found {
        Some(Bson::Array(items)) => items.iter().any(&check),
        Some(value) => check(value),
        None => false,
    }
}

fn equals(found: Option<&Bson>, expected: &Bson) -> bool {
    // null matches both missing fields and explicit nulls
    if std::matches!(expected, Bson::Null) {
        return std::matches!(found, None | Some(Bson::Null));
    }
    match found {
        Some(whole @ Bson::Array(_)) if whole == expected => true,
        other => any_element(other, |value| value_eq(value, expected)),
    }
}

fn text_matches(doc: &Document, search: &str) -> bool {
    let terms: Vec<String> = search.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return false;
    }
    let mut haystack = Vec::new();
    doc.values().for_each(|value| collect_strings(value, &mut haystack));
    haystack
        .iter()
        .any(|text| terms.iter().any(|term| text.contains(term.as_str())))
}

fn collect_strings(value: &Bson, out: &mut Vec<String>) {
    match value {
        Bson::String(s) => out.push(s.to_lowercase()),
        Bson::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Bson::Document(doc) => doc.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

/// Numeric view of a value, if it has one.
pub(crate) fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Equality: stored value vs query value.
fn value_eq(stored: &Bson, query: &Bson) -> bool {
    if let (Some(a), Some(b)) = (number(stored), number(query)) {
        return a == b;
    }
    match (stored, query) {
        (Bson::DateTime(a), Bson::DateTime(b)) => a.timestamp_millis() == b.timestamp_millis(),
        // a hex string addresses an ObjectId
        (Bson::ObjectId(a), Bson::String(s)) => a.to_hex() == *s,
        _ => stored == query,
    }
}

/// Ordering between a stored value and a query value of a comparable type.
pub(crate) fn value_cmp(stored: &Bson, query: &Bson) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (number(stored), number(query)) {
        return a.partial_cmp(&b);
    }
    match (stored, query) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        // epoch seconds against a stored date
        (Bson::DateTime(a), b) => {
            let millis = a.timestamp_millis() as f64;
            number(b).map(|secs| millis.total_cmp(&(secs * 1000.0)))
        }
        _ => None,
    }
}

/// Total order used for sorting: nulls and missing values first, then by
/// type, then by value within a type. Unlike filter comparisons, values of
/// different types never coerce.
pub(crate) fn sort_cmp(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    type_rank(a)
        .cmp(&type_rank(b))
        .then_with(|| match (a, b) {
            (Some(x), Some(y)) => same_type_cmp(x, y),
            _ => Ordering::Equal,
        })
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    }
}

fn same_type_cmp(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (number(a), number(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => Ordering::Equal,
    }
}
