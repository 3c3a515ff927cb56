use std::cmp::Ordering;

use bson::{Bson, Document};
use parley_query::parse_filter;

use super::eval::{lookup, matches, number, sort_cmp};
use crate::error::StoreError;

/// Run an aggregation pipeline over a collection snapshot.
///
/// Supports `$match`, `$group`, `$sort`, `$skip`, `$limit` and `$count`.
pub(crate) fn run(mut docs: Vec<Document>, pipeline: &[Document]) -> Result<Vec<Document>, StoreError> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(StoreError::InvalidQuery(
                    "pipeline stage must have exactly one field".into(),
                ));
            }
        };
        docs = match name.as_str() {
            "$match" => {
                let expr = parse_filter(as_document(name, spec)?)?;
                docs.into_iter().filter(|doc| matches(doc, &expr)).collect()
            }
            "$group" => group(docs, as_document(name, spec)?)?,
            "$sort" => sort(docs, as_document(name, spec)?)?,
            "$skip" => docs.into_iter().skip(as_count(name, spec)?).collect(),
            "$limit" => docs.into_iter().take(as_count(name, spec)?).collect(),
            "$count" => {
                let Bson::String(field) = spec else {
                    return Err(StoreError::InvalidQuery("$count requires a field name".into()));
                };
                let mut out = Document::new();
                out.insert(field.clone(), docs.len() as i64);
                vec![out]
            }
            other => return Err(StoreError::Unsupported(format!("pipeline stage {other}"))),
        };
    }
    Ok(docs)
}

fn as_document<'a>(stage: &str, spec: &'a Bson) -> Result<&'a Document, StoreError> {
    match spec {
        Bson::Document(doc) => Ok(doc),
        _ => Err(StoreError::InvalidQuery(format!("{stage} requires a document"))),
    }
}

fn as_count(stage: &str, spec: &Bson) -> Result<usize, StoreError> {
    match number(spec) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(StoreError::InvalidQuery(format!(
            "{stage} requires a non-negative integer"
        ))),
    }
}

/// Evaluate a `"$field"` reference or return the literal.
fn operand(doc: &Document, expr: &Bson) -> Bson {
    match expr {
        Bson::String(s) if s.starts_with('$') => {
            lookup(doc, &s[1..]).cloned().unwrap_or(Bson::Null)
        }
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accumulator {
    Sum,
    Avg,
    Min,
    Max,
}

impl Accumulator {
    fn from_operator(op: &str) -> Option<Self> {
        match op {
            "$sum" => Some(Accumulator::Sum),
            "$avg" => Some(Accumulator::Avg),
            "$min" => Some(Accumulator::Min),
            "$max" => Some(Accumulator::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    int_sum: i64,
    float_sum: f64,
    floating: bool,
    numbers: usize,
    extreme: Option<Bson>,
}

impl Tally {
    fn add(&mut self, acc: Accumulator, value: Bson) {
        match acc {
            Accumulator::Sum | Accumulator::Avg => match value {
                Bson::Int32(n) => self.add_int(n as i64),
                Bson::Int64(n) => self.add_int(n),
                Bson::Double(n) => {
                    self.floating = true;
                    self.float_sum += n;
                    self.numbers += 1;
                }
                _ => {}
            },
            Accumulator::Min | Accumulator::Max => {
                if std::matches!(value, Bson::Null) {
                    return;
                }
                let wanted = if acc == Accumulator::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match &self.extreme {
                    Some(current) => sort_cmp(Some(&value), Some(current)) == wanted,
                    None => true,
                };
                if replace {
                    self.extreme = Some(value);
                }
            }
        }
    }

    fn add_int(&mut self, n: i64) {
        match self.int_sum.checked_add(n) {
            Some(sum) => self.int_sum = sum,
            None => {
                self.floating = true;
                self.float_sum += n as f64;
            }
        }
        self.numbers += 1;
    }

    fn finish(self, acc: Accumulator) -> Bson {
        let total = self.int_sum as f64 + self.float_sum;
        match acc {
            Accumulator::Sum if self.floating => Bson::Double(total),
            Accumulator::Sum => Bson::Int64(self.int_sum),
            Accumulator::Avg if self.numbers == 0 => Bson::Null,
            Accumulator::Avg => Bson::Double(total / self.numbers as f64),
            Accumulator::Min | Accumulator::Max => self.extreme.unwrap_or(Bson::Null),
        }
    }
}

struct Output {
    name: String,
    acc: Accumulator,
    expr: Bson,
}

fn group(docs: Vec<Document>, spec: &Document) -> Result<Vec<Document>, StoreError> {
    let key_expr = spec
        .get("_id")
        .ok_or_else(|| StoreError::InvalidQuery("$group requires an _id".into()))?;

    let mut outputs = Vec::new();
    for (name, value) in spec.iter().filter(|(name, _)| name.as_str() != "_id") {
        let Bson::Document(op) = value else {
            return Err(StoreError::InvalidQuery(format!(
                "$group field {name} must be an accumulator"
            )));
        };
        let mut entries = op.iter();
        let (op_name, expr) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(StoreError::InvalidQuery(format!(
                    "$group field {name} must have one accumulator"
                )));
            }
        };
        let acc = Accumulator::from_operator(op_name)
            .ok_or_else(|| StoreError::Unsupported(format!("accumulator {op_name}")))?;
        outputs.push(Output {
            name: name.clone(),
            acc,
            expr: expr.clone(),
        });
    }

    // groups keep first-seen order
    let mut groups: Vec<(Bson, Vec<Tally>)> = Vec::new();
    for doc in &docs {
        let key = operand(doc, key_expr);
        let index = match groups.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                groups.push((key, outputs.iter().map(|_| Tally::default()).collect()));
                groups.len() - 1
            }
        };
        for (output, tally) in outputs.iter().zip(groups[index].1.iter_mut()) {
            tally.add(output.acc, operand(doc, &output.expr));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, tallies)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for (output, tally) in outputs.iter().zip(tallies) {
                out.insert(output.name.clone(), tally.finish(output.acc));
            }
            out
        })
        .collect())
}

fn sort(mut docs: Vec<Document>, spec: &Document) -> Result<Vec<Document>, StoreError> {
    let mut keys = Vec::new();
    for (field, direction) in spec {
        let descending = match number(direction) {
            Some(d) if d == 1.0 => false,
            Some(d) if d == -1.0 => true,
            _ => {
                return Err(StoreError::InvalidQuery(format!(
                    "$sort direction for {field} must be 1 or -1"
                )));
            }
        };
        keys.push((field.as_str(), descending));
    }

    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = sort_cmp(lookup(a, field), lookup(b, field));
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(docs)
}
