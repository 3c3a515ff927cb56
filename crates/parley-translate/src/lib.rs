//! Natural-language request translation.
//!
//! Every function here is pure: the same text always yields the same intent,
//! and nothing is retained between calls.

mod aggregate;
mod classify;
mod coerce;
mod error;
mod fields;
mod identifier;
pub mod literal;
mod mutation;
mod terms;

pub use aggregate::synthesize;
pub use classify::{classify, count_filter};
pub use coerce::{coerce, coerce_filter};
pub use error::TranslateError;
pub use fields::{FieldSet, KnownField, default_constraint, extract_fields};
pub use identifier::{extract_identifier, parse_identifier};
pub use mutation::parse_mutation;
pub use terms::reduce;
