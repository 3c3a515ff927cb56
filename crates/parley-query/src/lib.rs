mod aggregate;
mod expression;
mod filter;
mod intent;
mod mutation;
mod operator;
mod parse_filter;
mod value;

pub use aggregate::{AggregationSpec, AggregationStage};
pub use expression::{Expression, FieldTest};
pub use filter::{Filter, FilterClause, FilterValue, Pattern};
pub use intent::ParsedIntent;
pub use mutation::DocumentMutation;
pub use operator::Comparison;
pub use parse_filter::{FilterParseError, parse_filter};
pub use value::Scalar;
