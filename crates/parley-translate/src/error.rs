use std::fmt;

/// Translation failures that are reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// Identifier text that does not form a valid document identifier.
    MalformedIdentifier(String),
    /// Mutation text yielded no fields.
    UnparseableMutation,
    /// No aggregation phrase and no literal pipeline.
    UnrecognizedAggregation(String),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::MalformedIdentifier(id) => write!(f, "malformed identifier: {id}"),
            TranslateError::UnparseableMutation => write!(
                f,
                "could not parse document data; provide JSON or `field: value, field2: value2`"
            ),
            TranslateError::UnrecognizedAggregation(text) => write!(
                f,
                "aggregation not recognized: {text:?}; try 'group by field', 'count by field', \
                 'average field', 'sum field', or a JSON pipeline"
            ),
        }
    }
}

impl std::error::Error for TranslateError {}
