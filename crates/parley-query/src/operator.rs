use std::cmp::Ordering;

/// Ordering comparison written inline in a request, e.g. `price > 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Gte),
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Lte),
            _ => None,
        }
    }

    /// The filter-document operator key.
    pub fn operator(self) -> &'static str {
        match self {
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
        }
    }

    pub fn from_operator(key: &str) -> Option<Self> {
        [Comparison::Gt, Comparison::Gte, Comparison::Lt, Comparison::Lte]
            .into_iter()
            .find(|op| op.operator() == key)
    }

    /// Whether `stored cmp query` satisfies this comparison.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Gt => ordering.is_gt(),
            Comparison::Gte => ordering.is_ge(),
            Comparison::Lt => ordering.is_lt(),
            Comparison::Lte => ordering.is_le(),
        }
    }
}
