use std::fmt;

use serde_json::{Map, Value as JsonValue};

/// Comparison operators a filter can apply to a column.
///
/// `Ova` and `Ovr` both render as PostgREST `ov`; they differ only in how the
/// criteria is formatted (array literal vs. range literal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    ILike,
    Is,
    In,
    /// Contains (`@>`).
    Cs,
    /// Contained by (`<@`).
    Cd,
    /// Overlaps, array criteria.
    Ova,
    /// Overlaps, range criteria.
    Ovr,
    /// Strictly left of (`<<`).
    Sl,
    /// Strictly right of (`>>`).
    Sr,
    /// Does not extend to the right of (`&<`).
    Nxr,
    /// Does not extend to the left of (`&>`).
    Nxl,
    /// Adjacent to (`-|-`).
    Adj,
}

/// Fixed table from operator name to operator.
pub const OPERATORS: &[(&str, FilterOperator)] = &[
    ("eq", FilterOperator::Eq),
    ("neq", FilterOperator::Neq),
    ("gt", FilterOperator::Gt),
    ("lt", FilterOperator::Lt),
    ("gte", FilterOperator::Gte),
    ("lte", FilterOperator::Lte),
    ("like", FilterOperator::Like),
    ("ilike", FilterOperator::ILike),
    ("is", FilterOperator::Is),
    ("in", FilterOperator::In),
    ("cs", FilterOperator::Cs),
    ("cd", FilterOperator::Cd),
    ("ova", FilterOperator::Ova),
    ("ovr", FilterOperator::Ovr),
    ("sl", FilterOperator::Sl),
    ("sr", FilterOperator::Sr),
    ("nxr", FilterOperator::Nxr),
    ("nxl", FilterOperator::Nxl),
    ("adj", FilterOperator::Adj),
];

impl FilterOperator {
    /// Look an operator up by its chain name (`"eq"`, `"ova"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    /// The chain name, as listed in [`OPERATORS`].
    pub fn name(&self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(n, _)| *n)
            .unwrap_or("eq")
    }

    /// The operator as it appears in a PostgREST query string.
    pub fn postgrest_op(&self) -> &'static str {
        match self {
            Self::Ova | Self::Ovr => "ov",
            other => other.name(),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded chain operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Column comparison.
    Filter {
        column: String,
        operator: FilterOperator,
        criteria: JsonValue,
    },
    /// Equality on every column of the map.
    Match(Map<String, JsonValue>),
    Order {
        column: String,
        ascending: bool,
        nulls_first: bool,
    },
    /// Inclusive row window.
    Range { from: i64, to: i64 },
    /// Expect exactly one row back.
    Single,
}

impl FilterOp {
    /// Short kind label, used in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "filter",
            Self::Match(_) => "match",
            Self::Order { .. } => "order",
            Self::Range { .. } => "range",
            Self::Single => "single",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operator_round_trips_through_the_table() {
        for (name, op) in OPERATORS {
            assert_eq!(FilterOperator::from_name(name), Some(*op));
            assert_eq!(op.name(), *name);
        }
        assert_eq!(OPERATORS.len(), 19);
    }

    #[test]
    fn unknown_operator_name() {
        assert_eq!(FilterOperator::from_name("fts"), None);
        assert_eq!(FilterOperator::from_name("EQ"), None);
    }

    #[test]
    fn overlap_variants_share_wire_name() {
        assert_eq!(FilterOperator::Ova.postgrest_op(), "ov");
        assert_eq!(FilterOperator::Ovr.postgrest_op(), "ov");
        assert_eq!(FilterOperator::ILike.postgrest_op(), "ilike");
    }
}
