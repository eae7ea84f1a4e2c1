use serde_json::{Map, Value as JsonValue};

use crate::filter::{FilterOp, FilterOperator};

/// Ordered list of chain operations awaiting a terminal call.
///
/// Operations are kept in append order; nothing is sorted or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    ops: Vec<FilterOp>,
    errors: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: FilterOp) {
        self.ops.push(op);
    }

    /// Record a problem found while chaining, reported by the terminal call.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Move the accumulated operations out, leaving an empty chain behind.
    pub fn take(&mut self) -> FilterChain {
        std::mem::take(self)
    }

    pub fn into_ops(self) -> Vec<FilterOp> {
        self.ops
    }
}

impl IntoIterator for FilterChain {
    type Item = FilterOp;
    type IntoIter = std::vec::IntoIter<FilterOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Chaining methods shared by anything that owns a [`FilterChain`].
///
/// Each call appends exactly one operation and hands the builder back.
pub trait Filterable: Sized {
    fn chain_mut(&mut self) -> &mut FilterChain;

    /// Append a column comparison.
    fn filter(
        &mut self,
        column: &str,
        operator: FilterOperator,
        criteria: impl Into<JsonValue>,
    ) -> &mut Self {
        self.chain_mut().push(FilterOp::Filter {
            column: column.to_string(),
            operator,
            criteria: criteria.into(),
        });
        self
    }

    /// Append a comparison by operator name. Unknown names are reported by
    /// the terminal call instead of being dropped.
    fn filter_by_name(
        &mut self,
        column: &str,
        operator: &str,
        criteria: impl Into<JsonValue>,
    ) -> &mut Self {
        match FilterOperator::from_name(operator) {
            Some(op) => self.filter(column, op, criteria),
            None => {
                tracing::debug!(column, operator, "Unknown filter operator");
                self.chain_mut()
                    .push_error(format!("unknown filter operator '{operator}'"));
                self
            }
        }
    }

    fn eq(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Eq, value)
    }

    fn neq(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Neq, value)
    }

    fn gt(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Gt, value)
    }

    fn lt(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Lt, value)
    }

    fn gte(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Gte, value)
    }

    fn lte(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Lte, value)
    }

    fn like(&mut self, column: &str, pattern: &str) -> &mut Self {
        self.filter(column, FilterOperator::Like, pattern)
    }

    fn ilike(&mut self, column: &str, pattern: &str) -> &mut Self {
        self.filter(column, FilterOperator::ILike, pattern)
    }

    /// `IS` check; pass `JsonValue::Null`, `true` or `false`.
    fn is(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Is, value)
    }

    fn in_<V: Into<JsonValue>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
        self.filter(column, FilterOperator::In, JsonValue::Array(values))
    }

    fn contains(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Cs, value)
    }

    fn contained_by(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Cd, value)
    }

    /// Array overlap.
    fn overlaps(&mut self, column: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.filter(column, FilterOperator::Ova, value)
    }

    /// Range overlap, e.g. `"[2000-01-01,2000-01-02)"`.
    fn overlaps_range(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Ovr, range)
    }

    fn range_lt(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Sl, range)
    }

    fn range_gt(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Sr, range)
    }

    fn range_lte(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Nxr, range)
    }

    fn range_gte(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Nxl, range)
    }

    fn range_adjacent(&mut self, column: &str, range: &str) -> &mut Self {
        self.filter(column, FilterOperator::Adj, range)
    }

    /// Equality on every `(column, value)` pair.
    fn match_<K, V>(&mut self, query: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<JsonValue>,
    {
        let map: Map<String, JsonValue> = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.chain_mut().push(FilterOp::Match(map));
        self
    }

    /// Order by `column`, descending with nulls last.
    fn order(&mut self, column: &str) -> &mut Self {
        self.order_with(column, false, false)
    }

    fn order_with(&mut self, column: &str, ascending: bool, nulls_first: bool) -> &mut Self {
        self.chain_mut().push(FilterOp::Order {
            column: column.to_string(),
            ascending,
            nulls_first,
        });
        self
    }

    /// Limit results to rows `from..=to` (zero-based).
    fn range(&mut self, from: i64, to: i64) -> &mut Self {
        self.chain_mut().push(FilterOp::Range { from, to });
        self
    }

    fn single(&mut self) -> &mut Self {
        self.chain_mut().push(FilterOp::Single);
        self
    }
}

impl Filterable for FilterChain {
    fn chain_mut(&mut self) -> &mut FilterChain {
        self
    }
}
