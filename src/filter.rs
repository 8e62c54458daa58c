//! Predicate engine: declarative filter conditions and single-key sorting
//! over records.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workbook::{cell_text, field_text, Record};

/// Comparison applied by a single filter condition. String operators compare
/// case-insensitively except `equals`/`notEquals`, which are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    /// Comparison operand; unused by `isEmpty`/`isNotEmpty`.
    #[serde(default)]
    pub value: Value,
}

/// Conditions are AND-combined; an empty list matches every record.
pub type FilterSpec = Vec<Condition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Single-key sort specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

/// True when `record` satisfies every condition in `filter`.
pub fn matches(record: &Record, filter: &[Condition]) -> bool {
    filter.iter().all(|cond| condition_holds(record, cond))
}

fn condition_holds(record: &Record, cond: &Condition) -> bool {
    let actual = field_text(record, &cond.column);
    let expected = cell_text(&cond.value);
    match cond.operator {
        Operator::Contains => fold(&actual).contains(&fold(&expected)),
        Operator::NotContains => !fold(&actual).contains(&fold(&expected)),
        Operator::Equals => actual == expected,
        Operator::NotEquals => actual != expected,
        Operator::StartsWith => fold(&actual).starts_with(&fold(&expected)),
        Operator::EndsWith => fold(&actual).ends_with(&fold(&expected)),
        Operator::IsEmpty => actual.is_empty(),
        Operator::IsNotEmpty => !actual.is_empty(),
        Operator::GreaterThan => numeric(&actual, &expected, |a, b| a > b),
        Operator::LessThan => numeric(&actual, &expected, |a, b| a < b),
        Operator::GreaterOrEqual => numeric(&actual, &expected, |a, b| a >= b),
        Operator::LessOrEqual => numeric(&actual, &expected, |a, b| a <= b),
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase()
}

// Numeric operators require both sides to parse; a side that does not parse
// makes the condition false, the same way a NaN comparison is false.
fn numeric(lhs: &str, rhs: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (lhs.trim().parse::<f64>(), rhs.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

/// Stable in-place sort by `sort.column`. Values that both parse as
/// numbers compare numerically, anything else falls back to string order;
/// `desc` reverses the comparison. No-op for an empty column name.
pub fn sort_records(records: &mut [Record], sort: &SortSpec) {
    if sort.column.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        let x = field_text(a, &sort.column);
        let y = field_text(b, &sort.column);
        let ord = match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
            (Ok(m), Ok(n)) => m.partial_cmp(&n).unwrap_or(Ordering::Equal),
            _ => x.cmp(&y),
        };
        match sort.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });
}
