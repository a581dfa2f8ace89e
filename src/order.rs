// Ordering and discreteness resolution

use crate::data::{DataFrame, Value, VarKind};
use crate::error::{PlotError, Result};
use crate::parser::aesthetics::Aes;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ordering directive for the discrete domain of a variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderOption {
    pub aes: Aes,
    pub variable: String,
    pub order_by: Option<String>,
    /// Explicit direction: 1 ascending, -1 descending
    pub order: Option<i32>,
}

impl OrderOption {
    pub fn new(
        aes: Aes,
        variable: impl Into<String>,
        order_by: Option<String>,
        order: Option<i32>,
    ) -> Self {
        Self {
            aes,
            variable: variable.into(),
            order_by: order_by.filter(|s| !s.is_empty()),
            order,
        }
    }

    /// Effective direction. Ordering by another variable defaults to descending.
    pub fn direction(&self) -> i32 {
        match (self.order, &self.order_by) {
            (Some(order), _) => order,
            (None, Some(_)) => -1,
            (None, None) => 1,
        }
    }

    fn merge(self, other: OrderOption) -> Result<OrderOption> {
        let order_by = match (self.order_by, other.order_by) {
            (Some(a), Some(b)) if a != b => {
                return Err(PlotError::OrderingConflict(format!(
                    "Multiple ordering options for the variable '{}' with different non-empty 'order_by' fields: '{}' and '{}'",
                    self.variable, a, b
                )))
            }
            (a, b) => a.or(b),
        };
        let order = match (self.order, other.order) {
            (Some(a), Some(b)) if a != b => {
                return Err(PlotError::OrderingConflict(format!(
                    "Multiple ordering options for the variable '{}' with different order direction: '{}' and '{}'",
                    self.variable, a, b
                )))
            }
            (a, b) => a.or(b),
        };
        Ok(OrderOption { order_by, order, ..self })
    }
}

/// Combine plot- and layer-level options for one layer.
///
/// Plot-level options apply only to variables the layer actually binds;
/// layer options are appended and options for the same (aesthetic, variable)
/// merge in that order.
pub fn resolve_order_options(
    plot: &[OrderOption],
    layer: &[OrderOption],
    bound: &[(Aes, String)],
) -> Result<Vec<OrderOption>> {
    let candidates = plot
        .iter()
        .filter(|o| bound.iter().any(|(aes, var)| *aes == o.aes && *var == o.variable))
        .chain(layer.iter())
        .cloned();

    let mut merged: Vec<OrderOption> = Vec::new();
    for option in candidates {
        match merged
            .iter()
            .position(|m| m.aes == option.aes && m.variable == option.variable)
        {
            Some(idx) => {
                let existing = merged.remove(idx);
                merged.insert(idx, existing.merge(option)?);
            }
            None => merged.push(option),
        }
    }
    Ok(merged)
}

/// Discreteness decision: explicit scale setting, then `as_discrete`, then
/// the column kind, continuous by default.
pub fn resolve_discreteness(
    explicit: Option<bool>,
    as_discrete: bool,
    kind: Option<VarKind>,
) -> bool {
    explicit.unwrap_or(as_discrete || kind.map(|k| k.is_discrete()).unwrap_or(false))
}

/// How `order_by` values are aggregated per distinct value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAggregate {
    Sum,
    Mean,
}

impl OrderAggregate {
    /// Counts and stacked positions add up; everything else is averaged
    pub fn for_variable(order_by: &str, stacked: bool) -> Self {
        if stacked || order_by == "..count.." {
            OrderAggregate::Sum
        } else {
            OrderAggregate::Mean
        }
    }
}

fn natural_sorted(mut values: Vec<Value>, direction: i32) -> Vec<Value> {
    values.sort_by(|a, b| a.cmp_natural(b));
    if direction < 0 {
        values.reverse();
    }
    values
}

fn sorted_by_variable(
    data: &DataFrame,
    variable: &str,
    order_by: &str,
    direction: i32,
    aggregate: OrderAggregate,
) -> Result<Vec<Value>> {
    let values = &data.get(variable)?.values;
    let keys = data.numeric(order_by)?;

    let mut stats: HashMap<Value, (f64, usize)> = HashMap::new();
    for (value, key) in values.iter().zip(keys.iter()) {
        if let Some(k) = key {
            let entry = stats.entry(value.clone()).or_insert((0.0, 0));
            entry.0 += k;
            entry.1 += 1;
        }
    }
    let score = |v: &Value| -> Option<f64> {
        stats.get(v).map(|(sum, n)| match aggregate {
            OrderAggregate::Sum => *sum,
            OrderAggregate::Mean => sum / *n as f64,
        })
    };

    let mut domain = data.distinct_values(variable);
    domain.sort_by(|a, b| match (score(a), score(b)) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if direction < 0 {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(domain)
}

/// Declared levels first, then values missing from the declaration in data order
pub fn extend_factor_levels(levels: &[Value], actual: &[Value], direction: i32) -> Vec<Value> {
    let mut head: Vec<Value> = Vec::with_capacity(levels.len());
    for level in levels {
        if !head.contains(level) {
            head.push(level.clone());
        }
    }
    let mut tail: Vec<Value> = actual.iter().filter(|v| !head.contains(v)).cloned().collect();
    if direction < 0 {
        head.reverse();
        tail.reverse();
    }
    head.extend(tail);
    head
}

/// Ordered discrete domain of `variable` in `data`
pub fn ordered_domain(
    data: &DataFrame,
    variable: &str,
    option: Option<&OrderOption>,
    factor_levels: Option<(&[Value], i32)>,
    aggregate: OrderAggregate,
) -> Result<Vec<Value>> {
    if let Some((levels, direction)) = factor_levels {
        let direction = option.and_then(|o| o.order).unwrap_or(direction);
        return Ok(extend_factor_levels(levels, &data.distinct_values(variable), direction));
    }
    match option {
        Some(OrderOption { order_by: Some(by), .. }) if data.has(by) => {
            let direction = option.map(OrderOption::direction).unwrap_or(-1);
            sorted_by_variable(data, variable, by, direction, aggregate)
        }
        Some(OrderOption { order_by: Some(by), .. }) => Err(PlotError::Binding(format!(
            "Undefined variable: '{}' used in 'order_by' of '{}'",
            by, variable
        ))),
        Some(o @ OrderOption { order: Some(_), .. }) => {
            Ok(natural_sorted(data.distinct_values(variable), o.direction()))
        }
        _ => Ok(data.distinct_values(variable)),
    }
}

/// Merge per-layer domains of one scale: first layer wins ordering, later
/// layers append unseen values.
pub fn union_domains<'a>(domains: impl IntoIterator<Item = &'a Vec<Value>>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for domain in domains {
        for v in domain {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
    }
    out
}
