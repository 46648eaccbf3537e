use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::warn;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::flag_value::FlagValue;

/// Operator is the comparison a flag applies between the evaluation context and its own value.
///
/// Every operator is evaluated as `context <op> flag_value`, so a flag with value `10` and
/// operator [Operator::Gt] is enabled for contexts greater than 10.
///
/// The ordering operators ([Operator::Gt], [Operator::Ge], [Operator::Lt], [Operator::Le]) are
/// only meaningful for ordinal pairs: two numbers, two strings, two booleans, or two arrays of
/// comparable elements. Any other pairing evaluates to `false`.
///
/// Booleans are never coerced to numbers: `true` does not equal `1`, and neither `true > 0` nor
/// `false < 1` holds. A boolean context only matches boolean flag values (or arrays containing
/// them, for [Operator::In]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[serde(try_from = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    Ni,
}

lazy_static! {
    static ref OPERATORS_BY_NAME: HashMap<&'static str, Operator> = Operator::ALL
        .iter()
        .map(|op| (op.name(), *op))
        .collect();
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
        Operator::In,
        Operator::Ni,
    ];

    /// Resolve an operator from its name, ignoring case.
    pub fn from_name(name: &str) -> Result<Operator> {
        OPERATORS_BY_NAME
            .get(name.to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| Error::UnknownOperator(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Gt => "GT",
            Operator::Ge => "GE",
            Operator::Lt => "LT",
            Operator::Le => "LE",
            Operator::In => "IN",
            Operator::Ni => "NI",
        }
    }

    /// Apply the operator to `context` (left-hand side) and `value` (right-hand side).
    pub fn apply(&self, context: &FlagValue, value: &FlagValue) -> bool {
        match self {
            Operator::Eq => context == value,
            Operator::Ne => context != value,

            Operator::Gt => ordering_op(*self, context, value, |o| o.is_gt()),
            Operator::Ge => ordering_op(*self, context, value, |o| o.is_ge()),
            Operator::Lt => ordering_op(*self, context, value, |o| o.is_lt()),
            Operator::Le => ordering_op(*self, context, value, |o| o.is_le()),

            Operator::In => value.contains(context),
            Operator::Ni => !value.contains(context),
        }
    }
}

fn ordering_op<F: Fn(std::cmp::Ordering) -> bool>(
    op: Operator,
    lhs: &FlagValue,
    rhs: &FlagValue,
    f: F,
) -> bool {
    match lhs.partial_cmp(rhs) {
        Some(ordering) => f(ordering),
        None => {
            warn!(
                "operator {} is not defined between {} and {}, treating as false",
                op, lhs, rhs
            );
            false
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operator::from_name(s)
    }
}

impl TryFrom<String> for Operator {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Operator::from_name(&s)
    }
}

impl Serialize for Operator {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
