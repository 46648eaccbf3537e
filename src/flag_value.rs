use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::{cmp_int_float, int_eq_float};

/// A raw, JSON-shaped value. It is both the payload a [crate::Flag] carries and the context a
/// flag is evaluated against.
///
/// Equality is loose across numbers, so `Int(6) == Float(6.0)`. Booleans never compare equal to
/// numbers.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<FlagValue>),
    Object(BTreeMap<String, FlagValue>),
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> FlagValue {
        FlagValue::Bool(b)
    }
}

impl From<i64> for FlagValue {
    fn from(i: i64) -> FlagValue {
        FlagValue::Int(i)
    }
}

impl From<i32> for FlagValue {
    fn from(i: i32) -> FlagValue {
        FlagValue::Int(i.into())
    }
}

impl From<f64> for FlagValue {
    fn from(f: f64) -> FlagValue {
        FlagValue::Float(f)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> FlagValue {
        FlagValue::Str(s.to_owned())
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> FlagValue {
        FlagValue::Str(s)
    }
}

impl<T> From<Vec<T>> for FlagValue
where
    FlagValue: From<T>,
{
    fn from(v: Vec<T>) -> FlagValue {
        v.into_iter().collect()
    }
}

impl<T> From<Option<T>> for FlagValue
where
    FlagValue: From<T>,
{
    fn from(o: Option<T>) -> FlagValue {
        o.map(FlagValue::from).unwrap_or(FlagValue::Null)
    }
}

impl<T> FromIterator<T> for FlagValue
where
    FlagValue: From<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        FlagValue::Array(iter.into_iter().map(FlagValue::from).collect())
    }
}

impl From<&Value> for FlagValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => FlagValue::Null,
            Value::Bool(b) => FlagValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FlagValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    FlagValue::Float(f)
                } else {
                    warn!("unrepresentable number {}, converting to string", n);
                    FlagValue::Str(n.to_string())
                }
            }
            Value::String(s) => FlagValue::Str(s.clone()),
            Value::Array(arr) => FlagValue::Array(arr.iter().map(FlagValue::from).collect()),
            Value::Object(obj) => FlagValue::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), FlagValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for FlagValue {
    fn from(v: Value) -> Self {
        FlagValue::from(&v)
    }
}

impl From<&FlagValue> for Value {
    fn from(v: &FlagValue) -> Self {
        match v {
            FlagValue::Null => Value::Null,
            FlagValue::Bool(b) => Value::from(*b),
            FlagValue::Int(i) => Value::from(*i),
            // non-finite floats have no JSON form and become null
            FlagValue::Float(f) => Value::from(*f),
            FlagValue::Str(s) => Value::from(s.as_str()),
            FlagValue::Array(values) => Value::Array(values.iter().map(Value::from).collect()),
            FlagValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl FlagValue {
    /// Returns None unless self is a string. It will not convert.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns None unless self is a bool. It will not convert.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the wrapped value as a float for numeric types, and None otherwise.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            FlagValue::Int(i) => Some(*i as f64),
            FlagValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlagValue::Null)
    }

    /// Membership test used by the `IN` operator: arrays contain their elements, strings contain
    /// their substrings, objects contain their keys. Every other pairing contains nothing.
    pub fn contains(&self, needle: &FlagValue) -> bool {
        match (self, needle) {
            (FlagValue::Array(values), _) => values.iter().any(|v| v == needle),
            (FlagValue::Str(haystack), FlagValue::Str(n)) => haystack.contains(n.as_str()),
            (FlagValue::Object(map), FlagValue::Str(key)) => map.contains_key(key),
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::from(self)
    }
}

impl PartialEq for FlagValue {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        use FlagValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(l), Bool(r)) => l == r,
            (Int(l), Int(r)) => l == r,
            (Float(l), Float(r)) => l == r,
            (Int(i), Float(f)) | (Float(f), Int(i)) => int_eq_float(*i, *f),
            (Str(l), Str(r)) => l == r,
            (Array(l), Array(r)) => l == r,
            (Object(l), Object(r)) => l == r,
            _ => false,
        }
    }
}

impl PartialOrd for FlagValue {
    /// Ordering exists between numbers, between strings, between booleans, and between arrays whose
    /// elements are pairwise comparable. Everything else is unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use FlagValue::*;
        match (self, other) {
            (Int(l), Int(r)) => Some(l.cmp(r)),
            (Float(l), Float(r)) => l.partial_cmp(r),
            (Int(i), Float(f)) => cmp_int_float(*i, *f),
            (Float(f), Int(i)) => cmp_int_float(*i, *f).map(Ordering::reverse),
            (Str(l), Str(r)) => Some(l.cmp(r)),
            (Bool(l), Bool(r)) => Some(l.cmp(r)),
            (Array(l), Array(r)) => {
                for (lv, rv) in l.iter().zip(r.iter()) {
                    match lv.partial_cmp(rv)? {
                        Ordering::Equal => continue,
                        non_eq => return Some(non_eq),
                    }
                }
                Some(l.len().cmp(&r.len()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
