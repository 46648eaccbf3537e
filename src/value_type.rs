use std::fmt;

use crate::error::{Error, Result};
use crate::flag_value::FlagValue;

/// ValueType classifies the raw value a flag carries. It decides how the flag's intrinsic status
/// is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    String,
    Integer,
    Float,
    Null,
    Array,
    /// An empty string. Kept apart from [ValueType::String] because it is always off.
    Empty,
}

impl ValueType {
    /// Classify a raw value. Keyed maps have no flag semantics and are rejected.
    pub fn classify(value: &FlagValue) -> Result<ValueType> {
        match value {
            FlagValue::Bool(_) => Ok(ValueType::Boolean),
            FlagValue::Str(s) if s.is_empty() => Ok(ValueType::Empty),
            FlagValue::Str(_) => Ok(ValueType::String),
            FlagValue::Int(_) => Ok(ValueType::Integer),
            FlagValue::Float(_) => Ok(ValueType::Float),
            FlagValue::Array(_) => Ok(ValueType::Array),
            FlagValue::Null => Ok(ValueType::Null),
            FlagValue::Object(_) => Err(Error::UnsupportedType("object".to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Null => "null",
            ValueType::Array => "array",
            ValueType::Empty => "",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
