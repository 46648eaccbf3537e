use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::flag_value::FlagValue;
use crate::operator::Operator;
use crate::value_type::ValueType;

/// Flag is a single named feature flag as delivered by the remote source.
///
/// A flag without an [Operator] is evaluated on the intrinsic truthiness of its value (its
/// [Flag::status]). A flag with an operator compares the evaluation context against its value.
///
/// Two flags are equal when their name, description and status match. Use
/// [Flag::same_definition] to also compare value and operator.
#[derive(Clone, Debug)]
pub struct Flag {
    name: String,
    description: Option<String>,
    value: FlagValue,
    operation: Option<Operator>,
    value_type: ValueType,
}

impl Flag {
    /// Create a flag. The name must not be empty and the value must be classifiable by
    /// [ValueType::classify].
    pub fn new(name: impl Into<String>, value: impl Into<FlagValue>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let value = value.into();
        let value_type = ValueType::classify(&value)?;

        Ok(Self {
            name,
            description: None,
            value,
            operation: None,
            value_type,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_operation(mut self, operation: Operator) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    pub fn operation(&self) -> Option<Operator> {
        self.operation
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The intrinsic on/off state of the flag, derived from its value alone.
    #[allow(clippy::float_cmp)]
    pub fn status(&self) -> bool {
        match self.value_type {
            ValueType::Boolean => self.value.as_bool().unwrap_or(false),
            ValueType::Integer | ValueType::Float => {
                self.value.to_f64().map_or(false, |n| n != 0.0)
            }
            ValueType::String => true,
            ValueType::Array => matches!(&self.value, FlagValue::Array(values) if !values.is_empty()),
            ValueType::Null | ValueType::Empty => false,
        }
    }

    /// Decide whether the flag is on.
    ///
    /// Without an operation the context is ignored and [Flag::status] decides. With one, the
    /// result is `operation(context, value)`; an absent context is compared as null.
    pub fn is_enabled(&self, context: Option<&FlagValue>) -> bool {
        match self.operation {
            None => self.status(),
            Some(operation) => {
                operation.apply(context.unwrap_or(&FlagValue::Null), &self.value)
            }
        }
    }

    /// Shorthand for [Flag::is_enabled] with a present context.
    pub fn is_enabled_for(&self, context: impl Into<FlagValue>) -> bool {
        self.is_enabled(Some(&context.into()))
    }

    /// Strict comparison covering name, description, value and operation.
    pub fn same_definition(&self, other: &Flag) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.value == other.value
            && self.operation == other.operation
    }
}

impl PartialEq for Flag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.status() == other.status()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flag(name=\"{}\", ", self.name)?;
        match &self.description {
            Some(description) => write!(f, "description=\"{}\", ", description)?,
            None => write!(f, "description=None, ")?,
        }
        write!(f, "status=\"{}\")", self.status())
    }
}

// Serializes as the descriptor record the parser reads, so a flag set can be written back out as
// a document.
impl Serialize for Flag {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Flag", 4)?;
        state.serialize_field("name", &self.name)?;
        if let Some(description) = &self.description {
            state.serialize_field("description", description)?;
        } else {
            state.skip_field("description")?;
        }
        state.serialize_field("value", &self.value)?;
        if let Some(operation) = &self.operation {
            state.serialize_field("operation", operation)?;
        } else {
            state.skip_field("operation")?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use maplit::btreemap;
    use proptest::prelude::*;
    use serde_json::json;
    use spectral::prelude::*;
    use test_case::test_case;

    #[test]
    fn boolean_flag() {
        let flag = Flag::new("booleantest", true)
            .unwrap()
            .with_description("a boolean test");

        assert_that!(flag.name()).is_equal_to("booleantest");
        assert_that!(flag.description()).is_equal_to(Some("a boolean test"));
        assert_that!(flag.value()).is_equal_to(&FlagValue::Bool(true));
        assert_that!(flag.value_type()).is_equal_to(ValueType::Boolean);
        assert_that!(flag.status()).is_true();
        assert_that!(flag.is_enabled(None)).is_true();
    }

    #[test]
    fn numeric_flag_with_operation() {
        let flag = Flag::new("numerictest", 69)
            .unwrap()
            .with_description("a numeric test")
            .with_operation(Operator::Eq);

        assert_that!(flag.value()).is_equal_to(&FlagValue::Int(69));
        assert_that!(flag.status()).is_true();
        assert_that!(flag.is_enabled_for(69)).is_true();
        assert_that!(flag.is_enabled_for(69.0)).is_true();
        assert_that!(flag.is_enabled_for(42)).is_false();
    }

    #[test]
    fn string_flag_with_operation() {
        let flag = Flag::new("stringtest", "test")
            .unwrap()
            .with_operation(Operator::Eq);

        assert_that!(flag.status()).is_true();
        assert_that!(flag.is_enabled_for("test")).is_true();
        assert_that!(flag.is_enabled_for("different_test")).is_false();
    }

    #[test]
    fn array_flag_with_operation() {
        let flag = Flag::new("arraytest", vec!["foo", "bar"])
            .unwrap()
            .with_operation(Operator::In);

        assert_that!(flag.value_type()).is_equal_to(ValueType::Array);
        assert_that!(flag.status()).is_true();
        assert_that!(flag.is_enabled_for("foo")).is_true();
        assert_that!(flag.is_enabled_for("baz")).is_false();
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(Flag::new("", true), Err(Error::EmptyName)));
    }

    #[test]
    fn rejects_unclassifiable_value() {
        let value = FlagValue::Object(btreemap! {"a".to_string() => FlagValue::Int(1)});
        assert!(matches!(
            Flag::new("test", value),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test_case(FlagValue::Bool(true), true)]
    #[test_case(FlagValue::Bool(false), false)]
    #[test_case(FlagValue::Int(1), true)]
    #[test_case(FlagValue::Int(-1), true; "negative integer")]
    #[test_case(FlagValue::Int(0), false)]
    #[test_case(FlagValue::Float(0.1), true)]
    #[test_case(FlagValue::Float(0.0), false)]
    #[test_case(FlagValue::Float(-0.0), false; "negative zero")]
    #[test_case(FlagValue::from("active"), true)]
    #[test_case(FlagValue::from("x"), true)]
    #[test_case(FlagValue::from(""), false)]
    #[test_case(FlagValue::Null, false)]
    #[test_case(FlagValue::Array(vec![]), false)]
    #[test_case(FlagValue::from(vec![1_i64]), true)]
    fn status(value: FlagValue, expected: bool) {
        let flag = Flag::new("test", value).unwrap();
        assert_that!(flag.status()).is_equal_to(expected);
        assert_that!(flag.is_enabled(None)).is_equal_to(expected);
    }

    #[test]
    fn is_enabled_without_operation_ignores_context() {
        assert!(Flag::new("test", "active").unwrap().is_enabled_for("anything"));
        assert!(!Flag::new("test", 0).unwrap().is_enabled_for(0));
    }

    #[test]
    fn is_enabled_positives() {
        assert!(Flag::new("testint", 1).unwrap().is_enabled(None));
        assert!(Flag::new("testintoperation", 1)
            .unwrap()
            .with_operation(Operator::Eq)
            .is_enabled_for(1));

        assert!(Flag::new("testfloat", 1.1).unwrap().is_enabled(None));
        assert!(Flag::new("testfloatoperation", 3.25)
            .unwrap()
            .with_operation(Operator::Le)
            .is_enabled_for(2.5));

        assert!(Flag::new("teststr", "test").unwrap().is_enabled(None));
        assert!(Flag::new("teststroperation", "test")
            .unwrap()
            .with_operation(Operator::Ne)
            .is_enabled_for("anothertest"));

        assert!(Flag::new("testarray", vec!["test"]).unwrap().is_enabled(None));
        assert!(Flag::new("testarrayoperation", vec!["test"])
            .unwrap()
            .with_operation(Operator::In)
            .is_enabled_for("test"));
    }

    #[test]
    fn absent_context_is_compared_as_null() {
        let eq_null = Flag::new("test", FlagValue::Null)
            .unwrap()
            .with_operation(Operator::Eq);
        assert!(eq_null.is_enabled(None));

        let gt = Flag::new("test", 10).unwrap().with_operation(Operator::Gt);
        assert!(!gt.is_enabled(None));
    }

    #[test]
    fn display() {
        let flag = Flag::new("test", "test")
            .unwrap()
            .with_description("a test")
            .with_operation(Operator::Eq);
        assert_eq!(
            flag.to_string(),
            r#"Flag(name="test", description="a test", status="true")"#
        );

        let flag = Flag::new("off", 0).unwrap();
        assert_eq!(
            flag.to_string(),
            r#"Flag(name="off", description=None, status="false")"#
        );
    }

    #[test]
    fn equality_uses_name_description_and_status() {
        let flag1 = Flag::new("test", "test")
            .unwrap()
            .with_description("a test")
            .with_operation(Operator::Eq);
        let flag2 = Flag::new("test", "test")
            .unwrap()
            .with_description("a test")
            .with_operation(Operator::Eq);
        let flag3 = Flag::new("differenttest", "test")
            .unwrap()
            .with_description("a different test")
            .with_operation(Operator::Ne);

        assert_eq!(flag1, flag2);
        assert_ne!(flag1, flag3);

        let same_status_other_value = Flag::new("test", "other")
            .unwrap()
            .with_description("a test");
        asserting!("value and operation are not part of equality")
            .that(&(flag1 == same_status_other_value))
            .is_true();
        asserting!("but they are part of the definition")
            .that(&flag1.same_definition(&same_status_other_value))
            .is_false();
        assert!(flag1.same_definition(&flag2));
    }

    #[test]
    fn serializes_as_descriptor_record() {
        let flag = Flag::new("test", vec!["BR", "PT"])
            .unwrap()
            .with_description("a test")
            .with_operation(Operator::In);
        assert_json_eq!(
            serde_json::to_value(&flag).unwrap(),
            json!({"name": "test", "description": "a test", "value": ["BR", "PT"], "operation": "IN"})
        );

        let bare = Flag::new("bare", true).unwrap();
        assert_json_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({"name": "bare", "value": true})
        );
    }

    proptest! {
        #[test]
        fn without_operation_context_never_matters(value in any::<i64>(), context in any::<i64>()) {
            let flag = Flag::new("p", value).unwrap();
            prop_assert_eq!(flag.is_enabled_for(context), flag.status());
            prop_assert_eq!(flag.is_enabled(None), flag.status());
        }

        #[test]
        fn with_operation_delegates_to_operator(
            op in any::<Operator>(),
            value in -20_i64..20,
            context in -20_i64..20,
        ) {
            let flag = Flag::new("p", value).unwrap().with_operation(op);
            prop_assert_eq!(
                flag.is_enabled_for(context),
                op.apply(&FlagValue::Int(context), &FlagValue::Int(value))
            );
        }
    }
}
