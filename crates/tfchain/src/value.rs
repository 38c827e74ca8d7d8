//! value representation
//!
//! Values flow from three places into a variable file:
//! - configuration defaults and environment variables
//! - outputs of other stacks (terraform state is JSON)
//! - previously written variable files (HCL attribute syntax)
//!
//! The model contains
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map", keys are strings)
//!
//! Variable files only ever contain what we wrote ourselves, so objects only show up when reading
//! state or hand-edited files.
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when a value is handed to another stack or an external command
    ///
    /// Scalars become their literal text, lists and objects become compact JSON and null
    /// becomes `None`.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(self).ok(),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => {
                if let Some(int) = n.as_i64() {
                    return Value::Integer(int);
                }
                // u64 beyond i64 range and floats both land here
                Value::Decimal(n.as_f64().unwrap_or(f64::NAN))
            }
            Json::String(s) => s.into(),
            Json::Array(a) => a.into(),
            Json::Object(o) => Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

/// An hcl expression that is not a plain literal
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unsupported expression: {0}")]
pub struct UnsupportedExpression(pub String);

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        if value.is_f64() {
            return Value::Decimal(value.as_f64().unwrap_or(f64::NAN));
        }

        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        Value::Decimal(value.as_f64().unwrap_or(f64::NAN))
    }
}

impl TryFrom<hcl::Expression> for Value {
    type Error = UnsupportedExpression;

    fn try_from(value: hcl::Expression) -> Result<Self, Self::Error> {
        use hcl::{Expression, ObjectKey};

        Ok(match value {
            Expression::Null => Value::Null,
            Expression::Bool(bool) => bool.into(),
            Expression::Number(num) => num.into(),
            Expression::String(s) => s.into(),
            Expression::Array(array) => Value::Array(
                array
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Expression::Object(object) => {
                let mut map = IndexMap::with_capacity(object.len());
                for (key, value) in object {
                    let key = match key {
                        ObjectKey::Identifier(ident) => ident.to_string(),
                        ObjectKey::Expression(Expression::String(s)) => s,
                        other => return Err(UnsupportedExpression(format!("object key {other:?}"))),
                    };
                    map.insert(key, Value::try_from(value)?);
                }
                Value::Object(map)
            }
            other => return Err(UnsupportedExpression(format!("{other:?}"))),
        })
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_numbers_keep_their_kind() {
        let value: Value = serde_json::json!({"int": 3, "float": 0.5}).into();
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["int"], Value::Integer(3));
        assert_eq!(map["float"], Value::Decimal(0.5));
    }

    #[test]
    fn composite_plain_string_is_compact_json() {
        let value: Value = serde_json::json!(["a", {"b": 1}]).into();
        assert_eq!(value.to_plain_string().as_deref(), Some(r#"["a",{"b":1}]"#));
    }

    #[test]
    fn null_has_no_plain_string() {
        assert_eq!(Value::Null.to_plain_string(), None);
        assert_eq!(Value::from(None::<String>), Value::Null);
    }

    #[test]
    fn hcl_object_keys() {
        let expr: hcl_edit::expr::Expression = r#"{ a = 1, "b c" = [true, null] }"#.parse().unwrap();
        let value = Value::try_from(hcl::Expression::from(expr)).unwrap();

        let mut expected = IndexMap::new();
        expected.insert("a".to_string(), Value::Integer(1));
        expected.insert(
            "b c".to_string(),
            Value::Array(vec![Value::Boolean(true), Value::Null]),
        );
        assert_eq!(value, Value::Object(expected));
    }

    #[test]
    fn hcl_traversal_is_rejected() {
        let expr: hcl_edit::expr::Expression = "var.foo".parse().unwrap();
        assert!(Value::try_from(hcl::Expression::from(expr)).is_err());
    }
}
