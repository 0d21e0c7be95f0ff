use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl From<&'static str> for FieldKey {
    fn from(value: &'static str) -> Self {
        Self(value)
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(Decimal),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

pub trait FieldType: Sized {
    fn to_value(&self) -> FieldValue;
    fn from_value(value: FieldValue) -> Option<Self>;
}

impl FieldType for FieldValue {
    fn to_value(&self) -> FieldValue {
        self.clone()
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        Some(value)
    }
}

impl FieldType for String {
    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl FieldType for Decimal {
    fn to_value(&self) -> FieldValue {
        FieldValue::Number(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Number(number) => Some(number),
            _ => None,
        }
    }
}

impl FieldType for i64 {
    fn to_value(&self) -> FieldValue {
        FieldValue::Number(Decimal::from(*self))
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Number(number) if number.fract().is_zero() => number.to_i64(),
            _ => None,
        }
    }
}

impl FieldType for bool {
    fn to_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(flag) => Some(flag),
            _ => None,
        }
    }
}

impl FieldType for Vec<String> {
    fn to_value(&self) -> FieldValue {
        FieldValue::List(self.clone())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl<V> FieldType for Option<V>
where
    V: FieldType,
{
    fn to_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_value(),
            None => FieldValue::Null,
        }
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => V::from_value(other).map(Some),
        }
    }
}

pub trait FormValues: Clone + PartialEq + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    fn field_keys(&self) -> Vec<FieldKey>;

    fn field(&self, key: FieldKey) -> Option<FieldValue>;

    /// Returns `false` when the key is unknown or the value has the wrong type.
    fn set_field(&mut self, key: FieldKey, value: FieldValue) -> bool;

    fn to_map(&self) -> BTreeMap<FieldKey, FieldValue> {
        self.field_keys()
            .into_iter()
            .filter_map(|key| self.field(key).map(|value| (key, value)))
            .collect()
    }
}

impl FormValues for BTreeMap<FieldKey, FieldValue> {
    type Fields = ();

    fn fields() -> Self::Fields {}

    fn field_keys(&self) -> Vec<FieldKey> {
        self.keys().copied().collect()
    }

    fn field(&self, key: FieldKey) -> Option<FieldValue> {
        self.get(&key).cloned()
    }

    fn set_field(&mut self, key: FieldKey, value: FieldValue) -> bool {
        self.insert(key, value);
        true
    }
}

pub type FieldErrors = BTreeMap<FieldKey, String>;

pub type FormPatch = BTreeMap<FieldKey, FieldValue>;
