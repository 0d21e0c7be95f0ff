use std::collections::BTreeMap;
use std::sync::Arc;

use super::controller::{FormError, FormResult};
use super::values::{FieldErrors, FieldKey, FieldValue, FormValues};

pub trait FieldRule<T>: Send + Sync {
    fn check(&self, value: &FieldValue, values: &T) -> Result<(), String>;
}

impl<T, F> FieldRule<T> for F
where
    F: Fn(&FieldValue, &T) -> Result<(), String> + Send + Sync,
{
    fn check(&self, value: &FieldValue, values: &T) -> Result<(), String> {
        (self)(value, values)
    }
}

pub struct FieldSchema<T> {
    rules: Vec<Arc<dyn FieldRule<T>>>,
}

impl<T> Clone for FieldSchema<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<T> Default for FieldSchema<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T: 'static> FieldSchema<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: impl FieldRule<T> + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn required(self, message: impl Into<String>) -> Self {
        self.rule(rules::required(message))
    }

    pub fn min_length(self, min: usize, message: impl Into<String>) -> Self {
        self.rule(rules::min_length(min, message))
    }

    fn check(&self, value: &FieldValue, values: &T, first_error_only: bool) -> Option<String> {
        let mut messages = Vec::new();
        for rule in &self.rules {
            if let Err(message) = rule.check(value, values) {
                messages.push(message);
                if first_error_only {
                    break;
                }
            }
        }
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}

pub struct Schema<T> {
    fields: BTreeMap<FieldKey, FieldSchema<T>>,
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
        }
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }
}

impl<T> Schema<T>
where
    T: FormValues,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<FieldKey>, schema: FieldSchema<T>) -> Self {
        self.fields.insert(key.into(), schema);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn check_shape(&self, values: &T) -> FormResult<()> {
        match self.keys().find(|key| values.field(*key).is_none()) {
            Some(field) => Err(FormError::SchemaMismatch { field }),
            None => Ok(()),
        }
    }

    pub fn validate_field(
        &self,
        key: FieldKey,
        values: &T,
        first_error_only: bool,
    ) -> Option<String> {
        let schema = self.fields.get(&key)?;
        let value = values.field(key).unwrap_or_default();
        schema.check(&value, values, first_error_only)
    }

    pub fn validate(&self, values: &T, first_error_only: bool) -> FieldErrors {
        self.keys()
            .filter_map(|key| {
                self.validate_field(key, values, first_error_only)
                    .map(|message| (key, message))
            })
            .collect()
    }
}

pub mod rules {
    use super::FieldRule;
    use crate::form::values::FieldValue;

    pub fn required<T: 'static>(message: impl Into<String>) -> impl FieldRule<T> + 'static {
        required_with(message.into())
    }

    pub fn min_length<T: 'static>(
        min: usize,
        message: impl Into<String>,
    ) -> impl FieldRule<T> + 'static {
        min_length_with(min, message.into())
    }

    fn required_with<T: 'static>(message: String) -> impl FieldRule<T> + 'static {
        move |value: &FieldValue, _values: &T| {
            if value.is_empty() {
                Err(message.clone())
            } else {
                Ok(())
            }
        }
    }

    fn min_length_with<T: 'static>(min: usize, message: String) -> impl FieldRule<T> + 'static {
        move |value: &FieldValue, _values: &T| match value.as_text() {
            Some(text) if text.chars().count() < min => Err(message.clone()),
            _ => Ok(()),
        }
    }
}
