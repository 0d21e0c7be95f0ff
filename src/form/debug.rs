use std::fmt::{Display, Formatter};

use serde::Serialize;

use super::controller::{FormError, FormHandler, FormResult};
use super::engine::FormEngine;
use super::values::FormValues;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebugSnapshot {
    pub initial_values: String,
    pub current_state: String,
    pub is_valid: bool,
    pub errors: String,
    pub has_been_updated: bool,
}

impl DebugSnapshot {
    pub fn capture<T, E>(handler: &FormHandler<T, E>) -> FormResult<Self>
    where
        T: FormValues,
        E: FormEngine<T>,
    {
        let state = handler.debug_mode()?;
        Ok(Self {
            initial_values: to_json(&state.initial_values.to_map())?,
            current_state: to_json(&state.current_values.to_map())?,
            is_valid: state.is_form_valid,
            errors: to_json(&state.errors)?,
            has_been_updated: state.has_been_updated,
        })
    }
}

impl Display for DebugSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DEBUG MODE")?;
        writeln!(f, "Initial Values: {}", self.initial_values)?;
        writeln!(f, "Current State: {}", self.current_state)?;
        writeln!(f, "Valid Data: {}", self.is_valid)?;
        writeln!(f, "Errors: {}", self.errors)?;
        write!(f, "Form Has Been Updated: {}", self.has_been_updated)
    }
}

fn to_json<S: Serialize>(value: &S) -> FormResult<String> {
    serde_json::to_string(value).map_err(|error| FormError::Snapshot(error.to_string()))
}
