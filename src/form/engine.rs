use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::controller::{
    FormError, FormHandlerProps, FormId, FormIdentity, FormOptions, FormResult, SubmitState,
    read_lock, transition_submit_state, write_lock,
};
use super::validation::Schema;
use super::values::{FieldErrors, FieldKey, FieldValue, FormValues};

pub type EngineFuture<'a, R = ()> = Pin<Box<dyn Future<Output = FormResult<R>> + Send + 'a>>;

pub type SubmitHandler<T> = Arc<dyn Fn(&T) -> FormResult<()> + Send + Sync>;

pub trait FormEngine<T>: Send + Sync + 'static
where
    T: FormValues,
{
    fn set_field_value(&self, key: FieldKey, value: FieldValue, validate: bool)
    -> EngineFuture<'_>;

    fn set_field_touched(&self, key: FieldKey, touched: bool, validate: bool) -> EngineFuture<'_>;

    /// An empty message removes the field's error.
    fn set_field_error(&self, key: FieldKey, message: String) -> FormResult<()>;

    fn set_errors(&self, errors: FieldErrors) -> FormResult<()>;

    fn validate_field(&self, key: FieldKey) -> EngineFuture<'_>;

    fn validate_form(&self) -> EngineFuture<'_>;

    fn set_values(&self, values: T, validate: bool) -> FormResult<()>;

    fn reset_form(&self, values: T) -> FormResult<()>;

    fn reinitialize(&self, initial_values: T) -> FormResult<bool>;

    fn handle_submit(&self) -> EngineFuture<'_, SubmitState>;

    fn values(&self) -> FormResult<T>;

    fn initial_values(&self) -> FormResult<T>;

    fn errors(&self) -> FormResult<FieldErrors>;

    fn touched(&self) -> FormResult<BTreeSet<FieldKey>>;

    fn is_valid(&self) -> FormResult<bool>;

    fn identity(&self) -> FormResult<FormIdentity>;
}

struct EngineState<T> {
    id: FormId,
    revision: u64,
    initial_values: T,
    values: T,
    touched: BTreeSet<FieldKey>,
    errors: FieldErrors,
    submit_state: SubmitState,
    submit_count: u32,
}

impl<T> EngineState<T> {
    fn replace_values(&mut self, values: T) {
        self.values = values;
        self.revision = self.revision.saturating_add(1);
    }
}

#[derive(Clone)]
pub struct SchemaEngine<T>
where
    T: FormValues,
{
    options: FormOptions,
    schema: Arc<Schema<T>>,
    on_submit: SubmitHandler<T>,
    state: Arc<RwLock<EngineState<T>>>,
}

impl<T> SchemaEngine<T>
where
    T: FormValues,
{
    pub fn new(props: FormHandlerProps<T>) -> FormResult<Self> {
        let FormHandlerProps {
            initial_values,
            validation_schema,
            on_submit,
            options,
        } = props;
        validation_schema.check_shape(&initial_values)?;

        Ok(Self {
            options,
            schema: Arc::new(validation_schema),
            on_submit,
            state: Arc::new(RwLock::new(EngineState {
                id: FormId::next(),
                revision: 0,
                initial_values: initial_values.clone(),
                values: initial_values,
                touched: BTreeSet::new(),
                errors: FieldErrors::new(),
                submit_state: SubmitState::Idle,
                submit_count: 0,
            })),
        })
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    fn run_field_validation(&self, key: FieldKey) -> FormResult<()> {
        let values = read_lock(&self.state, "reading values for field validation")?
            .values
            .clone();
        let result =
            self.schema
                .validate_field(key, &values, self.options.validate_first_error_only);

        let mut state = write_lock(&self.state, "writing field validation result")?;
        match result {
            Some(message) => {
                state.errors.insert(key, message);
            }
            None => {
                state.errors.remove(&key);
            }
        }
        Ok(())
    }

    fn run_form_validation(&self) -> FormResult<bool> {
        let values = read_lock(&self.state, "reading values for form validation")?
            .values
            .clone();
        let errors = self
            .schema
            .validate(&values, self.options.validate_first_error_only);
        let is_valid = errors.is_empty();

        write_lock(&self.state, "writing form validation result")?.errors = errors;
        Ok(is_valid)
    }

    fn knows_field(&self, key: FieldKey) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking field key")?
            .values
            .field(key)
            .is_some())
    }
}

impl<T> FormEngine<T> for SchemaEngine<T>
where
    T: FormValues,
{
    fn set_field_value(
        &self,
        key: FieldKey,
        value: FieldValue,
        validate: bool,
    ) -> EngineFuture<'_> {
        Box::pin(async move {
            let written = write_lock(&self.state, "writing field value")?
                .values
                .set_field(key, value);
            if !written {
                warn!(field = %key, "ignoring value for unknown field or mismatched type");
                return Ok(());
            }
            if validate {
                self.run_form_validation()?;
            }
            Ok(())
        })
    }

    fn set_field_touched(&self, key: FieldKey, touched: bool, validate: bool) -> EngineFuture<'_> {
        Box::pin(async move {
            if !self.knows_field(key)? {
                warn!(field = %key, "ignoring touched flag for unknown field");
                return Ok(());
            }
            {
                let mut state = write_lock(&self.state, "writing touched flag")?;
                if touched {
                    state.touched.insert(key);
                } else {
                    state.touched.remove(&key);
                }
            }
            if validate && self.options.validate_on_blur {
                self.run_form_validation()?;
            }
            Ok(())
        })
    }

    fn set_field_error(&self, key: FieldKey, message: String) -> FormResult<()> {
        let mut state = write_lock(&self.state, "writing field error")?;
        if message.is_empty() {
            state.errors.remove(&key);
        } else {
            state.errors.insert(key, message);
        }
        Ok(())
    }

    fn set_errors(&self, mut errors: FieldErrors) -> FormResult<()> {
        errors.retain(|_, message| !message.is_empty());
        write_lock(&self.state, "replacing errors")?.errors = errors;
        Ok(())
    }

    fn validate_field(&self, key: FieldKey) -> EngineFuture<'_> {
        Box::pin(async move { self.run_field_validation(key) })
    }

    fn validate_form(&self) -> EngineFuture<'_> {
        Box::pin(async move { self.run_form_validation().map(|_| ()) })
    }

    fn set_values(&self, values: T, validate: bool) -> FormResult<()> {
        write_lock(&self.state, "replacing values")?.replace_values(values);
        if validate && self.options.validate_on_change {
            self.run_form_validation()?;
        }
        Ok(())
    }

    fn reset_form(&self, values: T) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.initial_values = values.clone();
        state.replace_values(values);
        state.touched.clear();
        state.errors.clear();
        state.submit_count = 0;
        transition_submit_state(&mut state.submit_state, SubmitState::Idle)
    }

    fn reinitialize(&self, initial_values: T) -> FormResult<bool> {
        if read_lock(&self.state, "comparing initial values")?.initial_values == initial_values {
            return Ok(false);
        }
        self.reset_form(initial_values)?;
        Ok(true)
    }

    fn handle_submit(&self) -> EngineFuture<'_, SubmitState> {
        Box::pin(async move {
            {
                let mut state = write_lock(&self.state, "preparing submit")?;
                if state.submit_state == SubmitState::Submitting {
                    return Err(FormError::AlreadySubmitting);
                }
                transition_submit_state(&mut state.submit_state, SubmitState::Validating)?;
                state.submit_count = state.submit_count.saturating_add(1);
                let keys = state.values.field_keys();
                state.touched.extend(keys);
            }

            if !self.run_form_validation()? {
                let mut state = write_lock(&self.state, "handling submit validation failure")?;
                transition_submit_state(&mut state.submit_state, SubmitState::Failed)?;
                debug!(errors = state.errors.len(), "submit blocked by validation errors");
                return Ok(SubmitState::Failed);
            }

            let values = {
                let mut state = write_lock(&self.state, "moving submit state to submitting")?;
                transition_submit_state(&mut state.submit_state, SubmitState::Submitting)?;
                state.values.clone()
            };
            let result = (self.on_submit)(&values);

            let mut state = write_lock(&self.state, "completing submit")?;
            match result {
                Ok(()) => {
                    transition_submit_state(&mut state.submit_state, SubmitState::Succeeded)?;
                    Ok(SubmitState::Succeeded)
                }
                Err(error) => {
                    transition_submit_state(&mut state.submit_state, SubmitState::Failed)?;
                    Err(error)
                }
            }
        })
    }

    fn values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading values")?.values.clone())
    }

    fn initial_values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading initial values")?
            .initial_values
            .clone())
    }

    fn errors(&self) -> FormResult<FieldErrors> {
        Ok(read_lock(&self.state, "reading errors")?.errors.clone())
    }

    fn touched(&self) -> FormResult<BTreeSet<FieldKey>> {
        Ok(read_lock(&self.state, "reading touched fields")?.touched.clone())
    }

    fn is_valid(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading validity")?.errors.is_empty())
    }

    fn identity(&self) -> FormResult<FormIdentity> {
        let state = read_lock(&self.state, "reading form identity")?;
        Ok(FormIdentity {
            form: state.id,
            revision: state.revision,
        })
    }
}
