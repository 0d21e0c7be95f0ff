use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::engine::{FormEngine, SchemaEngine, SubmitHandler};
use super::validation::Schema;
use super::values::{FieldErrors, FieldKey, FieldValue, FormPatch, FormValues};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

/// Changes whenever the engine's values are replaced wholesale (reset, `set_values`,
/// reinitialization). Single field writes keep the identity stable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormIdentity {
    pub form: FormId,
    pub revision: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_on_change: bool,
    pub validate_on_blur: bool,
    pub validate_first_error_only: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_on_change: true,
            validate_on_blur: true,
            validate_first_error_only: true,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    SchemaMismatch { field: FieldKey },
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    SubmitFailed(String),
    Snapshot(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::SchemaMismatch { field } => {
                write!(f, "validation schema describes unknown field `{field}`")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::SubmitFailed(error) => write!(f, "form submit failed: {error}"),
            FormError::Snapshot(error) => write!(f, "failed to render debug snapshot: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub struct FormHandlerProps<T>
where
    T: FormValues,
{
    pub initial_values: T,
    pub validation_schema: Schema<T>,
    pub on_submit: SubmitHandler<T>,
    pub options: FormOptions,
}

impl<T> FormHandlerProps<T>
where
    T: FormValues,
{
    pub fn new(
        initial_values: T,
        validation_schema: Schema<T>,
        on_submit: impl Fn(&T) -> FormResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            initial_values,
            validation_schema,
            on_submit: Arc::new(on_submit),
            options: FormOptions::default(),
        }
    }

    pub fn options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetValueProps {
    pub field: FieldKey,
    pub value: FieldValue,
    pub should_validate: bool,
}

impl SetValueProps {
    pub fn new(field: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            should_validate: true,
        }
    }

    pub fn should_validate(mut self, value: bool) -> Self {
        self.should_validate = value;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClearErrors {
    Field(FieldKey),
    Replace(FieldErrors),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormState<T> {
    pub initial_values: T,
    pub current_values: T,
    pub is_form_valid: bool,
    pub errors: FieldErrors,
    pub has_been_updated: bool,
}

pub type DebugModeState<T> = FormState<T>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldState {
    pub invalid: bool,
    pub error_message: String,
}

pub struct FormHandler<T, E = SchemaEngine<T>>
where
    T: FormValues,
    E: FormEngine<T>,
{
    engine: Arc<E>,
    manual_validation: Arc<AtomicBool>,
    _values: PhantomData<fn() -> T>,
}

impl<T, E> Clone for FormHandler<T, E>
where
    T: FormValues,
    E: FormEngine<T>,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            manual_validation: self.manual_validation.clone(),
            _values: PhantomData,
        }
    }
}

impl<T> FormHandler<T>
where
    T: FormValues,
{
    pub fn new(props: FormHandlerProps<T>) -> FormResult<Self> {
        Ok(Self::with_engine(SchemaEngine::new(props)?))
    }
}

impl<T, E> FormHandler<T, E>
where
    T: FormValues,
    E: FormEngine<T>,
{
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            manual_validation: Arc::new(AtomicBool::new(false)),
            _values: PhantomData,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_manual_validation_triggered(&self) -> bool {
        self.manual_validation.load(Ordering::SeqCst)
    }

    // The touch must start after the value write completes.
    pub async fn set_form_value(&self, props: SetValueProps) -> FormResult<()> {
        let SetValueProps {
            field,
            value,
            should_validate,
        } = props;
        debug!(field = %field, should_validate, "setting form value");
        self.engine
            .set_field_value(field, value, should_validate)
            .await?;
        self.engine.set_field_touched(field, true, false).await
    }

    pub fn form_state(&self) -> FormResult<FormState<T>> {
        let initial_values = self.engine.initial_values()?;
        let current_values = self.engine.values()?;
        let has_errors = !self.engine.is_valid()?;
        let has_been_updated = initial_values != current_values;
        Ok(FormState {
            initial_values,
            current_values,
            is_form_valid: !has_errors,
            errors: self.engine.errors()?,
            has_been_updated,
        })
    }

    pub fn field_state(&self, field: impl Into<FieldKey>) -> FormResult<FieldState> {
        let field = field.into();
        let errors = self.engine.errors()?;
        let has_error = errors.contains_key(&field);
        let invalid = if self.is_manual_validation_triggered() {
            has_error
        } else {
            has_error && self.engine.touched()?.contains(&field)
        };
        let error_message = if invalid {
            errors.get(&field).cloned().unwrap_or_default()
        } else {
            String::new()
        };
        Ok(FieldState {
            invalid,
            error_message,
        })
    }

    pub fn field_value(&self, field: impl Into<FieldKey>) -> FormResult<Option<FieldValue>> {
        Ok(self.engine.values()?.field(field.into()))
    }

    pub fn form_identity(&self) -> FormResult<FormIdentity> {
        self.engine.identity()
    }

    // The argument-specific steps never survive: every path ends in a full clear.
    pub fn clear_errors(&self, input: Option<ClearErrors>) -> FormResult<()> {
        match input {
            Some(ClearErrors::Field(field)) => self.engine.set_field_error(field, String::new())?,
            Some(ClearErrors::Replace(errors)) => self.engine.set_errors(errors)?,
            None => {}
        }
        self.engine.set_errors(FieldErrors::new())
    }

    pub fn reset_form(&self, next: Option<FormPatch>) -> FormResult<()> {
        self.clear_errors(None)?;
        self.manual_validation.store(false, Ordering::SeqCst);

        let Some(patch) = next else {
            debug!("resetting form to initial values");
            let initial_values = self.engine.initial_values()?;
            return self.engine.reset_form(initial_values);
        };

        debug!(fields = patch.len(), "merging values over current form state");
        let mut merged = self.engine.values()?;
        for (field, value) in patch {
            if !merged.set_field(field, value) {
                warn!(field = %field, "reset patch names a field the form cannot hold");
            }
        }
        self.engine.set_values(merged, true)
    }

    pub async fn trigger_validation(&self, field: Option<FieldKey>) -> FormResult<()> {
        self.manual_validation.store(true, Ordering::SeqCst);
        match field {
            Some(field) => {
                debug!(field = %field, "validating field on request");
                self.engine.validate_field(field).await
            }
            None => {
                debug!("validating form on request");
                self.engine.validate_form().await
            }
        }
    }

    pub async fn on_submit_handler(&self) -> FormResult<SubmitState> {
        self.engine.handle_submit().await
    }

    // Negates an already normalized flag, so this reports the opposite of
    // `form_state().is_form_valid`. Kept as observable behavior.
    pub fn debug_mode(&self) -> FormResult<DebugModeState<T>> {
        let state = self.form_state()?;
        Ok(DebugModeState {
            is_form_valid: !state.is_form_valid,
            ..state
        })
    }

    pub async fn seed_value(&self, field: FieldKey, value: FieldValue) -> FormResult<()> {
        debug!(field = %field, "seeding field value");
        self.engine.set_field_value(field, value, false).await
    }

    pub fn reinitialize(&self, initial_values: T) -> FormResult<bool> {
        let changed = self.engine.reinitialize(initial_values)?;
        if changed {
            debug!("form reinitialized with new initial values");
            self.manual_validation.store(false, Ordering::SeqCst);
        }
        Ok(changed)
    }
}

pub(super) fn transition_submit_state(
    current: &mut SubmitState,
    next: SubmitState,
) -> FormResult<()> {
    if *current == next {
        return Ok(());
    }

    let allowed = matches!(
        (*current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Failed)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: *current,
            to: next,
        });
    }
    *current = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
