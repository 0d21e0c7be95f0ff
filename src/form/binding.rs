use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, trace};

use super::controller::{
    FormError, FormHandler, FormIdentity, FormResult, SetValueProps, read_lock, write_lock,
};
use super::debounce::{DEFAULT_WAIT, DebounceHandle, Debouncer};
use super::engine::{FormEngine, SchemaEngine};
use super::values::{FieldKey, FieldValue, FormValues};

/// Resolves to `true` when the write reached the form, `false` when it was superseded,
/// canceled or had no form to write to. The write only happens while the future is
/// polled: dropping it unpolled loses the write.
pub type PendingWrite = Pin<Box<dyn Future<Output = FormResult<bool>> + Send + 'static>>;
pub type ChangeHandler = Arc<dyn Fn(FieldValue) -> PendingWrite + Send + Sync>;
pub type BlurHandler = Arc<dyn Fn() -> PendingWrite + Send + Sync>;

pub trait BindableInput: Sized {
    fn value(self, value: FieldValue) -> Self;
    fn error(self, invalid: bool) -> Self;
    fn helper_text(self, text: impl Into<String>) -> Self;
    fn on_change(self, handler: ChangeHandler) -> Self;
    fn on_blur(self, handler: BlurHandler) -> Self;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingPhase {
    Unbound,
    Seeding,
    Active,
    TornDown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BindingOptions {
    pub change_wait: Duration,
    pub blur_wait: Duration,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            change_wait: DEFAULT_WAIT,
            blur_wait: DEFAULT_WAIT,
        }
    }
}

pub struct BindingProps<T, E = SchemaEngine<T>>
where
    T: FormValues,
    E: FormEngine<T>,
{
    pub name: FieldKey,
    pub formhandler: Option<FormHandler<T, E>>,
    pub value: Option<FieldValue>,
    pub error: Option<bool>,
    pub helper_text: Option<String>,
}

impl<T, E> Clone for BindingProps<T, E>
where
    T: FormValues,
    E: FormEngine<T>,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            formhandler: self.formhandler.clone(),
            value: self.value.clone(),
            error: self.error,
            helper_text: self.helper_text.clone(),
        }
    }
}

impl<T, E> BindingProps<T, E>
where
    T: FormValues,
    E: FormEngine<T>,
{
    pub fn new(name: impl Into<FieldKey>) -> Self {
        Self {
            name: name.into(),
            formhandler: None,
            value: None,
            error: None,
            helper_text: None,
        }
    }

    pub fn formhandler(mut self, handler: FormHandler<T, E>) -> Self {
        self.formhandler = Some(handler);
        self
    }

    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn error(mut self, invalid: bool) -> Self {
        self.error = Some(invalid);
        self
    }

    pub fn helper_text(mut self, text: impl Into<String>) -> Self {
        self.helper_text = Some(text.into());
        self
    }
}

pub struct FieldBinding<T, E = SchemaEngine<T>>
where
    T: FormValues,
    E: FormEngine<T>,
{
    props: BindingProps<T, E>,
    identity: Option<FormIdentity>,
    seeded: Arc<AtomicBool>,
    torn_down: bool,
    local: Arc<RwLock<FieldValue>>,
    change: Debouncer,
    blur: Debouncer,
}

impl<T, E> FieldBinding<T, E>
where
    T: FormValues,
    E: FormEngine<T>,
{
    pub fn new(props: BindingProps<T, E>, options: BindingOptions) -> Self {
        let local = props.value.clone().unwrap_or_default();
        Self {
            props,
            identity: None,
            seeded: Arc::new(AtomicBool::new(false)),
            torn_down: false,
            local: Arc::new(RwLock::new(local)),
            change: Debouncer::new(options.change_wait),
            blur: Debouncer::new(options.blur_wait),
        }
    }

    pub fn name(&self) -> FieldKey {
        self.props.name
    }

    pub fn props(&self) -> &BindingProps<T, E> {
        &self.props
    }

    pub fn phase(&self) -> BindingPhase {
        if self.torn_down {
            BindingPhase::TornDown
        } else if self.props.formhandler.is_none() {
            BindingPhase::Unbound
        } else if self.identity.is_some() && self.seeded.load(Ordering::SeqCst) {
            BindingPhase::Active
        } else {
            BindingPhase::Seeding
        }
    }

    pub fn has_pending_change(&self) -> bool {
        self.change.is_pending()
    }

    // Pending debounced writes are canceled before re-seeding.
    pub fn sync(&mut self) -> FormResult<Option<PendingWrite>> {
        if self.torn_down {
            return Ok(None);
        }
        let Some(handler) = self.props.formhandler.clone() else {
            return Ok(None);
        };
        let identity = handler.form_identity()?;
        if self.identity == Some(identity) {
            return Ok(None);
        }

        self.change.cancel();
        self.blur.cancel();
        self.identity = Some(identity);

        let name = self.props.name;
        let current = handler.field_value(name)?.unwrap_or_default();
        let seed = self.props.value.clone().filter(|value| *value != current);
        *write_lock(&self.local, "seeding local field value")? =
            seed.clone().unwrap_or(current);

        let Some(value) = seed else {
            self.seeded.store(true, Ordering::SeqCst);
            trace!(field = %name, revision = identity.revision, "field synced with form");
            return Ok(None);
        };

        debug!(field = %name, revision = identity.revision, "seeding field into form");
        self.seeded.store(false, Ordering::SeqCst);
        let seeded = self.seeded.clone();
        let live = self.change.handle();
        Ok(Some(Box::pin(async move {
            if live.is_closed() || handler.form_identity()? != identity {
                return Ok(false);
            }
            handler.seed_value(name, value).await?;
            seeded.store(true, Ordering::SeqCst);
            Ok(true)
        })))
    }

    // Handlers and seed effects handed out before the rebind keep the old debouncers
    // and slots, so replacing them here leaves those handlers inert.
    pub fn set_props(&mut self, props: BindingProps<T, E>) {
        if self.torn_down {
            self.props = props;
            return;
        }
        self.change = Debouncer::new(self.change.wait());
        self.blur = Debouncer::new(self.blur.wait());
        self.local = Arc::new(RwLock::new(props.value.clone().unwrap_or_default()));
        self.seeded = Arc::new(AtomicBool::new(false));
        self.identity = None;
        trace!(from = %self.props.name, to = %props.name, "field binding rebound");
        self.props = props;
    }

    pub fn value(&self) -> FormResult<FieldValue> {
        let local = read_lock(&self.local, "reading local field value")?.clone();
        match &self.props.formhandler {
            Some(handler)
                if self.phase() == BindingPhase::Active && !self.change.is_pending() =>
            {
                Ok(handler.field_value(self.props.name)?.unwrap_or(local))
            }
            _ => Ok(local),
        }
    }

    pub fn error(&self) -> FormResult<Option<bool>> {
        match &self.props.formhandler {
            Some(handler) => Ok(Some(handler.field_state(self.props.name)?.invalid)),
            None => Ok(self.props.error),
        }
    }

    pub fn helper_text(&self) -> FormResult<Option<String>> {
        match &self.props.formhandler {
            Some(handler) => Ok(Some(handler.field_state(self.props.name)?.error_message)),
            None => Ok(self.props.helper_text.clone()),
        }
    }

    pub fn on_change_handler(&self) -> ChangeHandler {
        let local = self.local.clone();
        let debounce = self.change.handle();
        let handler = self.props.formhandler.clone();
        let name = self.props.name;
        Arc::new(move |value: FieldValue| {
            schedule_change(&local, &debounce, handler.as_ref(), name, value)
        })
    }

    pub fn on_blur_handler(&self) -> BlurHandler {
        let local = self.local.clone();
        let debounce = self.blur.handle();
        let handler = self.props.formhandler.clone();
        let name = self.props.name;
        Arc::new(move || schedule_blur(&local, &debounce, handler.as_ref(), name))
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.change.close();
        self.blur.close();
        self.torn_down = true;
        trace!(field = %self.props.name, "field binding torn down");
    }
}

fn schedule_change<T, E>(
    local: &Arc<RwLock<FieldValue>>,
    debounce: &DebounceHandle,
    handler: Option<&FormHandler<T, E>>,
    name: FieldKey,
    value: FieldValue,
) -> PendingWrite
where
    T: FormValues,
    E: FormEngine<T>,
{
    match write_lock(local, "storing local field value") {
        Ok(mut slot) => *slot = value.clone(),
        Err(error) => return failed(error),
    }
    let Some(handler) = handler.cloned() else {
        return Box::pin(async { Ok(false) });
    };

    let call = debounce.call(move || async move {
        handler
            .set_form_value(SetValueProps::new(name, value))
            .await
    });
    Box::pin(async move {
        match call.await {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    })
}

fn schedule_blur<T, E>(
    local: &Arc<RwLock<FieldValue>>,
    debounce: &DebounceHandle,
    handler: Option<&FormHandler<T, E>>,
    name: FieldKey,
) -> PendingWrite
where
    T: FormValues,
    E: FormEngine<T>,
{
    let Some(handler) = handler.cloned() else {
        return Box::pin(async { Ok(false) });
    };

    let local = local.clone();
    let call = debounce.call(move || async move {
        let value = read_lock(&local, "reading field value on blur")?.clone();
        handler
            .set_form_value(SetValueProps::new(name, value))
            .await
    });
    Box::pin(async move {
        match call.await {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    })
}

fn failed(error: FormError) -> PendingWrite {
    Box::pin(async move { Err(error) })
}

#[derive(Clone, Debug)]
pub struct BaseField<C> {
    component: C,
    kind: &'static str,
}

pub fn with_base_field<C>(component: C, kind: &'static str) -> BaseField<C>
where
    C: BindableInput + Clone,
{
    BaseField { component, kind }
}

impl<C> BaseField<C>
where
    C: BindableInput + Clone,
{
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn bind<T, E>(
        &self,
        props: BindingProps<T, E>,
        options: BindingOptions,
    ) -> BoundField<C, T, E>
    where
        T: FormValues,
        E: FormEngine<T>,
    {
        BoundField {
            template: self.component.clone(),
            kind: self.kind,
            binding: FieldBinding::new(props, options),
        }
    }
}

pub struct Rendered<C> {
    pub component: C,
    pub effect: Option<PendingWrite>,
}

pub struct BoundField<C, T, E = SchemaEngine<T>>
where
    T: FormValues,
    E: FormEngine<T>,
{
    template: C,
    kind: &'static str,
    binding: FieldBinding<T, E>,
}

impl<C, T, E> BoundField<C, T, E>
where
    C: BindableInput + Clone,
    T: FormValues,
    E: FormEngine<T>,
{
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn binding(&self) -> &FieldBinding<T, E> {
        &self.binding
    }

    pub fn set_props(&mut self, props: BindingProps<T, E>) {
        self.binding.set_props(props);
    }

    pub fn render(&mut self) -> FormResult<Rendered<C>> {
        let effect = self.binding.sync()?;
        trace!(field = %self.binding.name(), kind = self.kind, "rendering bound field");

        let mut component = self
            .template
            .clone()
            .value(self.binding.value()?)
            .on_change(self.binding.on_change_handler())
            .on_blur(self.binding.on_blur_handler());
        if let Some(invalid) = self.binding.error()? {
            component = component.error(invalid);
        }
        if let Some(text) = self.binding.helper_text()? {
            component = component.helper_text(text);
        }
        Ok(Rendered { component, effect })
    }

    pub fn unmount(mut self) {
        self.binding.teardown();
    }
}
