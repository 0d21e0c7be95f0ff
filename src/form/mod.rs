mod binding;
mod controller;
mod debounce;
mod debug;
mod engine;
mod validation;
mod values;


pub use binding::{
    BaseField, BindableInput, BindingOptions, BindingPhase, BindingProps, BlurHandler, BoundField,
    ChangeHandler, FieldBinding, PendingWrite, Rendered, with_base_field,
};
pub use controller::{
    ClearErrors, DebugModeState, FieldState, FormError, FormHandler, FormHandlerProps, FormId,
    FormIdentity, FormOptions, FormResult, FormState, SetValueProps, SubmitState,
};
pub use debounce::{DEFAULT_WAIT, DebounceHandle, DebounceTicket, DebouncedCall, Debouncer};
pub use debug::DebugSnapshot;
pub use engine::{EngineFuture, FormEngine, SchemaEngine, SubmitHandler};
pub use fieldsync_derive::FormValues;
pub use validation::{FieldRule, FieldSchema, Schema, rules};
pub use values::{FieldErrors, FieldKey, FieldType, FieldValue, FormPatch, FormValues};
