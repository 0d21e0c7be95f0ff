pub use crate::form::{
    BindableInput, BindingOptions, BindingProps, ClearErrors, FieldKey, FieldSchema, FieldState,
    FieldValue, FormEngine, FormError, FormHandler, FormHandlerProps, FormResult, FormState,
    FormValues, Schema, SetValueProps, with_base_field,
};
