use fieldsync::form::{FieldKey, FieldValue, FormValues};

#[derive(Clone, PartialEq, fieldsync::form::FormValues)]
struct SignupForm {
    email: String,
    age: Option<i64>,
}

fn main() {
    let fields = SignupForm::fields();
    let mut values = SignupForm {
        email: "a@example.com".to_string(),
        age: None,
    };

    assert_eq!(fields.email().as_str(), "email");
    assert_eq!(values.field_keys(), vec![fields.email(), fields.age()]);
    assert!(values.set_field(fields.email(), FieldValue::from("b@example.com")));
    assert!(values.set_field(fields.age(), FieldValue::from(30_i64)));
    assert!(!values.set_field(FieldKey::new("unknown"), FieldValue::Null));
    assert_eq!(values.field(fields.email()), Some(FieldValue::from("b@example.com")));
    assert_eq!(values.age, Some(30));
}
