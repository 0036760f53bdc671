//! Argument validation against a tool's schema.
//!
//! Runs field-by-field before a handler is ever invoked, so handlers can
//! assume well-formed input: required fields are present, types match,
//! declared defaults are filled in, and enum constraints hold. The first
//! violation aborts validation and names the offending field.

use serde_json::{Map, Value};
use thiserror::Error;

use super::descriptor::{ArgumentSchema, FieldKind};

/// What to do with argument fields the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Silently drop unknown fields (the permissive default).
    #[default]
    Ignore,
    /// Fail the call when an unknown field is present.
    Reject,
}

/// A schema violation, naming the field that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The arguments were not a JSON object.
    #[error("arguments must be an object, got {got}")]
    NotAnObject {
        /// JSON type actually received.
        got: &'static str,
    },

    /// A required field was absent.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Name of the absent field.
        field: String,
    },

    /// A field had the wrong JSON type.
    #[error("field `{field}` must be of type {expected}, got {got}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// Type the schema declares.
        expected: &'static str,
        /// JSON type actually received.
        got: &'static str,
    },

    /// A string field held a value outside its declared set.
    #[error("field `{field}` must be one of [{allowed}]")]
    NotInSet {
        /// Name of the offending field.
        field: String,
        /// Comma-separated allowed values.
        allowed: String,
    },

    /// A field the schema does not declare (under [`UnknownFieldPolicy::Reject`]).
    #[error("unknown field `{field}`")]
    UnknownField {
        /// Name of the undeclared field.
        field: String,
    },
}

/// Arguments that passed schema validation, with typed accessors.
///
/// Defaults declared by the schema are already substituted; accessors return
/// `None` only for optional fields that have no default and were absent.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArguments {
    values: Map<String, Value>,
}

impl ValidatedArguments {
    /// The raw value of a field.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// A string field.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// An integer field.
    #[must_use]
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// A number field (integers widen losslessly within `f64` range).
    #[must_use]
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// A boolean field.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// Number of present fields (including substituted defaults).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Checks `arguments` against `schema`, producing typed arguments or the
/// first violation encountered.
///
/// `null` arguments are treated as an empty object, matching clients that
/// omit the `arguments` member entirely for parameterless tools.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the offending field.
pub fn validate(
    schema: &ArgumentSchema,
    arguments: &Value,
    policy: UnknownFieldPolicy,
) -> Result<ValidatedArguments, ValidationError> {
    let empty = Map::new();
    let supplied = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::NotAnObject {
                got: json_type_name(other),
            })
        }
    };

    if policy == UnknownFieldPolicy::Reject {
        if let Some(unknown) = supplied.keys().find(|key| schema.field(key).is_none()) {
            return Err(ValidationError::UnknownField {
                field: unknown.clone(),
            });
        }
    }

    let mut values = Map::new();
    for field in &schema.fields {
        match supplied.get(&field.name) {
            Some(value) => {
                check_kind(&field.name, field.kind, value)?;
                if !field.one_of.is_empty() {
                    let text = value.as_str().unwrap_or_default();
                    if !field.one_of.iter().any(|allowed| allowed == text) {
                        return Err(ValidationError::NotInSet {
                            field: field.name.clone(),
                            allowed: field.one_of.join(", "),
                        });
                    }
                }
                values.insert(field.name.clone(), value.clone());
            }
            None => {
                if let Some(ref default) = field.default {
                    values.insert(field.name.clone(), default.clone());
                } else if field.required {
                    return Err(ValidationError::MissingField {
                        field: field.name.clone(),
                    });
                }
            }
        }
    }

    Ok(ValidatedArguments { values })
}

fn check_kind(name: &str, kind: FieldKind, value: &Value) -> Result<(), ValidationError> {
    let ok = match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
    };

    if ok {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            field: name.to_string(),
            expected: kind.type_name(),
            got: json_type_name(value),
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::descriptor::FieldSpec;

    fn schema() -> ArgumentSchema {
        ArgumentSchema::new(vec![
            FieldSpec::required("x", FieldKind::Integer),
            FieldSpec::optional("label", FieldKind::String).with_default(json!("none")),
            FieldSpec::optional("engine", FieldKind::String).one_of(["chromium", "firefox"]),
            FieldSpec::optional("ratio", FieldKind::Number),
        ])
    }

    #[test]
    fn accepts_well_formed_arguments() {
        let args = validate(
            &schema(),
            &json!({"x": 3, "engine": "firefox", "ratio": 0.5}),
            UnknownFieldPolicy::Ignore,
        )
        .unwrap();

        assert_eq!(args.i64("x"), Some(3));
        assert_eq!(args.str("engine"), Some("firefox"));
        assert_eq!(args.f64("ratio"), Some(0.5));
    }

    #[test]
    fn type_mismatch_names_the_field() {
        let err = validate(&schema(), &json!({"x": "abc"}), UnknownFieldPolicy::Ignore)
            .unwrap_err();

        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                field: "x".to_string(),
                expected: "integer",
                got: "string",
            }
        );
        assert!(err.to_string().contains("`x`"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = validate(&schema(), &json!({}), UnknownFieldPolicy::Ignore).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "x".to_string()
            }
        );
    }

    #[test]
    fn defaults_fill_absent_optional_fields() {
        let args = validate(&schema(), &json!({"x": 1}), UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(args.str("label"), Some("none"));
        // No default declared and absent: stays absent.
        assert_eq!(args.str("engine"), None);
        assert_eq!(args.f64("ratio"), None);
    }

    #[test]
    fn enum_constraint_is_enforced() {
        let err = validate(
            &schema(),
            &json!({"x": 1, "engine": "netscape"}),
            UnknownFieldPolicy::Ignore,
        )
        .unwrap_err();

        assert!(matches!(err, ValidationError::NotInSet { ref field, .. } if field == "engine"));
    }

    #[test]
    fn unknown_fields_ignored_by_default() {
        let args = validate(
            &schema(),
            &json!({"x": 1, "surprise": true}),
            UnknownFieldPolicy::Ignore,
        )
        .unwrap();
        assert_eq!(args.value("surprise"), None);
    }

    #[test]
    fn unknown_fields_rejected_under_strict_policy() {
        let err = validate(
            &schema(),
            &json!({"x": 1, "surprise": true}),
            UnknownFieldPolicy::Reject,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "surprise".to_string()
            }
        );
    }

    #[test]
    fn null_arguments_mean_empty_object() {
        let empty = ArgumentSchema::empty();
        let args = validate(&empty, &Value::Null, UnknownFieldPolicy::Reject).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = validate(&schema(), &json!([1, 2]), UnknownFieldPolicy::Ignore).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject { got: "array" });
    }

    #[test]
    fn integer_field_accepts_unsigned_json_numbers() {
        let args = validate(&schema(), &json!({"x": 9}), UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(args.i64("x"), Some(9));
    }

    #[test]
    fn number_field_rejects_strings() {
        let err = validate(
            &schema(),
            &json!({"x": 1, "ratio": "fast"}),
            UnknownFieldPolicy::Ignore,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "ratio"));
    }
}
