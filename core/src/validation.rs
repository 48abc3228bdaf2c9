//! Request-shape and field validation.
//!
//! [`FieldShapeValidator`] rejects undeclared keys. [`check_fields`] then
//! checks the declared ones: type, null and, on create, presence. Both
//! accumulate every offending field before failing.

use crate::error::{FieldErrors, LifecycleError, Result};
use crate::messages::{MessageKey, Translator};
use crate::resource::{
    FieldKind, ID_FIELD, LOCK_VERSION_FIELD, Resource, STATUS_FIELD, Scenario, field_spec,
    settable_fields,
};
use crate::status::Status;
use crate::Params;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Rejects requests carrying keys outside an allow-list.
///
/// `id` is routing metadata and is never checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShapeValidator {
    allowed: BTreeSet<&'static str>,
}

impl FieldShapeValidator {
    /// Validator for an explicit allow-list.
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Validator for `T` in `scenario`.
    #[must_use]
    pub fn for_resource<T: Resource>(scenario: Scenario) -> Self {
        Self {
            allowed: settable_fields::<T>(scenario),
        }
    }

    /// Whether `field` is settable.
    #[must_use]
    pub fn allows(&self, field: &str) -> bool {
        self.allowed.contains(field)
    }

    /// Requested keys outside the allow-list, in request order.
    #[must_use]
    pub fn offending<'p>(&self, params: &'p Params) -> Vec<&'p str> {
        params
            .keys()
            .map(String::as_str)
            .filter(|key| *key != ID_FIELD && !self.allowed.contains(key))
            .collect()
    }

    /// Fail with every undeclared key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ValidationFailed`] listing each offending key
    /// with a "not a valid parameter" message.
    pub fn check(&self, params: &Params, translator: &dyn Translator) -> Result<()> {
        let mut errors = FieldErrors::new();
        for field in self.offending(params) {
            errors.push(
                field,
                translator.translate(MessageKey::InvalidParameter, &[("field", field)]),
            );
        }
        errors.into_result(|errors| {
            tracing::debug!(fields = errors.len(), "request carries undeclared parameters");
            LifecycleError::validation(translator.translate(MessageKey::ValidationFailed, &[]), errors)
        })
    }
}

/// Check the values of declared fields.
///
/// Business fields are checked against their [`crate::FieldSpec`]; `status`
/// must be a known status code. On create, required fields must be present
/// and non-null.
///
/// # Errors
///
/// Returns [`LifecycleError::ValidationFailed`] listing every violation.
pub fn check_fields<T: Resource>(
    scenario: Scenario,
    params: &Params,
    translator: &dyn Translator,
) -> Result<()> {
    let mut errors = FieldErrors::new();

    for (field, value) in params {
        if field == STATUS_FIELD {
            if parse_status(value).is_none() {
                errors.push(
                    field.as_str(),
                    translator.translate(MessageKey::InvalidStatus, &[("field", field)]),
                );
            }
            continue;
        }
        let Some(spec) = field_spec::<T>(field) else {
            continue;
        };
        if value.is_null() {
            if !spec.nullable {
                errors.push(
                    field.as_str(),
                    translator.translate(MessageKey::FieldNotNull, &[("field", field)]),
                );
            }
        } else if !spec.kind.matches(value) {
            let message = if spec.kind == FieldKind::Array {
                translator.translate(MessageKey::FieldArray, &[("field", field)])
            } else {
                translator.translate(
                    MessageKey::FieldType,
                    &[("field", field), ("value", spec.kind.name())],
                )
            };
            errors.push(field.as_str(), message);
        }
    }

    if scenario == Scenario::Create {
        for spec in T::FIELDS.iter().filter(|spec| spec.required) {
            let missing = params.get(spec.name).is_none_or(Value::is_null);
            if missing && !errors.contains(spec.name) {
                errors.push(
                    spec.name,
                    translator.translate(MessageKey::FieldRequired, &[("field", spec.name)]),
                );
            }
        }
    }

    errors.into_result(|errors| {
        LifecycleError::validation(translator.translate(MessageKey::ValidationFailed, &[]), errors)
    })
}

/// Requested target status, if any.
///
/// Callers run [`check_fields`] first, so an unparseable value is treated as
/// absent.
#[must_use]
pub fn requested_status(params: &Params) -> Option<Status> {
    params.get(STATUS_FIELD).and_then(parse_status)
}

fn parse_status(value: &Value) -> Option<Status> {
    value.as_i64().and_then(Status::from_code)
}

/// Numeric record id carried by `params`.
///
/// Accepts a JSON integer or a string of digits (path segments arrive as
/// strings).
#[must_use]
pub fn record_id(params: &Params) -> Option<i64> {
    match params.get(ID_FIELD)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Whether `params` carries anything besides the routing id.
#[must_use]
pub fn has_payload(params: &Params) -> bool {
    params.keys().any(|key| key != ID_FIELD)
}

/// Overlay the declared business fields of `params` onto `attributes`.
///
/// Framework keys are never merged; the controller owns them.
pub fn merge_attributes<T: Resource>(attributes: &mut Map<String, Value>, params: &Params) {
    for (field, value) in params {
        if matches!(field.as_str(), ID_FIELD | STATUS_FIELD | LOCK_VERSION_FIELD) {
            continue;
        }
        if field_spec::<T>(field).is_some() {
            attributes.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::messages::MessageCatalog;
    use crate::resource::FieldSpec;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Widget {
        name: String,
        tags: Vec<String>,
        weight: Option<f64>,
    }

    impl Resource for Widget {
        const TABLE: &'static str = "widget";
        const LABEL: &'static str = "Widget";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::string("name").required().not_null(),
            FieldSpec::array("tags").not_null(),
            FieldSpec::number("weight"),
        ];
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn every_undeclared_key_is_reported() {
        let validator = FieldShapeValidator::for_resource::<Widget>(Scenario::Create);
        let request = params(json!({"id": 1, "name": "a", "bogusField": "x", "other": 2}));

        let err = validator.check(&request, &MessageCatalog::new()).unwrap_err();

        assert_eq!(err.status_code(), 422);
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["bogusField", "other"]);
        assert_eq!(err.field_errors()[0].message, "bogusField is not a valid parameter.");
    }

    #[test]
    fn lock_version_is_not_settable_on_create() {
        let validator = FieldShapeValidator::for_resource::<Widget>(Scenario::Create);
        let request = params(json!({"name": "a", "lockVersion": 1}));
        assert_eq!(validator.offending(&request), vec!["lockVersion"]);
    }

    #[test]
    fn declared_keys_pass() {
        let validator = FieldShapeValidator::for_resource::<Widget>(Scenario::Update);
        let request = params(json!({"id": "3", "name": "a", "lockVersion": 1, "status": 1}));
        assert!(validator.check(&request, &MessageCatalog::new()).is_ok());
    }

    #[test]
    fn field_checks_accumulate() {
        let request = params(json!({"tags": "nope", "weight": "heavy", "status": 42}));
        let err = check_fields::<Widget>(Scenario::Create, &request, &MessageCatalog::new())
            .unwrap_err();

        let errors = err.field_errors();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.field == "tags" && e.message == "tags must be an array."));
        assert!(errors.iter().any(|e| e.message == "weight must be of type number."));
        assert!(errors.iter().any(|e| e.field == "status"));
        assert!(errors.iter().any(|e| e.field == "name" && e.message == "name is required."));
    }

    #[test]
    fn required_only_on_create() {
        let request = params(json!({"weight": 2.5}));
        assert!(check_fields::<Widget>(Scenario::Update, &request, &MessageCatalog::new()).is_ok());
    }

    #[test]
    fn null_rejected_for_not_null_fields() {
        let request = params(json!({"name": null, "weight": null}));
        let err = check_fields::<Widget>(Scenario::Update, &request, &MessageCatalog::new())
            .unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].message, "name cannot be null.");
    }

    #[test]
    fn record_id_accepts_numbers_and_digit_strings() {
        assert_eq!(record_id(&params(json!({"id": 5}))), Some(5));
        assert_eq!(record_id(&params(json!({"id": "12"}))), Some(12));
        assert_eq!(record_id(&params(json!({"id": "abc"}))), None);
        assert_eq!(record_id(&params(json!({"id": 1.5}))), None);
        assert_eq!(record_id(&params(json!({}))), None);
    }

    #[test]
    fn merge_skips_framework_and_undeclared_keys() {
        let mut attributes = Map::new();
        attributes.insert("name".into(), json!("old"));
        let request = params(json!({"id": 1, "name": "new", "status": 1, "lockVersion": 2, "x": 1}));

        merge_attributes::<Widget>(&mut attributes, &request);

        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes["name"], "new");
    }

    #[test]
    fn payload_ignores_id() {
        assert!(!has_payload(&params(json!({"id": 1}))));
        assert!(has_payload(&params(json!({"id": 1, "lockVersion": 1}))));
    }
}
