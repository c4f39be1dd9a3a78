//! Semantic checks on coerced values.

use std::time::Duration;

use url::Url;

use super::coerce::{format_duration, TypedValues, Value};
use super::registry::{FieldDescriptor, Registry};
use crate::error::OptionsError;

/// Shortest credential lifetime the cloud provider accepts.
pub const MIN_ASSUME_ROLE_DURATION: Duration = Duration::from_secs(15 * 60);

/// A failed field predicate, before it is attributed to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    OutOfRange(String),
    InvalidUrl(String),
}

impl Violation {
    fn into_error(self, field: &FieldDescriptor, value: &Value) -> OptionsError {
        match self {
            Self::OutOfRange(reason) => OptionsError::OutOfRange {
                field: field.flag,
                value: value.to_string(),
                reason,
            },
            Self::InvalidUrl(reason) => OptionsError::InvalidUrlShape {
                field: field.flag,
                value: value.to_string(),
                reason,
            },
        }
    }
}

/// Check every field in declaration order and stop at the first violation.
///
/// # Errors
///
/// Returns [`OptionsError::MissingRequired`] for an absent or empty required
/// field, or the error produced by the field's predicate.
pub fn validate(registry: &Registry, values: &TypedValues) -> std::result::Result<(), OptionsError> {
    for field in registry.iter() {
        let value = values.get(field.id);
        if field.required && value.map_or(true, Value::is_empty) {
            return Err(OptionsError::MissingRequired {
                field: field.flag,
                env: field.env,
            });
        }
        if let (Some(value), Some(check)) = (value, field.check) {
            check(value).map_err(|violation| violation.into_error(field, value))?;
        }
    }
    Ok(())
}

/// Durations must be at least [`MIN_ASSUME_ROLE_DURATION`]; exactly 15m passes.
///
/// # Errors
///
/// Returns [`Violation::OutOfRange`] for shorter durations.
pub fn min_assume_role_duration(value: &Value) -> std::result::Result<(), Violation> {
    match value {
        Value::Duration(d) if *d < MIN_ASSUME_ROLE_DURATION => Err(Violation::OutOfRange(
            format!(
                "must be at least {}",
                format_duration(MIN_ASSUME_ROLE_DURATION)
            ),
        )),
        _ => Ok(()),
    }
}

/// Zero is allowed; negative numbers and NaN are not.
///
/// # Errors
///
/// Returns [`Violation::OutOfRange`] for negative values.
pub fn non_negative(value: &Value) -> std::result::Result<(), Violation> {
    let negative = match value {
        Value::Float(v) => v.is_nan() || *v < 0.0,
        Value::Int(v) => *v < 0,
        _ => false,
    };
    if negative {
        return Err(Violation::OutOfRange(
            "must be greater than or equal to 0".to_string(),
        ));
    }
    Ok(())
}

/// The value must parse as a URL with both a scheme and a host.
///
/// # Errors
///
/// Returns [`Violation::InvalidUrl`] for relative URLs, bare hostnames and
/// URLs without a host.
pub fn absolute_url(value: &Value) -> std::result::Result<(), Violation> {
    let (Value::Url(raw) | Value::String(raw)) = value else {
        return Ok(());
    };
    let url = Url::parse(raw).map_err(|e| Violation::InvalidUrl(e.to_string()))?;
    if !url.has_host() {
        return Err(Violation::InvalidUrl("missing host".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::registry::FieldId;

    fn valid_values() -> TypedValues {
        let mut values = TypedValues::new();
        values.insert(FieldId::ClusterName, Value::String("test-cluster".to_string()));
        values
    }

    #[test]
    fn test_minimal_values_pass() {
        assert!(validate(Registry::standard(), &valid_values()).is_ok());
    }

    #[test]
    fn test_missing_cluster_name() {
        let err = validate(Registry::standard(), &TypedValues::new()).unwrap_err();
        assert_eq!(
            err,
            OptionsError::MissingRequired {
                field: "cluster-name",
                env: "CLUSTER_NAME",
            }
        );
    }

    #[test]
    fn test_empty_cluster_name() {
        let mut values = TypedValues::new();
        values.insert(FieldId::ClusterName, Value::String(String::new()));
        let err = validate(Registry::standard(), &values).unwrap_err();
        assert_eq!(err.field(), "cluster-name");
    }

    #[test]
    fn test_assume_role_duration_bound() {
        let check = |d: Duration| min_assume_role_duration(&Value::Duration(d));
        assert!(check(Duration::from_secs(1)).is_err());
        assert!(check(Duration::from_secs(15 * 60 - 1)).is_err());
        assert!(check(Duration::from_secs(15 * 60)).is_ok());
        assert!(check(Duration::from_secs(20 * 60)).is_ok());
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative(&Value::Float(-0.01)).is_err());
        assert!(non_negative(&Value::Float(f64::NAN)).is_err());
        assert!(non_negative(&Value::Float(0.0)).is_ok());
        assert!(non_negative(&Value::Float(0.1)).is_ok());
        assert!(non_negative(&Value::Int(-1)).is_err());
        assert!(non_negative(&Value::Int(0)).is_ok());
        assert!(non_negative(&Value::Int(10)).is_ok());
    }

    #[test]
    fn test_absolute_url() {
        let check = |s: &str| absolute_url(&Value::Url(s.to_string()));
        assert!(check("https://env-cluster").is_ok());
        assert!(check("https://10.0.0.1:6443/path").is_ok());
        assert!(check("00000000000000000000000.gr7.us-west-2.eks.amazonaws.com").is_err());
        assert!(check("/relative/path").is_err());
        assert!(check("localhost:6443").is_err());
        assert!(check("mailto:ops@example.com").is_err());
        assert!(check("").is_err());
    }

    #[test]
    fn test_violation_attributed_to_field() {
        let mut values = valid_values();
        values.insert(FieldId::ReservedEnis, Value::Int(-1));
        let err = validate(Registry::standard(), &values).unwrap_err();
        assert_eq!(
            err,
            OptionsError::OutOfRange {
                field: "reserved-enis",
                value: "-1".to_string(),
                reason: "must be greater than or equal to 0".to_string(),
            }
        );
    }

    #[test]
    fn test_url_violation_carries_value() {
        let mut values = valid_values();
        values.insert(FieldId::ClusterEndpoint, Value::Url("example.com".to_string()));
        match validate(Registry::standard(), &values) {
            Err(OptionsError::InvalidUrlShape { field, value, .. }) => {
                assert_eq!(field, "cluster-endpoint");
                assert_eq!(value, "example.com");
            }
            other => panic!("expected InvalidUrlShape, got {other:?}"),
        }
    }

    #[test]
    fn test_first_violation_wins() {
        let mut values = TypedValues::new();
        values.insert(FieldId::ReservedEnis, Value::Int(-1));
        values.insert(
            FieldId::AssumeRoleDuration,
            Value::Duration(Duration::from_secs(1)),
        );
        let err = validate(Registry::standard(), &values).unwrap_err();
        assert_eq!(err.field(), "assume-role-duration");
    }
}
