//! Conversion of raw strings into typed field values.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::time::Duration;

use super::registry::{FieldId, FieldKind, Registry};
use super::resolver::RawValues;
use crate::error::OptionsError;

const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Duration(Duration),
    Float(f64),
    Int(i64),
    Url(String),
}

impl Value {
    /// True for a present but empty string or URL.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) | Self::Url(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Url(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Duration(d) => f.write_str(&format_duration(*d)),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Typed values keyed by field. Absent fields have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedValues {
    values: BTreeMap<FieldId, Value>,
}

impl TypedValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FieldId, value: Value) {
        self.values.insert(id, value);
    }

    /// Insert only if the field has no value yet.
    pub fn insert_missing(&mut self, id: FieldId, value: Value) {
        self.values.entry(id).or_insert(value);
    }

    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&Value> {
        self.values.get(&id)
    }

    pub fn remove(&mut self, id: FieldId) -> Option<Value> {
        self.values.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Value)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }
}

/// Convert a raw string into a value of the given kind.
///
/// # Errors
///
/// Returns the reason the literal does not match the kind's grammar.
pub fn coerce(raw: &str, kind: FieldKind) -> std::result::Result<Value, String> {
    match kind {
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Url => Ok(Value::Url(raw.to_string())),
        FieldKind::Bool => parse_bool(raw).map(Value::Bool),
        FieldKind::Duration => parse_duration(raw).map(Value::Duration),
        FieldKind::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("invalid float: {e}")),
        FieldKind::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("invalid integer: {e}")),
    }
}

/// Coerce every resolved raw value, stopping at the first malformed one.
///
/// # Errors
///
/// Returns [`OptionsError::MalformedLiteral`] naming the field, where the
/// value came from, and the offending text.
pub fn coerce_values(
    registry: &Registry,
    raw: &RawValues,
) -> std::result::Result<TypedValues, OptionsError> {
    let mut typed = TypedValues::new();
    for field in registry.iter() {
        let Some(raw) = raw.get(field.id) else {
            continue;
        };
        let value =
            coerce(&raw.value, field.kind).map_err(|reason| OptionsError::MalformedLiteral {
                field: field.flag,
                origin: raw.source,
                value: raw.value.clone(),
                reason,
            })?;
        typed.insert(field.id, value);
    }
    Ok(typed)
}

/// Parse the boolean tokens accepted by the operator's flags.
///
/// # Errors
///
/// Returns an error for anything outside the canonical true/false tokens.
pub fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

/// Parse a duration literal such as `20m`, `1h30m`, `1.5s` or `300ms`.
///
/// Each component is a decimal number followed by one of `ns`, `us`, `µs`,
/// `ms`, `s`, `m`, `h`. A lone `0` needs no unit.
///
/// # Errors
///
/// Returns an error for missing or unknown units, negative values, and
/// values that overflow.
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let mut rest = raw.strip_prefix('+').unwrap_or(raw);
    if rest.starts_with('-') {
        return Err("negative durations are not allowed".to_string());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        if number.is_empty() {
            return Err(format!("expected a number before {unit:?}"));
        }
        let scale = match unit {
            "" => return Err(format!("missing unit after {number:?}")),
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            other => return Err(format!("unknown unit {other:?}")),
        };
        total = total
            .checked_add(component_nanos(number, scale)?)
            .ok_or_else(|| "duration out of range".to_string())?;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| "duration out of range".to_string())
}

fn component_nanos(number: &str, scale: u128) -> std::result::Result<u128, String> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
        return Err(format!("invalid number {number:?}"));
    }

    let overflow = || "duration out of range".to_string();
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

    // Digits past nanosecond precision of the largest unit cannot matter.
    let frac = &frac[..frac.len().min(18)];
    if !frac.is_empty() {
        let digits: u128 = frac.parse().map_err(|_| overflow())?;
        let divisor = 10_u128.pow(u32::try_from(frac.len()).map_err(|_| overflow())?);
        nanos = nanos
            .checked_add(digits * scale / divisor)
            .ok_or_else(overflow)?;
    }
    Ok(nanos)
}

/// Format a duration the way it is written on the command line, e.g. `20m0s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_SECOND {
        let (unit, scale) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{unit}", decimal(nanos, scale));
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
    let seconds = nanos % NANOS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", decimal(seconds, NANOS_PER_SECOND));
    out
}

fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("20m"), Ok(Duration::from_secs(20 * 60)));
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
        assert_eq!(parse_duration("5us"), Ok(Duration::from_micros(5)));
        assert_eq!(parse_duration("5µs"), Ok(Duration::from_micros(5)));
        assert_eq!(parse_duration("7ns"), Ok(Duration::from_nanos(7)));
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration(".5m"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("+15m"), Ok(Duration::from_secs(900)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        for raw in ["", "20", "m", "1.2.3s", "5 m", "10x", "-1s", "1h-5m", "."] {
            assert!(parse_duration(raw).is_err(), "{raw:?} should be rejected");
        }
        let err = parse_duration("20").unwrap_err();
        assert!(err.contains("missing unit"));
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(parse_duration("9999999999999999999h").is_err());
        assert!(parse_duration("99999999999999999999999999999999999999999s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(20 * 60)), "20m0s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(300)), "300ms");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_nanos(42)), "42ns");
    }

    #[test]
    fn test_format_then_parse_preserves_value() {
        let duration = Duration::from_millis(5_432_100);
        assert_eq!(parse_duration(&format_duration(duration)), Ok(duration));
    }

    #[test]
    fn test_parse_bool_tokens() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(raw), Ok(true), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(raw), Ok(false), "{raw}");
        }
        for raw in ["yes", "no", "", "tRuE", " true"] {
            assert!(parse_bool(raw).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce("0.1", FieldKind::Float), Ok(Value::Float(0.1)));
        assert_eq!(coerce("-0.01", FieldKind::Float), Ok(Value::Float(-0.01)));
        assert_eq!(coerce("10", FieldKind::Int), Ok(Value::Int(10)));
        assert_eq!(coerce("-1", FieldKind::Int), Ok(Value::Int(-1)));
        assert!(coerce("1.5", FieldKind::Int).is_err());
        assert!(coerce("ten", FieldKind::Int).is_err());
        assert!(coerce("", FieldKind::Float).is_err());
    }

    #[test]
    fn test_coerce_strings_verbatim() {
        assert_eq!(
            coerce("not a url", FieldKind::Url),
            Ok(Value::Url("not a url".to_string()))
        );
        assert_eq!(
            coerce("", FieldKind::String),
            Ok(Value::String(String::new()))
        );
    }

    #[test]
    fn test_value_is_empty() {
        assert!(Value::String(String::new()).is_empty());
        assert!(Value::Url(String::new()).is_empty());
        assert!(!Value::String("x".to_string()).is_empty());
        assert!(!Value::Int(0).is_empty());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            Value::Duration(Duration::from_secs(1)).to_string(),
            "1s"
        );
        assert_eq!(Value::Float(-0.01).to_string(), "-0.01");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_typed_values_insert_missing() {
        let mut values = TypedValues::new();
        values.insert(FieldId::ReservedEnis, Value::Int(3));
        values.insert_missing(FieldId::ReservedEnis, Value::Int(0));
        values.insert_missing(FieldId::IsolatedVpc, Value::Bool(false));
        assert_eq!(values.get(FieldId::ReservedEnis), Some(&Value::Int(3)));
        assert_eq!(values.get(FieldId::IsolatedVpc), Some(&Value::Bool(false)));
        assert_eq!(values.iter().count(), 2);
    }
}
