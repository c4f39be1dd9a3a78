//! Per-field source selection: explicit flag, then environment, then default.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::env::EnvSource;
use super::registry::{FieldId, Registry};

/// Where a raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Flag,
    Env,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "command line",
            Self::Env => "environment",
            Self::Default => "default",
        })
    }
}

/// An uncoerced value together with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub value: String,
    pub source: Source,
}

impl RawValue {
    pub fn new(value: impl Into<String>, source: Source) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// Raw values keyed by field. A field that no tier supplied has no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawValues {
    values: BTreeMap<FieldId, RawValue>,
}

impl RawValues {
    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&RawValue> {
        self.values.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, id: FieldId, raw: RawValue) {
        self.values.insert(id, raw);
    }
}

/// Flags explicitly supplied on the command line, keyed by flag name.
///
/// Flags that the parser only filled in from a default must not appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagValues {
    values: HashMap<String, String>,
}

impl FlagValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(flag, value)` pairs, flag names without the `--`.
    pub fn from_pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        self.values.insert(flag.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, flag: &str) -> Option<&str> {
        self.values.get(flag).map(String::as_str)
    }
}

/// Pick the effective raw value for every registered field.
///
/// Precedence is per field, so one field may come from a flag while its
/// sibling comes from the environment. Absence at every tier is not an error
/// here; requiredness is enforced by validation.
#[must_use]
pub fn resolve(flags: &FlagValues, env: &dyn EnvSource, registry: &Registry) -> RawValues {
    let mut values = RawValues::default();
    for field in registry.iter() {
        let raw = flags
            .get(field.flag)
            .map(|v| RawValue::new(v, Source::Flag))
            .or_else(|| env.get(field.env).map(|v| RawValue::new(v, Source::Env)))
            .or_else(|| field.default.map(|v| RawValue::new(v, Source::Default)));

        if let Some(raw) = raw {
            tracing::debug!(field = field.flag, source = %raw.source, "Resolved option");
            values.insert(field.id, raw);
        } else {
            tracing::debug!(field = field.flag, "Option not set");
        }
    }
    values
}

/// Raw values taken from declared defaults only.
#[must_use]
pub fn defaults(registry: &Registry) -> RawValues {
    let mut values = RawValues::default();
    for field in registry.iter() {
        if let Some(default) = field.default {
            values.insert(field.id, RawValue::new(default, Source::Default));
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::env::MockEnv;

    fn raw(values: &RawValues, id: FieldId) -> Option<(&str, Source)> {
        values.get(id).map(|r| (r.value.as_str(), r.source))
    }

    #[test]
    fn test_flag_wins_over_env() {
        let flags = FlagValues::from_pairs([("cluster-name", "flag-cluster")]);
        let env = MockEnv::from_pairs([("CLUSTER_NAME", "env-cluster")]);
        let values = resolve(&flags, &env, Registry::standard());
        assert_eq!(
            raw(&values, FieldId::ClusterName),
            Some(("flag-cluster", Source::Flag))
        );
    }

    #[test]
    fn test_env_used_without_flag() {
        let env = MockEnv::from_pairs([("RESERVED_ENIS", "4")]);
        let values = resolve(&FlagValues::new(), &env, Registry::standard());
        assert_eq!(raw(&values, FieldId::ReservedEnis), Some(("4", Source::Env)));
    }

    #[test]
    fn test_default_and_absent() {
        let values = resolve(&FlagValues::new(), &MockEnv::new(), Registry::standard());
        assert_eq!(
            raw(&values, FieldId::AssumeRoleDuration),
            Some(("15m", Source::Default))
        );
        assert_eq!(
            raw(&values, FieldId::IsolatedVpc),
            Some(("false", Source::Default))
        );
        assert_eq!(raw(&values, FieldId::ClusterName), None);
        assert_eq!(raw(&values, FieldId::ClusterEndpoint), None);
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_mixed_sources_in_one_pass() {
        let flags = FlagValues::from_pairs([("cluster-name", "a")]);
        let env = MockEnv::from_pairs([("CLUSTER_ENDPOINT", "https://b"), ("CLUSTER_NAME", "z")]);
        let values = resolve(&flags, &env, Registry::standard());
        assert_eq!(raw(&values, FieldId::ClusterName), Some(("a", Source::Flag)));
        assert_eq!(
            raw(&values, FieldId::ClusterEndpoint),
            Some(("https://b", Source::Env))
        );
        assert_eq!(
            raw(&values, FieldId::ReservedEnis),
            Some(("0", Source::Default))
        );
    }

    #[test]
    fn test_empty_env_value_counts_as_set() {
        let env = MockEnv::from_pairs([("CLUSTER_NAME", "")]);
        let values = resolve(&FlagValues::new(), &env, Registry::standard());
        assert_eq!(raw(&values, FieldId::ClusterName), Some(("", Source::Env)));
    }

    #[test]
    fn test_env_overrides_default() {
        let env = MockEnv::from_pairs([("ASSUME_ROLE_DURATION", "1h")]);
        let values = resolve(&FlagValues::new(), &env, Registry::standard());
        assert_eq!(
            raw(&values, FieldId::AssumeRoleDuration),
            Some(("1h", Source::Env))
        );
    }

    #[test]
    fn test_unrelated_inputs_ignored() {
        let flags = FlagValues::from_pairs([("not-a-flag", "x")]);
        let env = MockEnv::from_pairs([("NOT_A_FIELD", "y")]);
        assert_eq!(
            resolve(&flags, &env, Registry::standard()),
            defaults(Registry::standard())
        );
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Flag.to_string(), "command line");
        assert_eq!(Source::Env.to_string(), "environment");
        assert_eq!(Source::Default.to_string(), "default");
    }
}
