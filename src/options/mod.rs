//! Operator options.
//!
//! Every field can be supplied from:
//! - Command-line flags (highest priority)
//! - Environment variables
//! - A hard-coded default (lowest priority)
//!
//! Resolution runs in four steps: [`resolver::resolve`] picks a raw string
//! per field, [`coerce::coerce_values`] types it, [`validate::validate`]
//! checks it, and only then is an [`Options`] built.

pub mod coerce;
pub mod env;
pub mod flags;
pub mod registry;
pub mod resolver;
pub mod validate;

use std::ffi::OsString;
use std::time::Duration;

use clap::ArgMatches;
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use url::Url;

use crate::observability::spans;
use crate::{Error, Result};

pub use coerce::{TypedValues, Value};
pub use env::{EnvSource, MockEnv, StdEnv};
pub use registry::{FieldDescriptor, FieldId, FieldKind, Registry};
pub use resolver::{FlagValues, RawValue, RawValues, Source};

static INSTALLED: OnceCell<Options> = OnceCell::new();

/// Fully resolved and validated operator options.
///
/// Instances only come out of a successful resolution or
/// [`Options::from_fields`], so every value here has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    assume_role_arn: Option<String>,
    #[serde(serialize_with = "serialize_duration")]
    assume_role_duration: Duration,
    cluster_ca_bundle: Option<String>,
    cluster_name: String,
    cluster_endpoint: Option<String>,
    isolated_vpc: bool,
    vm_memory_overhead_percent: f64,
    interruption_queue: Option<String>,
    reserved_enis: i64,
}

/// Plain field values for building [`Options`] directly.
///
/// Unset fields take their registered default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsFields {
    pub assume_role_arn: Option<String>,
    pub assume_role_duration: Option<Duration>,
    pub cluster_ca_bundle: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_endpoint: Option<String>,
    pub isolated_vpc: Option<bool>,
    pub vm_memory_overhead_percent: Option<f64>,
    pub interruption_queue: Option<String>,
    pub reserved_enis: Option<i64>,
}

impl OptionsFields {
    fn into_values(self) -> TypedValues {
        let mut values = TypedValues::new();
        let mut set = |id, value: Option<Value>| {
            if let Some(value) = value {
                values.insert(id, value);
            }
        };
        set(FieldId::AssumeRoleArn, self.assume_role_arn.map(Value::String));
        set(
            FieldId::AssumeRoleDuration,
            self.assume_role_duration.map(Value::Duration),
        );
        set(FieldId::ClusterCaBundle, self.cluster_ca_bundle.map(Value::String));
        set(FieldId::ClusterName, self.cluster_name.map(Value::String));
        set(FieldId::ClusterEndpoint, self.cluster_endpoint.map(Value::Url));
        set(FieldId::IsolatedVpc, self.isolated_vpc.map(Value::Bool));
        set(
            FieldId::VmMemoryOverheadPercent,
            self.vm_memory_overhead_percent.map(Value::Float),
        );
        set(
            FieldId::InterruptionQueue,
            self.interruption_queue.map(Value::String),
        );
        set(FieldId::ReservedEnis, self.reserved_enis.map(Value::Int));
        values
    }
}

impl Options {
    /// Parse `args` (program name first) and resolve against `env`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flags`] if the command line does not parse, or
    /// [`Error::Options`] if a value is malformed or invalid.
    pub fn parse_from<I, T>(args: I, env: &dyn EnvSource) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = flags::command(Registry::standard()).try_get_matches_from(args)?;
        Self::from_matches(&matches, env)
    }

    /// Resolve from matches produced by a command built with
    /// [`flags::command`] or [`flags::augment_args`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] if a value is malformed or invalid.
    pub fn from_matches(matches: &ArgMatches, env: &dyn EnvSource) -> Result<Self> {
        let registry = Registry::standard();
        Self::resolve(&FlagValues::from_matches(matches, registry), env)
    }

    /// Resolve from explicitly supplied flag values and an environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] if a value is malformed or invalid.
    pub fn resolve(flags: &FlagValues, env: &dyn EnvSource) -> Result<Self> {
        let registry = Registry::standard();
        let _span = spans::resolve_span(registry.len()).entered();

        let raw = resolver::resolve(flags, env, registry);
        let typed = coerce::coerce_values(registry, &raw).map_err(|err| {
            tracing::warn!(field = err.field(), "Malformed option: {err}");
            err
        })?;
        Self::from_values(registry, typed)
    }

    /// Build options from plain values, filling in defaults and validating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] if the values violate a field rule.
    pub fn from_fields(fields: OptionsFields) -> Result<Self> {
        let registry = Registry::standard();
        let mut typed = fields.into_values();
        for (id, value) in coerce::coerce_values(registry, &resolver::defaults(registry))?.iter() {
            typed.insert_missing(id, value.clone());
        }
        Self::from_values(registry, typed)
    }

    fn from_values(registry: &Registry, mut values: TypedValues) -> Result<Self> {
        if let Err(err) = validate::validate(registry, &values) {
            tracing::warn!(field = err.field(), "Invalid option: {err}");
            return Err(err.into());
        }

        let options = Self {
            assume_role_arn: take_string(&mut values, FieldId::AssumeRoleArn)?,
            assume_role_duration: required(
                FieldId::AssumeRoleDuration,
                take_duration(&mut values, FieldId::AssumeRoleDuration)?,
            )?,
            cluster_ca_bundle: take_string(&mut values, FieldId::ClusterCaBundle)?,
            cluster_name: required(
                FieldId::ClusterName,
                take_string(&mut values, FieldId::ClusterName)?,
            )?,
            cluster_endpoint: take_string(&mut values, FieldId::ClusterEndpoint)?,
            isolated_vpc: required(
                FieldId::IsolatedVpc,
                take_bool(&mut values, FieldId::IsolatedVpc)?,
            )?,
            vm_memory_overhead_percent: required(
                FieldId::VmMemoryOverheadPercent,
                take_float(&mut values, FieldId::VmMemoryOverheadPercent)?,
            )?,
            interruption_queue: take_string(&mut values, FieldId::InterruptionQueue)?,
            reserved_enis: required(
                FieldId::ReservedEnis,
                take_int(&mut values, FieldId::ReservedEnis)?,
            )?,
        };
        tracing::debug!(cluster = %options.cluster_name, "Options validated");
        Ok(options)
    }

    /// Make these options the process-wide instance.
    ///
    /// # Errors
    ///
    /// Hands the options back if an instance was already installed.
    pub fn install(self) -> std::result::Result<&'static Self, Self> {
        INSTALLED.try_insert(self).map_err(|(_, rejected)| rejected)
    }

    /// The process-wide instance, if one was installed.
    #[must_use]
    pub fn current() -> Option<&'static Self> {
        INSTALLED.get()
    }

    #[must_use]
    pub fn assume_role_arn(&self) -> Option<&str> {
        self.assume_role_arn.as_deref()
    }

    #[must_use]
    pub const fn assume_role_duration(&self) -> Duration {
        self.assume_role_duration
    }

    #[must_use]
    pub fn cluster_ca_bundle(&self) -> Option<&str> {
        self.cluster_ca_bundle.as_deref()
    }

    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    #[must_use]
    pub fn cluster_endpoint(&self) -> Option<&str> {
        self.cluster_endpoint.as_deref()
    }

    /// The endpoint as a parsed URL.
    #[must_use]
    pub fn cluster_endpoint_url(&self) -> Option<Url> {
        self.cluster_endpoint
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
    }

    #[must_use]
    pub const fn isolated_vpc(&self) -> bool {
        self.isolated_vpc
    }

    #[must_use]
    pub const fn vm_memory_overhead_percent(&self) -> f64 {
        self.vm_memory_overhead_percent
    }

    #[must_use]
    pub fn interruption_queue(&self) -> Option<&str> {
        self.interruption_queue.as_deref()
    }

    #[must_use]
    pub const fn reserved_enis(&self) -> i64 {
        self.reserved_enis
    }

    /// Interruption handling is enabled only when a queue is configured.
    #[must_use]
    pub fn interruption_handling_enabled(&self) -> bool {
        self.interruption_queue.as_deref().is_some_and(|q| !q.is_empty())
    }
}

fn serialize_duration<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&coerce::format_duration(*duration))
}

fn mismatch(id: FieldId, value: &Value) -> Error {
    Error::internal(format!("{id:?} holds unexpected value {value:?}"))
}

fn required<T>(id: FieldId, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::internal(format!("{id:?} has no value after validation")))
}

fn take_string(values: &mut TypedValues, id: FieldId) -> Result<Option<String>> {
    match values.remove(id) {
        None => Ok(None),
        Some(Value::String(s) | Value::Url(s)) => Ok(Some(s)),
        Some(other) => Err(mismatch(id, &other)),
    }
}

fn take_duration(values: &mut TypedValues, id: FieldId) -> Result<Option<Duration>> {
    match values.remove(id) {
        None => Ok(None),
        Some(Value::Duration(d)) => Ok(Some(d)),
        Some(other) => Err(mismatch(id, &other)),
    }
}

fn take_bool(values: &mut TypedValues, id: FieldId) -> Result<Option<bool>> {
    match values.remove(id) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(mismatch(id, &other)),
    }
}

fn take_float(values: &mut TypedValues, id: FieldId) -> Result<Option<f64>> {
    match values.remove(id) {
        None => Ok(None),
        Some(Value::Float(v)) => Ok(Some(v)),
        Some(other) => Err(mismatch(id, &other)),
    }
}

fn take_int(values: &mut TypedValues, id: FieldId) -> Result<Option<i64>> {
    match values.remove(id) {
        None => Ok(None),
        Some(Value::Int(v)) => Ok(Some(v)),
        Some(other) => Err(mismatch(id, &other)),
    }
}
