//! Field declarations: flag name, environment variable, type and rules.

use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::coerce::Value;
use super::validate::{self, Violation};

/// Identity of a configuration field.
///
/// Variant order is the declaration order of the standard registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FieldId {
    AssumeRoleArn,
    AssumeRoleDuration,
    ClusterCaBundle,
    ClusterName,
    ClusterEndpoint,
    IsolatedVpc,
    VmMemoryOverheadPercent,
    InterruptionQueue,
    ReservedEnis,
}

/// Semantic type of a field, used to pick the coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Bool,
    Duration,
    Float,
    Int,
    /// Kept as a string; absoluteness is checked during validation.
    Url,
}

impl FieldKind {
    /// Placeholder shown in `--help` for the flag's value.
    #[must_use]
    pub const fn value_name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Duration => "DURATION",
            Self::Float => "FLOAT",
            Self::Int => "INT",
            Self::Url => "URL",
        }
    }
}

/// Per-field predicate run on the coerced value.
pub type Check = fn(&Value) -> std::result::Result<(), Violation>;

/// Static description of one configuration field.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    pub id: FieldId,
    /// Kebab-case flag name, without the leading `--`.
    pub flag: &'static str,
    /// Upper snake case environment variable name.
    pub env: &'static str,
    pub kind: FieldKind,
    /// Raw default literal, coerced like any other raw value.
    pub default: Option<&'static str>,
    pub required: bool,
    pub help: &'static str,
    pub check: Option<Check>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("id", &self.id)
            .field("flag", &self.flag)
            .field("env", &self.env)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl FieldDescriptor {
    /// Create an optional field with no default and no predicate.
    #[must_use]
    pub const fn new(
        id: FieldId,
        flag: &'static str,
        env: &'static str,
        kind: FieldKind,
        help: &'static str,
    ) -> Self {
        Self {
            id,
            flag,
            env,
            kind,
            default: None,
            required: false,
            help,
            check: None,
        }
    }

    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn with_check(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }
}

/// Ordered set of field descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    fields: Vec<FieldDescriptor>,
}

static STANDARD: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::new();
    registry
        .register(FieldDescriptor::new(
            FieldId::AssumeRoleArn,
            "assume-role-arn",
            "ASSUME_ROLE_ARN",
            FieldKind::String,
            "Role to assume for calling cloud provider APIs.",
        ))
        .register(
            FieldDescriptor::new(
                FieldId::AssumeRoleDuration,
                "assume-role-duration",
                "ASSUME_ROLE_DURATION",
                FieldKind::Duration,
                "Duration of assumed credentials. Must be at least 15m.",
            )
            .with_default("15m")
            .with_check(validate::min_assume_role_duration),
        )
        .register(FieldDescriptor::new(
            FieldId::ClusterCaBundle,
            "cluster-ca-bundle",
            "CLUSTER_CA_BUNDLE",
            FieldKind::String,
            "Cluster CA bundle for nodes to use for TLS connections with the API server.",
        ))
        .register(
            FieldDescriptor::new(
                FieldId::ClusterName,
                "cluster-name",
                "CLUSTER_NAME",
                FieldKind::String,
                "The kubernetes cluster name for resource discovery.",
            )
            .required(),
        )
        .register(
            FieldDescriptor::new(
                FieldId::ClusterEndpoint,
                "cluster-endpoint",
                "CLUSTER_ENDPOINT",
                FieldKind::Url,
                "The external kubernetes cluster endpoint for new nodes to connect with.",
            )
            .with_check(validate::absolute_url),
        )
        .register(
            FieldDescriptor::new(
                FieldId::IsolatedVpc,
                "isolated-vpc",
                "ISOLATED_VPC",
                FieldKind::Bool,
                "Assume the operator runs in a VPC with no egress to the internet.",
            )
            .with_default("false"),
        )
        .register(
            FieldDescriptor::new(
                FieldId::VmMemoryOverheadPercent,
                "vm-memory-overhead-percent",
                "VM_MEMORY_OVERHEAD_PERCENT",
                FieldKind::Float,
                "The VM memory overhead as a percent that will be subtracted from the total memory for all instance types.",
            )
            .with_default("0.075")
            .with_check(validate::non_negative),
        )
        .register(FieldDescriptor::new(
            FieldId::InterruptionQueue,
            "interruption-queue",
            "INTERRUPTION_QUEUE",
            FieldKind::String,
            "Interruption queue is the name of the queue to receive interruption events. Interruption handling is disabled if not specified.",
        ))
        .register(
            FieldDescriptor::new(
                FieldId::ReservedEnis,
                "reserved-enis",
                "RESERVED_ENIS",
                FieldKind::Int,
                "Reserved ENIs are not included in the calculations for max-pods or kube-reserved.",
            )
            .with_default("0")
            .with_check(validate::non_negative),
        );
    registry
});

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// The operator's own field set.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Add a descriptor.
    ///
    /// # Panics
    ///
    /// Panics if the field id, flag name or environment variable name is
    /// already registered.
    pub fn register(&mut self, descriptor: FieldDescriptor) -> &mut Self {
        for existing in &self.fields {
            assert!(
                existing.id != descriptor.id,
                "field {:?} registered twice",
                descriptor.id
            );
            assert!(
                existing.flag != descriptor.flag,
                "flag --{} registered twice",
                descriptor.flag
            );
            assert!(
                existing.env != descriptor.env,
                "environment variable {} registered twice",
                descriptor.env
            );
        }
        self.fields.push(descriptor);
        self
    }

    /// Iterate descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.id == id)
    }

    #[must_use]
    pub fn by_flag(&self, flag: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.flag == flag)
    }

    #[must_use]
    pub fn by_env(&self, env: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.env == env)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
