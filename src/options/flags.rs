//! Command-line flag definitions generated from the registry.

use std::fmt::Write as _;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use super::registry::{FieldDescriptor, FieldKind, Registry};
use super::resolver::FlagValues;

/// A standalone command holding one flag per registered field.
#[must_use]
pub fn command(registry: &Registry) -> Command {
    augment_args(
        Command::new("operator-options")
            .about("Resolve operator options from flags and environment variables")
            .version(env!("CARGO_PKG_VERSION")),
        registry,
    )
}

/// Add one flag per registered field to an existing command.
///
/// Flags carry no clap-level default or env binding; both tiers are handled
/// by the resolver so that an explicit flag can be told apart from a
/// fallback.
#[must_use]
pub fn augment_args(command: Command, registry: &Registry) -> Command {
    registry
        .iter()
        .fold(command.args_override_self(true), |cmd, field| cmd.arg(arg_for(field)))
}

fn arg_for(field: &FieldDescriptor) -> Arg {
    let arg = Arg::new(field.flag)
        .long(field.flag)
        .value_name(field.kind.value_name())
        .help(help_for(field))
        .action(ArgAction::Set);

    match field.kind {
        // `--isolated-vpc` alone means true; `--isolated-vpc=false` is allowed.
        FieldKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        _ => arg.num_args(1).allow_hyphen_values(true),
    }
}

fn help_for(field: &FieldDescriptor) -> String {
    let mut help = String::new();
    if field.required {
        help.push_str("[REQUIRED] ");
    }
    help.push_str(field.help);
    let _ = write!(help, " [env: {}]", field.env);
    if let Some(default) = field.default {
        let _ = write!(help, " [default: {default}]");
    }
    help
}

impl FlagValues {
    /// Collect the flags that were given on the command line.
    ///
    /// Values clap filled in on its own are skipped so they cannot shadow
    /// the environment.
    #[must_use]
    pub fn from_matches(matches: &ArgMatches, registry: &Registry) -> Self {
        let mut flags = Self::new();
        for field in registry.iter() {
            if matches.value_source(field.flag) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Ok(Some(value)) = matches.try_get_one::<String>(field.flag) {
                flags.insert(field.flag, value.clone());
            }
        }
        flags
    }
}
