//! Operator options
//!
//! Resolves the operator's startup configuration from command-line flags and
//! environment variables into a single validated [`Options`] value.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod observability;
pub mod options;

pub use error::{Error, OptionsError, Result};
pub use options::{Options, OptionsFields};
