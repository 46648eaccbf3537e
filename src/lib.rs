//! A remote feature flag client.
//!
//! [FlagClient] keeps a local snapshot of flags fetched from a remote JSON document and refreshes
//! it on a background thread. Each [Flag] is either on or off by the truthiness of its value, or
//! compares an evaluation context against its value with an [Operator].
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use flagsync::{ClientConfig, Flag, FlagClient, FlagValue};
//!
//! let defaults: HashMap<String, Flag> = [("new-ui".to_string(), Flag::new("new-ui", false).unwrap())]
//!     .into_iter()
//!     .collect();
//! let client = FlagClient::new(
//!     ClientConfig::new("https://flags.example.com/flags.json", Duration::from_secs(60)),
//!     defaults,
//! );
//!
//! if client.is_enabled("new-ui", Some(&FlagValue::from("BR"))) {
//!     // ...
//! }
//! ```
//!
//! The crate logs through the [log](https://docs.rs/log) facade; install any compatible logger
//! to see refresh failures.

mod client;
mod config;
mod error;
mod fetch;
mod flag;
mod flag_value;
mod operator;
mod parse;
mod snapshot;
mod store;
mod test_common;
mod util;
mod value_type;

pub use client::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use flag::*;
pub use flag_value::*;
pub use operator::*;
pub use parse::*;
pub use snapshot::*;
pub use store::*;
pub use value_type::*;
