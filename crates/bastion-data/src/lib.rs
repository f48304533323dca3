//! Data-driven configuration for the simulation.
//!
//! A config file may be RON, TOML or JSON; the format comes from the file
//! extension. Every section is optional and falls back to
//! [`SimConfig::default`](bastion_core::config::SimConfig). Structure kinds
//! listed in the file replace the standard spec for that kind, the rest
//! keep theirs.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, config_from_str, load_config, resolve_config};
