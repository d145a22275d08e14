//! Knowledge Base Configuration Module
//!
//! Operator-tunable settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `PLC_KB_CONFIG` environment variable (path to TOML file)
//! 2. `plc_kb.toml` in the current working directory
//! 3. Built-in defaults
//!
//! `PLC_KB_DIR` overrides `source.dir` regardless of where the rest came from.
//!
//! The loaded `KbConfig` is passed explicitly to the knowledge base and the
//! API; there is no process-global config.

mod kb_config;
pub mod validation;

pub use kb_config::*;
