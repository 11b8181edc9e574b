//! Command implementations for the cryptpool CLI
//!
//! Each command is organized into its own module.

pub mod config;
pub mod run;
pub mod transform;
pub mod version;
pub mod worker;
