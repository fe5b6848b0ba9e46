//! CLI command implementations.

pub mod create;

pub use create::cmd_create;
