//! `create-ekko-app`: an interactive scaffolder for web app projects.
//!
//! Selections are turned into a [`plan::Plan`] of steps that the
//! `ekko-runtime` engine runs one after another with live progress.

pub mod editor;
pub mod errors;
pub mod logging;
pub mod options;
pub mod plan;
pub mod prompt;
pub mod settings;
pub mod summary;
pub mod ui;
