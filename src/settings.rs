//! Layered configuration: file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [commands]
//! package_manager = "pnpm"
//! editor = "code"        # "" disables the editor launch
//!
//! [progress]
//! chunk_increment = 0.05
//! step_ceiling = 0.9
//!
//! [ui]
//! mode = "full"          # full | plain | json
//! ```
//!
//! The file is read from `--config` when given, otherwise from
//! `<config dir>/create-ekko-app/config.toml`. A missing file means defaults.

use crate::ui::UiMode;
use anyhow::{Context, Result};
use ekko_runtime::ProgressTuning;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PACKAGE_MANAGER_ENV: &str = "EKKO_PACKAGE_MANAGER";
pub const EDITOR_ENV: &str = "EKKO_EDITOR";

pub const DEFAULT_PACKAGE_MANAGER: &str = "pnpm";
pub const DEFAULT_EDITOR: &str = "code";

const CONFIG_DIR_NAME: &str = "create-ekko-app";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<UiMode>,
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub commands: CommandsSection,
    #[serde(default)]
    pub progress: ProgressTuning,
    #[serde(default)]
    pub ui: UiSection,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(content).context("Failed to parse config.toml")?;
        file.progress
            .validate()
            .context("Invalid [progress] section")?;
        Ok(file)
    }

    /// `<config dir>/create-ekko-app/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load `explicit` (which must exist) or the default location (which may not).
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub package_manager: Option<String>,
    pub ui: Option<UiMode>,
    pub no_editor: bool,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub package_manager: String,
    /// `None` disables the editor launch.
    pub editor: Option<String>,
    pub tuning: ProgressTuning,
    pub ui_mode: UiMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
            editor: Some(DEFAULT_EDITOR.to_string()),
            tuning: ProgressTuning::default(),
            ui_mode: UiMode::default(),
        }
    }
}

impl Settings {
    /// Resolve from the process environment.
    pub fn resolve(file: SettingsFile, cli: &CliOverrides) -> Self {
        Self::resolve_with(file, |key| std::env::var(key).ok(), cli)
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        file: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
        cli: &CliOverrides,
    ) -> Self {
        let non_empty = |value: String| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        let package_manager = cli
            .package_manager
            .clone()
            .and_then(non_empty)
            .or_else(|| env(PACKAGE_MANAGER_ENV).and_then(non_empty))
            .or_else(|| file.commands.package_manager.clone().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_PACKAGE_MANAGER.to_string());

        // An explicitly empty editor disables the launch, so only fall through when unset.
        let editor = if cli.no_editor {
            None
        } else {
            non_empty(
                env(EDITOR_ENV)
                    .or(file.commands.editor)
                    .unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
            )
        };

        Self {
            package_manager,
            editor,
            tuning: file.progress,
            ui_mode: cli.ui.or(file.ui.mode).unwrap_or_default(),
        }
    }
}
