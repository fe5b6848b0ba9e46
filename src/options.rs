//! The choices a user makes before anything runs.

use crate::errors::CliError;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_PROJECT_NAME: &str = "ekko-app";
pub const DEFAULT_SHADCN_COLOR: &str = "zinc";
pub const SHADCN_COLORS: [&str; 5] = ["neutral", "gray", "zinc", "stone", "slate"];

/// Application scaffold to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    #[default]
    Next,
    TanstackStart,
}

impl Framework {
    pub const ALL: [Framework; 2] = [Framework::Next, Framework::TanstackStart];

    pub fn label(self) -> &'static str {
        match self {
            Framework::Next => "Next.js",
            Framework::TanstackStart => "TanStack Start",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthChoice {
    #[default]
    None,
    Clerk,
    BetterAuth,
}

impl AuthChoice {
    pub const ALL: [AuthChoice; 3] = [AuthChoice::None, AuthChoice::Clerk, AuthChoice::BetterAuth];

    pub fn label(self) -> &'static str {
        match self {
            AuthChoice::None => "None",
            AuthChoice::Clerk => "Clerk",
            AuthChoice::BetterAuth => "Better Auth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseChoice {
    #[default]
    None,
    Convex,
    Drizzle,
}

impl DatabaseChoice {
    pub const ALL: [DatabaseChoice; 3] = [
        DatabaseChoice::None,
        DatabaseChoice::Convex,
        DatabaseChoice::Drizzle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DatabaseChoice::None => "None",
            DatabaseChoice::Convex => "Convex",
            DatabaseChoice::Drizzle => "Drizzle",
        }
    }
}

/// Optional integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolingOption {
    TanstackQuery,
    TanstackForm,
    Shadcn,
    ReactEmail,
    Resend,
}

impl ToolingOption {
    pub const ALL: [ToolingOption; 5] = [
        ToolingOption::TanstackQuery,
        ToolingOption::TanstackForm,
        ToolingOption::Shadcn,
        ToolingOption::ReactEmail,
        ToolingOption::Resend,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolingOption::TanstackQuery => "TanStack Query",
            ToolingOption::TanstackForm => "TanStack Form",
            ToolingOption::Shadcn => "shadcn",
            ToolingOption::ReactEmail => "React Email",
            ToolingOption::Resend => "Resend",
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })+
    };
}

display_label!(Framework, AuthChoice, DatabaseChoice, ToolingOption);

/// Everything the plan builder needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selections {
    pub project_name: String,
    pub framework: Framework,
    pub auth: AuthChoice,
    pub database: DatabaseChoice,
    pub tooling: Vec<ToolingOption>,
    /// Empty unless shadcn was chosen.
    pub shadcn_color: String,
    /// Leave shadcn init and component installation to the user.
    pub skip_shadcn_ops: bool,
}

impl Selections {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            framework: Framework::default(),
            auth: AuthChoice::default(),
            database: DatabaseChoice::default(),
            tooling: Vec::new(),
            shadcn_color: String::new(),
            skip_shadcn_ops: false,
        }
    }

    pub fn has_tool(&self, tool: ToolingOption) -> bool {
        self.tooling.contains(&tool)
    }

    /// The shadcn base color, falling back to the default when unset.
    pub fn effective_shadcn_color(&self) -> &str {
        let color = self.shadcn_color.trim();
        if color.is_empty() {
            DEFAULT_SHADCN_COLOR
        } else {
            color
        }
    }
}

/// Normalize a user-supplied project name into a directory name.
///
/// Trims, lower-cases, turns spaces into dashes and keeps only the last
/// path component, so `"../My App"` becomes `"my-app"`.
pub fn sanitize_project_name(raw: &str) -> Result<String, CliError> {
    let lowered = raw.trim().to_lowercase().replace(' ', "-");
    let name = Path::new(&lowered)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(CliError::InvalidProjectName {
            raw: raw.to_string(),
            reason: "name is empty after normalization".to_string(),
        });
    }
    Ok(name)
}

/// Reject colors shadcn does not know about.
pub fn validate_shadcn_color(color: &str) -> anyhow::Result<String> {
    let color = color.trim().to_lowercase();
    if SHADCN_COLORS.contains(&color.as_str()) {
        Ok(color)
    } else {
        anyhow::bail!(
            "Invalid shadcn color '{}'. Valid values: {}",
            color,
            SHADCN_COLORS.join(", ")
        )
    }
}
