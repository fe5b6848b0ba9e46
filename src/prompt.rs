//! Collecting selections: from flags, and interactively for whatever the
//! flags left open.

use crate::errors::CliError;
use crate::options::{
    AuthChoice, DEFAULT_PROJECT_NAME, DEFAULT_SHADCN_COLOR, DatabaseChoice, Framework,
    SHADCN_COLORS, Selections, ToolingOption, sanitize_project_name, validate_shadcn_color,
};
use anyhow::Result;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use std::io::IsTerminal;

/// Selections given on the command line. `None` means "ask".
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub name: Option<String>,
    pub framework: Option<Framework>,
    pub auth: Option<AuthChoice>,
    pub database: Option<DatabaseChoice>,
    pub tooling: Option<Vec<ToolingOption>>,
    pub shadcn_color: Option<String>,
    pub skip_shadcn_ops: bool,
}

/// Prompts need a terminal on both ends.
pub fn can_prompt() -> bool {
    std::io::stdin().is_terminal() && console::user_attended()
}

/// Fill every open selection with its default. The project name has no
/// default here: without a terminal there is nobody to confirm it.
pub fn from_preset(preset: Preset) -> Result<Selections> {
    let raw = preset.name.ok_or(CliError::NonInteractive)?;
    let mut selections = Selections::new(sanitize_project_name(&raw)?);
    selections.framework = preset.framework.unwrap_or_default();
    selections.auth = preset.auth.unwrap_or_default();
    selections.database = preset.database.unwrap_or_default();
    selections.tooling = dedup(preset.tooling.unwrap_or_default());
    selections.skip_shadcn_ops = preset.skip_shadcn_ops;
    selections.shadcn_color = shadcn_color(&selections, preset.shadcn_color, |_| {
        Ok(DEFAULT_SHADCN_COLOR.to_string())
    })?;
    Ok(selections)
}

/// Ask for every selection the preset leaves open.
pub fn interactive(preset: Preset) -> Result<Selections> {
    let theme = ColorfulTheme::default();

    let raw = match preset.name {
        Some(name) => name,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Project name")
            .default(DEFAULT_PROJECT_NAME.to_string())
            .validate_with(|input: &String| -> Result<(), String> {
                sanitize_project_name(input)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .interact_text()?,
    };
    let mut selections = Selections::new(sanitize_project_name(&raw)?);

    selections.framework = match preset.framework {
        Some(framework) => framework,
        None => Framework::ALL[select(&theme, "Framework", &labels(&Framework::ALL))?],
    };
    selections.auth = match preset.auth {
        Some(auth) => auth,
        None => AuthChoice::ALL[select(&theme, "Authentication", &labels(&AuthChoice::ALL))?],
    };
    selections.database = match preset.database {
        Some(database) => database,
        None => DatabaseChoice::ALL[select(&theme, "Database", &labels(&DatabaseChoice::ALL))?],
    };
    selections.tooling = match preset.tooling {
        Some(tooling) => dedup(tooling),
        None => MultiSelect::with_theme(&theme)
            .with_prompt("Tooling (space to toggle, enter to confirm)")
            .items(&labels(&ToolingOption::ALL))
            .interact()?
            .into_iter()
            .map(|index| ToolingOption::ALL[index])
            .collect(),
    };
    selections.skip_shadcn_ops = preset.skip_shadcn_ops;
    selections.shadcn_color = shadcn_color(&selections, preset.shadcn_color, |theme_default| {
        let index =
            select_with_default(&theme, "shadcn base color", &SHADCN_COLORS, theme_default)?;
        Ok(SHADCN_COLORS[index].to_string())
    })?;
    Ok(selections)
}

/// Show the summary and ask to proceed. Declining is a [`CliError::Aborted`].
pub fn confirm(items: &[String]) -> Result<()> {
    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Create project with: {}?", items.join(", ")))
        .default(true)
        .interact()?;
    if proceed {
        Ok(())
    } else {
        Err(CliError::Aborted.into())
    }
}

/// Only meaningful when shadcn was chosen; otherwise always empty.
fn shadcn_color(
    selections: &Selections,
    given: Option<String>,
    ask: impl FnOnce(usize) -> Result<String>,
) -> Result<String> {
    if !selections.has_tool(ToolingOption::Shadcn) {
        return Ok(String::new());
    }
    match given {
        Some(color) => validate_shadcn_color(&color),
        None => {
            let default_index = SHADCN_COLORS
                .iter()
                .position(|c| *c == DEFAULT_SHADCN_COLOR)
                .unwrap_or(0);
            ask(default_index)
        }
    }
}

fn labels<T: ToString>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

fn select(theme: &ColorfulTheme, prompt: &str, items: &[String]) -> Result<usize> {
    select_with_default(theme, prompt, items, 0)
}

fn select_with_default<T: std::fmt::Display>(
    theme: &ColorfulTheme,
    prompt: &str,
    items: &[T],
    default: usize,
) -> Result<usize> {
    Ok(Select::with_theme(theme)
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact()?)
}

fn dedup(tooling: Vec<ToolingOption>) -> Vec<ToolingOption> {
    let mut unique = Vec::with_capacity(tooling.len());
    for tool in tooling {
        if !unique.contains(&tool) {
            unique.push(tool);
        }
    }
    unique
}
