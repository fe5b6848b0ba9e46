//! Text shown before and after a run.

use crate::options::{AuthChoice, DatabaseChoice, Selections, ToolingOption};

/// One row per selection, in the order they were asked for.
pub fn build_summary_items(selections: &Selections) -> Vec<String> {
    let mut items = vec![
        selections.project_name.clone(),
        selections.framework.label().to_string(),
    ];

    if selections.auth != AuthChoice::None {
        items.push(selections.auth.label().to_string());
    }
    if selections.database != DatabaseChoice::None {
        items.push(selections.database.label().to_string());
    }

    for tool in &selections.tooling {
        let label = match tool {
            ToolingOption::Shadcn if !selections.shadcn_color.is_empty() => {
                format!("shadcn ({})", selections.shadcn_color)
            }
            other => other.label().to_string(),
        };
        items.push(label);
    }
    items
}

/// Commands to run once the project exists.
pub fn next_steps(project_name: &str, package_manager: &str) -> Vec<String> {
    vec![
        format!("cd {}", project_name),
        format!("{} dev", package_manager),
    ]
}

/// Shown when the editor could not be launched.
pub fn editor_hint(project_name: &str, editor: &str) -> String {
    format!("cd {} && {} .", project_name, editor)
}
