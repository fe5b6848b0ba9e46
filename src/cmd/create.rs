//! The scaffolding run: collect selections, build the plan, drive it.

use anyhow::{Context, Result};
use console::style;
use ekko::editor::{EditorLaunch, editor_label, open_in_editor};
use ekko::errors::CliError;
use ekko::options::Selections;
use ekko::plan::{Plan, PlanContext, build_plan};
use ekko::prompt::{self, Preset};
use ekko::settings::{CliOverrides, Settings, SettingsFile};
use ekko::summary::{build_summary_items, editor_hint, next_steps};
use ekko::ui::icons::{CHECK, FOLDER, ROCKET, WARN};
use ekko::ui::{UiMode, renderer_for};
use ekko_runtime::{Engine, Layout, LayoutEvent, RunOutcome, StepPolicy};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::super::Cli;

const HEADER: &str = "create-ekko-app";
const RESIZE_POLL: Duration = Duration::from_millis(250);

pub async fn cmd_create(cli: &Cli) -> Result<()> {
    let cwd = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let file = SettingsFile::load_or_default(cli.config.as_deref())?;
    let settings = Settings::resolve(
        file,
        &CliOverrides {
            package_manager: cli.package_manager.clone(),
            ui: cli.ui,
            no_editor: cli.no_editor,
        },
    );
    tracing::debug!(?settings, cwd = %cwd.display(), "Resolved settings");

    let interactive = !cli.yes && prompt::can_prompt();
    let preset = preset_from(cli);
    let selections = if interactive {
        prompt::interactive(preset)?
    } else {
        prompt::from_preset(preset)?
    };
    tracing::info!(?selections, "Selections collected");

    let plan = build_plan(
        &selections,
        &PlanContext::new(&cwd, settings.package_manager.as_str()),
    );
    let ui_mode = settings.ui_mode.effective(console::user_attended());

    if cli.dry_run {
        print_plan(&selections, &plan);
        return Ok(());
    }

    if interactive {
        prompt::confirm(&build_summary_items(&selections))?;
    }
    ensure_target_available(plan.project_dir())?;

    let project_dir = plan.project_dir().to_path_buf();
    let report = drive(plan, &settings, ui_mode).await;

    match report.outcome {
        RunOutcome::Completed => {
            finish_success(&selections, &settings, &project_dir, ui_mode).await;
            Ok(())
        }
        RunOutcome::Failed { step, reason, .. } => Err(CliError::RunFailed { step, reason }.into()),
        RunOutcome::Cancelled => Err(CliError::RunCancelled.into()),
    }
}

fn preset_from(cli: &Cli) -> Preset {
    Preset {
        name: cli.name.clone(),
        framework: cli.framework,
        auth: cli.auth,
        database: cli.database,
        tooling: (!cli.tool.is_empty() || cli.yes).then(|| cli.tool.clone()),
        shadcn_color: cli.shadcn_color.clone(),
        skip_shadcn_ops: cli.skip_shadcn,
    }
}

/// Refuse to scaffold over an existing, non-empty directory.
fn ensure_target_available(project_dir: &Path) -> Result<()> {
    if !project_dir.exists() {
        return Ok(());
    }
    let mut entries = std::fs::read_dir(project_dir)
        .with_context(|| format!("Failed to read {}", project_dir.display()))?;
    if entries.next().is_some() {
        anyhow::bail!(
            "Directory {} already exists and is not empty",
            project_dir.display()
        );
    }
    Ok(())
}

fn print_plan(selections: &Selections, plan: &Plan) {
    println!(
        "{} {}",
        style("Plan for").bold(),
        style(&selections.project_name).cyan().bold()
    );
    println!("  {}{}", FOLDER, plan.project_dir().display());
    println!("  {}", build_summary_items(selections).join(", "));
    println!();
    for (i, entry) in plan.outline().iter().enumerate() {
        let policy = match entry.policy {
            StepPolicy::Fatal => style("fatal").red(),
            StepPolicy::Soft => style("soft").yellow(),
        };
        println!("  {}. {} [{}]", i + 1, entry.title, policy);
        if let Some(command) = &entry.command {
            println!("     {}", style(format!("$ {}", command)).dim());
        }
    }
}

async fn drive(plan: Plan, settings: &Settings, ui_mode: UiMode) -> ekko_runtime::RunReport {
    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_handler(cancel.clone());

    let watchers = CancellationToken::new();
    let (layout_tx, layout_rx) = mpsc::unbounded_channel();
    let initial = current_size();
    let resize = spawn_resize_watcher(layout_tx, watchers.clone(), initial);
    let layout = initial
        .map(|(width, height)| Layout::new(width, height))
        .unwrap_or_default();

    let mut renderer = renderer_for(ui_mode);
    let report = Engine::new(HEADER)
        .with_tuning(settings.tuning)
        .with_layout(layout)
        .with_layout_events(layout_rx)
        .run(plan.into_sequencer(), cancel, &mut *renderer)
        .await;

    watchers.cancel();
    interrupt.abort();
    let _ = resize.await;
    report
}

/// Ctrl-C cancels the run instead of killing the process.
fn spawn_interrupt_handler(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    })
}

fn current_size() -> Option<(u16, u16)> {
    terminal_size::terminal_size().map(|(width, height)| (width.0, height.0))
}

fn spawn_resize_watcher(
    tx: UnboundedSender<LayoutEvent>,
    stop: CancellationToken,
    mut last: Option<(u16, u16)>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RESIZE_POLL);
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = interval.tick() => {
                    let size = current_size();
                    if size.is_none() || size == last {
                        continue;
                    }
                    last = size;
                    if let Some((width, height)) = size {
                        if tx.send(LayoutEvent::Resize { width, height }).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    })
}

async fn finish_success(
    selections: &Selections,
    settings: &Settings,
    project_dir: &Path,
    ui_mode: UiMode,
) {
    let human = ui_mode != UiMode::Json;
    if human {
        println!();
        println!("{}{}", ROCKET, style("Done! Your app is ready.").green().bold());
        println!("{}", style("Next steps:").underlined());
        for step in next_steps(&selections.project_name, &settings.package_manager) {
            println!("  {}", style(step).cyan());
        }
    }

    let Some(editor) = settings.editor.as_deref() else {
        return;
    };
    let outcome = open_in_editor(editor, project_dir).await;
    if !human {
        return;
    }
    match outcome {
        EditorLaunch::Opened => println!(
            "{}Opened in {} ({} .).",
            CHECK,
            editor_label(editor),
            editor
        ),
        EditorLaunch::Failed(reason) => {
            tracing::debug!(%reason, "Editor not opened");
            println!(
                "{}Could not open {}. Run: {}",
                WARN,
                editor_label(editor),
                style(editor_hint(&selections.project_name, editor)).cyan()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_available_when_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_target_available(&dir.path().join("demo")).is_ok());
        assert!(ensure_target_available(dir.path()).is_ok());
    }

    #[test]
    fn test_target_rejected_when_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let err = ensure_target_available(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }
}
