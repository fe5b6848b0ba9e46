//! Best-effort "open the new project in an editor".

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Editors that hand off to a running instance return quickly; anything
/// slower is left running in the background.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorLaunch {
    Opened,
    /// Reason the editor could not be started.
    Failed(String),
}

/// Run `<editor> .` inside `project_dir` with all output discarded.
pub async fn open_in_editor(editor: &str, project_dir: &Path) -> EditorLaunch {
    let mut child = match Command::new(editor)
        .arg(".")
        .current_dir(project_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(editor, error = %e, "Editor launch failed");
            return EditorLaunch::Failed(format!("could not start `{}`: {}", editor, e));
        }
    };

    match tokio::time::timeout(LAUNCH_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) if status.success() => EditorLaunch::Opened,
        Ok(Ok(status)) => EditorLaunch::Failed(format!("`{} .` exited with {}", editor, status)),
        Ok(Err(e)) => EditorLaunch::Failed(format!("`{} .` failed: {}", editor, e)),
        Err(_) => {
            tracing::debug!(editor, "Editor still running after launch timeout");
            EditorLaunch::Opened
        }
    }
}

/// Human name for the well-known editors.
pub fn editor_label(editor: &str) -> &str {
    match editor {
        "code" => "VS Code",
        "cursor" => "Cursor",
        "zed" => "Zed",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_editor_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_in_editor("definitely-not-an-editor-ekko", dir.path()).await;
        match result {
            EditorLaunch::Failed(reason) => {
                assert!(reason.contains("definitely-not-an-editor-ekko"))
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_editor() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(open_in_editor("true", dir.path()).await, EditorLaunch::Opened);
        assert!(matches!(
            open_in_editor("false", dir.path()).await,
            EditorLaunch::Failed(_)
        ));
    }

    #[test]
    fn test_editor_label() {
        assert_eq!(editor_label("code"), "VS Code");
        assert_eq!(editor_label("nvim"), "nvim");
    }
}
