//! Turns validated selections into an ordered list of steps.
//!
//! | Step                          | Policy | Gate read      | Gate provided   |
//! |-------------------------------|--------|----------------|-----------------|
//! | Create <framework> project    | fatal  |                | `project-ready` |
//! | Install selected dependencies | fatal  | `project-ready`|                 |
//! | Initialize shadcn (<color>)   | soft   | `project-ready`| `shadcn-ready`  |
//! | Install shadcn components     | soft   | `shadcn-ready` |                 |
//!
//! The dependency step only exists when something needs installing, and the
//! shadcn steps only when shadcn was chosen and not skipped. For TanStack
//! Start the shadcn steps collapse into a single notice.

use crate::options::{AuthChoice, DatabaseChoice, Framework, Selections, ToolingOption};
use anyhow::anyhow;
use async_trait::async_trait;
use ekko_runtime::{
    CommandSpec, Gate, PipelineContext, ProcessExecutor, Sequencer, Step, StepAction, StepContext,
    StepError, StepPolicy,
};
use std::path::{Path, PathBuf};

/// The scaffold produced a usable project directory.
pub const PROJECT_READY: Gate = Gate::new("project-ready");
/// `shadcn init` succeeded.
pub const SHADCN_READY: Gate = Gate::new("shadcn-ready");
/// Path fact: the project directory.
pub const PROJECT_DIR: &str = "project-dir";

const SHADCN_DEPENDENCIES: [&str; 5] = [
    "class-variance-authority",
    "clsx",
    "tailwindcss-animate",
    "lucide-react",
    "tailwind-merge",
];

/// Where and with what the plan runs.
#[derive(Clone)]
pub struct PlanContext {
    /// Directory the project is created in.
    pub cwd: PathBuf,
    pub package_manager: String,
    pub executor: ProcessExecutor,
}

impl PlanContext {
    pub fn new(cwd: impl Into<PathBuf>, package_manager: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            package_manager: package_manager.into(),
            executor: ProcessExecutor::default(),
        }
    }

    pub fn with_executor(mut self, executor: ProcessExecutor) -> Self {
        self.executor = executor;
        self
    }
}

/// One line of the plan as shown by `--dry-run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub title: String,
    pub policy: StepPolicy,
    /// `None` for steps that run no command.
    pub command: Option<String>,
}

pub struct Plan {
    steps: Vec<Step>,
    outline: Vec<PlanEntry>,
    project_dir: PathBuf,
}

impl Plan {
    fn new(project_dir: PathBuf) -> Self {
        Self {
            steps: Vec::new(),
            outline: Vec::new(),
            project_dir,
        }
    }

    fn push(&mut self, step: Step, command: Option<String>) {
        self.outline.push(PlanEntry {
            title: step.title().to_string(),
            policy: step.policy(),
            command,
        });
        self.steps.push(step);
    }

    pub fn outline(&self) -> &[PlanEntry] {
        &self.outline
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_sequencer(self) -> Sequencer {
        Sequencer::new(self.steps)
    }
}

/// Packages added to the scaffolded project, in install order.
pub fn collect_dependencies(selections: &Selections) -> Vec<&'static str> {
    let mut deps = Vec::new();
    if selections.has_tool(ToolingOption::Shadcn) {
        deps.extend(SHADCN_DEPENDENCIES);
    }

    match selections.auth {
        AuthChoice::Clerk => deps.push(match selections.framework {
            Framework::Next => "@clerk/nextjs",
            Framework::TanstackStart => "@clerk/clerk-react",
        }),
        AuthChoice::BetterAuth => deps.push("better-auth"),
        AuthChoice::None => {}
    }

    match selections.database {
        DatabaseChoice::Convex => deps.push("convex"),
        DatabaseChoice::Drizzle => deps.push("drizzle-orm"),
        DatabaseChoice::None => {}
    }

    if selections.has_tool(ToolingOption::ReactEmail) {
        deps.extend(["@react-email/components", "@react-email/render"]);
    }
    if selections.has_tool(ToolingOption::Resend) {
        deps.push("resend");
    }
    if selections.has_tool(ToolingOption::TanstackQuery) {
        deps.push("@tanstack/react-query");
    }
    if selections.has_tool(ToolingOption::TanstackForm) {
        deps.push("@tanstack/react-form");
    }
    deps
}

/// The generator invocation for the chosen framework, run in `cwd`.
pub fn scaffold_command(selections: &Selections, package_manager: &str, cwd: &Path) -> CommandSpec {
    let name = selections.project_name.as_str();
    let spec = match selections.framework {
        Framework::Next => CommandSpec::new(package_manager).args([
            "dlx",
            "create-next-app@latest",
            name,
            "--app",
            "--ts",
            "--tailwind",
            "--eslint",
            "--turbopack",
            "--src-dir",
            "--use-pnpm",
            "--import-alias",
            "@/*",
        ]),
        Framework::TanstackStart => {
            CommandSpec::new(package_manager).args(["create", "@tanstack/start@latest", name])
        }
    };
    spec.current_dir(cwd)
}

pub fn build_plan(selections: &Selections, cx: &PlanContext) -> Plan {
    let pm = cx.package_manager.as_str();
    let project_dir = cx.cwd.join(&selections.project_name);
    let mut plan = Plan::new(project_dir.clone());

    let scaffold = scaffold_command(selections, pm, &cx.cwd);
    let command = scaffold.display();
    plan.push(
        Step::fatal(
            format!("Create {} project", selections.framework.label()),
            Scaffold {
                executor: cx.executor.clone(),
                command: scaffold,
                project_dir,
            },
        )
        .providing(PROJECT_READY),
        Some(command),
    );

    let deps = collect_dependencies(selections);
    if !deps.is_empty() {
        let mut args = vec!["add".to_string()];
        args.extend(deps.iter().map(|dep| dep.to_string()));
        let command = ProjectCommand::new(cx, args);
        let line = command.display();
        plan.push(Step::fatal("Install selected dependencies", command), Some(line));
    }

    if selections.has_tool(ToolingOption::Shadcn) && !selections.skip_shadcn_ops {
        push_shadcn_steps(&mut plan, selections, cx);
    }
    plan
}

fn push_shadcn_steps(plan: &mut Plan, selections: &Selections, cx: &PlanContext) {
    if selections.framework != Framework::Next {
        plan.push(
            Step::soft(
                "shadcn automation",
                Notice(
                    "shadcn automation currently targets Next.js. Skipping for TanStack Start."
                        .to_string(),
                ),
            ),
            None,
        );
        return;
    }

    let pm = cx.package_manager.as_str();
    let color = selections.effective_shadcn_color();

    let init = ProjectCommand::new(
        cx,
        ["dlx", "shadcn@latest", "init", "-y", "--base-color", color],
    )
    .with_rerun_hint(format!("{} dlx shadcn@latest init", pm));
    let line = init.display();
    plan.push(
        Step::soft(format!("Initialize shadcn ({})", color), init).providing(SHADCN_READY),
        Some(line),
    );

    let add = ProjectCommand::new(cx, ["dlx", "shadcn@latest", "add", "--all", "-y"])
        .only_if(
            SHADCN_READY,
            "Skipping component installation because shadcn init failed.",
        )
        .with_rerun_hint(format!("{} dlx shadcn@latest add --all", pm));
    let line = add.display();
    plan.push(Step::soft("Install shadcn components", add), Some(line));
}

/// Runs the generator, then checks that it left a project directory behind.
struct Scaffold {
    executor: ProcessExecutor,
    command: CommandSpec,
    project_dir: PathBuf,
}

#[async_trait]
impl StepAction for Scaffold {
    async fn run(&self, cx: &mut StepContext) -> Result<(), StepError> {
        self.executor
            .run(&self.command, &cx.cancel, &cx.emit)
            .await
            .into_result()?;

        if !self.project_dir.is_dir() {
            return Err(StepError::Other(anyhow!(
                "project directory missing at {}",
                self.project_dir.display()
            )));
        }
        cx.pipeline.set_path(PROJECT_DIR, &self.project_dir);
        Ok(())
    }
}

/// A package-manager command run inside the project directory.
struct ProjectCommand {
    executor: ProcessExecutor,
    program: String,
    args: Vec<String>,
    only_if: Option<(Gate, &'static str)>,
    rerun_hint: Option<String>,
}

impl ProjectCommand {
    fn new<I, S>(cx: &PlanContext, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executor: cx.executor.clone(),
            program: cx.package_manager.clone(),
            args: args.into_iter().map(Into::into).collect(),
            only_if: None,
            rerun_hint: None,
        }
    }

    /// Skip with `notice` instead of running when `gate` is closed.
    fn only_if(mut self, gate: Gate, notice: &'static str) -> Self {
        self.only_if = Some((gate, notice));
        self
    }

    fn with_rerun_hint(mut self, hint: String) -> Self {
        self.rerun_hint = Some(hint);
        self
    }

    fn display(&self) -> String {
        CommandSpec::new(&self.program).args(&self.args).display()
    }
}

fn project_dir(pipeline: &PipelineContext) -> Result<PathBuf, StepError> {
    pipeline.require(PROJECT_READY, "project directory missing; previous step failed")?;
    pipeline
        .path(PROJECT_DIR)
        .map(Path::to_path_buf)
        .ok_or_else(|| StepError::precondition("project directory was never recorded"))
}

#[async_trait]
impl StepAction for ProjectCommand {
    async fn run(&self, cx: &mut StepContext) -> Result<(), StepError> {
        let dir = project_dir(&cx.pipeline)?;
        if let Some((gate, notice)) = self.only_if {
            if !cx.pipeline.is_open(gate) {
                cx.emit.notice(notice);
                return Ok(());
            }
        }

        let spec = CommandSpec::new(&self.program)
            .args(&self.args)
            .current_dir(&dir);
        match self.executor.run(&spec, &cx.cancel, &cx.emit).await.into_result() {
            Err(err @ StepError::ProcessExit { .. }) => match &self.rerun_hint {
                Some(hint) => {
                    cx.emit.notice(format!("You can rerun: {}", hint));
                    Err(StepError::Other(anyhow!("{}. You can rerun: {}", err, hint)))
                }
                None => Err(err),
            },
            other => other,
        }
    }
}

/// Emits one line and succeeds.
struct Notice(String);

#[async_trait]
impl StepAction for Notice {
    async fn run(&self, cx: &mut StepContext) -> Result<(), StepError> {
        cx.emit.notice(self.0.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selections() -> Selections {
        Selections::new("demo")
    }

    fn titles(plan: &Plan) -> Vec<&str> {
        plan.outline().iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_collect_dependencies_order() {
        let selections = Selections {
            auth: AuthChoice::Clerk,
            database: DatabaseChoice::Drizzle,
            tooling: ToolingOption::ALL.to_vec(),
            ..selections()
        };
        assert_eq!(
            collect_dependencies(&selections),
            vec![
                "class-variance-authority",
                "clsx",
                "tailwindcss-animate",
                "lucide-react",
                "tailwind-merge",
                "@clerk/nextjs",
                "drizzle-orm",
                "@react-email/components",
                "@react-email/render",
                "resend",
                "@tanstack/react-query",
                "@tanstack/react-form",
            ]
        );
    }

    #[test]
    fn test_clerk_package_depends_on_framework() {
        let selections = Selections {
            framework: Framework::TanstackStart,
            auth: AuthChoice::Clerk,
            database: DatabaseChoice::Convex,
            ..selections()
        };
        assert_eq!(
            collect_dependencies(&selections),
            vec!["@clerk/clerk-react", "convex"]
        );
        assert!(collect_dependencies(&Selections {
            auth: AuthChoice::BetterAuth,
            ..self::selections()
        })
        .contains(&"better-auth"));
    }

    #[test]
    fn test_scaffold_commands() {
        let next = scaffold_command(&selections(), "pnpm", Path::new("/work"));
        assert_eq!(
            next.display(),
            "pnpm dlx create-next-app@latest demo --app --ts --tailwind --eslint --turbopack --src-dir --use-pnpm --import-alias @/*"
        );
        assert_eq!(next.cwd.as_deref(), Some(Path::new("/work")));

        let tanstack = Selections {
            framework: Framework::TanstackStart,
            ..selections()
        };
        assert_eq!(
            scaffold_command(&tanstack, "pnpm", Path::new("/work")).display(),
            "pnpm create @tanstack/start@latest demo"
        );
    }

    #[test]
    fn test_minimal_plan_only_scaffolds() {
        let plan = build_plan(&selections(), &PlanContext::new("/work", "pnpm"));
        assert_eq!(titles(&plan), vec!["Create Next.js project"]);
        assert_eq!(plan.project_dir(), Path::new("/work/demo"));
        assert_eq!(plan.outline()[0].policy, StepPolicy::Fatal);
    }

    #[test]
    fn test_next_plan_with_shadcn() {
        let selections = Selections {
            tooling: vec![ToolingOption::Shadcn],
            shadcn_color: "slate".into(),
            ..selections()
        };
        let plan = build_plan(&selections, &PlanContext::new("/work", "pnpm"));
        assert_eq!(
            titles(&plan),
            vec![
                "Create Next.js project",
                "Install selected dependencies",
                "Initialize shadcn (slate)",
                "Install shadcn components",
            ]
        );
        let policies: Vec<_> = plan.outline().iter().map(|e| e.policy).collect();
        assert_eq!(
            policies,
            vec![StepPolicy::Fatal, StepPolicy::Fatal, StepPolicy::Soft, StepPolicy::Soft]
        );
        assert_eq!(
            plan.outline()[2].command.as_deref(),
            Some("pnpm dlx shadcn@latest init -y --base-color slate")
        );
    }

    #[test]
    fn test_shadcn_color_defaults_to_zinc() {
        let selections = Selections {
            tooling: vec![ToolingOption::Shadcn],
            ..selections()
        };
        let plan = build_plan(&selections, &PlanContext::new("/work", "pnpm"));
        assert!(titles(&plan).contains(&"Initialize shadcn (zinc)"));
    }

    #[test]
    fn test_skip_shadcn_ops_keeps_dependencies() {
        let selections = Selections {
            tooling: vec![ToolingOption::Shadcn],
            skip_shadcn_ops: true,
            ..selections()
        };
        let plan = build_plan(&selections, &PlanContext::new("/work", "pnpm"));
        assert_eq!(
            titles(&plan),
            vec!["Create Next.js project", "Install selected dependencies"]
        );
    }

    #[test]
    fn test_tanstack_shadcn_is_a_notice() {
        let selections = Selections {
            framework: Framework::TanstackStart,
            tooling: vec![ToolingOption::Shadcn],
            ..selections()
        };
        let plan = build_plan(&selections, &PlanContext::new("/work", "bun"));
        assert_eq!(titles(&plan)[2], "shadcn automation");
        assert_eq!(plan.outline()[2].command, None);
        assert_eq!(plan.outline()[2].policy, StepPolicy::Soft);
        assert!(
            plan.outline()[1]
                .command
                .as_deref()
                .unwrap()
                .starts_with("bun add ")
        );
    }

    #[cfg(unix)]
    mod execution {
        use super::*;
        use ekko_runtime::{Engine, NullRenderer, ProcessSpawner, RunOutcome, SystemSpawner};
        use std::sync::{Arc, Mutex};
        use tokio::process::Child;
        use tokio_util::sync::CancellationToken;

        /// Stands in for the package manager: records each command line and
        /// runs a shell snippet instead.
        struct FakePackageManager {
            fail_when: Option<&'static str>,
            calls: Arc<Mutex<Vec<String>>>,
        }

        impl ProcessSpawner for FakePackageManager {
            fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child> {
                let line = spec.args.join(" ");
                self.calls.lock().unwrap().push(line.clone());
                let script = match self.fail_when {
                    Some(needle) if line.contains(needle) => {
                        "echo 'failing on purpose' >&2; exit 1".to_string()
                    }
                    _ if line.starts_with("dlx create-next-app") => {
                        format!("echo scaffolding; mkdir -p '{}'", spec.args[2])
                    }
                    _ => "echo ok".to_string(),
                };
                let mut redirected = CommandSpec::new("sh").arg("-c").arg(script);
                redirected.cwd = spec.cwd.clone();
                SystemSpawner.spawn(&redirected)
            }
        }

        async fn run_plan(fail_when: Option<&'static str>) -> (RunOutcome, Vec<String>, usize) {
            let dir = tempfile::tempdir().unwrap();
            let calls = Arc::new(Mutex::new(Vec::new()));
            let spawner = FakePackageManager {
                fail_when,
                calls: calls.clone(),
            };
            let cx = PlanContext::new(dir.path(), "pnpm")
                .with_executor(ProcessExecutor::new(Arc::new(spawner)));
            let selections = Selections {
                tooling: vec![ToolingOption::Shadcn],
                ..Selections::new("demo")
            };

            let plan = build_plan(&selections, &cx);
            let report = Engine::new("test")
                .run(plan.into_sequencer(), CancellationToken::new(), &mut NullRenderer)
                .await;
            let calls = calls.lock().unwrap().clone();
            (report.outcome, calls, report.warnings.len())
        }

        #[tokio::test]
        async fn test_full_plan_runs_every_command() {
            let (outcome, calls, warnings) = run_plan(None).await;
            assert_eq!(outcome, RunOutcome::Completed);
            assert_eq!(warnings, 0);
            assert_eq!(calls.len(), 4);
            assert!(calls[1].starts_with("add class-variance-authority"));
            assert_eq!(calls[3], "dlx shadcn@latest add --all -y");
        }

        #[tokio::test]
        async fn test_failed_shadcn_init_skips_components() {
            let (outcome, calls, warnings) = run_plan(Some("shadcn@latest init")).await;
            assert_eq!(outcome, RunOutcome::Completed);
            assert_eq!(warnings, 1);
            assert_eq!(calls.len(), 3);
            assert!(!calls.iter().any(|c| c.contains("add --all")));
        }

        #[tokio::test]
        async fn test_failed_scaffold_stops_the_run() {
            let (outcome, calls, _) = run_plan(Some("create-next-app")).await;
            match outcome {
                RunOutcome::Failed { step, output, .. } => {
                    assert_eq!(step, "Create Next.js project");
                    assert!(output.iter().any(|line| line == "failing on purpose"));
                }
                other => panic!("Expected Failed, got {:?}", other),
            }
            assert_eq!(calls.len(), 1);
        }
    }
}
