use clap::Parser;
use ekko::errors::exit_code_for;
use ekko::options::{AuthChoice, DatabaseChoice, Framework, ToolingOption};
use ekko::ui::UiMode;
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

#[derive(Parser)]
#[command(name = "create-ekko-app")]
#[command(version, about = "Scaffold a web app with your choice of framework, auth, database and tooling")]
pub struct Cli {
    /// Project directory name (asked for when omitted)
    pub name: Option<String>,

    #[arg(long, value_enum)]
    pub framework: Option<Framework>,

    #[arg(long, value_enum)]
    pub auth: Option<AuthChoice>,

    #[arg(long, value_enum)]
    pub database: Option<DatabaseChoice>,

    /// Tooling to add; repeat or comma-separate
    #[arg(long, value_enum, value_delimiter = ',')]
    pub tool: Vec<ToolingOption>,

    /// shadcn base color: neutral, gray, zinc, stone or slate
    #[arg(long)]
    pub shadcn_color: Option<String>,

    /// Install shadcn dependencies but leave `shadcn init` and components to you
    #[arg(long)]
    pub skip_shadcn: bool,

    /// Accept defaults for everything not given and skip the confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print the steps that would run and exit
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum)]
    pub ui: Option<UiMode>,

    /// Package manager used for every command (default: pnpm)
    #[arg(long)]
    pub package_manager: Option<String>,

    /// Do not open the project in an editor afterwards
    #[arg(long)]
    pub no_editor: bool,

    /// Directory to create the project in (default: current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Config file (default: <config dir>/create-ekko-app/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write diagnostic logs to this file as JSON lines
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match ekko::logging::init_tracing(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match cmd::cmd_create(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Exiting with error");
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e).clamp(1, 255) as u8)
        }
    }
}
