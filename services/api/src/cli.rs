use crate::demo::{run_demo, DemoArgs};
use crate::rubric::{run_rubric_check, RubricCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use qualify::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Qualification Scoring Service",
    about = "Manage qualification rubrics and score opportunities from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Offline rubric tooling
    Rubric {
        #[command(subcommand)]
        command: RubricCommand,
    },
    /// Walk through saving, scoring, and re-versioning a rubric
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RubricCommand {
    /// Import a rubric CSV and validate it against the configured weight policy
    Check(RubricCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Organizations to seed with the default MEDDPICC rubric at startup
    #[arg(long = "seed-org")]
    pub(crate) seed_orgs: Vec<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rubric {
            command: RubricCommand::Check(args),
        } => run_rubric_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
