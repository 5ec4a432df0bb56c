use crate::commands::{
    run_classify, run_gate_normalize, run_gate_validate, run_rubric, ClassifyArgs, GateArgs,
    RubricArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scope_advisor::config::AppConfig;
use scope_advisor::error::AppError;
use scope_advisor::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "scope-advisor",
    about = "Classify project intake into feature, epic, or program scope",
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
    /// Score an intake document and print the classification with its gate payload
    Classify(ClassifyArgs),
    /// Print the scoring rubric, or check a rubric document against the current version
    Rubric(RubricArgs),
    /// Repair or check gate payloads produced elsewhere
    Gate {
        #[command(subcommand)]
        command: GateCommand,
    },
}

#[derive(Subcommand, Debug)]
enum GateCommand {
    /// Print the fully populated payload together with every issue found
    Normalize(GateArgs),
    /// Print only the validation verdict and issues
    Validate(GateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Classify(args) => run_classify(&config, args),
        Command::Rubric(args) => run_rubric(&config, args),
        Command::Gate {
            command: GateCommand::Normalize(args),
        } => run_gate_normalize(args),
        Command::Gate {
            command: GateCommand::Validate(args),
        } => run_gate_validate(args),
    }
}
