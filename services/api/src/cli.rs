use crate::apply::{run_apply, ApplyArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use vault_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Vault Intake",
    about = "Run the Vault evaluation relay or submit an application from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the evaluation relay (default command)
    Serve(ServeArgs),
    /// Fill in and submit a credit application against a running relay
    Apply(ApplyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Synthesize outcomes locally instead of calling the upstream service
    #[arg(long)]
    pub(crate) simulate: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Apply(args) => run_apply(args).await,
    }
}
