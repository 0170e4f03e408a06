use crate::commands::{run_features, run_score, run_score_batch, ScoreArgs, ScoreBatchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use riskflow::error::AppError;
use riskflow::scoring::RiskPolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "RiskFlow",
    about = "Score credit applicants over HTTP or from the command line",
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
    /// Score a single applicant read from a JSON file and print the result
    Score(ScoreArgs),
    /// Score every applicant in a CSV export
    ScoreBatch(ScoreBatchArgs),
    /// Print the feature names every scoring request must carry
    Features,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

/// Overrides shared by every command that loads the model.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ModelArgs {
    /// Path to the logistic model artifact
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
    /// Risk tier policy: score_table or probability_bands
    #[arg(long)]
    pub(crate) policy: Option<RiskPolicy>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::ScoreBatch(args) => run_score_batch(args),
        Command::Features => run_features(),
    }
}
