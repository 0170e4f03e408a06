use crate::cli::ModelArgs;
use crate::infra::{load_config, load_service, LiveService};
use clap::Args;
use riskflow::error::AppError;
use riskflow::scoring::{
    BatchReport, BatchScorer, FeatureRow, ProbabilityModel, ScoringResult, ScoringService,
    REQUIRED_FEATURES,
};
use riskflow::telemetry;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding one applicant object
    #[arg(long)]
    pub(crate) input: PathBuf,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreBatchArgs {
    /// CSV export whose header row names the features
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Write the result CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let service = prepare_service(&args.model)?;
    let result = score_applicant_file(&service, &args.input)?;

    let rendered = serde_json::to_string_pretty(&result)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_score_batch(args: ScoreBatchArgs) -> Result<(), AppError> {
    let service = prepare_service(&args.model)?;
    let report = BatchScorer::new(service.as_ref()).score_path(&args.input)?;

    match &args.output {
        Some(path) => {
            report.write_csv(File::create(path)?)?;
            println!("{}", batch_summary(&report));
            println!("Results written to {}", path.display());
        }
        None => report.write_csv(std::io::stdout().lock())?,
    }

    Ok(())
}

pub(crate) fn run_features() -> Result<(), AppError> {
    for name in REQUIRED_FEATURES {
        println!("{name}");
    }
    Ok(())
}

fn prepare_service(overrides: &ModelArgs) -> Result<Arc<LiveService>, AppError> {
    let config = load_config(overrides)?;
    telemetry::init(&config.telemetry)?;
    load_service(&config.scoring)
}

pub(crate) fn score_applicant_file<M>(
    service: &ScoringService<M>,
    path: &Path,
) -> Result<ScoringResult, AppError>
where
    M: ProbabilityModel,
{
    let file = File::open(path)?;
    let features: FeatureRow = serde_json::from_reader(BufReader::new(file))?;
    Ok(service.score(&features)?)
}

pub(crate) fn batch_summary(report: &BatchReport) -> String {
    format!(
        "Scored {} of {} applicants ({} failed) at {}",
        report.scored(),
        report.rows.len(),
        report.failed(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
