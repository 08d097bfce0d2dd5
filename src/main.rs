use anyhow::Context;
use clap::Parser;
use rubric_eval::config::Config;
use rubric_eval::output::{self, OutputFormat};
use rubric_eval::{RemoteScoringEngine, RubricEvaluator, RunOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Rubric Evaluation CLI - Grade model answers against golden answers with a judge model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file
    run_file: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log each stage and generation request
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "rubric_eval=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_file(&args.run_file)?;

    let engine = RemoteScoringEngine::new(config.scoring.endpoint.clone(), config.scoring.api_key()?);
    let mut evaluator = RubricEvaluator::new(Arc::new(engine))
        .with_generation_concurrency(config.generation_concurrency)?;

    if let Some(student_model) = config.student_model.clone() {
        evaluator = evaluator.with_student_model(student_model);
    }
    if let Some(run_policy) = config.run_policy {
        evaluator = evaluator.with_run_policy(run_policy);
    }
    if let Some(inference) = &config.inference {
        evaluator = evaluator.with_inference_client(Arc::new(inference.client()?));
    }

    let result = evaluator
        .run(config.dataset_value()?, RunOptions::new())
        .await
        .with_context(|| format!("Evaluation failed for {}", args.run_file.display()))?;

    output::print_result(&result, args.output);

    Ok(())
}
