use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use taskline::data::FileSource;
use taskline::pipeline::loader::load_pipeline_from_yaml;
use taskline::pipeline::Pipeline;
use taskline::recommender::BaselineTrainer;
use taskline::runtime::fs_store::FsStore;
use taskline::runtime::identity::Params;
use taskline::runtime::runner::{Runner, TaskStatus};
use taskline::runtime::sweep::{select_best, VariantSweep};
use taskline::tasks::{
    movie_pipeline, GetDataTask, MapMovieIdsTask, PreProcessTask, TrainModelTask,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline up to a target task
    Run {
        /// Path to a pipeline YAML file (defaults to the built-in movie pipeline)
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Target task kind
        #[arg(long, short, default_value = TrainModelTask::KIND)]
        target: String,

        /// Parameter bindings for the target task (key=value)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        vars: Vec<(String, serde_json::Value)>,

        /// Ratings file (user::movie::rating::timestamp lines); only
        /// needed when the ingest task actually has to run
        #[arg(long)]
        data: Option<PathBuf>,

        /// Directory for cached task results
        #[arg(long, default_value = ".taskline")]
        store_dir: PathBuf,
    },

    /// Train several model variants and report the one with the lowest RMSE
    Sweep {
        /// Path to a pipeline YAML file (defaults to the built-in movie pipeline)
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Target task kind
        #[arg(long, short, default_value = TrainModelTask::KIND)]
        target: String,

        /// Model variants to train
        #[arg(long = "model", default_values_t = ["svd".to_string(), "svdpp".to_string(), "nmf".to_string()])]
        models: Vec<String>,

        /// Ratings file (user::movie::rating::timestamp lines); only
        /// needed when the ingest task actually has to run
        #[arg(long)]
        data: Option<PathBuf>,

        /// Directory for cached task results
        #[arg(long, default_value = ".taskline")]
        store_dir: PathBuf,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value binding: {}", s))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn build_runner(data: &Option<PathBuf>, store_dir: &PathBuf) -> Result<Runner> {
    let store = Arc::new(FsStore::new(store_dir.clone()).context("Failed to open result store")?);
    let mut runner = Runner::new(store);
    // Without a ratings file the ingest task stays unregistered; that only
    // matters if the pipeline actually schedules it.
    if let Some(data) = data {
        runner.register_task(Arc::new(GetDataTask::new(Arc::new(FileSource::new(
            data.clone(),
        )))));
    }
    runner.register_task(Arc::new(PreProcessTask));
    runner.register_task(Arc::new(MapMovieIdsTask));
    runner.register_task(Arc::new(TrainModelTask::new(Arc::new(BaselineTrainer))));
    Ok(runner)
}

/// A scheduled-but-unregistered ingest task means the caller has to point
/// us at a ratings file.
fn explain_missing_data(err: taskline::error::PipelineError, data: &Option<PathBuf>) -> anyhow::Error {
    match &err {
        taskline::error::PipelineError::UnknownTask(kind)
            if kind == GetDataTask::KIND && data.is_none() =>
        {
            anyhow::anyhow!("task `{}` needs to run but no ratings file was given; pass --data", kind)
        }
        _ => err.into(),
    }
}

fn load_pipeline(file: &Option<PathBuf>) -> Result<Pipeline> {
    match file {
        Some(path) => load_pipeline_from_yaml(path),
        None => Ok(movie_pipeline()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            target,
            vars,
            data,
            store_dir,
        } => {
            let pipeline = load_pipeline(&file)?;
            let runner = build_runner(&data, &store_dir)?;

            let pipeline = if vars.is_empty() {
                pipeline
            } else {
                let mut params: Params = pipeline.identity(&target)?.params;
                for (key, value) in vars {
                    params.insert(key, value);
                }
                pipeline.with_params(&target, params)?
            };

            let report = runner
                .run(&pipeline, &target)
                .await
                .map_err(|e| explain_missing_data(e, &data))?;
            for entry in &report.entries {
                match &entry.status {
                    TaskStatus::Skipped => info!(task = %entry.id, "skipped (cached)"),
                    TaskStatus::Completed => info!(task = %entry.id, "completed"),
                    TaskStatus::Failed(e) => error!(task = %entry.id, error = %e, "task failed"),
                }
            }
            if !report.is_success() {
                bail!("pipeline run failed");
            }
            println!("run {} finished: {} task(s)", report.run_id, report.entries.len());
        }

        Commands::Sweep {
            file,
            target,
            models,
            data,
            store_dir,
        } => {
            let pipeline = load_pipeline(&file)?;
            let runner = build_runner(&data, &store_dir)?;

            let mut sweep = VariantSweep::new(&target);
            for model in &models {
                let mut params = Params::new();
                params.insert(
                    TrainModelTask::PARAM_MODEL.to_string(),
                    serde_json::Value::String(model.clone()),
                );
                sweep = sweep.variant(model, params);
            }

            let report = sweep
                .run(&runner, &pipeline)
                .await
                .map_err(|e| explain_missing_data(e, &data))?;
            if !report.is_success() {
                for run in &report.runs {
                    for (id, err) in run.report.failures() {
                        error!(variant = %run.name, task = %id, error = %err, "task failed");
                    }
                }
                bail!("sweep failed");
            }

            let store = runner.store();
            let outputs = report.output_load(store.as_ref()).await?;
            let metas = report.output_load_meta(store.as_ref()).await?;

            let mut scores = Vec::with_capacity(metas.len());
            for (variant, meta) in &metas {
                let rmse = meta
                    .get("rmse")
                    .and_then(|v| v.as_f64())
                    .with_context(|| format!("variant {} reported no rmse", variant))?;
                println!("variant {:<8} rmse {:.4}", variant, rmse);
                scores.push((variant.clone(), rmse));
            }

            match select_best(&outputs, &scores) {
                Some((best, _)) => {
                    println!("The model with least RMSE is deployed which is {}", best)
                }
                None => bail!("sweep produced no variants"),
            }
        }
    }

    Ok(())
}
