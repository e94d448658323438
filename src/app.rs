use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::domain::synthesis::{
    BatchCoordinator, InputUnit, ItemFailure, RealtimeSynthesizer, ResultDownloader, RunReport,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::{load_voice_config, Config};
use crate::infrastructure::input::collect_input_files;
use crate::infrastructure::repositories::{
    AzureBatchRepository, AzureTtsRepository, BatchSynthesisRepository, TtsRepository,
};
use crate::infrastructure::storage::ArtifactStore;

/// Wire repositories into services and run the mode the CLI asked for
pub async fn handle_run(cli: &Cli, mut config: Config) -> AppResult<()> {
    if let Some(region) = &cli.azure_region {
        config.azure_region = region.clone();
    }
    if let Some(endpoint) = &cli.azure_endpoint {
        config.azure_endpoint = endpoint.clone();
    }

    let http_client = reqwest::Client::new();
    let batch_repo: Arc<dyn BatchSynthesisRepository> = Arc::new(AzureBatchRepository::new(
        http_client.clone(),
        config.batch_synthesis_url(),
        config.resource_key.clone(),
        config.output_format.clone(),
    ));

    if cli.list_only {
        return list_jobs(batch_repo.as_ref()).await;
    }

    let input = cli
        .input
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("no input given".to_string()))?;
    let files = collect_input_files(input)?;
    if files.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "no .txt files found in {}",
            input.display()
        )));
    }

    let voice_config = Arc::new(load_voice_config(&cli.config)?);

    tracing::info!(
        input = %input.display(),
        files = files.len(),
        output = %cli.output.display(),
        realtime = cli.realtime,
        "Starting voice synthesis"
    );

    if cli.realtime {
        let tts_repo: Arc<dyn TtsRepository> = Arc::new(AzureTtsRepository::new(
            http_client,
            config.realtime_tts_url(),
            config.resource_key.clone(),
            config.output_format.clone(),
        ));
        run_realtime(tts_repo, &config, cli.output.clone(), files, voice_config).await
    } else {
        run_batch(batch_repo, &config, cli, files, voice_config).await
    }
}

async fn list_jobs(repo: &dyn BatchSynthesisRepository) -> AppResult<()> {
    tracing::info!("Listing jobs");
    let jobs = repo
        .list_jobs()
        .await
        .map_err(|e| AppError::Remote(format!("error listing batch synthesis jobs: {}", e)))?;

    let count = jobs.as_array().map(Vec::len).unwrap_or(0);
    let pretty = serde_json::to_string_pretty(&jobs)
        .map_err(|e| AppError::Remote(format!("unprintable job listing: {}", e)))?;
    println!("Listed batch synthesis jobs successfully, got {} jobs:", count);
    println!("{}", pretty);
    Ok(())
}

async fn run_batch(
    repo: Arc<dyn BatchSynthesisRepository>,
    config: &Config,
    cli: &Cli,
    files: Vec<PathBuf>,
    voice_config: Arc<Value>,
) -> AppResult<()> {
    let mut units = Vec::with_capacity(files.len());
    let mut unreadable = Vec::new();
    for file in files {
        match InputUnit::from_file(&file).await {
            Ok(unit) => units.push(unit),
            Err(e) => {
                tracing::error!(source = %file.display(), error = %e, "Cannot read input");
                unreadable.push(ItemFailure::new(file.display().to_string(), e.to_string()));
            }
        }
    }

    let store = ArtifactStore::new(&cli.output, &config.pipeline.archive_entry_extension);
    let downloader = Arc::new(ResultDownloader::new(Arc::clone(&repo), store));
    let coordinator = BatchCoordinator::new(repo, downloader, config.pipeline.clone())
        .with_verbose(cli.debug);

    let mut report = coordinator.run(units, voice_config).await;
    report.inputs += unreadable.len();
    report.submission_failures.extend(unreadable);

    finish_batch(report, cli)
}

fn finish_batch(report: RunReport, cli: &Cli) -> AppResult<()> {
    println!("{}", report);

    if report.is_success() {
        tracing::info!(
            downloads = report.downloads_succeeded,
            input = ?cli.input,
            output = %cli.output.display(),
            "Batch run complete"
        );
        return Ok(());
    }

    if report.timed_out() {
        return Err(AppError::Incomplete(format!(
            "download phase timed out with {} item(s) unresolved",
            report.downloads_pending
        )));
    }

    Err(AppError::Incomplete(format!(
        "{} item(s) unresolved",
        report.unresolved_count()
    )))
}

async fn run_realtime(
    tts_repo: Arc<dyn TtsRepository>,
    config: &Config,
    output_dir: PathBuf,
    files: Vec<PathBuf>,
    voice_config: Arc<Value>,
) -> AppResult<()> {
    let synthesizer = RealtimeSynthesizer::new(
        tts_repo,
        output_dir,
        config.pipeline.chunk_size,
        config.audio_extension(),
        config.pipeline.realtime_concurrency,
    );

    let report = synthesizer.run(files, voice_config).await;
    println!("{}", report);

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::Incomplete(format!(
            "{} file(s) failed realtime synthesis",
            report.failures.len()
        )))
    }
}
