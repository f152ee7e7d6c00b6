//! Six-stage conversion workflow.
//!
//! ```text
//! fetch -> analyze -> plan -> convert -> assemble -> complete
//!   5-15     18-38    40-45    45-83      85-92      terminal
//! ```
//!
//! Each stage emits progress inside its percentage band. Per-file work in
//! `analyze` and `convert` fans out over every file at once; the shared
//! [`Gateway`] semaphore bounds how many calls actually run. Progress is
//! emitted in completion order from the job's own task, so percentages are
//! non-decreasing.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use jacport_core::conversion::{mean_confidence, round2, SourceFile};
use jacport_core::event::{CompleteData, ProgressData};
use jacport_core::plan::ConversionPlan;
use jacport_core::preview::Preview;
use jacport_core::role::FileRole;
use jacport_core::types::{JobId, Stage};
use jacport_events::{JobEmitter, JobRegistry};
use jacport_github::repo::repo_display_name;
use jacport_github::{FileFilter, SourceFetcher};
use jacport_llm::{CompletionRequest, Gateway};

use crate::archive::{self, ArchiveContents};
use crate::config::PipelineConfig;
use crate::convert::{convert_file, FileConversion};
use crate::error::PipelineError;
use crate::prompts;

// ---------------------------------------------------------------------------
// Progress bands
// ---------------------------------------------------------------------------

const FETCH_START_PCT: u8 = 5;
const FETCH_DONE_PCT: u8 = 15;
const ANALYZE_START_PCT: u8 = 18;
const ANALYZE_SPAN: u8 = 20;
const PLAN_START_PCT: u8 = 40;
const PLAN_DONE_PCT: u8 = 45;
const CONVERT_START_PCT: u8 = 45;
const CONVERT_SPAN: u8 = 38;
const ASSEMBLE_START_PCT: u8 = 85;
const ARCHIVE_PCT: u8 = 92;

/// Linear position of `done / total` inside a band, rounded down.
fn band_pct(start: u8, span: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return start.saturating_add(span);
    }
    let offset = (done.min(total) * usize::from(span)) / total;
    start.saturating_add(offset as u8)
}

const CLASSIFY_TEMPERATURE: f32 = 0.1;
const PLAN_TEMPERATURE: f32 = 0.2;
const README_TEMPERATURE: f32 = 0.3;
const DEMO_TEMPERATURE: f32 = 0.1;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A submitted conversion.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub job_id: JobId,
    pub repo_url: String,
    pub include_tests: bool,
    /// Model override; the gateway default is used when `None`.
    pub model: Option<String>,
}

/// Shared, stateless runner for conversion jobs.
pub struct Pipeline {
    gateway: Arc<Gateway>,
    source: Arc<dyn SourceFetcher>,
    registry: Arc<JobRegistry>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        gateway: Arc<Gateway>,
        source: Arc<dyn SourceFetcher>,
        registry: Arc<JobRegistry>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            gateway,
            source,
            registry,
            config,
        }
    }

    /// Run `job` to completion, emitting exactly one terminal event.
    ///
    /// Never returns an error: fatal failures, and panics inside a stage,
    /// become the job's terminal `error` event.
    pub async fn run(&self, job: ConversionJob, emitter: JobEmitter) {
        tracing::info!(job_id = %job.job_id, url = %job.repo_url, "Pipeline started");

        let outcome = AssertUnwindSafe(self.execute(&job, &emitter))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Internal(panic_message(panic.as_ref()))));

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    job_id = %job.job_id,
                    total_files = summary.total_files,
                    avg_confidence = summary.avg_confidence,
                    "Pipeline complete",
                );
                emitter.complete(summary);
            }
            Err(e) => {
                tracing::error!(job_id = %job.job_id, error = %e, "Pipeline failed");
                emitter.fail(e.to_string());
            }
        }
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        emitter: &JobEmitter,
    ) -> Result<CompleteData, PipelineError> {
        let model = job
            .model
            .clone()
            .unwrap_or_else(|| self.gateway.default_model().to_string());
        let repo_name = repo_display_name(&job.repo_url);

        // --- fetch ---
        emitter.status(Stage::Fetch, FETCH_START_PCT, "Connecting to GitHub...");
        let mut files = self.fetch(job).await?;
        emitter.status(
            Stage::Fetch,
            FETCH_DONE_PCT,
            format!("Found {} Python files in '{repo_name}'", files.len()),
        );

        // --- analyze ---
        emitter.status(Stage::Analyze, ANALYZE_START_PCT, "Analyzing file roles...");
        let roles = self
            .within_stage(Stage::Analyze, self.analyze(&model, &files, emitter))
            .await?;
        for (file, role) in files.iter_mut().zip(roles) {
            file.role = role;
        }
        tracing::info!(job_id = %job.job_id, "Analysis complete");

        // --- plan ---
        emitter.status(Stage::Plan, PLAN_START_PCT, "Building OSP plan...");
        let plan = self
            .within_stage(Stage::Plan, self.plan(&model, &repo_name, &files))
            .await?;
        plan.apply_order(&mut files, |f| f.path.as_str());
        emitter.status(
            Stage::Plan,
            PLAN_DONE_PCT,
            format!("Plan ready - {} nodes mapped", plan.nodes.len()),
        );

        // --- convert ---
        let plan_context = plan.to_context();
        let conversions = self
            .within_stage(
                Stage::Convert,
                self.convert(&model, &files, &plan_context, emitter),
            )
            .await?;
        for (file, conversion) in files.iter_mut().zip(conversions) {
            conversion.apply_to(file);
        }
        tracing::info!(job_id = %job.job_id, "All files converted");

        // --- assemble ---
        emitter.status(Stage::Assemble, ASSEMBLE_START_PCT, "Generating README...");
        let (readme, demo_script) = self
            .within_stage(Stage::Assemble, self.documents(&model, &repo_name, &files))
            .await?;

        emitter.status(Stage::Assemble, ARCHIVE_PCT, "Building ZIP...");
        let contents = ArchiveContents {
            files: files
                .iter()
                .map(|f| (f.target_path(), f.generated.clone()))
                .collect(),
            readme: readme.clone(),
            demo_script: demo_script.clone(),
        };
        let archive = archive::write_archive(&self.config.output_dir, &job.job_id, contents).await?;

        self.registry
            .set_preview(&job.job_id, Preview::build(&files, &readme, &demo_script))
            .await;
        self.registry.set_output(&job.job_id, archive).await;

        // --- complete ---
        Ok(CompleteData {
            download_url: format!("/api/download/{}", job.job_id),
            total_files: files.len(),
            avg_confidence: round2(mean_confidence(&files)),
        })
    }

    /// Apply the optional per-stage timeout to `stage_work`.
    async fn within_stage<T>(
        &self,
        stage: Stage,
        stage_work: impl Future<Output = T>,
    ) -> Result<T, PipelineError> {
        match self.config.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, stage_work)
                .await
                .map_err(|_| PipelineError::StageTimeout { stage, limit }),
            None => Ok(stage_work.await),
        }
    }

    async fn fetch(&self, job: &ConversionJob) -> Result<Vec<SourceFile>, PipelineError> {
        let filter = FileFilter::new(job.include_tests);
        let fetch = self
            .source
            .fetch_files(&job.repo_url, &filter, self.config.max_files);
        let remote = self.within_stage(Stage::Fetch, fetch).await??;

        if remote.is_empty() {
            return Err(PipelineError::NoFiles);
        }

        let files: Vec<SourceFile> = remote
            .into_iter()
            .take(self.config.max_files)
            .map(|f| SourceFile::new(f.path, f.content))
            .collect();
        tracing::info!(job_id = %job.job_id, count = files.len(), "Fetched files");
        Ok(files)
    }

    /// Classify every file concurrently. Failures default to [`FileRole::Util`].
    async fn analyze(
        &self,
        model: &str,
        files: &[SourceFile],
        emitter: &JobEmitter,
    ) -> Vec<FileRole> {
        let total = files.len();
        let mut roles = vec![FileRole::default(); total];

        let mut pending: FuturesUnordered<_> = files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let request = CompletionRequest::new(
                    "classify",
                    model,
                    prompts::classify_role(&file.path, &file.content),
                )
                .with_temperature(CLASSIFY_TEMPERATURE);
                async move { (index, self.gateway.generate(request).await) }
            })
            .collect();

        let mut done = 0;
        while let Some((index, result)) = pending.next().await {
            let file = &files[index];
            let role = match result {
                Ok(answer) => FileRole::from_response(&answer),
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "Role classification failed, using util");
                    FileRole::default()
                }
            };
            roles[index] = role;
            done += 1;
            emitter.progress(
                ProgressData::new(
                    Stage::Analyze,
                    band_pct(ANALYZE_START_PCT, ANALYZE_SPAN, done, total),
                    file.path.clone(),
                )
                .with_role(role),
            );
        }
        roles
    }

    /// Request the mapping plan, falling back to an empty plan in input order.
    async fn plan(&self, model: &str, repo_name: &str, files: &[SourceFile]) -> ConversionPlan {
        let request = CompletionRequest::new("plan", model, prompts::mapping_plan(repo_name, files))
            .with_temperature(PLAN_TEMPERATURE);

        let parsed = match self.gateway.generate(request).await {
            Ok(raw) => ConversionPlan::parse(&raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(plan) => {
                tracing::info!(nodes = plan.nodes.len(), walkers = plan.walkers.len(), "Plan ready");
                plan
            }
            Err(e) => {
                tracing::error!(error = %e, "Plan failed, keeping input order");
                ConversionPlan::fallback(files.iter().map(|f| f.path.as_str()))
            }
        }
    }

    /// Convert every file concurrently, in completion order.
    async fn convert(
        &self,
        model: &str,
        files: &[SourceFile],
        plan_context: &str,
        emitter: &JobEmitter,
    ) -> Vec<FileConversion> {
        let total = files.len();
        tracing::info!(
            total,
            max_parallel = self.gateway.available_permits(),
            "Converting files"
        );

        let mut pending: FuturesUnordered<_> = files
            .iter()
            .enumerate()
            .map(|(index, file)| async move {
                let conversion = convert_file(
                    &self.gateway,
                    model,
                    file,
                    plan_context,
                    self.config.max_retries,
                )
                .await;
                (index, conversion)
            })
            .collect();

        let mut results: Vec<Option<FileConversion>> = vec![None; total];
        let mut done = 0;
        while let Some((index, conversion)) = pending.next().await {
            done += 1;
            emitter.progress(
                ProgressData::new(
                    Stage::Convert,
                    band_pct(CONVERT_START_PCT, CONVERT_SPAN, done, total),
                    files[index].path.clone(),
                )
                .with_result(round2(conversion.confidence), conversion.validated),
            );
            results[index] = Some(conversion);
        }
        drop(pending);

        results.into_iter().flatten().collect()
    }

    /// Generate the README and demo script concurrently, each with a fallback.
    async fn documents(&self, model: &str, repo_name: &str, files: &[SourceFile]) -> (String, String) {
        let readme = async {
            let request = CompletionRequest::new("readme", model, prompts::readme(repo_name, files))
                .with_temperature(README_TEMPERATURE);
            self.gateway.generate(request).await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "README generation failed, using fallback");
                prompts::fallback_readme(repo_name)
            })
        };
        let demo = async {
            let request = CompletionRequest::new("demo", model, prompts::demo_script(repo_name))
                .with_temperature(DEMO_TEMPERATURE);
            self.gateway.generate(request).await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Demo script generation failed, using fallback");
                prompts::FALLBACK_DEMO.to_string()
            })
        };
        tokio::join!(readme, demo)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "stage panicked".to_string())
}
