// Cut orchestrator - Runs delete requests through planning, transcoding and reporting

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::model::{DeleteRequest, ExecutionStrategy, OutputFormat};
use crate::domain::rules::IntervalMerger;
use crate::engine::fallback::FallbackCutter;
use crate::engine::filter_graph::FilterGraphBuilder;
use crate::engine::transcode::SinglePassCutter;
use crate::engine::{EncodingConfig, JobReporter};
use crate::error::{CutXError, CutXResult};
use crate::events::ProgressHub;
use crate::planner::strategy::StrategySelector;
use crate::planner::{CutPlan, CutPlanner};
use crate::ports::{ProbePort, TranscodePort};
use crate::utils::path::{absolutize, cut_output_path};

#[cfg(test)]
mod tests;

/// A request to cut `deletes` out of `source`
#[derive(Debug, Clone)]
pub struct CutRequest {
    pub source: PathBuf,
    pub deletes: DeleteRequest,
    pub format: OutputFormat,
}

impl CutRequest {
    pub fn new(source: impl Into<PathBuf>, deletes: DeleteRequest, format: OutputFormat) -> Self {
        Self {
            source: source.into(),
            deletes,
            format,
        }
    }
}

/// Returned to the submitter once a job is running
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobAccepted {
    pub job_id: String,
    pub output: PathBuf,
    pub format: OutputFormat,
}

/// Result of a finished job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutOutcome {
    pub job_id: String,
    pub output: PathBuf,
    /// Output size in bytes
    pub size: u64,
    /// Probed output duration in seconds
    pub duration: f64,
    /// Strategy that produced the output
    pub strategy: ExecutionStrategy,
    pub segments: usize,
}

/// Tunables the orchestrator needs from the configuration
#[derive(Debug, Clone)]
pub struct CutSettings {
    pub planner: CutPlanner,
    pub graph: FilterGraphBuilder,
    pub encoding: EncodingConfig,
    pub audit_file: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl CutSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            planner: CutPlanner::new(
                IntervalMerger::new(config.cut.buffer_secs())
                    .with_min_keep(config.cut.crossfade_secs()),
                StrategySelector::new(config.cut.max_segments),
            ),
            graph: FilterGraphBuilder::new(config.cut.crossfade_secs()),
            encoding: config.encoding.clone(),
            audit_file: Some(config.cut.audit_file.clone()),
            work_dir: config.cut.work_dir.clone(),
            output_dir: config.cut.output_dir.clone(),
        }
    }
}

struct Inner {
    probe: Arc<dyn ProbePort>,
    transcoder: Arc<dyn TranscodePort>,
    hub: ProgressHub,
    settings: CutSettings,
    in_flight: Mutex<HashSet<PathBuf>>,
    next_job: AtomicU64,
}

/// Releases an output path from the in-flight set when dropped
struct InFlightGuard {
    inner: Arc<Inner>,
    key: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Interactor for the cut use case.
///
/// Cloning is cheap; clones share the hub, the ports and the set of outputs
/// currently being written.
#[derive(Clone)]
pub struct CutOrchestrator {
    inner: Arc<Inner>,
}

impl CutOrchestrator {
    /// Create new orchestrator with injected ports
    pub fn new(
        probe: Arc<dyn ProbePort>,
        transcoder: Arc<dyn TranscodePort>,
        hub: ProgressHub,
        settings: CutSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe,
                transcoder,
                hub,
                settings,
                in_flight: Mutex::new(HashSet::new()),
                next_job: AtomicU64::new(1),
            }),
        }
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.inner.hub
    }

    pub fn settings(&self) -> &CutSettings {
        &self.inner.settings
    }

    /// Number of jobs currently running
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Validate and start a cut in the background.
    ///
    /// Errors here mean no job was started. Once accepted, the outcome is
    /// only reported through the hub.
    pub fn submit(&self, request: CutRequest) -> CutXResult<JobAccepted> {
        let (job_id, output, guard) = self.prepare(&request)?;
        let accepted = JobAccepted {
            job_id: job_id.clone(),
            output: output.clone(),
            format: request.format,
        };

        let this = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let _ = this.run(&job_id, &request, &output).await;
        });
        Ok(accepted)
    }

    /// Run a cut in the foreground. Events are broadcast as for `submit`.
    pub async fn execute(&self, request: CutRequest) -> CutXResult<CutOutcome> {
        let (job_id, output, _guard) = self.prepare(&request)?;
        self.run(&job_id, &request, &output).await
    }

    fn prepare(&self, request: &CutRequest) -> CutXResult<(String, PathBuf, InFlightGuard)> {
        if request.source.as_os_str().is_empty() {
            return Err(CutXError::validation("source path is empty"));
        }
        if !request.source.is_file() {
            return Err(CutXError::validation(format!(
                "source file not found: {}",
                request.source.display()
            )));
        }

        let settings = &self.inner.settings;
        let output = cut_output_path(&request.source, request.format, settings.output_dir.as_deref())?;
        let guard = self.acquire(&output)?;

        if let Some(audit_file) = &settings.audit_file {
            write_audit_file(audit_file, &request.deletes)?;
        }

        let seq = self.inner.next_job.fetch_add(1, Ordering::Relaxed);
        let job_id = format!("{}-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"), seq);
        info!(
            job = %job_id,
            source = %request.source.display(),
            output = %output.display(),
            deletes = request.deletes.len(),
            format = %request.format,
            "Cut accepted"
        );
        Ok((job_id, output, guard))
    }

    fn acquire(&self, output: &Path) -> CutXResult<InFlightGuard> {
        let key = absolutize(output)?;
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(key.clone()) {
            return Err(CutXError::JobInFlight {
                path: output.display().to_string(),
            });
        }
        Ok(InFlightGuard {
            inner: Arc::clone(&self.inner),
            key,
        })
    }

    /// Run the job and turn its result into the terminal event
    async fn run(&self, job_id: &str, request: &CutRequest, output: &Path) -> CutXResult<CutOutcome> {
        let mut reporter = JobReporter::new(self.inner.hub.clone(), job_id);
        let result = self.run_job(request, output, &mut reporter).await;
        match &result {
            Ok(outcome) => {
                reporter.complete(outcome.output.clone(), outcome.size, outcome.duration)
            }
            Err(e) => reporter.error(e.to_string()),
        }
        result
    }

    async fn run_job(
        &self,
        request: &CutRequest,
        output: &Path,
        reporter: &mut JobReporter,
    ) -> CutXResult<CutOutcome> {
        let inner = &self.inner;
        let source_duration = inner.probe.probe_duration(&request.source).await?;
        let plan = inner.settings.planner.plan(&request.deletes, source_duration)?;

        reporter.start(plan.keep.len());
        let strategy = self.realize(request, output, &plan, reporter).await?;

        let size = tokio::fs::metadata(output)
            .await
            .map_err(|e| CutXError::probe(format!("cannot stat {}: {}", output.display(), e)))?
            .len();
        let duration = inner.probe.probe_duration(output).await?;

        Ok(CutOutcome {
            job_id: reporter.job_id().to_string(),
            output: output.to_path_buf(),
            size,
            duration,
            strategy,
            segments: plan.keep.len(),
        })
    }

    /// Run the planned strategy; a failed single pass is retried once
    /// segment by segment.
    async fn realize(
        &self,
        request: &CutRequest,
        output: &Path,
        plan: &CutPlan,
        reporter: &mut JobReporter,
    ) -> CutXResult<ExecutionStrategy> {
        let settings = &self.inner.settings;
        let transcoder = self.inner.transcoder.as_ref();
        let fallback = FallbackCutter::new(transcoder, &settings.encoding, settings.work_dir.as_deref());

        if plan.strategy == ExecutionStrategy::SinglePass {
            let single = SinglePassCutter::new(transcoder, settings.graph, &settings.encoding);
            match single
                .cut(&request.source, output, &plan.keep, request.format, reporter)
                .await
            {
                Ok(()) => return Ok(ExecutionStrategy::SinglePass),
                Err(e) if e.is_transcode() => {
                    warn!(job = %reporter.job_id(), "Single-pass cut failed: {}", e);
                    reporter.info("single-pass cut failed, retrying segment by segment");
                }
                Err(e) => return Err(e),
            }
        }

        fallback
            .cut(&request.source, output, &plan.keep, request.format, reporter)
            .await?;
        Ok(ExecutionStrategy::Fallback)
    }
}

fn write_audit_file(path: &Path, deletes: &DeleteRequest) -> CutXResult<()> {
    let json = serde_json::to_string_pretty(deletes)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}
