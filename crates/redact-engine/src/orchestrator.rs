//! The export orchestrator (§4.G): sequences probe → resolve → process → mux, and implements the
//! audio-passthrough fallback (§4.G step 5, §7 `MuxerError`).

use crate::config::EngineConfig;
use crate::engine::{self, ProcessOutcome, TrimWindow};
use crate::error::{EngineError, Result};
use crate::external::mux::{MuxProgress, MuxSpec, MuxTool};
use crate::external::probe::ProbeTool;
use crate::frame_store::FrameStore;
use redact_core::registry::JobRegistry;
use redact_core::resolver::resolve;
use redact_core::{EventLog, Job, JobStatus};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Caps preview exports to a bounded window (§4.G preview variant).
pub const PREVIEW_MAX_FRAMES: u64 = 200;

pub struct ExportRequest<'a> {
    pub source_video: PathBuf,
    pub frame_store: &'a FrameStore,
    pub dest_dir: PathBuf,
    pub event_log: &'a EventLog,
    pub trim: Option<TrimWindow>,
    pub output_path: PathBuf,
}

/// Runs a full export: probe, resolve, process, mux. The resolver always walks from frame 0 even
/// for a trimmed/preview window, so carry-forward state entering the window is correct (§4.G).
pub fn run_export(
    req: &ExportRequest,
    config: &EngineConfig,
    probe_tool: &dyn ProbeTool,
    mux_tool: &dyn MuxTool,
    job_id: Uuid,
    registry: &JobRegistry<Job>,
) -> Result<()> {
    registry.update(job_id, |job| job.status = JobStatus::Analyzing);
    let stream_info = probe_tool.probe(&req.source_video)?;

    let max_index = req.frame_store.max_index()?.unwrap_or(0);
    let active_sets = resolve(req.event_log, max_index);

    let trim = req.trim.unwrap_or_else(|| TrimWindow::full(max_index));

    let outcome = engine::process(
        req.frame_store,
        &req.dest_dir,
        &active_sets,
        config,
        trim,
        job_id,
        registry,
    )?;

    if outcome == ProcessOutcome::Cancelled {
        return Ok(());
    }

    registry.update(job_id, |job| job.status = JobStatus::Encoding);

    let spec = MuxSpec {
        frame_pattern: req.dest_dir.join("frame_%06d.jpg"),
        start_number: crate::frame_store::frame_index_to_file_number(trim.start),
        fps: stream_info.fps,
        audio_source: stream_info.has_audio.then(|| req.source_video.clone()),
        output_path: req.output_path.clone(),
    };

    let has_audio = mux_with_fallback(mux_tool, &spec, config, job_id, registry)?;

    registry.update(job_id, |job| {
        job.status = JobStatus::Completed;
        job.progress = 100.0;
        job.export_path = Some(job.export_path.clone().unwrap_or_else(|| req.output_path.display().to_string()));
        job.has_audio = Some(has_audio);
    });

    Ok(())
}

/// Preview variant: identical flow but capped at `PREVIEW_MAX_FRAMES` and writing to a
/// preview-specific path; see `run_export` for the shared resolver/process/mux sequencing.
pub fn run_preview(
    req: &ExportRequest,
    start_frame: u64,
    config: &EngineConfig,
    probe_tool: &dyn ProbeTool,
    mux_tool: &dyn MuxTool,
    job_id: Uuid,
    registry: &JobRegistry<Job>,
) -> Result<()> {
    let end_frame = start_frame.saturating_add(PREVIEW_MAX_FRAMES.saturating_sub(1));
    let trim = TrimWindow { start: start_frame, end: end_frame };
    let preview_req = ExportRequest { trim: Some(trim), ..clone_request(req) };
    run_export(&preview_req, config, probe_tool, mux_tool, job_id, registry)
}

fn clone_request<'a>(req: &ExportRequest<'a>) -> ExportRequest<'a> {
    ExportRequest {
        source_video: req.source_video.clone(),
        frame_store: req.frame_store,
        dest_dir: req.dest_dir.clone(),
        event_log: req.event_log,
        trim: req.trim,
        output_path: req.output_path.clone(),
    }
}

/// Invokes the muxer; on failure whose stderr mentions "audio" or "stream", retries exactly once
/// without audio mapping (§4.G step 5, §7). Returns whether the final attempt included audio.
fn mux_with_fallback(
    mux_tool: &dyn MuxTool,
    spec: &MuxSpec,
    config: &EngineConfig,
    job_id: Uuid,
    registry: &JobRegistry<Job>,
) -> Result<bool> {
    let mut on_progress = |update: MuxProgress| {
        let encoding_progress = update.frame as f32;
        registry.update(job_id, |job| {
            job.encoding_progress = Some(encoding_progress);
            job.progress = config.blended_progress(encoding_progress.min(100.0));
        });
    };

    match mux_tool.mux(spec, &mut on_progress) {
        Ok(()) => Ok(spec.audio_source.is_some()),
        Err(EngineError::Muxer(stderr)) if spec.audio_source.is_some() && is_audio_related(&stderr) => {
            tracing::warn!(job = %job_id, "mux failed on audio stream, retrying without audio");
            let retry_spec = MuxSpec { audio_source: None, ..spec.clone() };
            mux_tool.mux(&retry_spec, &mut on_progress)?;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn is_audio_related(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("audio") || lower.contains("stream")
}
