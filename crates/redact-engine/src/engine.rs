//! The parallel frame-processing engine (§4.D): a bounded worker pool that renders blurred
//! frames, reports progress, and honors cooperative cancellation.
//!
//! Workers are independent and share only read-only access to the active-set table and blur
//! radius; the job record is the sole piece of shared mutable state, touched only through
//! `JobRegistry::update` for brief field writes (§4.D concurrency contract).

use crate::blur;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::frame_store::FrameStore;
use rayon::prelude::*;
use redact_core::registry::JobRegistry;
use redact_core::{ActiveSetTable, Job, JobStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct TrimWindow {
    pub start: u64,
    pub end: u64,
}

impl TrimWindow {
    pub fn full(max_index: u64) -> Self {
        Self { start: 0, end: max_index }
    }

    fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(EngineError::BadTrim { start: self.start, end: self.end });
        }
        Ok(())
    }
}

/// Runs the blur pipeline over every frame in `trim`, writing results into `dest_dir`. Returns
/// `Cancelled` rather than an error when the job is cancelled mid-run (§4.D cancellation).
pub fn process(
    source: &FrameStore,
    dest_dir: &Path,
    active_sets: &ActiveSetTable,
    config: &EngineConfig,
    trim: TrimWindow,
    job_id: Uuid,
    registry: &JobRegistry<Job>,
) -> Result<ProcessOutcome> {
    trim.validate()?;
    std::fs::create_dir_all(dest_dir)?;

    let all_indices = source.list()?;
    let indices: Vec<u64> =
        all_indices.into_iter().filter(|i| *i >= trim.start && *i <= trim.end).collect();
    let total = indices.len() as u64;

    registry.update(job_id, |job| {
        job.status = JobStatus::ProcessingFrames;
        job.total_frames = Some(total);
        job.processed_frames = Some(0);
    });

    let processed = AtomicU64::new(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_workers.max(1))
        .build()
        .map_err(|e| EngineError::Frame(e.to_string()))?;

    let cancelled_flag = std::sync::atomic::AtomicBool::new(false);

    pool.install(|| {
        indices.par_iter().for_each(|&frame_index| {
            if cancelled_flag.load(Ordering::Relaxed) {
                return;
            }
            if registry.is_cancelled(job_id) {
                cancelled_flag.store(true, Ordering::Relaxed);
                return;
            }

            match process_one_frame(source, dest_dir, active_sets, config.blur_radius, frame_index) {
                Ok(()) => {
                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    // Raw frame-processing percentage. The orchestrator rescales this into its
                    // own overall-progress span and blends it with mux progress (§4.G, §10.4) —
                    // this module only knows about its own share of the work.
                    let frame_progress = if total == 0 { 100.0 } else { 100.0 * done as f32 / total as f32 };
                    registry.update(job_id, |job| {
                        job.processed_frames = Some(done);
                        job.progress = (frame_progress / 100.0 * config.frame_processing_progress_span)
                            .min(config.frame_processing_progress_span);
                    });
                }
                Err(e) => {
                    cancelled_flag.store(true, Ordering::Relaxed);
                    registry.update(job_id, |job| {
                        job.status = JobStatus::Error;
                        job.error = Some(e.to_string());
                        job.message = e.to_string();
                    });
                }
            }
        });
    });

    if registry.get(job_id).map(|j| j.status == JobStatus::Error).unwrap_or(false) {
        return Err(EngineError::Frame("frame processing failed".into()));
    }

    if cancelled_flag.load(Ordering::Relaxed) {
        registry.update(job_id, |job| {
            job.status = JobStatus::Cancelled;
        });
        return Ok(ProcessOutcome::Cancelled);
    }

    Ok(ProcessOutcome::Success)
}

fn process_one_frame(
    source: &FrameStore,
    dest_dir: &Path,
    active_sets: &ActiveSetTable,
    blur_radius: f32,
    frame_index: u64,
) -> Result<()> {
    let dest_path: PathBuf = dest_dir.join(crate::frame_store::frame_file_name(frame_index));
    let active = active_sets.get(&frame_index).filter(|a| !a.is_empty());

    match active {
        None => {
            // No active rectangles: copy source bytes verbatim, no decode (§4.D step 4).
            std::fs::copy(source.path_for(frame_index), &dest_path)?;
        }
        Some(active_set) => {
            let bytes = source.read(frame_index)?;
            let mut image = blur::decode(&bytes)?;
            blur::apply_blur(&mut image, active_set, blur_radius);
            let encoded = blur::encode_jpeg(&image)?;
            std::fs::write(&dest_path, encoded)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba};
    use redact_core::Rectangle;

    fn write_frames(dir: &Path, count: u64) {
        for i in 0..count {
            let img = DynamicImage::ImageRgba8(image::ImageBuffer::from_pixel(40, 40, Rgba([1, 2, 3, 255])));
            let bytes = blur::encode_jpeg(&img).unwrap();
            std::fs::write(dir.join(crate::frame_store::frame_file_name(i)), bytes).unwrap();
        }
    }

    #[test]
    fn copies_frames_with_no_active_rectangles() {
        let src_dir = tempfile::tempdir().unwrap();
        write_frames(src_dir.path(), 5);
        let dest_dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(src_dir.path());
        let config = EngineConfig::default();
        let registry = JobRegistry::<Job>::new();
        let job_id = Uuid::new_v4();
        registry.create(Job::new(job_id, "now"));

        let outcome = process(
            &store,
            dest_dir.path(),
            &ActiveSetTable::new(),
            &config,
            TrimWindow::full(4),
            job_id,
            &registry,
        )
        .unwrap();

        assert_eq!(outcome, ProcessOutcome::Success);
        for i in 0..5 {
            assert!(dest_dir.path().join(crate::frame_store::frame_file_name(i)).exists());
        }
        let job = registry.get(job_id).unwrap();
        assert_eq!(job.processed_frames, Some(5));
    }

    #[test]
    fn progress_ends_non_decreasing() {
        let src_dir = tempfile::tempdir().unwrap();
        write_frames(src_dir.path(), 10);
        let dest_dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(src_dir.path());
        let mut active_sets = ActiveSetTable::new();
        let mut active = redact_core::ActiveSet::new();
        active.insert("a".into(), Rectangle::new(0, 0, 5, 5));
        active_sets.insert(3, active);
        let config = EngineConfig::default();
        let registry = JobRegistry::<Job>::new();
        let job_id = Uuid::new_v4();
        registry.create(Job::new(job_id, "now"));

        process(&store, dest_dir.path(), &active_sets, &config, TrimWindow::full(9), job_id, &registry)
            .unwrap();

        let job = registry.get(job_id).unwrap();
        assert_eq!(job.processed_frames, Some(10));
        assert!(job.progress > 0.0);
    }

    #[test]
    fn bad_trim_window_rejected() {
        let src_dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(src_dir.path());
        let dest_dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::<Job>::new();
        let job_id = Uuid::new_v4();
        registry.create(Job::new(job_id, "now"));
        let err = process(
            &store,
            dest_dir.path(),
            &ActiveSetTable::new(),
            &EngineConfig::default(),
            TrimWindow { start: 10, end: 5 },
            job_id,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BadTrim { .. }));
    }
}
