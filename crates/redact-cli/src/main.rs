// crates/redact-cli/src/main.rs
//
// Thin command-line front-end over the three library crates: resolve/export/preview drive the
// event store + resolver + engine + orchestrator, track drives the tracking pipeline. No redaction
// logic lives here — this binary only parses args, wires dependencies, and reports errors.

use clap::{Parser, Subcommand};
use redact_core::event_store::EventStore;
use redact_core::registry::JobRegistry;
use redact_core::Job;
use redact_engine::external::mux::ProcessMuxTool;
use redact_engine::external::probe::ProcessProbeTool;
use redact_engine::{EngineConfig, ExportRequest, FrameStore};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "redact", about = "Offline video redaction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the active-rectangle set for every frame of an event log.
    Resolve {
        #[arg(long)]
        rectangles: PathBuf,
        #[arg(long)]
        max_frame: u64,
    },
    /// Run a full export: resolve, blur, mux.
    Export {
        #[arg(long)]
        frames_dir: PathBuf,
        #[arg(long)]
        rectangles: PathBuf,
        #[arg(long)]
        source_video: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 4)]
        max_workers: usize,
        #[arg(long, default_value_t = 15.0)]
        blur_radius: f32,
    },
    /// Like export, but capped at 200 frames starting at `start_frame`.
    Preview {
        #[arg(long)]
        frames_dir: PathBuf,
        #[arg(long)]
        rectangles: PathBuf,
        #[arg(long)]
        source_video: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        start_frame: u64,
    },
    /// Run the OCR + template tracker starting from a rectangle on `start_frame`, appending the
    /// resulting trajectory to the event log as `Moved` events on `rectangle_id` (§2, §4.E).
    Track {
        #[arg(long)]
        frames_dir: PathBuf,
        #[arg(long)]
        rectangles: PathBuf,
        #[arg(long)]
        rectangle_id: String,
        #[arg(long)]
        start_frame: u64,
        #[arg(long, allow_hyphen_values = true)]
        rect: String,
        #[arg(long)]
        frame_limit: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("REDACT_LOG"))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Resolve { rectangles, max_frame } => cmd_resolve(&rectangles, max_frame),
        Command::Export { frames_dir, rectangles, source_video, output, max_workers, blur_radius } => {
            cmd_export(&frames_dir, &rectangles, &source_video, &output, max_workers, blur_radius, None)
        }
        Command::Preview { frames_dir, rectangles, source_video, output, start_frame } => {
            cmd_export(&frames_dir, &rectangles, &source_video, &output, 4, 15.0, Some(start_frame))
        }
        Command::Track { frames_dir, rectangles, rectangle_id, start_frame, rect, frame_limit } => {
            cmd_track(&frames_dir, &rectangles, &rectangle_id, start_frame, &rect, frame_limit)
        }
    }
}

fn cmd_resolve(rectangles: &PathBuf, max_frame: u64) -> anyhow::Result<()> {
    let dir = rectangles.parent().unwrap_or(std::path::Path::new("."));
    let stem = rectangles.file_stem().unwrap_or_default().to_string_lossy().to_string();
    let store = EventStore::new(dir);
    let log = store.load(&stem)?;
    let table = redact_core::resolver::resolve(&log, max_frame);
    let mut frames: Vec<_> = table.keys().copied().collect();
    frames.sort_unstable();
    for frame in frames {
        println!("{frame}: {:?}", table[&frame]);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_export(
    frames_dir: &PathBuf,
    rectangles: &PathBuf,
    source_video: &PathBuf,
    output: &PathBuf,
    max_workers: usize,
    blur_radius: f32,
    preview_start: Option<u64>,
) -> anyhow::Result<()> {
    let rect_dir = rectangles.parent().unwrap_or(std::path::Path::new("."));
    let stem = rectangles.file_stem().unwrap_or_default().to_string_lossy().to_string();
    let event_store = EventStore::new(rect_dir);
    let log = event_store.load(&stem)?;

    let frame_store = FrameStore::new(frames_dir);
    let dest_dir_name = format!("{}_blurred", frames_dir.file_name().unwrap_or_default().to_string_lossy());
    let dest_dir = frames_dir.parent().unwrap_or(std::path::Path::new(".")).join(dest_dir_name);

    let config = EngineConfig { max_workers, blur_radius, ..EngineConfig::default() };

    let registry = JobRegistry::<Job>::new();
    let job_id = Uuid::new_v4();
    registry.create(Job::new(job_id, "now"));

    let req = ExportRequest {
        source_video: source_video.clone(),
        frame_store: &frame_store,
        dest_dir,
        event_log: &log,
        trim: None,
        output_path: output.clone(),
    };

    let probe_tool = ProcessProbeTool::new();
    let mux_tool = ProcessMuxTool::new(Duration::from_millis(500));

    let result = match preview_start {
        Some(start) => {
            redact_engine::run_preview(&req, start, &config, &probe_tool, &mux_tool, job_id, &registry)
        }
        None => redact_engine::run_export(&req, &config, &probe_tool, &mux_tool, job_id, &registry),
    };

    match result {
        Ok(()) => {
            let job = registry.get(job_id).expect("job just created");
            println!("job {job_id} {:?}: {}", job.status, job.message);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_track(
    frames_dir: &PathBuf,
    rectangles: &PathBuf,
    rectangle_id: &str,
    start_frame: u64,
    rect: &str,
    frame_limit: Option<u64>,
) -> anyhow::Result<()> {
    let parts: Vec<i64> = rect.split(',').map(|s| s.trim().parse()).collect::<Result<_, _>>()?;
    anyhow::ensure!(parts.len() == 4, "--rect must be \"x,y,w,h\"");
    let initial_rect = redact_core::Rectangle::new(parts[0], parts[1], parts[2], parts[3]);

    let store = FrameStore::new(frames_dir);
    let ocr = redact_tracking::ocr::LeptessOcrEngine::new()?;
    let config = redact_tracking::TrackingConfig::default();
    let req = redact_tracking::TrackRequest {
        rectangle_id: rectangle_id.to_string(),
        initial_rect,
        start_frame,
        frame_limit,
    };
    let never_cancel = || false;

    let results = redact_tracking::track(&store, &ocr, &config, &req, &never_cancel)?;

    let rect_dir = rectangles.parent().unwrap_or(std::path::Path::new("."));
    let stem = rectangles.file_stem().unwrap_or_default().to_string_lossy().to_string();
    let event_store = EventStore::new(rect_dir);
    let mut log = event_store.load(&stem)?;

    for result in &results {
        println!(
            "frame {} rect {:?} confidence {:.2} method {:?}",
            result.frame, result.rect, result.confidence, result.method
        );
        // §2/§4.E: the caller folds each emitted result back into a `Moved` event on the same
        // rectangle id that seeded the tracker — the resolver (§4.C) is the only thing that
        // interprets these events from here on.
        log.push_event(
            result.frame,
            redact_core::Event::Moved {
                id: req.rectangle_id.clone(),
                x: result.rect.x,
                y: result.rect.y,
                width: result.rect.w,
                height: result.rect.h,
            },
        );
    }
    event_store.save(&stem, &log)?;

    Ok(())
}
