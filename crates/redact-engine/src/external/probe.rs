//! `probe(path) -> stream info` (§6, §9). The real implementation shells out to `ffprobe -of json`;
//! a `FakeProbeTool` lives in `#[cfg(test)]` callers for hermetic tests.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub duration_secs: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub pix_fmt: Option<String>,
    pub video_codec: Option<String>,
    pub has_audio: bool,
    pub bit_rate: Option<u64>,
}

pub trait ProbeTool: Send + Sync {
    fn probe(&self, path: &Path) -> Result<StreamInfo>;
}

/// Shells out to `ffprobe -v quiet -print_format json -show_streams -show_format`.
pub struct ProcessProbeTool {
    binary: String,
}

impl ProcessProbeTool {
    pub fn new() -> Self {
        Self { binary: "ffprobe".into() }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for ProcessProbeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeTool for ProcessProbeTool {
    fn probe(&self, path: &Path) -> Result<StreamInfo> {
        let output = Command::new(&self.binary)
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| EngineError::Muxer(format!("failed to spawn ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(EngineError::Muxer(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        parse_ffprobe_json(&output.stdout)
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: String,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    pix_fmt: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

fn parse_ffprobe_json(stdout: &[u8]) -> Result<StreamInfo> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(stdout).map_err(|e| EngineError::Muxer(format!("malformed ffprobe json: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| EngineError::Muxer("no video stream found".into()))?;
    let has_audio = parsed.streams.iter().any(|s| s.codec_type == "audio");

    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .unwrap_or(0.0);

    let duration_secs = video
        .duration
        .as_deref()
        .or_else(|| parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(StreamInfo {
        duration_secs,
        fps,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        pix_fmt: video.pix_fmt.clone(),
        video_codec: video.codec_name.clone(),
        has_audio,
        bit_rate: video.bit_rate.as_deref().and_then(|s| s.parse().ok()),
    })
}

/// `r_frame_rate` comes back as a rational string, e.g. `"30000/1001"`.
fn parse_rational(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_frame_rate() {
        assert_eq!(parse_rational("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("garbage"), None);
    }

    #[test]
    fn parses_ffprobe_json_with_audio() {
        let json = br#"{
            "streams": [
                {"codec_type":"video","r_frame_rate":"30/1","width":1920,"height":1080,"duration":"10.0","pix_fmt":"yuv420p","codec_name":"h264","bit_rate":"500000"},
                {"codec_type":"audio"}
            ],
            "format": {"duration":"10.0"}
        }"#;
        let info = parse_ffprobe_json(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!(info.has_audio);
        assert_eq!(info.fps, 30.0);
    }

    #[test]
    fn parses_ffprobe_json_without_video_errors() {
        let json = br#"{"streams":[{"codec_type":"audio"}]}"#;
        assert!(parse_ffprobe_json(json).is_err());
    }
}
