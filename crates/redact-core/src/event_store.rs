//! The rectangle event store (§4.B): loads and saves the event log JSON. I/O failures surface as
//! `RedactError::Storage`; malformed JSON surfaces as `RedactError::Schema`. A load either
//! succeeds completely or not at all — there is no partial commit.

use crate::error::{RedactError, Result};
use crate::types::EventLog;
use std::path::{Path, PathBuf};

/// Reads and writes `rectangles_<stem>.json` files beside a frames root, per §6.
pub struct EventStore {
    root: PathBuf,
}

impl EventStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, video_stem: &str) -> PathBuf {
        self.root.join(format!("rectangles_{video_stem}.json"))
    }

    /// Returns an empty log (named after `video_stem`) if the file does not exist. Rejects
    /// unknown `eventType` tags rather than silently dropping them, via serde's untagged-variant
    /// failure on `Event`, and rejects a log whose frames aren't sorted ascending (§4.B
    /// "validates structure") — the resolver assumes that ordering and never re-sorts.
    pub fn load(&self, video_stem: &str) -> Result<EventLog> {
        let path = self.path_for(video_stem);
        if !path.exists() {
            return Ok(EventLog::new(format!("{video_stem}.mp4")));
        }
        let bytes = std::fs::read(&path)?;
        let log: EventLog = serde_json::from_slice(&bytes)?;
        validate(&log)?;
        Ok(log)
    }

    /// Serializes `log` as pretty-printed UTF-8 JSON and writes it atomically: write to a temp
    /// file in the same directory, then rename over the destination, so a crash mid-write never
    /// leaves a truncated `rectangles_*.json` behind.
    pub fn save(&self, video_stem: &str, log: &EventLog) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(video_stem);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(log)?;
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// Validates the basic shape the resolver assumes: frames sorted ascending, no duplicate
/// `(frame_number)` entries that would make iteration order ambiguous across runs.
pub fn validate(log: &EventLog) -> Result<()> {
    let mut prev: Option<u64> = None;
    for frame in &log.frames {
        if let Some(p) = prev {
            if frame.frame_number < p {
                return Err(RedactError::input(format!(
                    "event log frames out of order: {} after {}",
                    frame.frame_number, p
                )));
            }
        }
        prev = Some(frame.frame_number);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, FrameEvents};

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path());
        let log = EventLog {
            video_name: "clip.mp4".into(),
            timestamp: Some("2026-01-01T00:00:00Z".into()),
            frames: vec![FrameEvents {
                frame_number: 0,
                events: vec![Event::Created { id: "a".into(), x: 1, y: 2, width: 3, height: 4 }],
            }],
        };
        store.save("clip", &log).unwrap();
        let loaded = store.load("clip").unwrap();
        assert_eq!(loaded.video_name, log.video_name);
        assert_eq!(loaded.frames.len(), 1);
        assert_eq!(loaded.frames[0].frame_number, 0);
    }

    #[test]
    fn load_missing_file_returns_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path());
        let log = store.load("nonexistent").unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn load_rejects_out_of_order_frames() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path());
        let path = dir.path().join("rectangles_clip.json");
        std::fs::write(
            &path,
            r#"{"video_name":"clip.mp4","frames":[
                {"frame_number":10,"events":[]},
                {"frame_number":5,"events":[]}
            ]}"#,
        )
        .unwrap();
        assert!(store.load("clip").is_err());
    }

    #[test]
    fn load_rejects_unknown_event_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path());
        let path = dir.path().join("rectangles_clip.json");
        std::fs::write(
            &path,
            r#"{"video_name":"clip.mp4","frames":[{"frame_number":0,"events":[{"eventType":"rectangleTeleported","rectangleId":"a"}]}]}"#,
        )
        .unwrap();
        assert!(store.load("clip").is_err());
    }
}
