//! Read-only catalog of per-frame JPEG files (§4.A). Extraction by the external frame extractor
//! is the only writer, done before any job starts — this store never writes to the source
//! frame folder.

use crate::error::{EngineError, Result};
use std::path::{Path, PathBuf};

const FRAME_FILE_PREFIX: &str = "frame_";
const FRAME_FILE_DIGITS: usize = 6;

/// `file_number = frame_index + 1` (§3) — the one place that crosses this boundary.
pub fn frame_index_to_file_number(frame_index: u64) -> u64 {
    frame_index + 1
}

pub fn file_number_to_frame_index(file_number: u64) -> Option<u64> {
    file_number.checked_sub(1)
}

pub fn frame_file_name(frame_index: u64) -> String {
    format!("{FRAME_FILE_PREFIX}{:0width$}.jpg", frame_index_to_file_number(frame_index), width = FRAME_FILE_DIGITS)
}

pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ordered, 0-based frame indices present on disk. Finite and restartable — re-reading the
    /// directory always yields the same answer for a frame folder that is no longer being
    /// extracted into.
    pub fn list(&self) -> Result<Vec<u64>> {
        let mut indices = Vec::new();
        if !self.dir.exists() {
            return Ok(indices);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(idx) = parse_frame_file_name(&name) {
                indices.push(idx);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    pub fn read(&self, frame_index: u64) -> Result<Vec<u8>> {
        let path = self.path_for(frame_index);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FrameNotFound(path.display().to_string())
            } else {
                EngineError::Io(e)
            }
        })
    }

    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.dir.join(frame_file_name(frame_index))
    }

    pub fn total_frames(&self) -> Result<u64> {
        Ok(self.list()?.len() as u64)
    }

    pub fn max_index(&self) -> Result<Option<u64>> {
        Ok(self.list()?.into_iter().max())
    }
}

fn parse_frame_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_prefix(FRAME_FILE_PREFIX)?;
    let stem = stem.strip_suffix(".jpg")?;
    if stem.len() != FRAME_FILE_DIGITS {
        return None;
    }
    let file_number: u64 = stem.parse().ok()?;
    file_number_to_frame_index(file_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_file_number_round_trip() {
        assert_eq!(frame_index_to_file_number(0), 1);
        assert_eq!(file_number_to_frame_index(1), Some(0));
        assert_eq!(frame_file_name(0), "frame_000001.jpg");
        assert_eq!(frame_file_name(99), "frame_000100.jpg");
    }

    #[test]
    fn list_reads_only_well_formed_frame_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame_000001.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("frame_000003.jpg"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        let store = FrameStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec![0, 2]);
        assert_eq!(store.total_frames().unwrap(), 2);
    }

    #[test]
    fn read_missing_frame_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        let err = store.read(0).unwrap_err();
        assert!(matches!(err, EngineError::FrameNotFound(_)));
    }
}
