//! Plain data types shared across the workspace: rectangles, the event log, active sets,
//! tracking results and job records. No behavior lives here beyond small constructors —
//! the algorithms that operate on these types live in `resolver` and `registry`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type RectangleId = String;
pub type FrameIndex = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rectangle {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Clamps this rectangle to `[0, width] x [0, height]`, returning `None` if the clamped
    /// result has zero area (degenerate — silently skipped per the blur pipeline's contract).
    pub fn clamp_to(&self, width: i64, height: i64) -> Option<Rectangle> {
        let x0 = self.x.clamp(0, width);
        let y0 = self.y.clamp(0, height);
        let x1 = (self.x + self.w).clamp(0, width);
        let y1 = (self.y + self.h).clamp(0, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rectangle::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn center(&self) -> (i64, i64) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// A new rectangle at `(x, y)` keeping this one's width and height, padded by `padding` on
    /// every side. Used for the tracker's "expand current rect by N px" stage-1 region.
    pub fn padded(&self, padding: i64) -> Rectangle {
        Rectangle::new(
            self.x - padding,
            self.y - padding,
            self.w + padding * 2,
            self.h + padding * 2,
        )
    }
}

/// A single rectangle lifecycle event, tagged the way the persisted JSON tags it
/// (`eventType`). Variants carry only the fields the wire format carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum Event {
    #[serde(rename = "rectangleCreated")]
    Created {
        #[serde(rename = "rectangleId")]
        id: RectangleId,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    #[serde(rename = "rectangleMoved")]
    Moved {
        #[serde(rename = "rectangleId")]
        id: RectangleId,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    #[serde(rename = "rectangleResized")]
    Resized {
        #[serde(rename = "rectangleId")]
        id: RectangleId,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    #[serde(rename = "rectangleDeleted")]
    Deleted {
        #[serde(rename = "rectangleId")]
        id: RectangleId,
    },
}

impl Event {
    pub fn id(&self) -> &RectangleId {
        match self {
            Event::Created { id, .. }
            | Event::Moved { id, .. }
            | Event::Resized { id, .. }
            | Event::Deleted { id } => id,
        }
    }

    pub fn rect(&self) -> Option<Rectangle> {
        match self {
            Event::Created { x, y, width, height, .. }
            | Event::Moved { x, y, width, height, .. }
            | Event::Resized { x, y, width, height, .. } => {
                Some(Rectangle::new(*x, *y, *width, *height))
            }
            Event::Deleted { .. } => None,
        }
    }
}

/// One frame's worth of events, as persisted: `{ "frame_number": N, "events": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvents {
    pub frame_number: FrameIndex,
    pub events: Vec<Event>,
}

/// The on-disk event log shape, `rectangles_<stem>.json`. `frames` is kept sorted ascending
/// by `frame_number`; within one frame, event order is preserved exactly as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pub video_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub frames: Vec<FrameEvents>,
}

impl EventLog {
    pub fn new(video_name: impl Into<String>) -> Self {
        Self { video_name: video_name.into(), timestamp: None, frames: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(|f| f.events.is_empty())
    }

    /// Iterates `(frame_index, &Event)` pairs in stored order, which is already
    /// `(frame_number, sequence-within-frame)` ascending for a log that came from `load`.
    pub fn iter_events(&self) -> impl Iterator<Item = (FrameIndex, &Event)> {
        self.frames.iter().flat_map(|f| f.events.iter().map(move |e| (f.frame_number, e)))
    }

    pub fn max_frame(&self) -> Option<FrameIndex> {
        self.frames.iter().map(|f| f.frame_number).max()
    }

    /// Appends a single event at `frame_index`, creating a new `FrameEvents` entry if needed
    /// and re-sorting by `frame_number` to keep the ascending invariant. Used by the tracker to
    /// fold its `Moved` output back into a loaded log.
    pub fn push_event(&mut self, frame_index: FrameIndex, event: Event) {
        if let Some(entry) = self.frames.iter_mut().find(|f| f.frame_number == frame_index) {
            entry.events.push(event);
        } else {
            self.frames.push(FrameEvents { frame_number: frame_index, events: vec![event] });
            self.frames.sort_by_key(|f| f.frame_number);
        }
    }
}

/// `RectangleId -> Rectangle` at a single frame. Materialized by the resolver, never persisted.
pub type ActiveSet = HashMap<RectangleId, Rectangle>;

/// The dense, per-frame resolver output: `frame_index -> ActiveSet`. Frames whose active set is
/// empty may be absent from this map (§4.C).
pub type ActiveSetTable = HashMap<FrameIndex, ActiveSet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingMethod {
    OcrStage1,
    OcrStage2,
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingResult {
    pub frame: FrameIndex,
    pub rect: Rectangle,
    pub confidence: f32,
    pub method: TrackingMethod,
    pub matched_texts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Analyzing,
    Extracting,
    ProcessingFrames,
    Encoding,
    Completed,
    Cancelled,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled | JobStatus::Error)
    }
}

/// An export or preview job. Created by the orchestrator, mutated only through
/// `JobRegistry::update`, never removed for the life of the process (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: uuid::Uuid,
    pub status: JobStatus,
    pub progress: f32,
    pub message: String,
    pub cancelled: bool,
    pub created_at: String,
    pub processed_frames: Option<u64>,
    pub total_frames: Option<u64>,
    pub encoding_progress: Option<f32>,
    pub error: Option<String>,
    pub export_path: Option<String>,
    pub filename: Option<String>,
    pub has_audio: Option<bool>,
}

impl Job {
    pub fn new(id: uuid::Uuid, created_at: impl Into<String>) -> Self {
        Self {
            id,
            status: JobStatus::Starting,
            progress: 0.0,
            message: String::new(),
            cancelled: false,
            created_at: created_at.into(),
            processed_frames: None,
            total_frames: None,
            encoding_progress: None,
            error: None,
            export_path: None,
            filename: None,
            has_audio: None,
        }
    }
}

/// Mirrors `Job`'s progress/cancel shape for a tracking run (§4.E's "global tracking-state
/// record"). Kept as a distinct type rather than reusing `Job` since a tracking run has no
/// mux/export fields; both implement `JobRecord` (see `registry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingJob {
    pub id: uuid::Uuid,
    pub status: JobStatus,
    pub progress: f32,
    pub message: String,
    pub cancelled: bool,
    pub created_at: String,
    pub current_frame: Option<FrameIndex>,
    pub results_emitted: u64,
    pub error: Option<String>,
}

impl TrackingJob {
    pub fn new(id: uuid::Uuid, created_at: impl Into<String>) -> Self {
        Self {
            id,
            status: JobStatus::Starting,
            progress: 0.0,
            message: String::new(),
            cancelled: false,
            created_at: created_at.into(),
            current_frame: None,
            results_emitted: 0,
            error: None,
        }
    }
}
