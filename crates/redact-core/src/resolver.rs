//! The temporal resolver (§4.C): the single algorithm that turns an event log into a dense
//! per-frame active-rectangle mapping. Every consumer — preview, export, tracking re-resolution —
//! goes through `resolve`, so there is exactly one place that knows what "active at frame f" means.

use crate::types::{ActiveSet, ActiveSetTable, Event, EventLog, FrameIndex};

/// Converts `log` into `{frame_index -> ActiveSet}` for frames `0..=max_frame`.
///
/// Pure function of its inputs: calling this twice with the same log and `max_frame` produces
/// identical snapshots (testable property 1). Frames whose active set ends up empty are omitted
/// from the result rather than stored as an empty map.
pub fn resolve(log: &EventLog, max_frame: FrameIndex) -> ActiveSetTable {
    let mut events_by_frame: std::collections::BTreeMap<FrameIndex, Vec<&Event>> =
        std::collections::BTreeMap::new();
    for frame in &log.frames {
        if frame.frame_number > max_frame {
            continue;
        }
        events_by_frame.entry(frame.frame_number).or_default().extend(frame.events.iter());
    }

    let mut table = ActiveSetTable::new();
    let mut active: ActiveSet = ActiveSet::new();
    let mut last_snapshot: Option<ActiveSet> = None;

    for frame_index in 0..=max_frame {
        let touched = if let Some(events) = events_by_frame.get(&frame_index) {
            apply_events(&mut active, events, frame_index);
            true
        } else {
            false
        };

        if touched {
            last_snapshot = Some(active.clone());
            if !active.is_empty() {
                table.insert(frame_index, active.clone());
            }
        } else if let Some(snapshot) = &last_snapshot {
            if !snapshot.is_empty() {
                table.insert(frame_index, snapshot.clone());
            }
        }
    }

    table
}

/// Applies one frame's events, in stored order, to the running `active` map (§4.C step 3).
fn apply_events(active: &mut ActiveSet, events: &[&Event], frame_index: FrameIndex) {
    for event in events {
        match event {
            Event::Created { id, x, y, width, height } => {
                if active.contains_key(id) {
                    tracing::warn!(frame = frame_index, rect_id = %id, "Created on already-active rectangle");
                }
                active.insert(id.clone(), crate::types::Rectangle::new(*x, *y, *width, *height));
            }
            Event::Moved { id, x, y, .. } => {
                // Move-only updates preserve the existing w,h — tracking relies on this to avoid
                // drift (§4.E step 5: "preserve original w,h of the initial rectangle").
                if let Some(rect) = active.get_mut(id) {
                    rect.x = *x;
                    rect.y = *y;
                } else {
                    tracing::warn!(frame = frame_index, rect_id = %id, "Moved on inactive rectangle");
                }
            }
            Event::Resized { id, x, y, width, height } => {
                if let Some(rect) = active.get_mut(id) {
                    *rect = crate::types::Rectangle::new(*x, *y, *width, *height);
                } else {
                    tracing::warn!(frame = frame_index, rect_id = %id, "Resized on inactive rectangle");
                }
            }
            Event::Deleted { id } => {
                if active.remove(id).is_none() {
                    tracing::warn!(frame = frame_index, rect_id = %id, "Deleted on inactive rectangle");
                }
            }
        }
    }
}
