//! Tunables §4–§5 leave as defaults-with-override (§10.4).

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_workers: usize,
    pub blur_radius: f32,
    #[serde(with = "duration_millis")]
    pub progress_poll_interval: Duration,
    /// Overall progress at which frame processing is considered complete and muxing begins
    /// (§4.G step 6, §10.4).
    pub frame_processing_progress_span: f32,
    /// Weight applied to the muxer's own `encoding_progress` when blending into overall
    /// progress: `overall = frame_processing_progress_span + encoding_progress * mux_progress_weight`.
    pub mux_progress_weight: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            blur_radius: 15.0,
            progress_poll_interval: Duration::from_millis(500),
            frame_processing_progress_span: 80.0,
            mux_progress_weight: 0.18,
        }
    }
}

impl EngineConfig {
    pub fn blended_progress(&self, encoding_progress: f32) -> f32 {
        (self.frame_processing_progress_span + encoding_progress * self.mux_progress_weight)
            .clamp(0.0, 100.0)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
