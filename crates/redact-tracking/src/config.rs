//! Constants driving the tracking pipeline (§4.E, §10.4).

#[derive(Debug, Clone, Copy)]
pub struct TrackingConfig {
    pub ocr_confidence_floor: f32,
    pub fuzzy_match_threshold: f32,
    pub stage1_coverage_threshold: f32,
    pub stabilization_threshold_px: i64,
    pub template_match_floor: f32,
    pub template_drift_update_floor: f32,
    pub frame_limit_cap: u64,
    pub local_region_padding_px: i64,
    pub match_bbox_padding_px: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            ocr_confidence_floor: 0.5,
            fuzzy_match_threshold: 70.0,
            stage1_coverage_threshold: 0.8,
            stabilization_threshold_px: 3,
            template_match_floor: 0.6,
            template_drift_update_floor: 0.8,
            frame_limit_cap: 900,
            local_region_padding_px: 15,
            match_bbox_padding_px: 5,
        }
    }
}
