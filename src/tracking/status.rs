use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackingMode;
use crate::dwell::DwellStatus;

pub(crate) const STATUS_AVAILABLE: &str = "Eye tracking is available";
pub(crate) const STATUS_DEVICE_UNSUPPORTED: &str = "This device does not support eye tracking.";
pub(crate) const STATUS_START_UNSUPPORTED: &str = "Face tracking is not supported on this device";
pub(crate) const STATUS_TAP_FALLBACK: &str = "Tap a highlighted word to see its definition";
pub(crate) const STATUS_STARTING: &str = "Starting eye tracking...";
pub(crate) const STATUS_ACTIVE: &str = "Tracking active";
pub(crate) const STATUS_STOPPED: &str = "Tracking stopped";
pub(crate) const STATUS_INTERRUPTED: &str = "Session was interrupted";
pub(crate) const STATUS_INTERRUPTION_ENDED: &str = "Session interruption ended";

pub(crate) fn looking_at(word: &str) -> String {
    format!("Looking at word: {word}")
}

pub(crate) fn session_failed(reason: &str) -> String {
    format!("Session failed: {reason}")
}

/// What the host device can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub face_tracking: bool,
}

impl Capabilities {
    pub fn face_tracking() -> Self {
        Self {
            face_tracking: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Everything the reading screen binds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub mode: TrackingMode,
    pub tracking_available: bool,
    pub is_tracking: bool,
    pub session_id: Option<String>,
    pub dwell_status: DwellStatus,
    /// Word currently under the gaze, committed or not.
    pub current_word: Option<String>,
    /// Word whose definition is (or was last) revealed.
    pub highlighted_word: Option<String>,
    pub show_definition: bool,
    pub definition: Option<String>,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl TrackingSnapshot {
    pub(crate) fn initial(mode: TrackingMode, capabilities: Capabilities) -> Self {
        let tracking_available = mode == TrackingMode::ArFaceTracking && capabilities.face_tracking;
        let status = match mode {
            TrackingMode::TapFallback => STATUS_TAP_FALLBACK,
            TrackingMode::ArFaceTracking if tracking_available => STATUS_AVAILABLE,
            TrackingMode::ArFaceTracking => STATUS_DEVICE_UNSUPPORTED,
        };

        Self {
            mode,
            tracking_available,
            is_tracking: false,
            session_id: None,
            dwell_status: DwellStatus::Idle,
            current_word: None,
            highlighted_word: None,
            show_definition: false,
            definition: None,
            status: status.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.updated_at = Utc::now();
    }

    pub(crate) fn hide_definition(&mut self) {
        self.highlighted_word = None;
        self.show_definition = false;
        self.definition = None;
        self.updated_at = Utc::now();
    }

    pub(crate) fn clear_dwell(&mut self) {
        self.dwell_status = DwellStatus::Idle;
        self.current_word = None;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_reflects_capabilities() {
        let supported =
            TrackingSnapshot::initial(TrackingMode::ArFaceTracking, Capabilities::face_tracking());
        assert!(supported.tracking_available);
        assert_eq!(supported.status, STATUS_AVAILABLE);

        let unsupported = TrackingSnapshot::initial(TrackingMode::ArFaceTracking, Capabilities::none());
        assert!(!unsupported.tracking_available);
        assert_eq!(unsupported.status, STATUS_DEVICE_UNSUPPORTED);

        let tap = TrackingSnapshot::initial(TrackingMode::TapFallback, Capabilities::face_tracking());
        assert!(!tap.tracking_available);
        assert_eq!(tap.status, STATUS_TAP_FALLBACK);
    }

    #[test]
    fn serializes_camel_case_for_the_ui() {
        let snapshot = TrackingSnapshot::initial(TrackingMode::TapFallback, Capabilities::none());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["mode"], "tapFallback");
        assert_eq!(json["showDefinition"], false);
        assert_eq!(json["dwellStatus"], "idle");
    }
}
