pub mod config;
pub mod content;
pub mod dwell;
pub mod gaze;
pub mod replay;
pub mod tracking;
mod utils;

pub use config::{ConfigStore, EyeReadConfig, TrackingMode};
pub use content::{Article, FontSize, Vocabulary};
pub use dwell::{CommitEvent, CommitTrigger, DwellMachine, DwellState};
pub use gaze::{resolve, Point, Rect, WordFrames, WordRect};
pub use tracking::{Capabilities, GazeSample, TrackingService, TrackingSnapshot};
pub use utils::init_logging;
