pub mod controller;
pub mod loop_worker;
pub mod status;

pub use controller::TrackingService;
pub use loop_worker::{GazeSample, TrackingEvent};
pub use status::{Capabilities, TrackingSnapshot};
