pub mod geometry;
pub mod projection;
pub mod resolver;

pub use geometry::{Mat4, Point, Rect, Vec3, Vec4, Viewport};
pub use projection::{look_at_point, project, CameraFrame, EyePose};
pub use resolver::{resolve, WordFrames, WordFramesSnapshot, WordRect};
