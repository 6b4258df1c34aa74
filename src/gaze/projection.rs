use serde::{Deserialize, Serialize};

use super::geometry::{Mat4, Point, Vec3, Vec4, Viewport};

/// Per-frame face-tracking output: the face anchor in world space and each
/// eye relative to the face anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyePose {
    #[serde(default)]
    pub face: Mat4,
    pub left_eye: Mat4,
    pub right_eye: Mat4,
}

/// Camera matrices for the frame the pose was captured in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraFrame {
    pub view: Mat4,
    pub projection: Mat4,
}

impl CameraFrame {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Right-handed perspective camera looking down -z, clip depth in [-1, 1].
    pub fn perspective(fov_y_radians: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        let f = 1.0 / (fov_y_radians / 2.0).tan();
        let range = z_near - z_far;
        let projection = Mat4::from_columns([
            Vec4::new(f / aspect, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, (z_far + z_near) / range, -1.0),
            Vec4::new(0.0, 0.0, 2.0 * z_far * z_near / range, 0.0),
        ]);
        Self {
            view: Mat4::IDENTITY,
            projection,
        }
    }
}

/// Screen point the eyes are converging on: the midpoint between both eyes
/// pushed one unit along the averaged look direction, then projected.
///
/// `None` means the frame is unusable (eyes pointing in opposite directions
/// or a degenerate projection) and should be skipped.
pub fn look_at_point(pose: &EyePose, camera: &CameraFrame, viewport: Viewport) -> Option<Point> {
    let left = pose.face.mul(&pose.left_eye);
    let right = pose.face.mul(&pose.right_eye);

    let eye_center = left.translation().add(right.translation()).scale(0.5);
    let direction = left.forward().add(right.forward()).normalized()?;

    project(eye_center.add(direction), camera, viewport)
}

/// World position to viewport point through `projection * view`.
pub fn project(point: Vec3, camera: &CameraFrame, viewport: Viewport) -> Option<Point> {
    let view_projection = camera.projection.mul(&camera.view);
    let clip = view_projection.mul_vec4(Vec4::new(point.x, point.y, point.z, 1.0));

    if !clip.w.is_finite() || clip.w.abs() <= f32::EPSILON {
        return None;
    }

    let ndc_x = (clip.x / clip.w) as f64;
    let ndc_y = (clip.y / clip.w) as f64;

    let screen = Point::new(
        (ndc_x + 1.0) * 0.5 * viewport.width,
        (1.0 - ndc_y) * 0.5 * viewport.height,
    );
    screen.is_finite().then_some(screen)
}
