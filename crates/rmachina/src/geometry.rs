use glam::{DMat3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when comparing geometric quantities.
pub const EPSILON: f64 = 1e-6;

/// Build a rotation from an axis and an angle in degrees.
pub fn rotation_from_axis_angle(axis: DVec3, angle_degrees: f64) -> DQuat {
    let axis = axis.try_normalize().unwrap_or(DVec3::Z);
    DQuat::from_axis_angle(axis, angle_degrees.to_radians())
}

/// Axis and angle (degrees) of a rotation. Identity rotations report the Z axis.
pub fn axis_angle_degrees(rotation: DQuat) -> (DVec3, f64) {
    let (axis, angle) = rotation.normalize().to_axis_angle();
    if angle.abs() < EPSILON {
        return (DVec3::Z, 0.0);
    }
    (axis, angle.to_degrees())
}

/// Rotation vector (axis scaled by angle in radians), as used by UR poses.
///
/// The shortest equivalent rotation is returned, so the angle never exceeds pi.
pub fn rotation_vector(rotation: DQuat) -> DVec3 {
    let mut q = rotation.normalize();
    if q.w < 0.0 {
        q = -q;
    }
    let (axis, angle) = q.to_axis_angle();
    if angle.abs() < EPSILON {
        return DVec3::ZERO;
    }
    axis * angle
}

/// Build a rotation from a rotation vector in radians.
pub fn rotation_from_vector(vector: DVec3) -> DQuat {
    let angle = vector.length();
    if angle < EPSILON {
        return DQuat::IDENTITY;
    }
    DQuat::from_axis_angle(vector / angle, angle)
}

/// Intrinsic ZYX Euler angles in degrees (yaw, pitch, roll), i.e. KUKA's A, B, C.
pub fn yaw_pitch_roll(rotation: DQuat) -> (f64, f64, f64) {
    let (yaw, pitch, roll) = rotation.normalize().to_euler(EulerRot::ZYX);
    (yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
}

/// Build a rotation from intrinsic ZYX Euler angles in degrees.
pub fn rotation_from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        yaw.to_radians(),
        pitch.to_radians(),
        roll.to_radians(),
    )
}

/// Row-major rotation matrix for a rotation.
pub fn rotation_matrix_rows(rotation: DQuat) -> [[f64; 3]; 3] {
    let m = DMat3::from_quat(rotation.normalize()).transpose();
    [m.x_axis.to_array(), m.y_axis.to_array(), m.z_axis.to_array()]
}

/// Quaternion components in the `[w, x, y, z]` order robot controllers expect.
pub fn quaternion_wxyz(rotation: DQuat) -> [f64; 4] {
    let q = rotation.normalize();
    [q.w, q.x, q.y, q.z]
}

/// Whether two rotations describe the same orientation.
pub fn rotations_close(a: DQuat, b: DQuat, tolerance: f64) -> bool {
    a.normalize().dot(b.normalize()).abs() > 1.0 - tolerance
}

/// Six joint angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Joints(pub [f64; 6]);

impl Joints {
    pub fn new(values: [f64; 6]) -> Self {
        Self(values)
    }

    /// Component-wise sum.
    pub fn add(&self, other: &Joints) -> Joints {
        let mut out = self.0;
        for (slot, delta) in out.iter_mut().zip(other.0.iter()) {
            *slot += delta;
        }
        Joints(out)
    }

    pub fn to_radians(&self) -> [f64; 6] {
        self.0.map(f64::to_radians)
    }

    pub fn values(&self) -> &[f64; 6] {
        &self.0
    }
}

impl fmt::Display for Joints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Six optional external axis values. Unset slots are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalAxes(pub [Option<f64>; 6]);

impl ExternalAxes {
    /// Number of addressable external axes.
    pub const COUNT: usize = 6;

    pub fn new() -> Self {
        Self::default()
    }

    /// Value at a one-based axis index.
    pub fn get(&self, index: usize) -> Option<f64> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i).copied().flatten())
    }

    /// Set the value at a one-based axis index. Returns false for invalid indices.
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        match index.checked_sub(1).and_then(|i| self.0.get_mut(i)) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Format a vector as `[x, y, z]` using shortest float representation.
pub fn format_vector(v: DVec3) -> String {
    format!("[{}, {}, {}]", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_angle_roundtrip() {
        let q = rotation_from_axis_angle(DVec3::new(0.0, 0.0, 2.0), 90.0);
        let (axis, angle) = axis_angle_degrees(q);
        assert!((angle - 90.0).abs() < EPSILON);
        assert!((axis - DVec3::Z).length() < EPSILON);
    }

    #[test]
    fn test_rotation_vector_is_shortest() {
        let q = rotation_from_axis_angle(DVec3::Z, 270.0);
        let v = rotation_vector(q);
        assert!((v.length() - std::f64::consts::FRAC_PI_2).abs() < EPSILON);
        assert!(v.z < 0.0, "270 deg about +Z is -90 deg about +Z");
        assert!(rotations_close(rotation_from_vector(v), q, EPSILON));
    }

    #[test]
    fn test_yaw_pitch_roll() {
        let q = rotation_from_yaw_pitch_roll(30.0, 0.0, 0.0);
        let (a, b, c) = yaw_pitch_roll(q);
        assert!((a - 30.0).abs() < EPSILON);
        assert!(b.abs() < EPSILON);
        assert!(c.abs() < EPSILON);
    }

    #[test]
    fn test_matrix_rows_of_quarter_turn() {
        let rows = rotation_matrix_rows(rotation_from_axis_angle(DVec3::Z, 90.0));
        // Rotating X by +90 about Z yields Y: first column is (0, 1, 0).
        assert!(rows[0][0].abs() < EPSILON);
        assert!((rows[1][0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_external_axes_indices_are_one_based() {
        let mut axes = ExternalAxes::new();
        assert!(axes.is_empty());
        assert!(axes.set(1, 250.0));
        assert!(!axes.set(0, 1.0));
        assert!(!axes.set(7, 1.0));
        assert_eq!(axes.get(1), Some(250.0));
        assert_eq!(axes.get(2), None);
    }

    #[test]
    fn test_joints_add() {
        let a = Joints([0.0, 10.0, 20.0, 0.0, 90.0, 0.0]);
        let b = Joints([1.0, -10.0, 0.0, 0.0, 0.0, 5.0]);
        assert_eq!(a.add(&b), Joints([1.0, 0.0, 20.0, 0.0, 90.0, 5.0]));
    }
}
