//! Interactive crop parameters.

use serde::{Deserialize, Serialize};

use crate::domain::errors::TransformError;

/// Smallest zoom factor: the crop fills the largest square that fits.
pub const MIN_SCALE: f32 = 1.0;

/// Largest zoom factor accepted by the editor.
pub const MAX_SCALE: f32 = 3.0;

/// Crop, zoom and rotation chosen in the avatar editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    /// Zoom factor in `[MIN_SCALE, MAX_SCALE]`.
    pub scale: f32,
    /// Clockwise rotation in degrees. Any integer, normalized mod 360.
    pub rotation_degrees: i32,
    /// Horizontal crop centre, 0 is leftmost and 1 is rightmost.
    pub focal_x: f32,
    /// Vertical crop centre, 0 is topmost and 1 is bottommost.
    pub focal_y: f32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            scale: MIN_SCALE,
            rotation_degrees: 0,
            focal_x: 0.5,
            focal_y: 0.5,
        }
    }
}

impl TransformParams {
    #[must_use]
    pub const fn new(scale: f32, rotation_degrees: i32, focal_x: f32, focal_y: f32) -> Self {
        Self {
            scale,
            rotation_degrees,
            focal_x,
            focal_y,
        }
    }

    /// Rotation in `[0, 360)`.
    #[must_use]
    pub const fn normalized_rotation(&self) -> i32 {
        self.rotation_degrees.rem_euclid(360)
    }

    /// Returns the number of clockwise quarter turns when the rotation is a
    /// multiple of 90 degrees.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn quarter_turns(&self) -> Option<u8> {
        let rotation = self.normalized_rotation();
        if rotation % 90 == 0 {
            Some((rotation / 90) as u8)
        } else {
            None
        }
    }

    /// Checks scale and focal ranges.
    ///
    /// # Errors
    /// Returns `TransformError::InvalidParameters` when a value is NaN or out of range.
    pub fn validate(&self) -> Result<(), TransformError> {
        if !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(TransformError::invalid_parameters(format!(
                "scale {} outside [{MIN_SCALE}, {MAX_SCALE}]",
                self.scale
            )));
        }
        for (axis, value) in [("x", self.focal_x), ("y", self.focal_y)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TransformError::invalid_parameters(format!(
                    "focal {axis} {value} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.99, 0.5, 0.5 ; "scale_below_fit")]
    #[test_case(3.5, 0.5, 0.5 ; "scale_above_max")]
    #[test_case(f32::NAN, 0.5, 0.5 ; "scale_nan")]
    #[test_case(1.5, -0.1, 0.5 ; "focal_x_negative")]
    #[test_case(1.5, 0.5, 1.1 ; "focal_y_overflow")]
    fn test_validate_rejects(scale: f32, focal_x: f32, focal_y: f32) {
        let params = TransformParams::new(scale, 0, focal_x, focal_y);
        assert!(matches!(
            params.validate(),
            Err(TransformError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(TransformParams::new(1.0, 0, 0.0, 1.0).validate().is_ok());
        assert!(TransformParams::new(3.0, 270, 1.0, 0.0).validate().is_ok());
    }

    #[test_case(0, Some(0) ; "zero")]
    #[test_case(90, Some(1) ; "quarter")]
    #[test_case(-90, Some(3) ; "negative_quarter")]
    #[test_case(450, Some(1) ; "wraps")]
    #[test_case(45, None ; "continuous")]
    fn test_quarter_turns(rotation: i32, expected: Option<u8>) {
        let params = TransformParams::new(1.0, rotation, 0.5, 0.5);
        assert_eq!(params.quarter_turns(), expected);
    }
}
