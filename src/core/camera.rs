// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera intrinsics of the sensor that produced the dataset,
//! and back-projection of image points into viewing directions.

use crate::misc::type_aliases::{Float, Mat3, Vec3};

/// Intrinsics parameters of the NYU Depth v2 RGB camera.
/// All 1449 scenes share this calibration.
#[allow(clippy::excessive_precision)]
pub const INTRINSICS_NYU_RGB: Intrinsics = Intrinsics {
    principal_point: (325.582_449_411_190_34, 253.736_166_334_004_65),
    focal: (518.857_901_174_501_88, 519.469_611_121_274_85),
    skew: 0.0,
};

/// Pinhole camera intrinsics parameters.
#[derive(PartialEq, Debug, Clone)]
pub struct Intrinsics {
    /// Principal point (cx, cy) of the camera in pixels.
    pub principal_point: (Float, Float),
    /// Focal lengths (fx, fy) in pixels.
    pub focal: (Float, Float),
    /// Skew of the camera.
    pub skew: Float,
}

impl Intrinsics {
    /// Compute the calibration matrix K of the camera.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3 {
        Mat3::new(
            self.focal.0, self.skew,    self.principal_point.0,
            0.0,          self.focal.1, self.principal_point.1,
            0.0,          0.0,          1.0,
        )
    }

    /// Compute the inverse K^-1 of the calibration matrix.
    /// Returns `None` for a singular calibration (zero focal length).
    pub fn inverse_matrix(&self) -> Option<Mat3> {
        self.matrix().try_inverse()
    }
}

/// Back-project a homogeneous image point through K^-1 into a unit
/// viewing direction. Returns `None` if the back-projected vector has
/// zero norm (pathological input).
pub fn back_project_direction(kinv: &Mat3, point: &Vec3) -> Option<Vec3> {
    let direction = kinv * point;
    let norm = direction.norm();
    if norm > 0.0 {
        Some(direction / norm)
    } else {
        None
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::TestResult;
    use quickcheck_macros;

    const EPSILON_APPROX: Float = 1e-12;

    #[test]
    fn calibration_matrix_round_trip() {
        let k = INTRINSICS_NYU_RGB.matrix();
        let kinv = INTRINSICS_NYU_RGB.inverse_matrix().unwrap();
        assert_relative_eq!(k * kinv, Mat3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn back_projected_direction_matches_manual_computation() {
        let kinv = INTRINSICS_NYU_RGB.inverse_matrix().unwrap();
        let vp = Vec3::new(100.0, 200.0, 1.0);
        let vd = back_project_direction(&kinv, &vp).unwrap();
        let manual = (kinv * vp).normalize();
        assert_relative_eq!(vd, manual, epsilon = EPSILON_APPROX);
        assert_relative_eq!(vd.norm(), 1.0, epsilon = EPSILON_APPROX);
    }

    #[test]
    fn zero_point_is_degenerate() {
        let kinv = Mat3::identity();
        assert_eq!(None, back_project_direction(&kinv, &Vec3::zeros()));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn back_projected_direction_has_unit_norm(x: Float, y: Float) -> TestResult {
        if !x.is_finite() || !y.is_finite() || x.abs() > 1e6 || y.abs() > 1e6 {
            return TestResult::discard();
        }
        let kinv = INTRINSICS_NYU_RGB.inverse_matrix().unwrap();
        match back_project_direction(&kinv, &Vec3::new(x, y, 1.0)) {
            Some(vd) => TestResult::from_bool((vd.norm() - 1.0).abs() < 1e-9),
            None => TestResult::failed(),
        }
    }
}
