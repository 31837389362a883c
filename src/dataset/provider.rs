// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! External source of the RGB image and depth map of each scene.
//!
//! The archive holding the original scene planes is opaque to the
//! dataset index: anything able to produce one image and one depth
//! map per scene identifier can back the optional record fields.

use image::RgbImage;
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::Float;

/// U16 depth values are scaled for better precision.
/// So 5000 in the 16 bits gray png corresponds to 1 meter.
pub const DEPTH_SCALE: Float = 5000.0;

/// Per-scene source of an RGB image plane and a depth plane.
///
/// Implementations are constructed once up front and read-only afterwards.
/// The dataset index queries them exactly once per scene, at record
/// assembly time.
pub trait ImageDepthProvider {
    /// Image (height x width, RGB) and depth (height x width, meters)
    /// planes of scene `id`.
    fn planes(&self, id: usize) -> Result<(RgbImage, DMatrix<Float>)>;
}

/// Provider backed by two directories of PNG files, `{id}.png` each:
/// 8 bits RGB images on one side, 16 bits gray depth maps on the other.
#[derive(Debug, Clone)]
pub struct PngDirProvider {
    rgb_dir: PathBuf,
    depth_dir: PathBuf,
}

impl PngDirProvider {
    /// Remember the two plane directories, checking they are readable.
    pub fn new<P: AsRef<Path>>(rgb_dir: P, depth_dir: P) -> Result<Self> {
        let rgb_dir = rgb_dir.as_ref().to_path_buf();
        let depth_dir = depth_dir.as_ref().to_path_buf();
        for dir in &[&rgb_dir, &depth_dir] {
            if !dir.is_dir() {
                return Err(Error::Configuration(format!(
                    "plane directory {} is not a readable directory",
                    dir.display()
                )));
            }
        }
        Ok(Self { rgb_dir, depth_dir })
    }
}

impl ImageDepthProvider for PngDirProvider {
    fn planes(&self, id: usize) -> Result<(RgbImage, DMatrix<Float>)> {
        let image = image::open(self.rgb_dir.join(format!("{}.png", id)))?.to_rgb8();
        let (width, height, raw_depth) =
            helper::read_png_16bits(self.depth_dir.join(format!("{}.png", id)))?;
        let meters: Vec<Float> = raw_depth
            .iter()
            .map(|&value| Float::from(value) / DEPTH_SCALE)
            .collect();
        let depth = DMatrix::from_row_slice(height, width, &meters);
        Ok((image, depth))
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn missing_plane_directory_is_a_configuration_error() {
        let result = PngDirProvider::new("/no/rgb/here", "/no/depth/here");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
