// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lazily-cached index over the 1449 scenes of the NYU-VP dataset.

use image::RgbImage;
use log::debug;
use nalgebra::DMatrix;
use std::path::Path;
use std::rc::Rc;

use crate::core::camera::INTRINSICS_NYU_RGB;
use crate::dataset::annotations::{parse, AnnotationStore};
use crate::dataset::provider::ImageDepthProvider;
use crate::error::{Error, Result};
use crate::misc::type_aliases::{Float, Mat3, Vec3, Vec4};

/// Number of scenes in the NYU-VP dataset.
pub const NUM_SCENES: usize = 1449;

/// Fully assembled annotations of one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Scene identifier, equal to the ordinal used to fetch the record.
    pub id: usize,
    /// Ground-truth vanishing points, each normalized to unit norm.
    pub vps: Vec<Vec3>,
    /// Unit viewing directions, index-aligned with `vps`.
    pub vds: Vec<Vec3>,
    /// Labelled line segments `(x1, y1, x2, y2)`, one group per
    /// vanishing point, 1 to 4 segments each.
    pub labelled_lines: Vec<Vec<Vec4>>,
    /// RGB image plane, present when a provider is configured.
    pub image: Option<RgbImage>,
    /// Depth plane in meters, present when a provider is configured.
    pub depth: Option<DMatrix<Float>>,
}

/// Index over the dataset, assembling records on demand.
///
/// Single-threaded by design: records are shared through `Rc` and the
/// cache is populated through `&mut self`. A cache slot goes from empty
/// to populated on first access and is never evicted or invalidated.
pub struct NyuVp {
    store: AnnotationStore,
    provider: Option<Box<dyn ImageDepthProvider>>,
    kinv: Mat3,
    keep_in_mem: bool,
    cache: Vec<Option<Rc<Record>>>,
}

impl NyuVp {
    /// Set up the index over the annotation files of `data_dir`.
    ///
    /// `provider` optionally supplies the per-scene image and depth
    /// planes; without one, those record fields stay `None`. With
    /// `keep_in_mem`, each record is assembled once and cached for the
    /// lifetime of the index; without it, every access reassembles.
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        provider: Option<Box<dyn ImageDepthProvider>>,
        keep_in_mem: bool,
    ) -> Result<Self> {
        let store = AnnotationStore::discover(data_dir)?;
        let kinv = INTRINSICS_NYU_RGB.inverse_matrix().ok_or_else(|| {
            Error::Configuration("camera calibration matrix is singular".to_string())
        })?;
        Ok(Self {
            store,
            provider,
            kinv,
            keep_in_mem,
            cache: vec![None; NUM_SCENES],
        })
    }

    /// Number of scenes the dataset is defined over.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Always false: the identifier range is fixed.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetch the record of scene `key`, assembling it on a cache miss.
    pub fn get(&mut self, key: usize) -> Result<Rc<Record>> {
        if key >= self.cache.len() {
            return Err(Error::Range {
                index: key,
                len: self.cache.len(),
            });
        }
        if let Some(record) = &self.cache[key] {
            return Ok(Rc::clone(record));
        }
        let record = Rc::new(self.assemble(key)?);
        if self.keep_in_mem {
            self.cache[key] = Some(Rc::clone(&record));
        }
        Ok(record)
    }

    // Pure function of the scene identifier (and the read-only inputs).
    fn assemble(&self, id: usize) -> Result<Record> {
        debug!("assembling record of scene {}", id);

        let (image, depth) = match &self.provider {
            Some(provider) => {
                let (image, depth) = provider.planes(id)?;
                (Some(image), Some(depth))
            }
            None => (None, None),
        };

        let lines_text = self.store.labelled_lines_text(id)?;
        let labelled_lines =
            parse::labelled_lines(&lines_text, self.store.labelled_lines_path(id)?)?;

        let vps_text = self.store.vps_text(id)?;
        let (mut vps, vds) =
            parse::vanishing_points(&vps_text, self.store.vps_path(id)?, &self.kinv)?;

        // Both files describe the same vanishing points, row for row.
        if vps.len() != labelled_lines.len() {
            return Err(Error::CrossFile {
                vps_file: self.store.vps_path(id)?.to_path_buf(),
                lines_file: self.store.labelled_lines_path(id)?.to_path_buf(),
                vp_rows: vps.len(),
                line_rows: labelled_lines.len(),
            });
        }

        // Final pass over the collected points. The homogeneous z
        // component keeps every norm strictly positive.
        for vp in &mut vps {
            let norm = vp.norm();
            *vp /= norm;
        }

        Ok(Record {
            id,
            vps,
            vds,
            labelled_lines,
            image,
            depth,
        })
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;
    use std::fs;
    use std::path::PathBuf;

    const VPS_CONTENT: &str = "point x y\n0 100.0 200.0\n1 50.0 60.0\n";

    const LINES_HEADER: &str = "line1_x1 line1_y1 line1_x2 line1_y2 \
                                line2_x1 line2_y1 line2_x2 line2_y2 \
                                line3_x1 line3_y1 line3_x2 line3_y2 \
                                line4_x1 line4_y1 line4_x2 line4_y2";

    fn lines_content(rows: usize) -> String {
        let mut content = format!("{}\n", LINES_HEADER);
        for row in 0..rows {
            content.push_str(&format!("1 2 3 {}\n", row + 4));
        }
        content
    }

    fn dataset_dir(name: &str, scenes: usize, lines_rows: usize) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("nyu-vp-rs-index-{}-{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        for scene in 0..scenes {
            fs::write(dir.join(format!("vps_{:04}.csv", scene)), VPS_CONTENT).unwrap();
            fs::write(
                dir.join(format!("labelled_lines_{:04}.csv", scene)),
                lines_content(lines_rows),
            )
            .unwrap();
        }
        dir
    }

    struct StubProvider;

    impl ImageDepthProvider for StubProvider {
        fn planes(&self, _id: usize) -> Result<(RgbImage, DMatrix<Float>)> {
            let image = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
            let depth = DMatrix::from_element(2, 2, 0.5);
            Ok((image, depth))
        }
    }

    #[test]
    fn records_are_assembled_and_cached() {
        let dir = dataset_dir("cached", 2, 2);
        let mut dataset = NyuVp::new(&dir, None, true).unwrap();
        assert_eq!(NUM_SCENES, dataset.len());

        let record = dataset.get(1).unwrap();
        assert_eq!(1, record.id);
        assert_eq!(record.vps.len(), record.vds.len());
        assert_eq!(record.vps.len(), record.labelled_lines.len());
        assert!(record.image.is_none());
        assert!(record.depth.is_none());

        // Second access returns the very same cached record.
        let again = dataset.get(1).unwrap();
        assert!(Rc::ptr_eq(&record, &again));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn vanishing_points_and_directions_have_unit_norm() {
        let dir = dataset_dir("norms", 1, 2);
        let mut dataset = NyuVp::new(&dir, None, true).unwrap();
        let record = dataset.get(0).unwrap();

        for vp in &record.vps {
            assert_relative_eq!(vp.norm(), 1.0, epsilon = 1e-12);
        }
        for vd in &record.vds {
            assert_relative_eq!(vd.norm(), 1.0, epsilon = 1e-12);
        }

        // The first vanishing point was read as (100, 200, 1).
        let expected_vp = Vec3::new(100.0, 200.0, 1.0).normalize();
        assert_relative_eq!(record.vps[0], expected_vp, epsilon = 1e-12);
        let kinv = INTRINSICS_NYU_RGB.inverse_matrix().unwrap();
        let expected_vd = (kinv * Vec3::new(100.0, 200.0, 1.0)).normalize();
        assert_relative_eq!(record.vds[0], expected_vd, epsilon = 1e-12);

        for group in &record.labelled_lines {
            assert!((1..=4).contains(&group.len()));
            for segment in group {
                assert!(segment.iter().all(|value| value.is_finite()));
            }
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn disabled_cache_reassembles_equal_records() {
        let dir = dataset_dir("uncached", 1, 2);
        let mut dataset = NyuVp::new(&dir, None, false).unwrap();
        let first = dataset.get(0).unwrap();
        let second = dataset.get(0).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn provider_planes_are_attached_to_the_record() {
        let dir = dataset_dir("planes", 1, 2);
        let mut dataset = NyuVp::new(&dir, Some(Box::new(StubProvider)), true).unwrap();
        let record = dataset.get(0).unwrap();
        let image = record.image.as_ref().unwrap();
        assert_eq!((2, 2), image.dimensions());
        let depth = record.depth.as_ref().unwrap();
        assert_eq!((2, 2), depth.shape());
        assert_eq!(0.5, depth[(0, 0)]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn out_of_range_keys_are_rejected() {
        let dir = dataset_dir("range", 1, 2);
        let mut dataset = NyuVp::new(&dir, None, true).unwrap();
        let result = dataset.get(NUM_SCENES);
        assert!(matches!(
            result,
            Err(Error::Range {
                index: NUM_SCENES,
                len: NUM_SCENES,
            })
        ));
        // Valid ordinal, but beyond the discovered files.
        assert!(matches!(dataset.get(1), Err(Error::Range { index: 1, len: 1 })));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn row_count_mismatch_fails_loudly() {
        let dir = dataset_dir("crossfile", 1, 1);
        let mut dataset = NyuVp::new(&dir, None, true).unwrap();
        let result = dataset.get(0);
        assert!(matches!(
            result,
            Err(Error::CrossFile {
                vp_rows: 2,
                line_rows: 1,
                ..
            })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
