// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Discovery of the annotation files and parsing of their text layout.
//!
//! A dataset directory holds two file families, one pair per scene:
//! `vps*` files with the vanishing points and `labelled_lines*` files
//! with the line segments assigned to each vanishing point.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Sorted paths of the two annotation file families of a dataset directory.
///
/// Both families are sorted with ordinary lexicographic string order.
/// The dataset's naming convention embeds the scene identifier such that
/// this order equals identifier order, so index `i` in both lists (and in
/// the external image/depth provider) refers to the same scene.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    vps_files: Vec<PathBuf>,
    labelled_line_files: Vec<PathBuf>,
}

impl AnnotationStore {
    /// List and sort the annotation files of `dir`.
    ///
    /// Fails with [`Error::Configuration`] if the directory cannot be read
    /// or if the two families do not contain the same number of files.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::Configuration(format!(
                "annotation directory {} is not a readable directory",
                dir.display()
            )));
        }
        let vps_files = files_with_prefix(dir, "vps")?;
        let labelled_line_files = files_with_prefix(dir, "labelled_lines")?;
        if vps_files.len() != labelled_line_files.len() {
            return Err(Error::Configuration(format!(
                "found {} vps files but {} labelled_lines files in {}",
                vps_files.len(),
                labelled_line_files.len(),
                dir.display()
            )));
        }
        Ok(Self {
            vps_files,
            labelled_line_files,
        })
    }

    /// Number of discovered scene annotation pairs.
    pub fn len(&self) -> usize {
        self.vps_files.len()
    }

    /// True if the directory contained no annotation pair.
    pub fn is_empty(&self) -> bool {
        self.vps_files.is_empty()
    }

    /// Path of the vanishing-point file of scene `id`.
    pub fn vps_path(&self, id: usize) -> Result<&Path> {
        nth_path(&self.vps_files, id)
    }

    /// Path of the labelled-lines file of scene `id`.
    pub fn labelled_lines_path(&self, id: usize) -> Result<&Path> {
        nth_path(&self.labelled_line_files, id)
    }

    /// Raw text of the vanishing-point file of scene `id`.
    pub fn vps_text(&self, id: usize) -> Result<String> {
        Ok(fs::read_to_string(self.vps_path(id)?)?)
    }

    /// Raw text of the labelled-lines file of scene `id`.
    pub fn labelled_lines_text(&self, id: usize) -> Result<String> {
        Ok(fs::read_to_string(self.labelled_lines_path(id)?)?)
    }
}

fn nth_path(paths: &[PathBuf], id: usize) -> Result<&Path> {
    paths.get(id).map(PathBuf::as_path).ok_or(Error::Range {
        index: id,
        len: paths.len(),
    })
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Parse the annotation text layouts into numeric arrays.
pub mod parse {
    use super::*;
    use crate::core::camera;
    use crate::misc::type_aliases::{Float, Mat3, Vec3, Vec4};

    /// Maximum number of labelled segment slots per vanishing point row.
    const SEGMENT_SLOTS: usize = 4;

    /// Parse a vps file into its vanishing points and viewing directions.
    ///
    /// The file is whitespace-delimited with a discarded header row;
    /// columns 1 and 2 of each data row are the pixel x and y coordinates.
    /// Each row yields the homogeneous point `(x, y, 1)` and its viewing
    /// direction `normalize(kinv * vp)`, in row order. `file` is only used
    /// for error reporting.
    pub fn vanishing_points(
        content: &str,
        file: &Path,
        kinv: &Mat3,
    ) -> Result<(Vec<Vec3>, Vec<Vec3>)> {
        let mut reader = table_reader(content);
        let mut vps = Vec::new();
        let mut vds = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|error| csv_error(file, row, error))?;
            let x = numeric_field(&record, 1, file, row)?;
            let y = numeric_field(&record, 2, file, row)?;
            let vp = Vec3::new(x, y, 1.0);
            let vd = camera::back_project_direction(kinv, &vp).ok_or(
                Error::DegenerateGeometry {
                    file: file.to_path_buf(),
                    row,
                },
            )?;
            vps.push(vp);
            vds.push(vd);
        }
        Ok((vps, vds))
    }

    /// Parse a labelled_lines file into per-vanishing-point segment groups.
    ///
    /// The header names columns `line{i}_x1 line{i}_y1 line{i}_x2 line{i}_y2`
    /// for i in 1..=4 (other columns may be present and are ignored). Each
    /// data row corresponds to one vanishing point of the companion vps file
    /// and holds 1 to 4 segments: slots are scanned in order and the first
    /// empty `line{i}_x1` terminates the row. Any coordinate that does not
    /// parse as a number is a hard error, as is a row without any segment.
    pub fn labelled_lines(content: &str, file: &Path) -> Result<Vec<Vec<Vec4>>> {
        let mut reader = table_reader(content);
        let columns = segment_columns(&mut reader, file)?;

        let mut groups = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|error| csv_error(file, row, error))?;
            let mut segments = Vec::new();
            for slot in &columns {
                // A missing or empty first coordinate ends the populated slots.
                match record.get(slot[0]) {
                    None => break,
                    Some("") => break,
                    Some(_) => (),
                }
                let x1 = numeric_field(&record, slot[0], file, row)?;
                let y1 = numeric_field(&record, slot[1], file, row)?;
                let x2 = numeric_field(&record, slot[2], file, row)?;
                let y2 = numeric_field(&record, slot[3], file, row)?;
                segments.push(Vec4::new(x1, y1, x2, y2));
            }
            if segments.is_empty() {
                return Err(Error::Parse {
                    file: file.to_path_buf(),
                    row,
                    message: "row holds no labelled line segment".to_string(),
                });
            }
            groups.push(segments);
        }
        Ok(groups)
    }

    // Space-delimited table with a header row, tolerant of short rows.
    fn table_reader(content: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes())
    }

    // Header positions of the line{i}_{x1,y1,x2,y2} columns, per slot.
    fn segment_columns(
        reader: &mut csv::Reader<&[u8]>,
        file: &Path,
    ) -> Result<Vec<[usize; 4]>> {
        let headers = reader
            .headers()
            .map_err(|error| csv_error(file, 0, error))?
            .clone();
        let position = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| Error::Parse {
                    file: file.to_path_buf(),
                    row: 0,
                    message: format!("missing expected column {}", name),
                })
        };
        let mut columns = Vec::with_capacity(SEGMENT_SLOTS);
        for i in 1..=SEGMENT_SLOTS {
            columns.push([
                position(&format!("line{}_x1", i))?,
                position(&format!("line{}_y1", i))?,
                position(&format!("line{}_x2", i))?,
                position(&format!("line{}_y2", i))?,
            ]);
        }
        Ok(columns)
    }

    fn numeric_field(
        record: &csv::StringRecord,
        index: usize,
        file: &Path,
        row: usize,
    ) -> Result<Float> {
        let field = record.get(index).ok_or_else(|| Error::Parse {
            file: file.to_path_buf(),
            row,
            message: format!("missing expected column {}", index),
        })?;
        field.parse().map_err(|_| Error::Parse {
            file: file.to_path_buf(),
            row,
            message: format!("field {:?} is not a number", field),
        })
    }

    fn csv_error(file: &Path, row: usize, error: csv::Error) -> Error {
        Error::Parse {
            file: file.to_path_buf(),
            row,
            message: error.to_string(),
        }
    }
}

// TESTS #############################################################
