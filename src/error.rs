// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error taxonomy of the dataset pipeline.
//!
//! Every failure propagates to the caller of the record-fetch operation:
//! a record is either fully assembled or not produced at all.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient alias for results of dataset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// All the ways assembling a dataset record can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// A required directory or file was missing or unusable at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An ordinal key outside the valid identifier bounds.
    #[error("index {index} out of range for dataset of length {len}")]
    Range {
        /// The requested ordinal.
        index: usize,
        /// Number of available entries.
        len: usize,
    },

    /// A malformed numeric field or a missing expected column.
    #[error("parse error in {} at data row {}: {}", .file.display(), .row, .message)]
    Parse {
        /// Annotation file being parsed.
        file: PathBuf,
        /// 0-indexed data row (header excluded).
        row: usize,
        /// What went wrong.
        message: String,
    },

    /// Row-count mismatch between a vps file and its labelled_lines companion.
    #[error(
        "row mismatch between {} ({} vanishing points) and {} ({} line groups)",
        .vps_file.display(),
        .vp_rows,
        .lines_file.display(),
        .line_rows
    )]
    CrossFile {
        /// The vanishing-point annotation file.
        vps_file: PathBuf,
        /// The labelled-lines annotation file.
        lines_file: PathBuf,
        /// Rows found in the vps file.
        vp_rows: usize,
        /// Rows found in the labelled_lines file.
        line_rows: usize,
    },

    /// A back-projected direction with zero norm.
    #[error("degenerate back-projection in {} at data row {}", .file.display(), .row)]
    DegenerateGeometry {
        /// Annotation file being parsed.
        file: PathBuf,
        /// 0-indexed data row (header excluded).
        row: usize,
    },

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// RGB image decoding failure in the external provider.
    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    /// Depth map decoding failure in the external provider.
    #[error("depth decoding error: {0}")]
    Png(#[from] png::DecodingError),
}
