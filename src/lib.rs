// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # nyu-vp-rs
//!
//! Indexed, lazily-cached access to the NYU-VP dataset:
//! ground-truth vanishing points, their 3D viewing directions,
//! manually labelled line segments grouped per vanishing point,
//! and optionally the RGB and depth planes of each scene.

pub mod core;
pub mod dataset;
pub mod error;
pub mod misc;
