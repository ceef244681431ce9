// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use serde::Deserialize;

use crate::{
    error::{
        Error,
        Result,
    },
    kdtree::MAX_LEAF_FACES,
};

// Per-buffer upload budget in bytes.
pub const MAX_BUFFER_SIZE: usize = 128 * 1024 * 1024;

pub const DEFAULT_SEGMENTS_X: u32 = 3;
pub const DEFAULT_SEGMENTS_Y: u32 = 3;

pub const DEFAULT_MAX_LEAF_SIZE: usize = MAX_LEAF_FACES;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const SAMPLES: u32 = 1;

/// Segment counts shared by every procedural shape in a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Tessellation {
    pub x: u32,
    pub y: u32,
}

impl Tessellation {
    pub const MIN: Self = Self { x: 1, y: 1 };

    pub const fn new(
        x: u32,
        y: u32,
    ) -> Self {
        Self { x, y }
    }
}

impl Default for Tessellation {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENTS_X, DEFAULT_SEGMENTS_Y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    pub tessellation:    Tessellation,
    pub max_leaf_size:   usize,
    pub max_buffer_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tessellation:    Tessellation::default(),
            max_leaf_size:   DEFAULT_MAX_LEAF_SIZE,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_size == 0 || self.max_leaf_size > MAX_LEAF_FACES {
            return Err(Error::LeafSize {
                requested: self.max_leaf_size,
                max:       MAX_LEAF_FACES,
            });
        }
        Ok(())
    }

    /// Scene-file settings win over the current values.
    #[must_use]
    pub fn with_settings(
        mut self,
        settings: &Settings,
    ) -> Self {
        if let Some(segments) = settings.segments {
            self.tessellation = segments;
        }
        if let Some(leaf) = settings.max_leaf_size {
            self.max_leaf_size = leaf;
        }
        if let Some(size) = settings.max_buffer_size {
            self.max_buffer_size = size;
        }
        self
    }
}

/// Optional `settings` block of a scene file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub segments:        Option<Tessellation>,
    #[serde(default)]
    pub max_leaf_size:   Option<usize>,
    #[serde(default)]
    pub max_buffer_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn leaf_size_outside_payload_is_rejected() {
        for leaf in [0, MAX_LEAF_FACES + 1] {
            let config = BuildConfig {
                max_leaf_size: leaf,
                ..BuildConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::LeafSize { requested, .. }) if requested == leaf
            ));
        }
    }

    #[test]
    fn settings_override_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "segments": { "x": 8, "y": 4 }, "max_leaf_size": 2 }"#)
                .expect("settings parse");
        let config = BuildConfig::default().with_settings(&settings);
        assert_eq!(config.tessellation, Tessellation::new(8, 4));
        assert_eq!(config.max_leaf_size, 2);
        assert_eq!(config.max_buffer_size, MAX_BUFFER_SIZE);
    }
}
