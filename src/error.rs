// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene file {path} is malformed: {source}")]
    SceneFormat {
        path:   PathBuf,
        source: serde_json::Error,
    },

    #[error("Scene description is malformed: {0}")]
    SceneJson(#[from] serde_json::Error),

    #[error("Failed to load mesh: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Leaf size {requested} is outside 1..={max}")]
    LeafSize { requested: usize, max: usize },

    #[error("{count} {what} exceed the {max} indices a float record can address exactly")]
    IndexOverflow {
        what:  &'static str,
        count: usize,
        max:   usize,
    },

    #[error("Buffer budget of {max_buffer_size} bytes cannot hold one record of {stride} floats")]
    BufferTooSmall {
        max_buffer_size: usize,
        stride:          usize,
    },

    #[error("Array of {len} floats is not a whole number of {stride}-float records")]
    RaggedArray { len: usize, stride: usize },

    #[error("Device out of memory: requested {requested} bytes, {available} available")]
    OutOfDeviceMemory { requested: usize, available: usize },

    #[error("Failed to encode image: {0}")]
    Png(#[from] png::EncodingError),
}
