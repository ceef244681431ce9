// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Scene viewer core: flattens a hierarchical scene into world-space
//! triangles, indexes them with k-d trees and packs the results into
//! fixed-stride float buffers sized for device upload.

pub mod builder;
pub mod config;
pub mod error;
pub mod gpu;
pub mod kdtree;
pub mod render;
pub mod scene;
pub mod shapes;
pub mod types;
pub mod viewer;

pub use builder::{
    build_triangle_array,
    TriangleArray,
};
pub use config::{
    BuildConfig,
    Tessellation,
};
pub use error::{
    Error,
    Result,
};
pub use gpu::{
    ChunkedBuffer,
    Device,
    MemoryDevice,
};
pub use kdtree::{
    ObjectTree,
    TriangleTree,
};
pub use scene::{
    flatten,
    SceneDescription,
    SceneInstance,
};
pub use viewer::{
    compile,
    CompiledScene,
    GpuScene,
    Viewer,
};
