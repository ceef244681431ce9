// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Spatial indices over a flattened scene: a coarse tree over whole
//! instances and a fine tree over world-space triangles. Both live in flat
//! arenas addressed by index, children before parents.

mod object;
mod triangle;

pub use object::{
    ObjectNode,
    ObjectTree,
};
pub use triangle::{
    TriangleNode,
    TriangleTree,
};

/// Triangle indices a serialized leaf can carry.
pub const MAX_LEAF_FACES: usize = 6;

/// Floats per serialized triangle-tree node:
/// `[left, right, 0, min.xyz, max.xyz, face0..face5]`.
pub const NODE_STRIDE: usize = 9 + MAX_LEAF_FACES;

/// Indices are written as `f32`, which is exact for integers up to 2^24.
pub const MAX_INDEX_COUNT: usize = 1 << 24;

/// Child slot of a leaf, and padding of unused face slots.
pub const NO_INDEX: f32 = -1.0;

/// Instance trees stop splitting at this many objects.
pub const MAX_OBJECTS_PER_LEAF: usize = 2;
