// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::path::Path;

use gltf::mesh::Mode;
use glam::Vec3;
use tracing::{
    debug,
    instrument,
    warn,
};

use super::{
    Mesh,
    MeshTriangle,
};
use crate::error::Result;

/// Loads every triangle primitive of every mesh in a glTF/GLB file, in
/// object space. Node transforms are not applied.
#[instrument]
pub fn load_gltf(path: &Path) -> Result<Mesh> {
    let (document, buffers, _) = gltf::import(path)?;
    let mut triangles = Vec::new();

    for mesh in document.meshes() {
        for prim in mesh.primitives() {
            if prim.mode() != Mode::Triangles {
                continue;
            }

            let reader = prim.reader(|buf| buffers.get(buf.index()).map(|d| &*d.0));
            let Some(positions) = reader.read_positions() else {
                warn!(mesh = mesh.index(), "No positions attached to triangle mesh");
                continue;
            };
            let positions = positions.map(Vec3::from_array).collect::<Vec<_>>();

            let indices = reader.read_indices().map_or_else(
                || (0..positions.len()).collect::<Vec<_>>(),
                |indices| indices.into_u32().map(|v| v as usize).collect(),
            );

            let before = triangles.len();
            for corners in indices.chunks_exact(3) {
                let (Some(&a), Some(&b), Some(&c)) = (
                    positions.get(corners[0]),
                    positions.get(corners[1]),
                    positions.get(corners[2]),
                ) else {
                    warn!(mesh = mesh.index(), "Triangle index out of range");
                    continue;
                };
                triangles.push(MeshTriangle::new(a, b, c));
            }
            debug!(mesh = mesh.index(), tris = triangles.len() - before, "Added mesh");
        }
    }

    if triangles.is_empty() {
        warn!("File contains no triangle primitives");
    }

    Ok(Mesh { triangles })
}
