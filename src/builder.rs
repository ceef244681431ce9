// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Mat3;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::{
    error::{
        Error,
        Result,
    },
    scene::SceneInstance,
    shapes::MeshLibrary,
    types::{
        TriangleRecord,
        TRIANGLE_STRIDE,
    },
};

/// World-space triangles, `TRIANGLE_STRIDE` floats each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleArray {
    data: Vec<f32>,
}

impl TriangleArray {
    pub fn from_floats(data: Vec<f32>) -> Result<Self> {
        if data.len() % TRIANGLE_STRIDE != 0 {
            return Err(Error::RaggedArray {
                len:    data.len(),
                stride: TRIANGLE_STRIDE,
            });
        }
        Ok(Self { data })
    }

    pub fn push(
        &mut self,
        record: &TriangleRecord,
    ) {
        record.write(&mut self.data);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.data.len() / TRIANGLE_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn record(
        &self,
        index: usize,
    ) -> &[f32] {
        &self.data[index * TRIANGLE_STRIDE..(index + 1) * TRIANGLE_STRIDE]
    }

    pub fn triangle(
        &self,
        index: usize,
    ) -> TriangleRecord {
        TriangleRecord::read(self.record(index))
    }
}

/// Appends every mesh triangle of every instance, in instance order, then
/// mesh order.
#[instrument(skip_all, fields(instances = instances.len()))]
pub fn build_triangle_array(
    instances: &[SceneInstance],
    library: &MeshLibrary,
) -> TriangleArray {
    let mut array = TriangleArray::default();

    for instance in instances {
        let Some(mesh) = library.get(&instance.shape) else {
            warn!(shape = ?instance.shape, "No mesh for shape, skipping instance");
            continue;
        };

        // Inverse-transpose keeps normals perpendicular under non-uniform scale.
        let normal_matrix = Mat3::from_mat4(instance.transform).inverse().transpose();
        let diffuse = instance.material.diffuse();
        let shape_code = instance.shape.code();

        array.data.reserve(mesh.len() * TRIANGLE_STRIDE);
        for triangle in &mesh.triangles {
            array.push(&TriangleRecord {
                vertices: triangle
                    .vertices
                    .map(|vertex| instance.transform.transform_point3(vertex)),
                normal: (normal_matrix * triangle.normal).normalize(),
                diffuse,
                shape_code,
            });
        }
    }

    info!(triangles = array.len(), floats = array.data.len(), "Built triangle array");
    array
}
