// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3;

use super::{
    Aabb,
    Ray,
};

/// Floats per triangle record.
///
/// | floats | field                                  |
/// |--------|----------------------------------------|
/// | 0..9   | positions of a, b, c                   |
/// | 9..12  | face normal                            |
/// | 12..15 | diffuse rgb                            |
/// | 15..18 | tag: `TRIANGLE_TAG`, shape code, 0     |
pub const TRIANGLE_STRIDE: usize = 18;

/// First tag float of every triangle record.
pub const TRIANGLE_TAG: f32 = 1.0;

const NORMAL: usize = 9;
const DIFFUSE: usize = 12;
const TAG: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleRecord {
    pub vertices:   [Vec3; 3],
    pub normal:     Vec3,
    pub diffuse:    Vec3,
    pub shape_code: f32,
}

impl TriangleRecord {
    pub fn write(
        &self,
        out: &mut Vec<f32>,
    ) {
        for vertex in &self.vertices {
            out.extend_from_slice(&vertex.to_array());
        }
        out.extend_from_slice(&self.normal.to_array());
        out.extend_from_slice(&self.diffuse.to_array());
        out.extend_from_slice(&[TRIANGLE_TAG, self.shape_code, 0.0]);
    }

    /// `record` must hold at least `TRIANGLE_STRIDE` floats.
    pub fn read(record: &[f32]) -> Self {
        Self {
            vertices:   [
                Self::vertex(record, 0),
                Self::vertex(record, 1),
                Self::vertex(record, 2),
            ],
            normal:     Vec3::from_slice(&record[NORMAL..NORMAL + 3]),
            diffuse:    Vec3::from_slice(&record[DIFFUSE..DIFFUSE + 3]),
            shape_code: record[TAG + 1],
        }
    }

    #[inline]
    pub fn vertex(
        record: &[f32],
        corner: usize,
    ) -> Vec3 {
        Vec3::from_slice(&record[corner * 3..corner * 3 + 3])
    }

    /// Mean of the three vertices along `axis`, read straight from a record.
    #[inline]
    pub fn centroid_axis(
        record: &[f32],
        axis: usize,
    ) -> f32 {
        (record[axis] + record[3 + axis] + record[6 + axis]) / 3.0
    }

    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::EMPTY;
        for vertex in self.vertices {
            aabb.grow_to_include_point(vertex);
        }
        aabb
    }

    /// Moller-Trumbore. Returns the distance along `ray` of a hit in front of
    /// the origin.
    pub fn intersect(
        &self,
        ray: &Ray,
    ) -> Option<f32> {
        const EPSILON: f32 = 1e-8;

        let [a, b, c] = self.vertices;
        let edge1 = b - a;
        let edge2 = c - a;

        let pvec = ray.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let along = edge2.dot(qvec) * inv_det;
        (along > 0.0).then_some(along)
    }
}
