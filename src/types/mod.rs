// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

mod aabb;
mod triangle;

pub use aabb::Aabb;
use glam::Vec3;
pub use triangle::{
    TriangleRecord,
    TRIANGLE_STRIDE,
    TRIANGLE_TAG,
};

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin:    Vec3,
    pub direction: Vec3,
    pub inv_dir:   Vec3,
}

impl Ray {
    pub fn new(
        origin: Vec3,
        direction: Vec3,
    ) -> Self {
        Self {
            origin,
            direction,
            inv_dir: 1.0 / direction,
        }
    }

    #[inline]
    pub fn at(
        &self,
        along: f32,
    ) -> Vec3 {
        self.origin + self.direction * along
    }
}
