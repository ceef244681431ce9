// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::{
    Mat4,
    Vec3,
};

use super::Ray;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Starts inverted so the first grown point sets both corners, whatever
    /// its sign.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub const fn new(
        min: Vec3,
        max: Vec3,
    ) -> Self {
        Self { min, max }
    }

    /// World box of the unit cube (half extent 0.5) placed by `transform`.
    ///
    /// Uses the absolute basis columns instead of transforming the eight
    /// corners, so a rotated instance gets the tight box of its rotated cube.
    pub fn from_unit_cube(transform: &Mat4) -> Self {
        let translation = transform.w_axis.truncate();
        let half = transform.x_axis.truncate().abs() * 0.5
            + transform.y_axis.truncate().abs() * 0.5
            + transform.z_axis.truncate().abs() * 0.5;

        Self {
            min: translation - half,
            max: translation + half,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn grow_to_include_point(
        &mut self,
        point: Vec3,
    ) {
        self.max = self.max.max(point);
        self.min = self.min.min(point);
    }

    #[inline]
    pub fn grow_to_include(
        &mut self,
        other: &Self,
    ) {
        self.max = self.max.max(other.max);
        self.min = self.min.min(other.min);
    }

    pub fn union(
        mut self,
        other: &Self,
    ) -> Self {
        self.grow_to_include(other);
        self
    }

    pub fn contains_point(
        &self,
        point: Vec3,
    ) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn overlaps(
        &self,
        other: &Self,
    ) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.cmple(other.max).all()
            && other.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Entry distance of `ray` into the box, clamped to zero when the origin
    /// is inside.
    #[inline]
    pub fn intersects(
        &self,
        ray: &Ray,
    ) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let t0 = (self.min - ray.origin) * ray.inv_dir;
        let t1 = (self.max - ray.origin) * ray.inv_dir;

        let tmin = t0.min(t1).max_element().max(0.0);
        let tmax = t0.max(t1).min_element();

        if tmin > tmax {
            None
        } else {
            Some(tmin)
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    #[test]
    fn negative_points_are_not_clamped_to_zero() {
        let mut aabb = Aabb::EMPTY;
        aabb.grow_to_include_point(Vec3::new(-3.0, -2.0, -5.0));
        aabb.grow_to_include_point(Vec3::new(-1.0, -4.0, -6.0));

        assert_eq!(aabb.min, Vec3::new(-3.0, -4.0, -6.0));
        assert_eq!(aabb.max, Vec3::new(-1.0, -2.0, -5.0));
    }

    #[test]
    fn empty_box_is_never_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(Aabb::EMPTY.is_empty());
        assert!(Aabb::EMPTY.intersects(&ray).is_none());
        assert!(!Aabb::EMPTY.overlaps(&Aabb::new(Vec3::splat(-1.0), Vec3::ONE)));
    }

    #[test]
    fn unit_cube_box_follows_translation_and_scale() {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 4.0),
            Quat::IDENTITY,
            Vec3::new(10.0, 0.0, -1.0),
        );
        let aabb = Aabb::from_unit_cube(&transform);

        assert!(aabb.min.abs_diff_eq(Vec3::new(9.0, -0.5, -3.0), 1e-6));
        assert!(aabb.max.abs_diff_eq(Vec3::new(11.0, 0.5, 1.0), 1e-6));
    }

    #[test]
    fn unit_cube_box_of_rotated_cube_uses_abs_columns() {
        // 45 degrees about Y: x and z half extents both become sqrt(2) / 2.
        let transform = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let aabb = Aabb::from_unit_cube(&transform);
        let half = std::f32::consts::FRAC_1_SQRT_2;

        assert!(aabb.max.abs_diff_eq(Vec3::new(half, 0.5, half), 1e-6));
        assert!(aabb.min.abs_diff_eq(-Vec3::new(half, 0.5, half), 1e-6));
    }

    #[test]
    fn ray_entry_distance() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let hit = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let miss = Ray::new(Vec3::new(-5.0, 3.0, 0.0), Vec3::X);
        let inside = Ray::new(Vec3::ZERO, Vec3::Y);

        assert_eq!(aabb.intersects(&hit), Some(4.0));
        assert_eq!(aabb.intersects(&miss), None);
        assert_eq!(aabb.intersects(&inside), Some(0.0));
    }
}
